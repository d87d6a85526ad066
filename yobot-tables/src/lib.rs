//! # YoBot Tables
//!
//! Config-driven access to Airtable tables. Callers address tables and fields
//! by stable logical names; the table map translates them into the physical
//! base id, table name and (often emoji-laden) field names Airtable stores.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use yobot_tables::{AccessorSettings, TableAccessor, TableMap};
//!
//! let tables = Arc::new(TableMap::from_path("tables.json")?);
//! let accessor = TableAccessor::new(tables, AccessorSettings::default(), "pat123")?;
//!
//! let mut lead = serde_json::Map::new();
//! lead.insert("email".into(), "a@b.com".into());
//! let record = accessor.create_record("leads", &lead).await?;
//! println!("created {}", record.id);
//! # Ok(())
//! # }
//! ```

pub mod accessor;
pub mod error;
pub mod fields;
pub mod record;
pub mod retry;
pub mod table_map;

pub use accessor::{AccessorSettings, TableAccessor};
pub use error::{AccessorError, AccessorResult, Operation};
pub use record::{DeletedRecord, ListQuery, Record, SortDirection, SortSpec};
pub use retry::{RetryPolicy, RetryingAccessor};
pub use table_map::{TableConfig, TableMap};
pub use yobot_common::config::FieldMode;

/// Logical or physical field payload, as sent to and received from Airtable
pub type Fields = serde_json::Map<String, serde_json::Value>;
