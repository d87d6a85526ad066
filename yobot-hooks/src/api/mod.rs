//! HTTP API handlers for yobot-hooks

pub mod health;
pub mod records;

pub use health::health_routes;
pub use records::{create_record, get_record, list_records, list_tables, update_record};
