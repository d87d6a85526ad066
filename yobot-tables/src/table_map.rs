//! Logical table map
//!
//! Loaded once at startup from a JSON document of the form
//!
//! ```json
//! { "leads": {
//!     "baseId": "appX",
//!     "tableName": "tblY",
//!     "view": "Grid view",
//!     "fields": { "email": "📧 Email" }
//! } }
//! ```
//!
//! and immutable afterward. Any invalid entry fails the whole load, since a
//! wrong base or table id writes data to the wrong place.

use crate::error::{AccessorError, AccessorResult};
use crate::Fields;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Physical location and field translations for one logical table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableConfig {
    /// Airtable base (workspace) id
    pub base_id: String,

    /// Physical table name or id within the base
    pub table_name: String,

    /// Default view for list queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,

    /// Logical field key → physical field name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl TableConfig {
    pub fn new(base_id: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            base_id: base_id.into(),
            table_name: table_name.into(),
            view: None,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn with_field(mut self, logical: impl Into<String>, physical: impl Into<String>) -> Self {
        self.fields.insert(logical.into(), physical.into());
        self
    }

    /// Physical name for a logical field key, if one is configured
    pub fn physical_field(&self, logical: &str) -> Option<&str> {
        self.fields.get(logical).map(String::as_str)
    }

    /// Translate a record's physical field names back to logical keys
    ///
    /// Physical names with no configured logical key are kept as-is. Never
    /// applied automatically to operation results.
    pub fn logical_fields(&self, physical: &Fields) -> Fields {
        let reverse: HashMap<&str, &str> = self
            .fields
            .iter()
            .map(|(logical, physical)| (physical.as_str(), logical.as_str()))
            .collect();

        physical
            .iter()
            .map(|(name, value)| {
                let key = reverse.get(name.as_str()).copied().unwrap_or(name.as_str());
                (key.to_string(), value.clone())
            })
            .collect()
    }

    fn validate(&self, logical_name: &str) -> AccessorResult<()> {
        if self.base_id.trim().is_empty() {
            return Err(AccessorError::Configuration(format!(
                "table '{}' has an empty baseId",
                logical_name
            )));
        }
        if self.table_name.trim().is_empty() {
            return Err(AccessorError::Configuration(format!(
                "table '{}' has an empty tableName",
                logical_name
            )));
        }

        let mut seen: HashMap<&str, &str> = HashMap::new();
        for (logical, physical) in &self.fields {
            if physical.trim().is_empty() {
                return Err(AccessorError::Configuration(format!(
                    "field '{}' of table '{}' maps to an empty name",
                    logical, logical_name
                )));
            }
            if let Some(other) = seen.insert(physical.as_str(), logical.as_str()) {
                return Err(AccessorError::Configuration(format!(
                    "fields '{}' and '{}' of table '{}' both map to '{}'",
                    other, logical, logical_name, physical
                )));
            }
        }

        Ok(())
    }
}

/// Immutable set of table configurations keyed by logical name
#[derive(Debug, Clone)]
pub struct TableMap {
    tables: BTreeMap<String, TableConfig>,
}

impl TableMap {
    /// Build from already-parsed entries, validating each
    pub fn from_tables(tables: BTreeMap<String, TableConfig>) -> AccessorResult<Self> {
        if tables.is_empty() {
            return Err(AccessorError::Configuration(
                "table map contains no tables".to_string(),
            ));
        }
        for (name, config) in &tables {
            if name.trim().is_empty() {
                return Err(AccessorError::Configuration(
                    "table map contains an empty logical table name".to_string(),
                ));
            }
            config.validate(name)?;
        }
        Ok(Self { tables })
    }

    pub fn from_json_str(json: &str) -> AccessorResult<Self> {
        let tables: BTreeMap<String, TableConfig> = serde_json::from_str(json)
            .map_err(|e| AccessorError::Configuration(format!("invalid table map: {}", e)))?;
        Self::from_tables(tables)
    }

    pub fn from_path(path: impl AsRef<Path>) -> AccessorResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AccessorError::Configuration(format!(
                "cannot read table map {}: {}",
                path.display(),
                e
            ))
        })?;
        let map = Self::from_json_str(&json).map_err(|e| match e {
            AccessorError::Configuration(msg) => {
                AccessorError::Configuration(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })?;

        tracing::info!(
            path = %path.display(),
            tables = map.len(),
            "Loaded table map"
        );
        Ok(map)
    }

    /// Look up a logical table. Unknown names are an error, never a default.
    pub fn resolve(&self, logical_name: &str) -> AccessorResult<&TableConfig> {
        self.tables.get(logical_name).ok_or_else(|| {
            AccessorError::Configuration(format!("unknown logical table '{}'", logical_name))
        })
    }

    pub fn contains(&self, logical_name: &str) -> bool {
        self.tables.contains_key(logical_name)
    }

    /// Logical table names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
