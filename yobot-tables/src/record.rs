//! Record envelope and list query types
//!
//! The envelope (id, creation time) is typed; the `fields` payload stays an
//! open JSON map owned by the caller.

use crate::Fields;
use serde::{Deserialize, Serialize};

/// One Airtable record
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Record {
    /// Record id (`rec...`)
    pub id: String,

    /// ISO 8601 creation timestamp
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,

    /// Physical field name → value. Airtable omits empty fields.
    #[serde(default)]
    pub fields: Fields,
}

/// Response to a record delete
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeletedRecord {
    pub id: String,
    pub deleted: bool,
}

/// Sort direction for list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Sort key: logical field key plus direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Options for listing records
///
/// Field names in `fields` and `sort` are logical keys and are translated
/// with the table's field map before the request is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// View to query; falls back to the table's configured view
    pub view: Option<String>,
    /// Airtable formula restricting the result set
    pub filter_formula: Option<String>,
    /// Records per page (Airtable caps this at 100)
    pub page_size: Option<u32>,
    /// Upper bound on records across all pages
    pub max_records: Option<u32>,
    /// Only return these fields
    pub fields: Vec<String>,
    pub sort: Vec<SortSpec>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(mut self, view: impl Into<String>) -> Self {
        self.view = Some(view.into());
        self
    }

    pub fn filter(mut self, formula: impl Into<String>) -> Self {
        self.filter_formula = Some(formula.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn max_records(mut self, max: u32) -> Self {
        self.max_records = Some(max);
        self
    }

    pub fn field(mut self, logical_key: impl Into<String>) -> Self {
        self.fields.push(logical_key.into());
        self
    }

    pub fn sort(mut self, logical_key: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortSpec {
            field: logical_key.into(),
            direction,
        });
        self
    }
}

/// One page of a list response
#[derive(Debug, Deserialize)]
pub(crate) struct RecordPage {
    #[serde(default)]
    pub records: Vec<Record>,
    /// Continuation token; absent on the last page
    pub offset: Option<String>,
}

/// Response to a batch create
#[derive(Debug, Deserialize)]
pub(crate) struct RecordBatch {
    pub records: Vec<Record>,
}

/// Request body for create and update
#[derive(Debug, Serialize)]
pub(crate) struct FieldsBody<'a> {
    pub fields: &'a Fields,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub typecast: bool,
}

/// Request body for batch create
#[derive(Debug, Serialize)]
pub(crate) struct BatchBody<'a> {
    pub records: Vec<BatchEntry<'a>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub typecast: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct BatchEntry<'a> {
    pub fields: &'a Fields,
}
