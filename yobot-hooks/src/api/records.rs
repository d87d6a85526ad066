//! Record intake endpoints
//!
//! Request bodies are plain JSON objects keyed by logical field names, e.g.
//! `{"email": "a@b.com", "name": "Ada"}`. Responses carry the Airtable record
//! as returned, with physical field names.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;
use yobot_tables::{Fields, Record};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Query parameters for listing records
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Airtable view (defaults to the table's configured view)
    pub view: Option<String>,
    /// Airtable filter formula
    pub filter: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecordList {
    pub table: String,
    pub count: usize,
    pub records: Vec<Record>,
}

#[derive(Debug, Serialize)]
pub struct TableList {
    pub tables: Vec<String>,
}

/// GET /api/tables
pub async fn list_tables(State(state): State<AppState>) -> Json<TableList> {
    let tables = state
        .tables
        .inner()
        .tables()
        .names()
        .map(str::to_string)
        .collect();
    Json(TableList { tables })
}

/// POST /api/tables/:table/records
pub async fn create_record(
    State(state): State<AppState>,
    Path(table): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Record>)> {
    ensure_table(&state, &table)?;
    let Json(payload) = payload?;
    let data = into_fields(payload)?;

    let record = state
        .tables
        .create_record(&table, &data)
        .instrument(request_span("create", &table))
        .await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// PATCH /api/tables/:table/records/:record_id
pub async fn update_record(
    State(state): State<AppState>,
    Path((table, record_id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Record>> {
    ensure_table(&state, &table)?;
    let Json(payload) = payload?;
    let data = into_fields(payload)?;

    let record = state
        .tables
        .update_record(&table, &record_id, &data)
        .instrument(request_span("update", &table))
        .await?;

    Ok(Json(record))
}

/// GET /api/tables/:table/records/:record_id
pub async fn get_record(
    State(state): State<AppState>,
    Path((table, record_id)): Path<(String, String)>,
) -> ApiResult<Json<Record>> {
    ensure_table(&state, &table)?;

    let record = state
        .tables
        .get_record(&table, &record_id)
        .instrument(request_span("get", &table))
        .await?;

    Ok(Json(record))
}

/// GET /api/tables/:table/records?view=&filter=
pub async fn list_records(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<RecordList>> {
    ensure_table(&state, &table)?;

    let records = state
        .tables
        .list_records(&table, params.view.as_deref(), params.filter.as_deref())
        .instrument(request_span("list", &table))
        .await?;

    Ok(Json(RecordList {
        table,
        count: records.len(),
        records,
    }))
}

fn ensure_table(state: &AppState, table: &str) -> ApiResult<()> {
    if state.tables.inner().tables().contains(table) {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("unknown table '{}'", table)))
    }
}

fn into_fields(payload: Value) -> ApiResult<Fields> {
    match payload {
        Value::Object(fields) => Ok(fields),
        other => Err(ApiError::BadRequest(format!(
            "expected a JSON object of fields, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn request_span(operation: &'static str, table: &str) -> tracing::Span {
    tracing::info_span!(
        "intake",
        request_id = %Uuid::new_v4(),
        operation,
        table = %table
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_fields_accepts_object() {
        let fields = into_fields(json!({"email": "a@b.com"})).unwrap();
        assert_eq!(fields["email"], json!("a@b.com"));
    }

    #[test]
    fn test_into_fields_rejects_non_object() {
        for payload in [json!([1, 2]), json!("text"), json!(null), json!(3)] {
            assert!(matches!(into_fields(payload), Err(ApiError::BadRequest(_))));
        }
    }
}
