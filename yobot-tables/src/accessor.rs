//! Config-driven table accessor
//!
//! Resolves logical table names through the [`TableMap`], translates logical
//! field keys, and performs record operations against the Airtable REST API:
//!
//! - create  `POST   {api}/v0/{baseId}/{tableName}`
//! - update  `PATCH  {api}/v0/{baseId}/{tableName}/{recordId}`
//! - get     `GET    {api}/v0/{baseId}/{tableName}/{recordId}`
//! - delete  `DELETE {api}/v0/{baseId}/{tableName}/{recordId}`
//! - list    `GET    {api}/v0/{baseId}/{tableName}?view=&filterByFormula=&offset=`
//!
//! The accessor never retries; see [`crate::retry`] for the retrying wrapper.

use crate::error::{AccessorError, AccessorResult, Operation};
use crate::fields::{map_field_name, map_fields};
use crate::record::{
    BatchBody, BatchEntry, DeletedRecord, FieldsBody, ListQuery, Record, RecordBatch, RecordPage,
};
use crate::table_map::{TableConfig, TableMap};
use crate::{FieldMode, Fields};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use yobot_common::config::{AirtableConfig, DEFAULT_API_URL};

const USER_AGENT: &str = concat!("YoBot/", env!("CARGO_PKG_VERSION"));

/// Airtable accepts at most 10 records per batch request
pub const MAX_BATCH_SIZE: usize = 10;

/// Connection settings for the accessor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessorSettings {
    /// REST API root, without the `/v0` suffix
    pub api_url: String,
    /// Bound on every outbound request
    pub timeout: Duration,
    pub field_mode: FieldMode,
    /// Send `"typecast": true` with create and update bodies
    pub typecast: bool,
}

impl Default for AccessorSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            field_mode: FieldMode::Permissive,
            typecast: false,
        }
    }
}

impl From<&AirtableConfig> for AccessorSettings {
    fn from(config: &AirtableConfig) -> Self {
        Self {
            api_url: config.api_url.clone(),
            timeout: config.timeout(),
            field_mode: config.field_mode,
            typecast: config.typecast,
        }
    }
}

/// Airtable table accessor
///
/// Cheap to clone; clones share the table map and the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct TableAccessor {
    tables: Arc<TableMap>,
    settings: AccessorSettings,
    api_root: Url,
    http_client: reqwest::Client,
}

impl TableAccessor {
    /// Build an accessor. Fails on a blank token or an unusable API URL.
    pub fn new(
        tables: Arc<TableMap>,
        settings: AccessorSettings,
        token: impl Into<String>,
    ) -> AccessorResult<Self> {
        if settings.timeout.is_zero() {
            return Err(AccessorError::Configuration(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        let token = token.into();
        if token.trim().is_empty() {
            return Err(AccessorError::Configuration(
                "Airtable token is empty".to_string(),
            ));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| {
            AccessorError::Configuration("Airtable token contains invalid characters".to_string())
        })?;
        auth.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let api_root = Url::parse(&settings.api_url).map_err(|e| {
            AccessorError::Configuration(format!("invalid API URL '{}': {}", settings.api_url, e))
        })?;
        if api_root.cannot_be_a_base() {
            return Err(AccessorError::Configuration(format!(
                "API URL '{}' cannot carry a path",
                settings.api_url
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                AccessorError::Configuration(format!("cannot build HTTP client: {}", e))
            })?;

        Ok(Self {
            tables,
            settings,
            api_root,
            http_client,
        })
    }

    pub fn tables(&self) -> &TableMap {
        &self.tables
    }

    pub fn settings(&self) -> &AccessorSettings {
        &self.settings
    }

    /// Look up the configuration for a logical table
    pub fn resolve_table(&self, logical_name: &str) -> AccessorResult<&TableConfig> {
        self.tables.resolve(logical_name)
    }

    /// Translate logical field keys for a table (see [`crate::fields::map_fields`])
    pub fn map_fields(&self, logical_name: &str, data: &Fields) -> AccessorResult<Fields> {
        let config = self.resolve_table(logical_name)?;
        map_fields(logical_name, config, data, self.settings.field_mode)
    }

    /// Create one record
    pub async fn create_record(&self, logical_name: &str, data: &Fields) -> AccessorResult<Record> {
        let config = self.resolve_table(logical_name)?;
        let fields = map_fields(logical_name, config, data, self.settings.field_mode)?;
        let url = self.table_url(config, None)?;

        tracing::debug!(table = %logical_name, url = %url, fields = fields.len(), "Creating record");

        let body = FieldsBody {
            fields: &fields,
            typecast: self.settings.typecast,
        };
        let record: Record = self
            .send(
                logical_name,
                Operation::Create,
                self.http_client.post(url).json(&body),
            )
            .await?;

        tracing::info!(table = %logical_name, record_id = %record.id, "Created record");
        Ok(record)
    }

    /// Create many records, 10 per request, preserving input order
    ///
    /// Chunks are sent one after another. The first failing chunk aborts the
    /// batch; records from earlier chunks have already been created.
    pub async fn create_records(
        &self,
        logical_name: &str,
        data: &[Fields],
    ) -> AccessorResult<Vec<Record>> {
        let config = self.resolve_table(logical_name)?;
        let mapped = data
            .iter()
            .map(|d| map_fields(logical_name, config, d, self.settings.field_mode))
            .collect::<AccessorResult<Vec<_>>>()?;
        let url = self.table_url(config, None)?;

        let mut created = Vec::with_capacity(mapped.len());
        for (index, chunk) in mapped.chunks(MAX_BATCH_SIZE).enumerate() {
            let body = BatchBody {
                records: chunk.iter().map(|fields| BatchEntry { fields }).collect(),
                typecast: self.settings.typecast,
            };
            let batch: RecordBatch = self
                .send(
                    logical_name,
                    Operation::BatchCreate,
                    self.http_client.post(url.clone()).json(&body),
                )
                .await?;

            tracing::debug!(
                table = %logical_name,
                chunk = index,
                records = batch.records.len(),
                "Created record batch"
            );
            created.extend(batch.records);
        }

        tracing::info!(table = %logical_name, records = created.len(), "Created records");
        Ok(created)
    }

    /// Partially update a record
    ///
    /// Only the translated keys of `data` are sent; fields absent from `data`
    /// keep their current values.
    pub async fn update_record(
        &self,
        logical_name: &str,
        record_id: &str,
        data: &Fields,
    ) -> AccessorResult<Record> {
        let config = self.resolve_table(logical_name)?;
        let fields = map_fields(logical_name, config, data, self.settings.field_mode)?;
        let url = self.table_url(config, Some(record_id))?;

        tracing::debug!(
            table = %logical_name,
            record_id = %record_id,
            fields = fields.len(),
            "Updating record"
        );

        let body = FieldsBody {
            fields: &fields,
            typecast: self.settings.typecast,
        };
        let record: Record = self
            .send(
                logical_name,
                Operation::Update,
                self.http_client.patch(url).json(&body),
            )
            .await?;

        tracing::info!(table = %logical_name, record_id = %record.id, "Updated record");
        Ok(record)
    }

    pub async fn get_record(&self, logical_name: &str, record_id: &str) -> AccessorResult<Record> {
        let config = self.resolve_table(logical_name)?;
        let url = self.table_url(config, Some(record_id))?;

        tracing::debug!(table = %logical_name, record_id = %record_id, "Fetching record");
        self.send(logical_name, Operation::Get, self.http_client.get(url))
            .await
    }

    pub async fn delete_record(
        &self,
        logical_name: &str,
        record_id: &str,
    ) -> AccessorResult<DeletedRecord> {
        let config = self.resolve_table(logical_name)?;
        let url = self.table_url(config, Some(record_id))?;

        let deleted: DeletedRecord = self
            .send(logical_name, Operation::Delete, self.http_client.delete(url))
            .await?;

        tracing::info!(table = %logical_name, record_id = %deleted.id, "Deleted record");
        Ok(deleted)
    }

    /// List every record of a table, following continuation tokens
    ///
    /// `view` defaults to the table's configured view.
    pub async fn list_records(
        &self,
        logical_name: &str,
        view: Option<&str>,
        filter_formula: Option<&str>,
    ) -> AccessorResult<Vec<Record>> {
        let query = ListQuery {
            view: view.map(str::to_string),
            filter_formula: filter_formula.map(str::to_string),
            ..ListQuery::default()
        };
        self.list_records_with(logical_name, &query).await
    }

    /// List records with the full query surface
    ///
    /// Pages are fetched strictly in sequence: page N+1 is requested only
    /// once page N has returned its continuation token.
    pub async fn list_records_with(
        &self,
        logical_name: &str,
        query: &ListQuery,
    ) -> AccessorResult<Vec<Record>> {
        let config = self.resolve_table(logical_name)?;
        let url = self.table_url(config, None)?;
        let params = self.list_params(logical_name, config, query)?;

        let mut records = Vec::new();
        let mut offset: Option<String> = None;
        let mut page = 0usize;

        loop {
            page += 1;
            let mut request = self.http_client.get(url.clone()).query(&params);
            if let Some(token) = &offset {
                request = request.query(&[("offset", token.as_str())]);
            }

            let batch: RecordPage = self.send(logical_name, Operation::List, request).await?;

            tracing::debug!(
                table = %logical_name,
                page,
                records = batch.records.len(),
                more = batch.offset.is_some(),
                "Fetched page"
            );
            records.extend(batch.records);

            match batch.offset {
                Some(next) if offset.as_deref() == Some(next.as_str()) => {
                    return Err(AccessorError::Decode {
                        table: logical_name.to_string(),
                        operation: Operation::List,
                        status: 200,
                        message: format!("continuation token '{}' repeated", next),
                    });
                }
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        tracing::info!(
            table = %logical_name,
            pages = page,
            records = records.len(),
            "Listed records"
        );
        Ok(records)
    }

    /// First record matching a formula, or `None`
    pub async fn find_first(
        &self,
        logical_name: &str,
        filter_formula: &str,
    ) -> AccessorResult<Option<Record>> {
        let query = ListQuery::new().filter(filter_formula).max_records(1);
        let records = self.list_records_with(logical_name, &query).await?;
        Ok(records.into_iter().next())
    }

    fn table_url(&self, config: &TableConfig, record_id: Option<&str>) -> AccessorResult<Url> {
        if record_id.is_some_and(|id| id.trim().is_empty()) {
            return Err(AccessorError::Configuration(
                "record id must not be empty".to_string(),
            ));
        }

        let mut url = self.api_root.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                AccessorError::Configuration(format!(
                    "API URL '{}' cannot carry a path",
                    self.settings.api_url
                ))
            })?;
            segments
                .pop_if_empty()
                .push("v0")
                .push(&config.base_id)
                .push(&config.table_name);
            if let Some(id) = record_id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn list_params(
        &self,
        logical_name: &str,
        config: &TableConfig,
        query: &ListQuery,
    ) -> AccessorResult<Vec<(String, String)>> {
        let mode = self.settings.field_mode;
        let mut params = Vec::new();

        if let Some(view) = query.view.as_ref().or(config.view.as_ref()) {
            params.push(("view".to_string(), view.clone()));
        }
        if let Some(formula) = &query.filter_formula {
            params.push(("filterByFormula".to_string(), formula.clone()));
        }
        if let Some(size) = query.page_size {
            params.push(("pageSize".to_string(), size.to_string()));
        }
        if let Some(max) = query.max_records {
            params.push(("maxRecords".to_string(), max.to_string()));
        }
        for field in &query.fields {
            let physical = map_field_name(logical_name, config, field, mode)?;
            params.push(("fields[]".to_string(), physical.to_string()));
        }
        for (index, sort) in query.sort.iter().enumerate() {
            let physical = map_field_name(logical_name, config, &sort.field, mode)?;
            params.push((format!("sort[{}][field]", index), physical.to_string()));
            params.push((
                format!("sort[{}][direction]", index),
                sort.direction.as_str().to_string(),
            ));
        }

        Ok(params)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        logical_name: &str,
        operation: Operation,
        request: reqwest::RequestBuilder,
    ) -> AccessorResult<T> {
        let timeout = self.settings.timeout;
        let response = request
            .send()
            .await
            .map_err(|e| AccessorError::from_transport(logical_name, operation, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(
                        table = %logical_name,
                        operation = %operation,
                        error = %e,
                        "Failed to read error response body"
                    );
                    format!("<body unreadable: {}>", e)
                }
            };
            tracing::warn!(
                table = %logical_name,
                operation = %operation,
                status = status.as_u16(),
                body = %body,
                "Airtable request failed"
            );
            return Err(AccessorError::from_status(
                logical_name,
                operation,
                status.as_u16(),
                body,
                retry_after,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AccessorError::from_transport(logical_name, operation, timeout, e))?;

        serde_json::from_slice(&bytes).map_err(|e| AccessorError::Decode {
            table: logical_name.to_string(),
            operation,
            status: status.as_u16(),
            message: e.to_string(),
        })
    }
}

/// Retry-After in delta-seconds form (the only form Airtable sends)
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
