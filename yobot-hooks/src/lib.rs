//! yobot-hooks library - webhook intake for YoBot tables
//!
//! Receives plain JSON payloads from webhook senders and test scripts and
//! forwards them to the table accessor. Accessor failures are reported as
//! 4xx/5xx responses; nothing is acknowledged unless Airtable accepted it.

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;
use yobot_tables::RetryingAccessor;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Table accessor with the configured retry policy
    pub tables: RetryingAccessor,
    /// Service startup timestamp for uptime reporting
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(tables: RetryingAccessor) -> Self {
        Self {
            tables,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let records = Router::new()
        .route("/api/tables", get(api::list_tables))
        .route(
            "/api/tables/:table/records",
            get(api::list_records).post(api::create_record),
        )
        .route(
            "/api/tables/:table/records/:record_id",
            get(api::get_record).patch(api::update_record),
        );

    Router::new()
        .merge(records)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
