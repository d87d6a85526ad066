//! yobot-hooks - webhook intake service for YoBot tables
//!
//! Startup order:
//! 1. Parse command line
//! 2. Load TOML bootstrap config (defaults if none)
//! 3. Initialize tracing
//! 4. Load the table map and resolve the Airtable token (both fatal if missing)
//! 5. Serve until Ctrl-C

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use yobot_common::config::{load_toml_config, resolve_airtable_token, resolve_tables_path};
use yobot_hooks::{build_router, AppState};
use yobot_tables::{AccessorSettings, RetryPolicy, RetryingAccessor, TableAccessor, TableMap};

/// YoBot webhook intake service
#[derive(Debug, Parser)]
#[command(name = "yobot-hooks", version, about)]
struct Args {
    /// TOML config file (overrides YOBOT_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON table map (overrides YOBOT_TABLES and tables_path)
    #[arg(short, long)]
    tables: Option<PathBuf>,

    /// Listen address (overrides [server] host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides [server] port)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_toml_config(args.config.as_deref())?;

    // RUST_LOG wins over the TOML level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting YoBot webhook intake (yobot-hooks) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let tables_path = resolve_tables_path(args.tables.as_deref(), &config);
    let tables = TableMap::from_path(&tables_path)
        .with_context(|| format!("Failed to load table map {}", tables_path.display()))?;
    info!("✓ Loaded {} logical tables from {}", tables.len(), tables_path.display());

    let token = resolve_airtable_token(&config)?;

    let settings = AccessorSettings::from(&config.airtable);
    info!(
        api_url = %settings.api_url,
        timeout_secs = settings.timeout.as_secs(),
        field_mode = ?settings.field_mode,
        typecast = settings.typecast,
        "Airtable accessor configured"
    );
    let accessor = TableAccessor::new(Arc::new(tables), settings, token)?;

    let policy = RetryPolicy::from(&config.retry);
    info!(
        max_attempts = policy.max_attempts,
        "Retry policy: initial backoff {:?}, max backoff {:?}",
        policy.initial_backoff,
        policy.max_backoff
    );

    let state = AppState::new(RetryingAccessor::new(accessor, policy));
    let app = build_router(state);

    let host = args.host.unwrap_or(config.server.host);
    let port = args.port.unwrap_or(config.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    info!("yobot-hooks listening on http://{}:{}", host, port);
    info!("Health check: http://{}:{}/health", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("yobot-hooks stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
