//! Searchlight server binary.
//!
//! Configuration comes from the environment:
//!
//! - `SEARCHLIGHT_PORT` - listen port (default 3000)
//! - `SEARCHLIGHT_DATABASE_URL` - SQLite connection string

use std::env;
use std::net::SocketAddr;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use searchlight::api::{
    AppState, generate_report_insights, get_report, get_report_insights, health_check,
    list_reports, submit_report,
};
use searchlight::storage::Storage;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
const DEFAULT_DB_PATH: &str = "sqlite:searchlight.db?mode=rwc";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing with environment filter
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("searchlight=info".parse()?))
        .init();

    // Load configuration from environment
    let port: u16 = env::var("SEARCHLIGHT_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(DEFAULT_PORT);

    let db_url =
        env::var("SEARCHLIGHT_DATABASE_URL").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());

    info!(port, db_url = %db_url, "Starting Searchlight server");

    // Initialize storage
    let storage = Storage::new(&db_url).await?;
    info!("Database initialized");

    // Create application state
    let state = AppState { storage };

    // Build router
    let app = Router::new()
        .route(
            "/clients/:client_id/reports",
            post(submit_report).get(list_reports),
        )
        .route("/clients/:client_id/reports/:report_id", get(get_report))
        .route(
            "/clients/:client_id/reports/:report_id/insights",
            post(generate_report_insights).get(get_report_insights),
        )
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Searchlight is listening");

    axum::serve(listener, app).await?;

    Ok(())
}
