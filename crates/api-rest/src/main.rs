//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful during development when only the HTTP surface is needed. The workspace's main
//! `urc-run` binary serves the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use urc_api_rest::{router, AppState};
use urc_core::{config::data_dir_from_env_value, CoreConfig, SurveillanceService};

/// Main entry point for the URC REST API server
///
/// # Environment Variables
/// - `URC_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `URC_DATA_DIR`: Directory holding the collection files (default: "surveillance_data")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("urc_api_rest=info".parse()?)
                .add_directive("urc_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("URC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("URC_DATA_DIR").ok());

    tracing::info!("-- Starting URC REST API on {}", addr);
    tracing::info!("-- Collection files under {}", data_dir.display());

    let cfg = Arc::new(CoreConfig::with_data_dir(data_dir)?);
    let service = SurveillanceService::open_data_dir(cfg)?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
