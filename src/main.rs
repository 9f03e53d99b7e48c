use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use urc_api_rest::{router, AppState};
use urc_core::{config::data_dir_from_env_value, CoreConfig, SurveillanceService};

/// Main entry point for the URC surveillance application
///
/// Resolves configuration once, loads every collection from the data directory and serves
/// the REST API until interrupted.
///
/// # Environment Variables
/// - `URC_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `URC_DATA_DIR`: Directory holding the collection files (default: "surveillance_data")
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or serving fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("urc=info".parse()?)
                .add_directive("urc_core=info".parse()?)
                .add_directive("urc_api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("URC_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("URC_DATA_DIR").ok());

    tracing::info!("++ Starting URC REST on {}", rest_addr);
    tracing::info!("++ Collection files under {}", data_dir.display());

    let cfg = Arc::new(CoreConfig::with_data_dir(data_dir)?);
    let service = SurveillanceService::open_data_dir(cfg)?;
    let app = router(AppState::new(service));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- URC REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
