//! CampusBridge - ERPNext access layer with background cache sync.

use anyhow::Context;
use campusbridge_app::utils::init_tracing;
use campusbridge_app::AppContext;
use campusbridge_infra::config;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG and the log format apply to the subscriber
    let dotenv = dotenvy::dotenv();
    init_tracing();

    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => warn!(error = %err, "no .env file loaded"),
    }

    let config = config::load().context("failed to load configuration")?;
    let ctx = AppContext::new(config).await.context("failed to start CampusBridge")?;
    info!("CampusBridge started");

    tokio::signal::ctrl_c().await.context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");

    ctx.shutdown().await.context("shutdown did not complete cleanly")?;
    info!("CampusBridge stopped");
    Ok(())
}
