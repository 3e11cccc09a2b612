use anyhow::{Context, Result};
use radiohub::config::AppConfig;
use radiohub::ui::Console;
use radiohub::{CatalogService, RadioBrowserClient, SessionController};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().context("Failed to load config")?;
    info!(base_url = ?config.api.base_url, "starting radiohub");

    let client = RadioBrowserClient::new(&config.api)?;
    let catalog = Arc::new(CatalogService::new(client, config.cache.clone()));
    let controller = SessionController::new(catalog, config.browse.clone());

    Console::new(controller).run().await
}
