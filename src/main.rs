use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use ridewise::{AppConfig, AppState, MemorySessionStore, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let _telemetry = telemetry::init(&config.logging)?;

    info!("Starting ridewise {}", ridewise::VERSION);
    for key in config.missing_credentials() {
        warn!("{} is not set, features depending on it will fail", key);
    }

    let state = AppState::new(config, Arc::new(MemorySessionStore::new()))?;
    web::serve(state).await
}
