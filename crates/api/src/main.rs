//! Telemetry Hub - Main Entry Point

use api::{config::Settings, init_logging, run_server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    init_logging(&settings.logging.level);

    info!("=== EnvMon Telemetry Hub v{} ===", env!("CARGO_PKG_VERSION"));
    run_server(&settings).await?;

    Ok(())
}
