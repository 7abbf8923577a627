//! Genius Dashboard agent binary.

use anyhow::Result;
use genius_dashboard_agent::{logging, Dashboard, DashboardConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = DashboardConfig::from_env()?;

    // Initialize logging
    logging::init(&config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting Genius Dashboard agent"
    );

    if let Err(err) = config.validate() {
        tracing::error!(error = %err, "Invalid configuration");
        return Err(err.into());
    }

    tracing::info!(
        team = config.team,
        server = %config.server,
        broker = %config.broker_url(),
        "Configuration loaded"
    );

    let dashboard = Dashboard::new(config)?;

    // Run dashboard
    dashboard.run().await?;

    Ok(())
}
