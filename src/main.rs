//! # Crud Core
//!
//! Entry point that prepares a deployment:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations

use anyhow::Result;
use tracing::info;

use crud_core::config::Settings;
use crud_core::startup;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber for structured logging
    crud_core::telemetry::init_tracing();

    info!("Starting Crud Core...");

    // Load configuration from environment and config files
    let settings = Settings::load()?;
    info!(
        base_url = %settings.server.base_url()?,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let state = startup::connect_postgres(&settings).await?;
    info!(
        default_take = settings.pagination.default_take,
        max_take = settings.pagination.max_take,
        base_url = %state.pagination.base_url(),
        "Database ready"
    );

    Ok(())
}
