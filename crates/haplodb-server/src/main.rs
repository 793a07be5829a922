//! HaploDB Server - Main entry point

use anyhow::{Context, Result};
use haplodb_common::logging::{init_logging, LogConfig};
use tracing::info;

use haplodb_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("haplodb-server".to_string())
        .filter_directives("haplodb_server=debug,tower_http=debug,sqlx=info".to_string())
        .build();

    // Environment variables take precedence over the built-in defaults
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config).context("Failed to initialize logging")?;

    info!("Starting HaploDB Server");

    let config = Config::load().context("Failed to load configuration")?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    api::serve(config).await
}
