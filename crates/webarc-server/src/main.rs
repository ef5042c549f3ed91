//! webarc-server - Main entry point

use anyhow::{Context, Result};
use tracing::info;
use webarc_common::logging::{init_logging, LogConfig};
use webarc_server::{api, config::Config};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("webarc-server".to_string())
        .filter_directives("webarc_server=debug,webarc_engine=info,tower_http=debug".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting webarc archive node");

    let config = Config::load().context("Failed to load server configuration")?;
    info!(
        storage_dirs = ?config.engine.storage_dirs,
        cache_dir = %config.engine.cache_dir.display(),
        "Configuration loaded - server will bind to {}:{}",
        config.server.host,
        config.server.port
    );

    api::serve(config).await
}
