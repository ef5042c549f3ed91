//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Engine Configuration Constants
// ============================================================================

/// Default storage directory.
pub const DEFAULT_STORAGE_DIR: &str = "./archive";

/// Default directory for cached index artifacts.
pub const DEFAULT_CACHE_DIR: &str = "./cache";

/// Default interval between checks of an index build marker.
pub const DEFAULT_CACHE_POLL_INTERVAL_MS: u64 = 100;

/// Default upper bound on waiting for another index builder (10 minutes).
pub const DEFAULT_CACHE_WAIT_TIMEOUT_SECS: u64 = 600;

/// Default cap on exception occurrences kept per batch run.
pub const DEFAULT_MAX_EXCEPTIONS: usize = crate::engine::DEFAULT_MAX_EXCEPTIONS;

/// Default idle connections kept per remote archive node.
pub const DEFAULT_REMOTE_POOL_SIZE: usize = 20;

/// Default timeout for a whole remote record request.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout for remote archive nodes.
pub const DEFAULT_REMOTE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default organization used in metadata record URIs.
pub const DEFAULT_ORGANIZATION: &str = "netarkivet";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub storage_dirs: Vec<PathBuf>,
    pub cache_dir: PathBuf,
    pub cache_poll_interval_ms: u64,
    pub cache_wait_timeout_secs: u64,
    pub max_exceptions: usize,
    pub organization: String,
    pub remote: RemoteConfig,
}

/// Connection settings for the remote retrieval client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: Option<String>,
    pub pool_max_idle_per_host: usize,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl EngineConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = EngineConfig {
            storage_dirs: std::env::var("WEBARC_STORAGE_DIRS")
                .unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string())
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect(),
            cache_dir: std::env::var("WEBARC_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),
            cache_poll_interval_ms: env_parse(
                "WEBARC_CACHE_POLL_INTERVAL_MS",
                DEFAULT_CACHE_POLL_INTERVAL_MS,
            ),
            cache_wait_timeout_secs: env_parse(
                "WEBARC_CACHE_WAIT_TIMEOUT_SECS",
                DEFAULT_CACHE_WAIT_TIMEOUT_SECS,
            ),
            max_exceptions: env_parse("WEBARC_MAX_EXCEPTIONS", DEFAULT_MAX_EXCEPTIONS),
            organization: std::env::var("WEBARC_ORGANIZATION")
                .unwrap_or_else(|_| DEFAULT_ORGANIZATION.to_string()),
            remote: RemoteConfig {
                base_url: std::env::var("WEBARC_REMOTE_URL").ok().filter(|s| !s.is_empty()),
                pool_max_idle_per_host: env_parse("WEBARC_REMOTE_POOL_SIZE", DEFAULT_REMOTE_POOL_SIZE),
                timeout_secs: env_parse("WEBARC_REMOTE_TIMEOUT_SECS", DEFAULT_REMOTE_TIMEOUT_SECS),
                connect_timeout_secs: env_parse(
                    "WEBARC_REMOTE_CONNECT_TIMEOUT_SECS",
                    DEFAULT_REMOTE_CONNECT_TIMEOUT_SECS,
                ),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage_dirs.is_empty() {
            anyhow::bail!("At least one storage directory must be configured");
        }

        if self.cache_poll_interval_ms == 0 {
            anyhow::bail!("Cache poll interval must be greater than 0");
        }

        if self.cache_wait_timeout_secs == 0 {
            anyhow::bail!("Cache wait timeout must be greater than 0");
        }

        if self.max_exceptions == 0 {
            anyhow::bail!("max_exceptions must be greater than 0");
        }

        if self.organization.trim().is_empty() || self.organization.contains('/') {
            anyhow::bail!("Organization '{}' is not usable in metadata URIs", self.organization);
        }

        self.remote.validate()
    }
}

impl RemoteConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("Remote URL must start with http:// or https://, got '{}'", url);
            }
        }

        if self.timeout_secs == 0 {
            anyhow::bail!("Remote timeout must be greater than 0");
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_dirs: vec![PathBuf::from(DEFAULT_STORAGE_DIR)],
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            cache_poll_interval_ms: DEFAULT_CACHE_POLL_INTERVAL_MS,
            cache_wait_timeout_secs: DEFAULT_CACHE_WAIT_TIMEOUT_SECS,
            max_exceptions: DEFAULT_MAX_EXCEPTIONS,
            organization: DEFAULT_ORGANIZATION.to_string(),
            remote: RemoteConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            pool_max_idle_per_host: DEFAULT_REMOTE_POOL_SIZE,
            timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_REMOTE_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.storage_dirs.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.remote.base_url = Some("ftp://node".into());
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.organization = "a/b".into();
        assert!(config.validate().is_err());
    }
}
