//! Configuration for the webarc CLI
//!
//! Server URL, index cache location and local storage directories.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use webarc_engine::config::{DEFAULT_ORGANIZATION, DEFAULT_STORAGE_DIR};

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default archive node URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8070";

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Archive node URL
    pub server_url: String,

    /// Index artifact directory
    pub cache_dir: PathBuf,

    /// Local storage directories
    pub storage_dirs: Vec<PathBuf>,

    /// Organization named in metadata record URIs
    pub organization: String,
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| CliError::config("Could not determine cache directory"))?
            .join("webarc");

        Ok(Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            cache_dir,
            storage_dirs: vec![PathBuf::from(DEFAULT_STORAGE_DIR)],
            organization: DEFAULT_ORGANIZATION.to_string(),
        })
    }

    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::new()?;

        if let Ok(url) = std::env::var("WEBARC_SERVER_URL") {
            config.server_url = url;
        }

        if let Ok(cache) = std::env::var("WEBARC_CACHE_DIR") {
            config.cache_dir = PathBuf::from(cache);
        }

        if let Ok(dirs) = std::env::var("WEBARC_STORAGE_DIRS") {
            let dirs: Vec<PathBuf> = dirs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
            if !dirs.is_empty() {
                config.storage_dirs = dirs;
            }
        }

        if let Ok(organization) = std::env::var("WEBARC_ORGANIZATION") {
            if organization.trim().is_empty() || organization.contains('/') {
                return Err(CliError::config(format!(
                    "organization '{}' is not usable in metadata URIs",
                    organization
                )));
            }
            config.organization = organization;
        }

        Ok(config)
    }

    /// Storage directories, with command-line ones taking precedence
    pub fn storage_dirs_or(&self, overrides: &[PathBuf]) -> Vec<PathBuf> {
        if overrides.is_empty() {
            self.storage_dirs.clone()
        } else {
            overrides.to_vec()
        }
    }

    /// Base URL of the node's raw container endpoint
    pub fn files_url(&self) -> String {
        format!("{}/files", self.server_url.trim_end_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            cache_dir: PathBuf::from(".webarc-cache"),
            storage_dirs: vec![PathBuf::from(DEFAULT_STORAGE_DIR)],
            organization: DEFAULT_ORGANIZATION.to_string(),
        })
    }
}
