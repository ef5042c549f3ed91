//! `webarc index` command implementation
//!
//! Gets the sorted index for a job-ID set, building it locally or
//! downloading it from an archive node, and prints the artifact path.

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{CliError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use webarc_engine::cache::{artifact_name, canonical_ids, IndexCache, IndexSource};
use webarc_engine::LocalArchive;

pub struct IndexArgs {
    pub job_ids: Vec<u64>,
    pub storage: Vec<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub embedded: bool,
    pub remote: bool,
}

/// Get or build the index artifact
pub async fn run(config: &Config, args: IndexArgs) -> Result<()> {
    let cache_dir = args.cache_dir.unwrap_or_else(|| config.cache_dir.clone());

    let path = if args.remote {
        fetch(config, &args.job_ids, cache_dir).await?
    } else {
        let archive = LocalArchive::new(config.storage_dirs_or(&args.storage));
        let source = if args.embedded {
            IndexSource::EmbeddedCdx
        } else {
            IndexSource::default()
        };
        let cache = IndexCache::new(Arc::new(archive), cache_dir).with_source(source);
        let ids = args.job_ids;
        tokio::task::spawn_blocking(move || cache.get_or_build(&ids))
            .await
            .map_err(|e| CliError::Other(e.into()))??
    };

    println!("{}", path.display());
    Ok(())
}

async fn fetch(config: &Config, job_ids: &[u64], cache_dir: PathBuf) -> Result<PathBuf> {
    let ids = canonical_ids(job_ids);
    if ids.is_empty() {
        return Err(CliError::invalid_argument("at least one job ID is required"));
    }

    let client = ApiClient::new(config.server_url.clone())?;
    let fetched = client.fetch_index(&ids).await?;

    // The node's name is only trusted when it is a bare filename.
    let name = fetched
        .artifact_name
        .filter(|n| !n.is_empty() && !n.contains('/') && !n.contains('\\') && n != "..")
        .unwrap_or_else(|| artifact_name(&ids));

    tokio::fs::create_dir_all(&cache_dir).await?;
    let path = cache_dir.join(name);
    tokio::fs::write(&path, &fetched.body).await?;

    info!(path = %path.display(), bytes = fetched.body.len(), "Downloaded index");
    Ok(path)
}
