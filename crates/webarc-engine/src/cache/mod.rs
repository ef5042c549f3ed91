//! Disk-backed cache of sorted CDX index artifacts keyed by job-ID sets
//!
//! At most one builder per key runs system-wide. Builders claim a key by
//! creating `<artifact>.working` with create-new semantics; the marker doubles
//! as the unsorted work file. Everyone else polls until the marker is gone and
//! then uses the artifact.

pub mod naming;
pub mod sort;

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::cdx::{CdxExtractionJob, CdxFields, CdxRecordHarvestJob};
use crate::config::EngineConfig;
use crate::engine::{BatchStatus, FileSelection};
use crate::error::CacheBuildError;
use crate::job::BatchJob;
use crate::repository::BatchRepository;

pub use naming::{artifact_name, canonical_ids, marker_path};

/// Where index lines for a job set come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Run CDX extraction over the harvested containers
    Extract { checksum: bool },
    /// Collect CDX records stored in metadata bundles
    EmbeddedCdx,
}

impl Default for IndexSource {
    fn default() -> Self {
        IndexSource::Extract { checksum: false }
    }
}

impl IndexSource {
    fn selection(&self, ids: &[u64]) -> Result<FileSelection, CacheBuildError> {
        let pattern = match self {
            IndexSource::Extract { .. } => naming::harvest_file_pattern(ids),
            IndexSource::EmbeddedCdx => naming::metadata_file_pattern(ids),
        };
        FileSelection::pattern(&pattern).map_err(|e| CacheBuildError::Build(e.to_string()))
    }

    fn job(&self) -> Box<dyn BatchJob> {
        match self {
            IndexSource::Extract { checksum } => Box::new(CdxExtractionJob::new(if *checksum {
                CdxFields::WithChecksum
            } else {
                CdxFields::Standard
            })),
            IndexSource::EmbeddedCdx => Box::new(CdxRecordHarvestJob::new()),
        }
    }
}

pub struct IndexCache {
    repository: Arc<dyn BatchRepository>,
    cache_dir: PathBuf,
    source: IndexSource,
    poll_interval: Duration,
    wait_timeout: Duration,
    run_bytes: usize,
}

impl IndexCache {
    pub fn new(repository: Arc<dyn BatchRepository>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            repository,
            cache_dir: cache_dir.into(),
            source: IndexSource::default(),
            poll_interval: Duration::from_millis(crate::config::DEFAULT_CACHE_POLL_INTERVAL_MS),
            wait_timeout: Duration::from_secs(crate::config::DEFAULT_CACHE_WAIT_TIMEOUT_SECS),
            run_bytes: sort::DEFAULT_RUN_BYTES,
        }
    }

    pub fn from_config(repository: Arc<dyn BatchRepository>, config: &EngineConfig) -> Self {
        Self::new(repository, config.cache_dir.clone())
            .with_poll_interval(Duration::from_millis(config.cache_poll_interval_ms))
            .with_wait_timeout(Duration::from_secs(config.cache_wait_timeout_secs))
    }

    pub fn with_source(mut self, source: IndexSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn with_sort_run_bytes(mut self, run_bytes: usize) -> Self {
        self.run_bytes = run_bytes.max(1);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Artifact path for a job-ID set, whether or not it exists yet
    pub fn artifact_path(&self, ids: &[u64]) -> Result<PathBuf, CacheBuildError> {
        let ids = canonical_ids(ids);
        if ids.is_empty() {
            return Err(CacheBuildError::NoJobIds);
        }
        Ok(self.cache_dir.join(artifact_name(&ids)))
    }

    /// Sorted index for `ids`, built on first request
    pub fn get_or_build(&self, ids: &[u64]) -> Result<PathBuf, CacheBuildError> {
        let ids = canonical_ids(ids);
        let artifact = self.artifact_path(&ids)?;
        let marker = marker_path(&artifact);
        fs::create_dir_all(&self.cache_dir)?;

        if artifact.is_file() && !marker.exists() {
            debug!(artifact = %artifact.display(), "Reusing cached index");
            return Ok(artifact);
        }

        match OpenOptions::new().write(true).create_new(true).open(&marker) {
            Ok(work) => {
                // A builder may have finished between the check and the claim.
                if artifact.is_file() {
                    drop(work);
                    remove_marker(&marker);
                    return Ok(artifact);
                }
                let built = self.build(&ids, work, &marker, &artifact);
                remove_marker(&marker);
                built?;
                Ok(artifact)
            },
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!(marker = %marker.display(), "Index build in progress, waiting");
                self.wait_for(&marker)?;
                if artifact.is_file() {
                    Ok(artifact)
                } else {
                    Err(CacheBuildError::ArtifactMissing { path: artifact })
                }
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Raw, unsorted index lines for `ids`
    pub fn retrieve_unsorted(
        &self,
        ids: &[u64],
        output: &mut dyn Write,
    ) -> Result<BatchStatus, CacheBuildError> {
        let ids = canonical_ids(ids);
        if ids.is_empty() {
            return Err(CacheBuildError::NoJobIds);
        }
        self.run_batch(&ids, output)
    }

    fn run_batch(&self, ids: &[u64], output: &mut dyn Write) -> Result<BatchStatus, CacheBuildError> {
        let selection = self.source.selection(ids)?;
        let mut job = self.source.job();
        let status = self
            .repository
            .batch(job.as_mut(), &selection, output)
            .map_err(|e| CacheBuildError::Build(e.to_string()))?;

        if status.files_processed < ids.len() {
            info!(
                "Only found {} files when asking for jobs {:?}",
                status.files_processed, ids
            );
        }
        if !status.success {
            warn!(
                jobs = ?ids,
                exceptions = status.exception_count(),
                "Index batch finished with exceptions"
            );
        }
        Ok(status)
    }

    fn build(
        &self,
        ids: &[u64],
        work: fs::File,
        marker: &Path,
        artifact: &Path,
    ) -> Result<(), CacheBuildError> {
        info!(jobs = ?ids, artifact = %artifact.display(), "Building index");
        let started = Instant::now();

        let mut out = BufWriter::new(work);
        self.run_batch(ids, &mut out)?;
        out.flush()?;
        drop(out);

        let mut staging = artifact.as_os_str().to_owned();
        staging.push(".sorting");
        let staging = PathBuf::from(staging);
        let lines = match sort::sort_file(marker, &staging, self.run_bytes)
            .and_then(|lines| fs::rename(&staging, artifact).map(|()| lines))
        {
            Ok(lines) => lines,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e.into());
            },
        };

        info!(
            artifact = %artifact.display(),
            lines,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Index built"
        );
        Ok(())
    }

    fn wait_for(&self, marker: &Path) -> Result<(), CacheBuildError> {
        let started = Instant::now();
        while marker.exists() {
            if started.elapsed() >= self.wait_timeout {
                return Err(CacheBuildError::WaitTimeout {
                    marker: marker.to_path_buf(),
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            std::thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

fn remove_marker(marker: &Path) {
    if let Err(e) = fs::remove_file(marker) {
        warn!(marker = %marker.display(), error = %e, "Could not remove index build marker");
    }
}

impl std::fmt::Debug for IndexCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexCache")
            .field("cache_dir", &self.cache_dir)
            .field("source", &self.source)
            .field("poll_interval", &self.poll_interval)
            .field("wait_timeout", &self.wait_timeout)
            .finish()
    }
}
