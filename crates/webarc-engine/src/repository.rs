//! Containers held in local storage directories

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use webarc_common::format;

use crate::config::EngineConfig;
use crate::engine::{BatchEngine, BatchStatus, FileSelection, ResumePoint, RunEntry};
use crate::error::{EngineError, Result};
use crate::job::BatchJob;

/// Something that can run a batch job over a selection of its containers
pub trait BatchRepository: Send + Sync {
    fn batch(
        &self,
        job: &mut dyn BatchJob,
        selection: &FileSelection,
        output: &mut dyn Write,
    ) -> Result<BatchStatus>;
}

/// Container files spread over one or more storage directories
#[derive(Debug, Clone)]
pub struct LocalArchive {
    dirs: Vec<PathBuf>,
    engine: BatchEngine,
}

impl LocalArchive {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self {
            dirs,
            engine: BatchEngine::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            dirs: config.storage_dirs.clone(),
            engine: BatchEngine::new().with_max_exceptions(config.max_exceptions),
        }
    }

    pub fn storage_dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First storage directory holding `filename`
    pub fn lookup(&self, filename: &str) -> Option<PathBuf> {
        if !is_plain_name(filename) {
            return None;
        }
        self.dirs
            .iter()
            .map(|dir| dir.join(filename))
            .find(|path| path.is_file())
    }

    /// Containers covered by `selection`
    ///
    /// Explicit names keep their order; names that are not stored anywhere
    /// still appear so the run can report them. Otherwise files are sorted by
    /// name and the first directory holding a name wins. Names that are not
    /// plain filenames are left out.
    pub fn files(&self, selection: &FileSelection) -> Result<Vec<PathBuf>> {
        Ok(self
            .entries(selection)?
            .into_iter()
            .filter_map(|entry| match entry {
                RunEntry::Container { path, .. } => Some(path),
                RunEntry::Unresolved { .. } => None,
            })
            .collect())
    }

    /// Run entries for `selection`; see [`LocalArchive::files`]
    ///
    /// A requested name with a directory part never resolves against the
    /// storage directories and becomes [`RunEntry::Unresolved`].
    pub fn entries(&self, selection: &FileSelection) -> Result<Vec<RunEntry>> {
        if let FileSelection::Names(names) = selection {
            return Ok(names.iter().map(|name| self.entry_for(name, 0)).collect());
        }

        let mut found: BTreeMap<String, PathBuf> = BTreeMap::new();
        for dir in &self.dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(dir = %dir.display(), error = %e, "Skipping storage directory");
                    continue;
                },
            };
            for entry in entries {
                let entry = entry.map_err(EngineError::Io)?;
                let name = entry.file_name().to_string_lossy().into_owned();
                if !format::is_container(&name) || !selection.matches(&name) {
                    continue;
                }
                if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                    found.entry(name).or_insert_with(|| entry.path());
                }
            }
        }
        Ok(found.into_values().map(RunEntry::container).collect())
    }

    /// Continue files from where an earlier run stopped
    pub fn resume(
        &self,
        job: &mut dyn BatchJob,
        points: &[ResumePoint],
        output: &mut dyn Write,
    ) -> Result<BatchStatus> {
        let entries: Vec<RunEntry> = points
            .iter()
            .map(|point| self.entry_for(&point.file, point.offset))
            .collect();
        self.engine.run_entries(job, &entries, output)
    }

    fn entry_for(&self, name: &str, start: u64) -> RunEntry {
        if !is_plain_name(name) {
            warn!(name = %name, "Refusing container name with a directory part");
            return RunEntry::Unresolved {
                name: name.to_string(),
                reason: "not a plain filename".to_string(),
            };
        }
        let path = self.lookup(name).unwrap_or_else(|| match self.dirs.first() {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        });
        RunEntry::Container { path, start }
    }
}

impl BatchRepository for LocalArchive {
    fn batch(
        &self,
        job: &mut dyn BatchJob,
        selection: &FileSelection,
        output: &mut dyn Write,
    ) -> Result<BatchStatus> {
        let entries = self.entries(selection)?;
        debug!(job = job.name(), files = entries.len(), "Running batch on local archive");
        self.engine.run_entries(job, &entries, output)
    }
}

fn is_plain_name(filename: &str) -> bool {
    !filename.is_empty()
        && filename != "."
        && filename != ".."
        && Path::new(filename).file_name().map(|n| n == filename).unwrap_or(false)
}
