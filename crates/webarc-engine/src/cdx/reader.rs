//! Exact-URL lookup over a set of CDX files

use regex::Regex;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::line::CdxLine;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Default)]
pub struct CdxReader {
    files: Vec<PathBuf>,
    filters: Vec<Regex>,
}

impl CdxReader {
    pub fn new<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self {
            files: files.into_iter().map(|p| p.as_ref().to_path_buf()).collect(),
            filters: Vec::new(),
        }
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) {
        self.files.push(path.as_ref().to_path_buf());
    }

    /// Only entries whose container filename matches every filter are returned
    pub fn add_filename_filter(&mut self, pattern: &str) -> Result<()> {
        let re = Regex::new(pattern)
            .map_err(|e| EngineError::InvalidArgument(format!("filename filter '{}': {}", pattern, e)))?;
        self.filters.push(re);
        Ok(())
    }

    /// First entry for exactly `url`
    pub fn lookup(&self, url: &str) -> Result<Option<CdxLine>> {
        let mut found = None;
        self.scan(url, |line| {
            found = Some(line);
            false
        })?;
        Ok(found)
    }

    /// Every entry for exactly `url`, sorted
    pub fn lookup_all(&self, url: &str) -> Result<Vec<CdxLine>> {
        let mut found = Vec::new();
        self.scan(url, |line| {
            found.push(line);
            true
        })?;
        found.sort();
        Ok(found)
    }

    fn accepts(&self, line: &CdxLine) -> bool {
        self.filters.iter().all(|re| re.is_match(&line.filename))
    }

    /// Feed matches to `visit` until it returns false
    fn scan(&self, url: &str, mut visit: impl FnMut(CdxLine) -> bool) -> Result<()> {
        let wanted = url.replace(' ', "%20");
        for path in &self.files {
            let reader = BufReader::new(File::open(path)?);
            debug!(file = %path.display(), url, "Scanning CDX file");
            for line in reader.lines() {
                let line = line?;
                // Cheap check before parsing: exact match on the first field.
                let Some(first) = line.split_whitespace().next() else {
                    continue;
                };
                if first != wanted {
                    continue;
                }
                let entry = match CdxLine::parse(&line) {
                    Ok(entry) => entry,
                    Err(e) => {
                        trace!(file = %path.display(), error = %e, "Skipping CDX line");
                        continue;
                    },
                };
                if self.accepts(&entry) && !visit(entry) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}
