//! Batch execution engine
//!
//! Drives a [`ContainerReader`] over a list of containers for one job,
//! isolating failures per record and per file. Every failure lands in the
//! exception ledger of the returned [`BatchStatus`]; only a broken output
//! stream ends a run early.
//!
//! A job writes each record's output into a staging buffer. The buffer
//! reaches the run output only once the record has closed cleanly, so a
//! record found truncated at close leaves no trace but its exception.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::job::BatchJob;
use crate::record::ContainerReader;

/// Default cap on exception occurrences kept per run
pub const DEFAULT_MAX_EXCEPTIONS: usize = 100_000;

/// One failure recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionOccurrence {
    /// Container name; absent for lifecycle failures
    pub file: Option<String>,
    /// Record start offset, when known
    pub offset: Option<u64>,
    pub message: String,
    pub recoverable: bool,
    #[serde(default)]
    pub in_initialize: bool,
    #[serde(default)]
    pub in_finish: bool,
}

impl fmt::Display for ExceptionOccurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self.file.as_deref().unwrap_or("-");
        match self.offset {
            Some(offset) => write!(f, "{} @ {}: {}", file, offset, self.message),
            None => {
                let stage = if self.in_initialize {
                    " (initialize)"
                } else if self.in_finish {
                    " (finish)"
                } else {
                    ""
                };
                write!(f, "{} @ unknown{}: {}", file, stage, self.message)
            },
        }
    }
}

/// Where iteration of a file stopped early
///
/// `offset` is the end offset of the last record that closed cleanly, or
/// the offset the file was entered at when none did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub file: String,
    pub offset: u64,
}

/// Outcome of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub success: bool,
    pub files_processed: usize,
    pub files_failed: Vec<String>,
    pub records_processed: u64,
    pub exceptions: Vec<ExceptionOccurrence>,
    pub exceptions_dropped: u64,
    #[serde(default)]
    pub resume_points: Vec<ResumePoint>,
}

impl BatchStatus {
    /// All occurrences seen, including the ones not kept
    pub fn exception_count(&self) -> u64 {
        self.exceptions.len() as u64 + self.exceptions_dropped
    }

    pub fn summary(&self) -> String {
        format!(
            "{} files processed ({} failed), {} records processed, {} exceptions",
            self.files_processed,
            self.files_failed.len(),
            self.records_processed,
            self.exception_count()
        )
    }
}

/// Which containers of a storage location a run covers
#[derive(Debug, Clone, Default)]
pub enum FileSelection {
    #[default]
    All,
    /// Explicit names, processed in the given order
    Names(Vec<String>),
    /// Names matching the whole pattern
    Pattern(Regex),
}

impl FileSelection {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FileSelection::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn pattern(pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(FileSelection::Pattern(Regex::new(&format!("^(?:{})$", pattern))?))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            FileSelection::All => true,
            FileSelection::Names(names) => names.iter().any(|n| n == name),
            FileSelection::Pattern(re) => re.is_match(name),
        }
    }
}

/// One container of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEntry {
    /// Read `path` from `start`, which is 0 or a known record start
    Container { path: PathBuf, start: u64 },
    /// A requested name that never addresses a container; reported, not opened
    Unresolved { name: String, reason: String },
}

impl RunEntry {
    pub fn container(path: impl Into<PathBuf>) -> Self {
        RunEntry::Container {
            path: path.into(),
            start: 0,
        }
    }

    pub fn resume(path: impl Into<PathBuf>, offset: u64) -> Self {
        RunEntry::Container {
            path: path.into(),
            start: offset,
        }
    }

    fn name(&self) -> String {
        match self {
            RunEntry::Container { path, .. } => display_name(path),
            RunEntry::Unresolved { name, .. } => name.clone(),
        }
    }
}

/// Keeps at most `limit` occurrences, counting the rest
struct ExceptionLedger {
    limit: usize,
    entries: Vec<ExceptionOccurrence>,
    dropped: u64,
}

impl ExceptionLedger {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            entries: Vec::new(),
            dropped: 0,
        }
    }

    fn push(&mut self, occurrence: ExceptionOccurrence) {
        warn!(
            file = occurrence.file.as_deref().unwrap_or("-"),
            offset = ?occurrence.offset,
            recoverable = occurrence.recoverable,
            error = %occurrence.message,
            "Batch exception"
        );
        if self.entries.len() < self.limit {
            self.entries.push(occurrence);
        } else {
            self.dropped += 1;
        }
    }

    fn record(&mut self, file: &str, offset: u64, message: impl ToString, recoverable: bool) {
        self.push(ExceptionOccurrence {
            file: Some(file.to_string()),
            offset: Some(offset),
            message: message.to_string(),
            recoverable,
            in_initialize: false,
            in_finish: false,
        });
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.dropped == 0
    }
}

/// Output wrapper remembering the first write failure
struct GuardedOutput<'a> {
    inner: &'a mut dyn Write,
    failure: Option<io::Error>,
}

impl<'a> GuardedOutput<'a> {
    fn new(inner: &'a mut dyn Write) -> Self {
        Self {
            inner,
            failure: None,
        }
    }

    /// Fail the run if the output stream broke
    fn check(&mut self) -> Result<()> {
        match self.failure.take() {
            Some(e) => Err(EngineError::Io(e)),
            None => Ok(()),
        }
    }

    fn remember(&mut self, e: &io::Error) {
        if self.failure.is_none() {
            self.failure = Some(io::Error::new(e.kind(), e.to_string()));
        }
    }
}

impl Write for GuardedOutput<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).inspect_err(|e| self.remember(e))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().inspect_err(|e| self.remember(e))
    }
}

enum FileOutcome {
    Completed,
    Failed,
    /// Iteration stopped early at the given resume offset
    Stopped(u64),
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs one job over an ordered list of containers
#[derive(Debug, Clone)]
pub struct BatchEngine {
    max_exceptions: usize,
}

impl Default for BatchEngine {
    fn default() -> Self {
        Self {
            max_exceptions: DEFAULT_MAX_EXCEPTIONS,
        }
    }
}

impl BatchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_exceptions(mut self, max_exceptions: usize) -> Self {
        self.max_exceptions = max_exceptions;
        self
    }

    /// Run `job` over `files` in the given order
    ///
    /// Always returns the full status unless the output stream fails.
    pub fn run(
        &self,
        job: &mut dyn BatchJob,
        files: &[PathBuf],
        output: &mut dyn Write,
    ) -> Result<BatchStatus> {
        let entries: Vec<RunEntry> = files.iter().map(|path| RunEntry::container(path.clone())).collect();
        self.run_entries(job, &entries, output)
    }

    /// Run `job` over explicit entries, e.g. resume points of an earlier run
    pub fn run_entries(
        &self,
        job: &mut dyn BatchJob,
        entries: &[RunEntry],
        output: &mut dyn Write,
    ) -> Result<BatchStatus> {
        let mut out = GuardedOutput::new(output);
        let mut ledger = ExceptionLedger::new(self.max_exceptions);
        let mut status = BatchStatus::default();

        info!(job = job.name(), files = entries.len(), "Starting batch run");

        if let Err(e) = job.initialize(&mut out) {
            out.check()?;
            ledger.push(ExceptionOccurrence {
                file: None,
                offset: None,
                message: e.to_string(),
                recoverable: e.is_recoverable(),
                in_initialize: true,
                in_finish: false,
            });
        }

        for entry in entries {
            let name = entry.name();
            let outcome = match entry {
                RunEntry::Container { path, start } => {
                    self.run_file(job, path, *start, &name, &mut out, &mut ledger, &mut status)?
                },
                RunEntry::Unresolved { reason, .. } => {
                    let message = format!("Container {} not addressable: {}", name, reason);
                    ledger.record(&name, 0, message, true);
                    FileOutcome::Failed
                },
            };
            match outcome {
                FileOutcome::Completed => debug!(file = %name, "Finished file"),
                FileOutcome::Failed => status.files_failed.push(name),
                FileOutcome::Stopped(offset) => {
                    debug!(file = %name, resume_offset = offset, "Stopped file early");
                    status.resume_points.push(ResumePoint {
                        file: name.clone(),
                        offset,
                    });
                    status.files_failed.push(name);
                },
            }
            status.files_processed += 1;
        }

        if let Err(e) = job.finish(&mut out) {
            out.check()?;
            ledger.push(ExceptionOccurrence {
                file: None,
                offset: None,
                message: e.to_string(),
                recoverable: e.is_recoverable(),
                in_initialize: false,
                in_finish: true,
            });
        }
        out.flush().map_err(EngineError::Io)?;

        status.success = ledger.is_empty();
        status.exceptions = ledger.entries;
        status.exceptions_dropped = ledger.dropped;

        info!(job = job.name(), success = status.success, "{}", status.summary());
        Ok(status)
    }

    #[allow(clippy::too_many_arguments)]
    fn run_file(
        &self,
        job: &mut dyn BatchJob,
        path: &Path,
        start: u64,
        name: &str,
        out: &mut GuardedOutput<'_>,
        ledger: &mut ExceptionLedger,
        status: &mut BatchStatus,
    ) -> Result<FileOutcome> {
        let opened = if start == 0 {
            ContainerReader::open(path)
        } else {
            ContainerReader::open_at(path, start)
        };
        let mut reader = match opened {
            Ok(reader) => reader,
            Err(e) => {
                ledger.record(name, start, &e, true);
                return Ok(FileOutcome::Failed);
            },
        };
        debug!(file = %name, format = %reader.format(), start, "Iterating container");

        let mut failed = false;
        let mut stopped = false;
        let mut staged = Vec::new();
        loop {
            let mut record = match reader.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(e) => {
                    failed = true;
                    let recoverable = e.is_recoverable();
                    ledger.record(name, e.offset(), &e, recoverable);
                    if recoverable {
                        continue;
                    }
                    stopped = true;
                    break;
                },
            };

            if !job.filter().accept(record.header()) {
                continue;
            }

            let offset = record.header().offset;
            staged.clear();
            if let Err(e) = job.process_record(&mut record, &mut staged) {
                failed = true;
                let recoverable = e.is_recoverable();
                ledger.record(name, offset, &e, recoverable);
                if recoverable {
                    continue;
                }
                stopped = true;
                break;
            }

            // Only a cleanly closed record counts; its output is dropped otherwise.
            if let Err(e) = record.close() {
                ledger.record(name, e.offset(), &e, false);
                failed = true;
                stopped = true;
                break;
            }
            out.write_all(&staged).map_err(EngineError::Io)?;
            status.records_processed += 1;
        }

        Ok(if stopped {
            FileOutcome::Stopped(reader.last_end_offset().unwrap_or(start))
        } else if failed {
            FileOutcome::Failed
        } else {
            FileOutcome::Completed
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_selection() {
        let pattern = FileSelection::pattern(r"(1|2)-.*\.warc").unwrap();
        assert!(pattern.matches("1-a.warc"));
        assert!(!pattern.matches("11-a.warc"));
        assert!(!pattern.matches("1-a.warc.gz"));

        let names = FileSelection::names(["b.arc", "a.arc"]);
        assert!(names.matches("a.arc"));
        assert!(!names.matches("c.arc"));
        assert!(FileSelection::All.matches("anything"));
    }

    #[test]
    fn test_ledger_caps_entries() {
        let mut ledger = ExceptionLedger::new(2);
        for offset in 0..5 {
            ledger.record("f.warc", offset, "boom", true);
        }
        assert_eq!(ledger.entries.len(), 2);
        assert_eq!(ledger.dropped, 3);
        assert!(!ledger.is_empty());
    }

    #[test]
    fn test_exception_display() {
        let occurrence = ExceptionOccurrence {
            file: None,
            offset: None,
            message: "no output".into(),
            recoverable: false,
            in_initialize: false,
            in_finish: true,
        };
        assert_eq!(occurrence.to_string(), "- @ unknown (finish): no output");
    }
}
