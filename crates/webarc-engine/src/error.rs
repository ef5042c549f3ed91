//! Error taxonomy for the archive engine
//!
//! Recoverability is a property of the error value. The batch engine
//! switches on [`RecordReadError::is_recoverable`] and [`JobError`]
//! variants instead of on where an error came from.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Failure to open a container at all; the whole file is skipped
#[derive(Error, Debug)]
pub enum ContainerOpenError {
    #[error("Container not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("Container {} could not be opened: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Container {name} is empty")]
    Empty { name: String },

    #[error("Container {name} has a corrupt header at offset {offset}: {reason}")]
    CorruptHeader {
        name: String,
        offset: u64,
        reason: String,
    },
}

/// Failure while iterating records inside an open container
#[derive(Error, Debug)]
pub enum RecordReadError {
    #[error("Corrupt record header at offset {offset}: {reason}")]
    CorruptHeader { offset: u64, reason: String },

    #[error("Record at offset {offset} is truncated: expected {expected} payload bytes, got {found}")]
    Truncated {
        offset: u64,
        expected: u64,
        found: u64,
    },

    #[error("Compressed stream is corrupt at offset {offset}: {source}")]
    CorruptStream {
        offset: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at offset {offset}: {source}")]
    Io {
        offset: u64,
        #[source]
        source: std::io::Error,
    },
}

impl RecordReadError {
    /// Start offset of the record the error belongs to
    pub fn offset(&self) -> u64 {
        match self {
            RecordReadError::CorruptHeader { offset, .. }
            | RecordReadError::Truncated { offset, .. }
            | RecordReadError::CorruptStream { offset, .. }
            | RecordReadError::Io { offset, .. } => *offset,
        }
    }

    /// Whether iteration of the same container can continue past this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RecordReadError::CorruptHeader { .. })
    }
}

/// Error raised by a batch job while handling one record
#[derive(Error, Debug)]
pub enum JobError {
    /// Record-local problem; skip the record and keep going
    #[error("{0}")]
    Recoverable(String),

    /// Unknown blast radius; abandon the current file
    #[error("{0}")]
    Unrecoverable(String),
}

impl JobError {
    pub fn recoverable(msg: impl Into<String>) -> Self {
        Self::Recoverable(msg.into())
    }

    pub fn unrecoverable(msg: impl Into<String>) -> Self {
        Self::Unrecoverable(msg.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, JobError::Recoverable(_))
    }
}

impl From<RecordReadError> for JobError {
    fn from(err: RecordReadError) -> Self {
        if err.is_recoverable() {
            JobError::Recoverable(err.to_string())
        } else {
            JobError::Unrecoverable(err.to_string())
        }
    }
}

/// Reading a payload mid-record: truncation is local to the record
impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                JobError::Recoverable(err.to_string())
            },
            _ => JobError::Unrecoverable(err.to_string()),
        }
    }
}

/// The index artifact never materialized
#[derive(Error, Debug)]
pub enum CacheBuildError {
    #[error("No job IDs given")]
    NoJobIds,

    #[error("Index {} missing after build finished", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("Timed out after {waited_secs}s waiting for index build marker {}", marker.display())]
    WaitTimeout { marker: PathBuf, waited_secs: u64 },

    #[error("Index build failed: {0}")]
    Build(String),

    #[error("Index cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single-record lookup failed
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Container {0} not found in any storage directory")]
    NotFound(String),

    #[error("Remote node answered {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Remote URL {url} is unusable: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Remote request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("No record at {filename} offset {offset}")]
    NoRecord { filename: String, offset: u64 },

    #[error("Record at {filename} offset {offset} is unreadable: {reason}")]
    Unreadable {
        filename: String,
        offset: u64,
        reason: String,
    },

    #[error("Retrieval I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Writing a record into a destination container failed
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Payload length mismatch: declared {declared}, wrote {written}")]
    LengthMismatch { declared: u64, written: u64 },

    #[error("Destination holds a partial record from an earlier failed write")]
    Poisoned,

    #[error("Write I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Open(#[from] ContainerOpenError),

    #[error(transparent)]
    Read(#[from] RecordReadError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error(transparent)]
    Cache(#[from] CacheBuildError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] webarc_common::WebarcError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_read_error_recoverability() {
        let header = RecordReadError::CorruptHeader {
            offset: 10,
            reason: "bad".into(),
        };
        assert!(header.is_recoverable());
        assert_eq!(header.offset(), 10);

        let truncated = RecordReadError::Truncated {
            offset: 42,
            expected: 100,
            found: 3,
        };
        assert!(!truncated.is_recoverable());
        assert_eq!(truncated.offset(), 42);
    }

    #[test]
    fn test_job_error_from_io_kind() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert!(JobError::from(eof).is_recoverable());

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "no");
        assert!(!JobError::from(denied).is_recoverable());
    }
}
