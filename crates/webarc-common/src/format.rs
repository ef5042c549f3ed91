//! Container format conventions
//!
//! Web captures live in ARC files (the legacy format) and WARC files (its
//! successor). Either may be compressed as one gzip member per record, in
//! which case the filename carries a trailing `.gz`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::WebarcError;

/// Container dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Arc,
    Warc,
}

impl ArchiveFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveFormat::Arc => "arc",
            ArchiveFormat::Warc => "warc",
        }
    }

    /// File extension including the leading dot
    pub fn extension(&self, compressed: bool) -> &'static str {
        match (self, compressed) {
            (ArchiveFormat::Arc, false) => ".arc",
            (ArchiveFormat::Arc, true) => ".arc.gz",
            (ArchiveFormat::Warc, false) => ".warc",
            (ArchiveFormat::Warc, true) => ".warc.gz",
        }
    }

    /// Guess the dialect from a filename
    pub fn from_filename(name: &str) -> Option<Self> {
        if is_warc(name) {
            Some(ArchiveFormat::Warc)
        } else if is_arc(name) {
            Some(ArchiveFormat::Arc)
        } else {
            None
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArchiveFormat {
    type Err = WebarcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arc" => Ok(ArchiveFormat::Arc),
            "warc" => Ok(ArchiveFormat::Warc),
            other => Err(WebarcError::Parse(format!("Unknown archive format: {}", other))),
        }
    }
}

/// True for `.arc` and `.arc.gz` names (case-insensitive)
pub fn is_arc(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".arc") || lower.ends_with(".arc.gz")
}

/// True for `.warc` and `.warc.gz` names (case-insensitive)
pub fn is_warc(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".warc") || lower.ends_with(".warc.gz")
}

/// True for any container name this workspace can read
pub fn is_container(name: &str) -> bool {
    is_arc(name) || is_warc(name)
}

/// True when the name says the container is gzip-per-record compressed
pub fn is_compressed(name: &str) -> bool {
    name.to_lowercase().ends_with(".gz")
}

/// Stable address of one record: container filename plus byte offset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordLocator {
    pub filename: String,
    pub offset: u64,
}

impl RecordLocator {
    pub fn new(filename: impl Into<String>, offset: u64) -> Self {
        Self {
            filename: filename.into(),
            offset,
        }
    }
}

impl fmt::Display for RecordLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.filename, self.offset)
    }
}

impl FromStr for RecordLocator {
    type Err = WebarcError;

    /// Parses `<filename> <offset>`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(filename), Some(offset), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(WebarcError::Parse(format!("Invalid record locator: '{}'", s)));
        };
        let offset = offset
            .parse()
            .map_err(|_| WebarcError::Parse(format!("Invalid offset in locator: '{}'", s)))?;
        Ok(Self::new(filename, offset))
    }
}
