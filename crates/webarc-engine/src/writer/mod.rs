//! Writing records into destination containers
//!
//! Both writers share [`RecordSink`]: it tracks the offset of every record
//! and optionally wraps each record in its own gzip member. A record is
//! staged whole before any byte of it reaches the destination, so a refused
//! record leaves the destination untouched.

pub mod arc;
pub mod copy;
pub mod warc;

pub use arc::ArcWriter;
pub use copy::{insert_arc_file, insert_warc_file, write_file_as_record};
pub use warc::WarcWriter;

use chrono::{DateTime, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Seek, SeekFrom, Write};
use webarc_common::ArchiveFormat;

use crate::error::WriteError;
use crate::record::RecordKind;

/// A record to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub kind: RecordKind,
    pub url: String,
    pub ip: Option<String>,
    pub date: DateTime<Utc>,
    pub mimetype: String,
    /// Keep an existing ID instead of minting one
    pub record_id: Option<String>,
    pub extra_fields: Vec<(String, String)>,
}

impl NewRecord {
    pub fn new(kind: RecordKind, url: impl Into<String>, mimetype: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
            ip: None,
            date: Utc::now(),
            mimetype: mimetype.into(),
            record_id: None,
            extra_fields: Vec::new(),
        }
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_fields.push((name.into(), value.into()));
        self
    }
}

/// Fresh `<urn:uuid:..>` record identifier
pub fn new_record_id() -> String {
    format!("<urn:uuid:{}>", uuid::Uuid::new_v4())
}

/// Destination container accepting appended records
pub trait ContainerWriter {
    fn format(&self) -> ArchiveFormat;

    /// Append one record; returns its start offset
    fn write_record(
        &mut self,
        record: &NewRecord,
        payload: &mut dyn Read,
        length: u64,
    ) -> Result<u64, WriteError>;

    fn flush(&mut self) -> Result<(), WriteError>;
}

struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Records up to this size are staged in memory, larger ones on disk
const STAGE_IN_MEMORY: usize = 1 << 20;

/// Offset-tracking output shared by the format writers
pub(crate) struct RecordSink<W: Write> {
    out: CountingWriter<W>,
    compress: bool,
    poisoned: bool,
}

/// Copy exactly `length` bytes or fail
fn copy_exact(payload: &mut dyn Read, out: &mut dyn Write, length: u64) -> Result<(), WriteError> {
    let written = io::copy(&mut payload.take(length), out)?;
    if written != length {
        return Err(WriteError::LengthMismatch {
            declared: length,
            written,
        });
    }
    Ok(())
}

impl<W: Write> RecordSink<W> {
    pub(crate) fn new(inner: W, compress: bool, start_offset: u64) -> Self {
        Self {
            out: CountingWriter {
                inner,
                count: start_offset,
            },
            compress,
            poisoned: false,
        }
    }

    pub(crate) fn position(&self) -> u64 {
        self.out.count
    }

    pub(crate) fn is_compressed(&self) -> bool {
        self.compress
    }

    /// Header, payload and trailer as one record
    pub(crate) fn emit(
        &mut self,
        header: &[u8],
        payload: &mut dyn Read,
        length: u64,
        trailer: &[u8],
    ) -> Result<u64, WriteError> {
        if self.poisoned {
            return Err(WriteError::Poisoned);
        }
        let offset = self.position();

        let mut staged = tempfile::spooled_tempfile(STAGE_IN_MEMORY);
        if self.compress {
            let mut gz = GzEncoder::new(&mut staged, Compression::default());
            gz.write_all(header)?;
            copy_exact(payload, &mut gz, length)?;
            gz.write_all(trailer)?;
            gz.finish()?;
        } else {
            staged.write_all(header)?;
            copy_exact(payload, &mut staged, length)?;
            staged.write_all(trailer)?;
        }
        staged.seek(SeekFrom::Start(0))?;

        // A commit that fails part way leaves a partial record behind.
        if let Err(e) = io::copy(&mut staged, &mut self.out) {
            self.poisoned = true;
            return Err(e.into());
        }
        Ok(offset)
    }

    pub(crate) fn flush(&mut self) -> Result<(), WriteError> {
        self.out.flush()?;
        Ok(())
    }

    pub(crate) fn into_inner(mut self) -> Result<W, WriteError> {
        self.out.flush()?;
        Ok(self.out.inner)
    }
}

/// A record must carry some information
pub(crate) fn check_not_empty(record: &NewRecord, length: u64) -> Result<(), WriteError> {
    if length == 0 && record.extra_fields.is_empty() {
        return Err(WriteError::InvalidRecord(format!(
            "record for '{}' has neither payload nor extra header fields",
            record.url
        )));
    }
    Ok(())
}
