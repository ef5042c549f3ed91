//! Sequential, offset-tracked iteration over one container
//!
//! The reader never loads a container into memory. Plain containers are read
//! through a single buffered stream; gzip-per-record containers are read one
//! member at a time so every record offset is the position of its gzip
//! member in the compressed file.
//!
//! # Failure model
//!
//! - Problems before the first record is parsed surface from
//!   [`ContainerReader::open`] as [`ContainerOpenError`].
//! - A corrupt record header is a recoverable [`RecordReadError`]. The reader
//!   skips to the next record start (next gzip member, or next line that
//!   looks like a record header) on the following call.
//! - Truncation and broken compressed streams end iteration of the file.

use flate2::bufread::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace};
use webarc_common::ArchiveFormat;

use super::http::{parse_header_block, parse_status_line, MAX_HTTP_HEADER_BYTES};
use super::{arc, warc, ArchiveRecord, RecordHeader, RecordStream};
use crate::error::{ContainerOpenError, RecordReadError};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Longest header line accepted before the record is declared corrupt
const MAX_HEADER_LINE: usize = 64 * 1024;

const MAX_WARC_FIELDS: usize = 1024;

/// Byte counter under the buffer, so positions survive buffering
struct Counting<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for Counting<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

type Raw<R> = BufReader<Counting<R>>;
type Member<R> = BufReader<GzDecoder<Raw<R>>>;

enum Source<R: Read> {
    Plain(Raw<R>),
    GzipIdle(Raw<R>),
    GzipMember(Member<R>),
    Poisoned,
}

fn raw_position<R: Read>(raw: &Raw<R>) -> u64 {
    raw.get_ref().count - raw.buffer().len() as u64
}

impl<R: Read> Source<R> {
    /// Position in the underlying file; exact between records
    fn position(&self) -> u64 {
        match self {
            Source::Plain(raw) | Source::GzipIdle(raw) => raw_position(raw),
            Source::GzipMember(member) => member.get_ref().get_ref().get_ref().count,
            Source::Poisoned => 0,
        }
    }

    fn active(&mut self) -> Option<&mut dyn BufRead> {
        match self {
            Source::Plain(raw) | Source::GzipIdle(raw) => Some(raw),
            Source::GzipMember(member) => Some(member),
            Source::Poisoned => None,
        }
    }

    fn enter_member(&mut self) {
        if let Source::GzipIdle(_) = self {
            if let Source::GzipIdle(raw) = std::mem::replace(self, Source::Poisoned) {
                *self = Source::GzipMember(BufReader::new(GzDecoder::new(raw)));
            }
        }
    }

    /// Drain the rest of the current gzip member and return to the raw stream
    fn leave_member(&mut self) -> io::Result<()> {
        match std::mem::replace(self, Source::Poisoned) {
            Source::GzipMember(mut member) => {
                io::copy(&mut member, &mut io::sink())?;
                *self = Source::GzipIdle(member.into_inner().into_inner());
                Ok(())
            },
            other => {
                *self = other;
                Ok(())
            },
        }
    }
}

/// Read up to and including `\n`, never more than `limit` bytes
fn read_line_bounded(reader: &mut dyn BufRead, limit: usize) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    while line.len() < limit {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let take = buf
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(buf.len())
            .min(limit - line.len());
        line.extend_from_slice(&buf[..take]);
        reader.consume(take);
        if line.ends_with(b"\n") {
            break;
        }
    }
    Ok(line)
}

/// Consume CR/LF padding between records
fn skip_line_breaks(reader: &mut dyn BufRead) -> io::Result<()> {
    loop {
        let buf = reader.fill_buf()?;
        let n = buf.iter().take_while(|&&b| b == b'\r' || b == b'\n').count();
        if n == 0 {
            return Ok(());
        }
        reader.consume(n);
    }
}

fn plain_start<R: Read>(raw: &mut Raw<R>) -> io::Result<Option<u64>> {
    skip_line_breaks(raw)?;
    if raw.fill_buf()?.is_empty() {
        return Ok(None);
    }
    Ok(Some(raw_position(raw)))
}

/// State of the record currently handed out
struct OpenRecord {
    offset: u64,
    declared: u64,
    remaining: u64,
    prefix: Vec<u8>,
    prefix_pos: usize,
    failed: bool,
}

/// Reader over one ARC or WARC container
pub struct ContainerReader<R: Read = File> {
    name: String,
    format: ArchiveFormat,
    compressed: bool,
    source: Source<R>,
    current: Option<OpenRecord>,
    pending: Option<RecordHeader>,
    pushback: Option<(u64, Vec<u8>)>,
    resync: bool,
    last_end: Option<u64>,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_file(path: &Path) -> Result<File, ContainerOpenError> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ContainerOpenError::Missing {
            path: path.to_path_buf(),
        },
        _ => ContainerOpenError::Unreadable {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

impl ContainerReader<File> {
    /// Open a container from its start; the first record must parse
    ///
    /// ARC containers must begin with their `filedesc` record.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ContainerOpenError> {
        let path = path.as_ref();
        let file = open_file(path)?;
        Self::with_options(file, file_name(path), 0, true)
    }

    /// Open a container positioned at a known record start
    pub fn open_at(path: impl AsRef<Path>, offset: u64) -> Result<Self, ContainerOpenError> {
        let path = path.as_ref();
        let mut file = open_file(path)?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| ContainerOpenError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        Self::with_options(file, file_name(path), offset, false)
    }
}

impl<R: Read> ContainerReader<R> {
    /// Read a container fragment from any stream, e.g. an HTTP range body
    ///
    /// `base_offset` is the absolute offset of the first byte of `reader`.
    pub fn from_reader(
        reader: R,
        name: impl Into<String>,
        base_offset: u64,
    ) -> Result<Self, ContainerOpenError> {
        Self::with_options(reader, name.into(), base_offset, false)
    }

    fn with_options(
        reader: R,
        name: String,
        base_offset: u64,
        expect_file_header: bool,
    ) -> Result<Self, ContainerOpenError> {
        let mut raw = BufReader::new(Counting {
            inner: reader,
            count: base_offset,
        });
        let head = raw.fill_buf().map_err(|e| ContainerOpenError::CorruptHeader {
            name: name.clone(),
            offset: base_offset,
            reason: e.to_string(),
        })?;
        if head.is_empty() {
            return Err(ContainerOpenError::Empty { name });
        }
        let compressed = head.starts_with(&GZIP_MAGIC);
        let source = if compressed {
            Source::GzipIdle(raw)
        } else {
            Source::Plain(raw)
        };

        let mut reader = Self {
            format: ArchiveFormat::from_filename(&name).unwrap_or(ArchiveFormat::Arc),
            name,
            compressed,
            source,
            current: None,
            pending: None,
            pushback: None,
            resync: false,
            last_end: None,
        };

        let corrupt = |reader: &Self, offset: u64, reason: String| ContainerOpenError::CorruptHeader {
            name: reader.name.clone(),
            offset,
            reason,
        };

        // The content decides the dialect; the filename is only a hint.
        let first = match reader.begin_record() {
            Ok(Some(offset)) => offset,
            Ok(None) => return Err(ContainerOpenError::Empty { name: reader.name }),
            Err(e) => return Err(corrupt(&reader, base_offset, e.to_string())),
        };
        let line = reader
            .read_line(first)
            .map_err(|e| corrupt(&reader, first, e.to_string()))?;
        reader.format = if warc::is_version_line(&String::from_utf8_lossy(&line)) {
            ArchiveFormat::Warc
        } else {
            ArchiveFormat::Arc
        };
        reader.pushback = Some((first, line));

        let header = match reader.read_next_header() {
            Ok(Some(header)) => header,
            Ok(None) => return Err(ContainerOpenError::Empty { name: reader.name }),
            Err(e) => return Err(corrupt(&reader, first, e.to_string())),
        };
        if expect_file_header && reader.format == ArchiveFormat::Arc && !header.is_file_header() {
            return Err(corrupt(
                &reader,
                first,
                "first ARC record is not a filedesc record".to_string(),
            ));
        }

        debug!(
            container = %reader.name,
            format = %reader.format,
            compressed = reader.compressed,
            offset = first,
            "Opened container"
        );
        reader.pending = Some(header);
        Ok(reader)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// End offset of the last record that was fully consumed
    pub fn last_end_offset(&self) -> Option<u64> {
        self.last_end
    }

    /// Advance to the next record
    ///
    /// Any unread payload of the previous record is skipped first.
    pub fn next_record(&mut self) -> Result<Option<ArchiveRecord<'_>>, RecordReadError> {
        if let Some(header) = self.pending.take() {
            return Ok(Some(ArchiveRecord::new(header, self)));
        }

        self.finish_current()?;
        if self.resync {
            self.resync_plain()?;
        }

        match self.read_next_header()? {
            Some(header) => Ok(Some(ArchiveRecord::new(header, self))),
            None => Ok(None),
        }
    }

    /// Finish any open record and release the container
    pub fn close(mut self) -> Result<Option<u64>, RecordReadError> {
        self.pending = None;
        self.finish_current()
    }

    fn map_io(&mut self, offset: u64, err: io::Error) -> RecordReadError {
        let stream_fault = matches!(
            err.kind(),
            io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof
        );
        if self.compressed && stream_fault {
            self.source = Source::Poisoned;
            RecordReadError::CorruptStream { offset, source: err }
        } else {
            RecordReadError::Io { offset, source: err }
        }
    }

    /// Position at the next record start; `None` at end of container
    fn begin_record(&mut self) -> Result<Option<u64>, RecordReadError> {
        let offset = self.source.position();
        let step: io::Result<Option<u64>> = match &mut self.source {
            Source::Plain(raw) => plain_start(raw),
            Source::GzipIdle(raw) => {
                let first = raw.fill_buf().map(|buf| buf.first().copied());
                match first {
                    Ok(None) => Ok(None),
                    Ok(Some(byte)) if byte != GZIP_MAGIC[0] => Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "expected a gzip member between records",
                    )),
                    Ok(Some(_)) => Ok(Some(raw_position(raw))),
                    Err(e) => Err(e),
                }
            },
            Source::GzipMember(_) => Ok(Some(offset)),
            Source::Poisoned => Ok(None),
        };

        let start = step.map_err(|e| self.map_io(offset, e))?;
        if start.is_some() {
            self.source.enter_member();
        }
        Ok(start)
    }

    fn read_line(&mut self, offset: u64) -> Result<Vec<u8>, RecordReadError> {
        let result = match self.source.active() {
            Some(reader) => read_line_bounded(reader, MAX_HEADER_LINE),
            None => Ok(Vec::new()),
        };
        result.map_err(|e| self.map_io(offset, e))
    }

    fn read_next_header(&mut self) -> Result<Option<RecordHeader>, RecordReadError> {
        let (offset, first_line) = match self.pushback.take() {
            Some(pushed) => pushed,
            None => {
                let Some(offset) = self.begin_record()? else {
                    return Ok(None);
                };
                let line = self.read_line(offset)?;
                (offset, line)
            },
        };

        let mut header = match self.parse_header(offset, first_line) {
            Ok(header) => header,
            Err(reason) => {
                trace!(container = %self.name, offset, %reason, "Corrupt record header");
                self.abandon_record();
                if let Source::Plain(_) = self.source {
                    self.resync = true;
                }
                return Err(RecordReadError::CorruptHeader { offset, reason });
            },
        };

        self.current = Some(OpenRecord {
            offset,
            declared: header.length,
            remaining: header.length,
            prefix: Vec::new(),
            prefix_pos: 0,
            failed: false,
        });

        let http_block = match header.format {
            ArchiveFormat::Arc => header.kind == super::RecordKind::Response,
            ArchiveFormat::Warc => warc::block_is_http_response(&header),
        };
        if http_block && header.length > 0 {
            if let Err(e) = self.read_http_prefix(&mut header) {
                self.abandon_record();
                return Err(e);
            }
        }

        Ok(Some(header))
    }

    fn parse_header(&mut self, offset: u64, first_line: Vec<u8>) -> Result<RecordHeader, String> {
        if first_line.is_empty() {
            return Err("empty record".to_string());
        }
        if !first_line.ends_with(b"\n") {
            return Err("unexpected end of container inside header".to_string());
        }
        let first = String::from_utf8_lossy(&first_line).into_owned();

        match self.format {
            ArchiveFormat::Arc => arc::parse_header_line(&first, offset),
            ArchiveFormat::Warc => {
                if !warc::is_version_line(&first) {
                    return Err(format!("expected WARC version line, found '{}'", first.trim_end()));
                }
                let mut lines = Vec::new();
                loop {
                    let line = self.read_line(offset).map_err(|e| e.to_string())?;
                    if line.is_empty() || !line.ends_with(b"\n") {
                        return Err("unexpected end of container inside header".to_string());
                    }
                    if line == b"\r\n" || line == b"\n" {
                        break;
                    }
                    if lines.len() >= MAX_WARC_FIELDS {
                        return Err("too many header fields".to_string());
                    }
                    lines.push(String::from_utf8_lossy(&line).into_owned());
                }
                warc::parse_fields(&lines, offset)
            },
        }
    }

    /// Buffer the embedded HTTP header so the payload can replay it
    fn read_http_prefix(&mut self, header: &mut RecordHeader) -> Result<(), RecordReadError> {
        let Self {
            current, source, ..
        } = &mut *self;
        let Some(record) = current.as_mut() else {
            return Ok(());
        };
        let Some(reader) = source.active() else {
            return Ok(());
        };

        let mut parsed = false;
        loop {
            let budget = (record.remaining as usize).min(MAX_HTTP_HEADER_BYTES - record.prefix.len());
            if budget == 0 {
                break;
            }
            let line = match read_line_bounded(reader, budget) {
                Ok(line) => line,
                Err(e) => {
                    let offset = record.offset;
                    return Err(self.map_io(offset, e));
                },
            };
            if line.is_empty() {
                let (offset, expected, found) =
                    (record.offset, record.declared, record.declared - record.remaining);
                return Err(RecordReadError::Truncated {
                    offset,
                    expected,
                    found,
                });
            }
            record.remaining -= line.len() as u64;
            let first = record.prefix.is_empty();
            let blank = line == b"\r\n" || line == b"\n";
            record.prefix.extend_from_slice(&line);

            if first && parse_status_line(&String::from_utf8_lossy(&line)).is_none() {
                break;
            }
            if blank && !first {
                parsed = true;
                break;
            }
        }

        if parsed {
            header.http = parse_header_block(&record.prefix);
            header.content_begin = record.prefix.len() as u64;
        }
        Ok(())
    }

    /// Drop the open record without reporting; resynchronise on next call
    fn abandon_record(&mut self) {
        self.current = None;
        if let Source::GzipMember(_) = self.source {
            if let Err(e) = self.source.leave_member() {
                debug!(container = %self.name, error = %e, "Could not drain gzip member");
                self.source = Source::Poisoned;
            }
        }
    }

    /// Skip lines until one that starts a record in this dialect
    fn resync_plain(&mut self) -> Result<(), RecordReadError> {
        self.resync = false;
        loop {
            let offset = self.source.position();
            let line = self.read_line(offset)?;
            if line.is_empty() {
                return Ok(());
            }
            let text = String::from_utf8_lossy(&line);
            let found = match self.format {
                ArchiveFormat::Warc => warc::is_version_line(&text),
                ArchiveFormat::Arc => arc::looks_like_header_line(&text),
            };
            if found {
                debug!(container = %self.name, offset, "Resynchronised after corrupt record");
                self.pushback = Some((offset, line));
                return Ok(());
            }
        }
    }

    /// Skip the rest of the open record plus its terminator
    fn finish_current(&mut self) -> Result<Option<u64>, RecordReadError> {
        let Some(mut record) = self.current.take() else {
            return Ok(None);
        };
        if record.failed {
            self.abandon_record();
            if let Source::Plain(_) = self.source {
                self.resync = true;
            }
            return Ok(None);
        }

        while record.remaining > 0 {
            let step = match self.source.active() {
                Some(reader) => reader.fill_buf().map(|buf| buf.len()),
                None => Ok(0),
            };
            let available = step.map_err(|e| self.map_io(record.offset, e))?;
            if available == 0 {
                self.abandon_record();
                return Err(RecordReadError::Truncated {
                    offset: record.offset,
                    expected: record.declared,
                    found: record.declared - record.remaining,
                });
            }
            let n = available.min(record.remaining as usize);
            if let Some(reader) = self.source.active() {
                reader.consume(n);
            }
            record.remaining -= n as u64;
        }

        let terminator = if let Source::Plain(raw) = &mut self.source {
            skip_line_breaks(raw)
        } else {
            self.source.leave_member()
        };
        terminator.map_err(|e| self.map_io(record.offset, e))?;

        let end = self.source.position();
        self.last_end = Some(end);
        Ok(Some(end))
    }
}

impl<R: Read> RecordStream for ContainerReader<R> {
    fn container_name(&self) -> &str {
        &self.name
    }

    fn read_payload(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Self {
            current, source, ..
        } = self;
        let Some(record) = current.as_mut() else {
            return Ok(0);
        };
        if record.failed {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("record at offset {} is unreadable", record.offset),
            ));
        }

        if record.prefix_pos < record.prefix.len() {
            let pending = &record.prefix[record.prefix_pos..];
            let n = pending.len().min(buf.len());
            buf[..n].copy_from_slice(&pending[..n]);
            record.prefix_pos += n;
            return Ok(n);
        }

        if record.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let want = buf.len().min(record.remaining as usize);
        let result = match source.active() {
            Some(reader) => reader.read(&mut buf[..want]),
            None => Ok(0),
        };
        match result {
            Ok(0) => {
                record.failed = true;
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "record at offset {} truncated after {} of {} bytes",
                        record.offset,
                        record.declared - record.remaining,
                        record.declared
                    ),
                ))
            },
            Ok(n) => {
                record.remaining -= n as u64;
                Ok(n)
            },
            Err(e) => {
                record.failed = true;
                Err(e)
            },
        }
    }

    fn finish_record(&mut self) -> Result<u64, RecordReadError> {
        let offset = self.current.as_ref().map(|r| r.offset).unwrap_or(0);
        self.finish_current()?.ok_or(RecordReadError::CorruptHeader {
            offset,
            reason: "record could not be finished".to_string(),
        })
    }
}
