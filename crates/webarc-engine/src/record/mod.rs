//! Record model shared by the ARC and WARC dialects
//!
//! A [`RecordHeader`] is fully parsed when a record is handed out; the
//! payload is a read-once stream owned by the [`ContainerReader`] and
//! exposed through [`ArchiveRecord`].

pub mod arc;
pub mod http;
pub mod reader;
pub mod warc;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::io::Read;
use webarc_common::ArchiveFormat;

use crate::error::RecordReadError;

pub use http::HttpResponseHeader;
pub use reader::ContainerReader;

/// Kind of record, normalised across dialects
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Container self-description: ARC `filedesc` or WARC `warcinfo`
    FileHeader,
    Response,
    Request,
    Metadata,
    Resource,
    Revisit,
    Conversion,
    Continuation,
    Other(String),
}

impl RecordKind {
    /// Value used for the `WARC-Type` header
    pub fn as_warc_type(&self) -> &str {
        match self {
            RecordKind::FileHeader => "warcinfo",
            RecordKind::Response => "response",
            RecordKind::Request => "request",
            RecordKind::Metadata => "metadata",
            RecordKind::Resource => "resource",
            RecordKind::Revisit => "revisit",
            RecordKind::Conversion => "conversion",
            RecordKind::Continuation => "continuation",
            RecordKind::Other(name) => name,
        }
    }

    pub fn from_warc_type(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "warcinfo" => RecordKind::FileHeader,
            "response" => RecordKind::Response,
            "request" => RecordKind::Request,
            "metadata" => RecordKind::Metadata,
            "resource" => RecordKind::Resource,
            "revisit" => RecordKind::Revisit,
            "conversion" => RecordKind::Conversion,
            "continuation" => RecordKind::Continuation,
            _ => RecordKind::Other(value.to_string()),
        }
    }
}

/// Parsed header of one record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordHeader {
    pub format: ArchiveFormat,
    pub kind: RecordKind,
    pub url: Option<String>,
    pub ip: Option<String>,
    /// Date as written in the container (14 digits for ARC, ISO-8601 for WARC)
    pub date: Option<String>,
    pub mimetype: Option<String>,
    /// Declared block length in bytes
    pub length: u64,
    /// Bytes of embedded HTTP response header at the start of the block
    pub content_begin: u64,
    /// Absolute offset of the record's first byte in the container file
    pub offset: u64,
    /// WARC named fields in file order; empty for ARC
    pub fields: Vec<(String, String)>,
    /// Embedded HTTP response header, if the block starts with one
    pub http: Option<HttpResponseHeader>,
}

impl RecordHeader {
    /// Payload bytes after the embedded HTTP header
    pub fn content_length(&self) -> u64 {
        self.length.saturating_sub(self.content_begin)
    }

    pub fn is_file_header(&self) -> bool {
        self.kind == RecordKind::FileHeader
    }

    /// Case-insensitive lookup of a WARC named field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn record_id(&self) -> Option<&str> {
        self.field(warc::RECORD_ID)
    }

    /// Capture time as a 14-digit `yyyyMMddHHmmss` string
    pub fn timestamp14(&self) -> Option<String> {
        let date = self.date.as_deref()?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
            return Some(parsed.format("%Y%m%d%H%M%S").to_string());
        }
        let digits: String = date.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.len() >= 14 {
            Some(digits[..14].to_string())
        } else if digits.is_empty() {
            None
        } else {
            Some(format!("{:0<14}", digits))
        }
    }

    /// Mimetype of the captured content when known, else of the record
    pub fn content_mimetype(&self) -> Option<&str> {
        self.http
            .as_ref()
            .and_then(|h| h.field("content-type"))
            .or(self.mimetype.as_deref())
    }
}

/// Payload access implemented by the container reader
pub(crate) trait RecordStream {
    fn container_name(&self) -> &str;
    fn read_payload(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
    fn finish_record(&mut self) -> Result<u64, RecordReadError>;
}

/// One record handed out by a [`ContainerReader`]
///
/// Reading yields the record block: embedded HTTP header bytes first,
/// then the content. Reads stop at the declared length.
pub struct ArchiveRecord<'a> {
    header: RecordHeader,
    stream: &'a mut dyn RecordStream,
}

impl<'a> ArchiveRecord<'a> {
    pub(crate) fn new(header: RecordHeader, stream: &'a mut dyn RecordStream) -> Self {
        Self { header, stream }
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    /// Name of the container the record was read from
    pub fn container(&self) -> &str {
        self.stream.container_name()
    }

    pub fn into_header(self) -> RecordHeader {
        self.header
    }

    /// Read the rest of the block into memory
    pub fn read_block(&mut self) -> std::io::Result<Vec<u8>> {
        let mut block = Vec::with_capacity(self.header.length.min(1 << 20) as usize);
        self.read_to_end(&mut block)?;
        Ok(block)
    }

    /// Read the content after the embedded HTTP header
    pub fn read_content(&mut self) -> std::io::Result<Vec<u8>> {
        let mut block = self.read_block()?;
        let begin = (self.header.content_begin as usize).min(block.len());
        Ok(block.split_off(begin))
    }

    /// Skip whatever is left and the record terminator; returns the end offset
    pub fn close(self) -> Result<u64, RecordReadError> {
        self.stream.finish_record()
    }
}

impl Read for ArchiveRecord<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read_payload(buf)
    }
}

impl std::fmt::Debug for ArchiveRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveRecord").field("header", &self.header).finish()
    }
}
