//! ARC version 1 writer

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use webarc_common::ArchiveFormat;

use super::{check_not_empty, ContainerWriter, NewRecord, RecordSink};
use crate::error::WriteError;
use crate::record::arc::{format_header_line, FILEDESC_SCHEME, V1_FIELD_NAMES};
use crate::record::RecordKind;

const DATE14: &str = "%Y%m%d%H%M%S";
const NO_IP: &str = "0.0.0.0";

pub struct ArcWriter<W: Write> {
    sink: RecordSink<W>,
}

impl ArcWriter<BufWriter<File>> {
    /// Create `path` and write its `filedesc` record
    pub fn create(path: impl AsRef<Path>, compress: bool) -> Result<Self, WriteError> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::create(path)?;
        Self::new(BufWriter::new(file), &filename, compress)
    }
}

impl<W: Write> ArcWriter<W> {
    pub fn new(inner: W, filename: &str, compress: bool) -> Result<Self, WriteError> {
        let mut writer = Self::without_filedesc(inner, compress, 0);
        let body = format!("1 0 webarc\n{}\n", V1_FIELD_NAMES);
        let record = NewRecord::new(
            RecordKind::FileHeader,
            format!("{}//{}", FILEDESC_SCHEME, filename),
            "text/plain",
        )
        .with_ip(NO_IP);
        writer.write_record(&record, &mut body.as_bytes(), body.len() as u64)?;
        Ok(writer)
    }

    /// Writer appending to a stream that already holds `start_offset` bytes
    pub fn without_filedesc(inner: W, compress: bool, start_offset: u64) -> Self {
        Self {
            sink: RecordSink::new(inner, compress, start_offset),
        }
    }

    pub fn position(&self) -> u64 {
        self.sink.position()
    }

    pub fn into_inner(self) -> Result<W, WriteError> {
        self.sink.into_inner()
    }
}

impl<W: Write> ContainerWriter for ArcWriter<W> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Arc
    }

    /// Extra header fields have no place in an ARC header and are dropped,
    /// so an ARC record needs a payload
    fn write_record(
        &mut self,
        record: &NewRecord,
        payload: &mut dyn Read,
        length: u64,
    ) -> Result<u64, WriteError> {
        check_not_empty(record, length)?;
        if length == 0 {
            return Err(WriteError::InvalidRecord(format!(
                "ARC record for '{}' has no payload",
                record.url
            )));
        }
        if record.url.is_empty() || record.url.contains(char::is_whitespace) {
            return Err(WriteError::InvalidRecord(format!(
                "ARC record URL '{}' is empty or contains whitespace",
                record.url
            )));
        }
        let line = format_header_line(
            &record.url,
            record.ip.as_deref().unwrap_or(NO_IP),
            &record.date.format(DATE14).to_string(),
            &record.mimetype,
            length,
        );
        self.sink.emit(line.as_bytes(), payload, length, b"\n")
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.sink.flush()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_filedesc_and_record_layout() {
        let mut writer = ArcWriter::new(Vec::new(), "1-a.arc", false).unwrap();
        let start = writer.position();
        let record = NewRecord::new(RecordKind::Response, "http://example.org/", "text/html")
            .with_ip("192.0.2.1")
            .with_date(chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
        let offset = writer.write_record(&record, &mut &b"hello"[..], 5).unwrap();
        assert_eq!(offset, start);

        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        assert!(text.starts_with("filedesc://1-a.arc 0.0.0.0 "));
        assert!(text.ends_with(
            "http://example.org/ 192.0.2.1 20240102030405 text/html 5\nhello\n"
        ));
    }

    #[test]
    fn test_rejects_url_with_spaces() {
        let mut writer = ArcWriter::without_filedesc(Vec::new(), false, 0);
        let record = NewRecord::new(RecordKind::Resource, "http://a b/", "text/plain");
        assert!(writer.write_record(&record, &mut &b"x"[..], 1).is_err());
    }
}
