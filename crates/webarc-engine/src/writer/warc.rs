//! WARC/1.0 writer

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use webarc_common::ArchiveFormat;

use super::{check_not_empty, new_record_id, ContainerWriter, NewRecord, RecordSink};
use crate::error::WriteError;
use crate::record::warc::{self as fields, canonical_name, is_recomputed};
use crate::record::RecordKind;

/// Fields always written from [`NewRecord`] itself
const OWN_FIELDS: [&str; 6] = [
    fields::TYPE,
    fields::RECORD_ID,
    fields::DATE,
    fields::TARGET_URI,
    fields::IP_ADDRESS,
    fields::CONTENT_TYPE,
];

pub struct WarcWriter<W: Write> {
    sink: RecordSink<W>,
}

impl WarcWriter<BufWriter<File>> {
    /// Create `path` and write its `warcinfo` record
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

impl<W: Write> WarcWriter<W> {
    pub fn new(inner: W, filename: &str, compress: bool) -> Result<Self, WriteError> {
        let mut writer = Self::without_info(inner, compress, 0);
        let info = format!(
            "software: webarc/{}\r\nformat: WARC File Format 1.0\r\n",
            env!("CARGO_PKG_VERSION")
        );
        let record = NewRecord::new(RecordKind::FileHeader, "", "application/warc-fields")
            .with_field(fields::FILENAME, filename);
        writer.write_record(&record, &mut info.as_bytes(), info.len() as u64)?;
        Ok(writer)
    }

    /// Writer appending to a stream that already holds `start_offset` bytes
    pub fn without_info(inner: W, compress: bool, start_offset: u64) -> Self {
        Self {
            sink: RecordSink::new(inner, compress, start_offset),
        }
    }

    pub fn position(&self) -> u64 {
        self.sink.position()
    }

    pub fn is_compressed(&self) -> bool {
        self.sink.is_compressed()
    }

    pub fn into_inner(self) -> Result<W, WriteError> {
        self.sink.into_inner()
    }

    fn header_block(record: &NewRecord, length: u64) -> String {
        let mut header = String::with_capacity(512);
        let mut field = |name: &str, value: &str| {
            header.push_str(name);
            header.push_str(": ");
            header.push_str(value);
            header.push_str("\r\n");
        };

        let id = record.record_id.clone().unwrap_or_else(new_record_id);
        field(fields::TYPE, record.kind.as_warc_type());
        field(fields::RECORD_ID, &id);
        field(
            fields::DATE,
            &record.date.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        if !record.url.is_empty() {
            field(fields::TARGET_URI, &record.url);
        }
        if let Some(ip) = &record.ip {
            field(fields::IP_ADDRESS, ip);
        }
        field(fields::CONTENT_TYPE, &record.mimetype);

        for (name, value) in &record.extra_fields {
            let skip = is_recomputed(name) || OWN_FIELDS.iter().any(|own| own.eq_ignore_ascii_case(name));
            if !skip {
                field(&canonical_name(name), value);
            }
        }
        field(fields::CONTENT_LENGTH, &length.to_string());

        format!("{}\r\n{}\r\n", fields::VERSION, header)
    }
}

impl<W: Write> ContainerWriter for WarcWriter<W> {
    fn format(&self) -> ArchiveFormat {
        ArchiveFormat::Warc
    }

    fn write_record(
        &mut self,
        record: &NewRecord,
        payload: &mut dyn Read,
        length: u64,
    ) -> Result<u64, WriteError> {
        check_not_empty(record, length)?;
        let header = Self::header_block(record, length);
        self.sink.emit(header.as_bytes(), payload, length, b"\r\n\r\n")
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
    fn test_header_block_layout() {
        let record = NewRecord::new(RecordKind::Resource, "http://example.org/", "text/plain")
            .with_date(chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_record_id("<urn:uuid:fixed>")
            .with_field("warc-concurrent-to", "<urn:uuid:other>")
            .with_field("Content-Length", "999")
            .with_field("WARC-Type", "response");

        let header = WarcWriter::<Vec<u8>>::header_block(&record, 5);
        assert_eq!(
            header,
            "WARC/1.0\r\n\
             WARC-Type: resource\r\n\
             WARC-Record-ID: <urn:uuid:fixed>\r\n\
             WARC-Date: 2024-01-02T03:04:05Z\r\n\
             WARC-Target-URI: http://example.org/\r\n\
             Content-Type: text/plain\r\n\
             WARC-Concurrent-To: <urn:uuid:other>\r\n\
             Content-Length: 5\r\n\r\n"
        );
    }

    #[test]
    fn test_new_writes_warcinfo() {
        let writer = WarcWriter::new(Vec::new(), "x.warc", false).unwrap();
        assert!(writer.position() > 0);
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("WARC/1.0\r\nWARC-Type: warcinfo\r\n"));
        assert!(text.contains("WARC-Filename: x.warc\r\n"));
        assert!(!text.contains("WARC-Target-URI"));
        assert!(text.ends_with("\r\n\r\n"));
    }
}
