//! Copying records between containers

use chrono::{DateTime, NaiveDateTime, Utc};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};
use webarc_common::ArchiveFormat;

use super::{ContainerWriter, NewRecord};
use crate::error::{EngineError, Result};
use crate::record::{ContainerReader, RecordHeader, RecordKind};

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

fn record_date(header: &RecordHeader) -> DateTime<Utc> {
    header
        .date
        .as_deref()
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .or_else(|| {
            header
                .timestamp14()
                .and_then(|ts| NaiveDateTime::parse_from_str(&ts, "%Y%m%d%H%M%S").ok())
                .map(|naive| naive.and_utc())
        })
        .unwrap_or_else(Utc::now)
}

fn open_expecting(src: &Path, format: ArchiveFormat) -> Result<ContainerReader> {
    let reader = ContainerReader::open(src)?;
    if reader.format() != format {
        return Err(EngineError::InvalidArgument(format!(
            "{} is a {} container, expected {}",
            src.display(),
            reader.format(),
            format
        )));
    }
    Ok(reader)
}

/// Copy every record of an ARC file except its `filedesc` record
pub fn insert_arc_file(src: &Path, dest: &mut dyn ContainerWriter) -> Result<usize> {
    let mut reader = open_expecting(src, ArchiveFormat::Arc)?;
    let mut copied = 0;

    while let Some(mut record) = reader.next_record()? {
        let header = record.header().clone();
        if header.is_file_header() {
            continue;
        }
        if header.length == 0 {
            debug!(file = %src.display(), offset = header.offset, "Skipping empty ARC record");
            continue;
        }

        let new = NewRecord {
            kind: header.kind.clone(),
            url: header.url.clone().unwrap_or_default(),
            ip: header.ip.clone(),
            date: record_date(&header),
            mimetype: header
                .mimetype
                .clone()
                .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string()),
            record_id: None,
            extra_fields: Vec::new(),
        };
        dest.write_record(&new, &mut record, header.length)?;
        record.close()?;
        copied += 1;
    }

    info!(file = %src.display(), records = copied, "Copied ARC records");
    Ok(copied)
}

/// Copy every record of a WARC file, keeping IDs, types and extra fields
pub fn insert_warc_file(src: &Path, dest: &mut dyn ContainerWriter) -> Result<usize> {
    let mut reader = open_expecting(src, ArchiveFormat::Warc)?;
    let mut copied = 0;

    while let Some(mut record) = reader.next_record()? {
        let header = record.header().clone();
        let new = NewRecord {
            kind: header.kind.clone(),
            url: header.url.clone().unwrap_or_default(),
            ip: header.ip.clone(),
            date: record_date(&header),
            mimetype: header
                .mimetype
                .clone()
                .unwrap_or_else(|| FALLBACK_MIMETYPE.to_string()),
            record_id: header.record_id().map(str::to_string),
            extra_fields: header.fields.clone(),
        };
        dest.write_record(&new, &mut record, header.length)?;
        record.close()?;
        copied += 1;
    }

    info!(file = %src.display(), records = copied, "Copied WARC records");
    Ok(copied)
}

/// Store a local file as one `resource` record; returns its offset
pub fn write_file_as_record(
    dest: &mut dyn ContainerWriter,
    path: &Path,
    uri: &str,
    mimetype: &str,
) -> Result<u64> {
    let file = File::open(path)?;
    let length = file.metadata()?.len();
    let record = NewRecord::new(RecordKind::Resource, uri, mimetype);
    let offset = dest.write_record(&record, &mut BufReader::new(file), length)?;
    Ok(offset)
}
