//! Container writer integration tests
//!
//! These tests verify:
//! - Written WARC and ARC files read back with the offsets the writer returned
//! - Copy helpers skip ARC file headers and keep WARC record IDs
//! - Invalid records are refused before anything is written
//! - A record refused mid-payload leaves the destination readable

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use chrono::{TimeZone, Utc};
use common::*;
use std::io::Cursor;
use tempfile::TempDir;
use webarc_engine::error::{EngineError, WriteError};
use webarc_engine::writer::{
    insert_arc_file, insert_warc_file, write_file_as_record, ArcWriter, ContainerWriter, NewRecord,
    WarcWriter,
};
use webarc_engine::{ContainerReader, RecordHeader, RecordKind};

fn read_all<R: std::io::Read>(mut reader: ContainerReader<R>) -> Vec<(RecordHeader, Vec<u8>)> {
    let mut out = Vec::new();
    while let Some(mut record) = reader.next_record().unwrap() {
        let block = record.read_block().unwrap();
        out.push((record.header().clone(), block));
    }
    out
}

fn capture() -> NewRecord {
    NewRecord::new(RecordKind::Response, "http://example.org/", "application/http; msgtype=response")
        .with_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
        .with_ip("192.0.2.7")
}

#[test]
fn test_warc_round_trip_plain_and_gzip() {
    let temp = TempDir::new().unwrap();

    for compress in [false, true] {
        let name = if compress { "out.warc.gz" } else { "out.warc" };
        let path = temp.path().join(name);
        let block = http_block("hello");

        let mut writer = WarcWriter::create(&path, compress).unwrap();
        let first = writer
            .write_record(&capture(), &mut block.as_slice(), block.len() as u64)
            .unwrap();
        let resource = NewRecord::new(RecordKind::Resource, "file:///a.txt", "text/plain")
            .with_record_id("<urn:uuid:00000000-0000-0000-0000-000000000001>");
        let second = writer.write_record(&resource, &mut &b"notes"[..], 5).unwrap();
        writer.into_inner().unwrap();

        let records = read_all(ContainerReader::open(&path).unwrap());
        assert_eq!(records.len(), 3);

        let (info, _) = &records[0];
        assert_eq!(info.kind, RecordKind::FileHeader);
        assert_eq!(info.field("WARC-Filename"), Some(name));

        let (response, response_block) = &records[1];
        assert_eq!(response.offset, first);
        assert_eq!(response.url.as_deref(), Some("http://example.org/"));
        assert_eq!(response.ip.as_deref(), Some("192.0.2.7"));
        assert_eq!(response.timestamp14().as_deref(), Some("20240102030405"));
        assert_eq!(response.http.as_ref().map(|h| h.status), Some(200));
        assert_eq!(response_block, &block);

        let (stored, stored_block) = &records[2];
        assert_eq!(stored.offset, second);
        assert_eq!(
            stored.record_id(),
            Some("<urn:uuid:00000000-0000-0000-0000-000000000001>")
        );
        assert_eq!(stored_block, b"notes");
    }
}

#[test]
fn test_arc_round_trip() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("out.arc.gz");

    let mut writer = ArcWriter::create(&path, true).unwrap();
    let record = NewRecord::new(RecordKind::Response, "http://example.org/", "text/html")
        .with_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap());
    let block = http_block("arc body");
    let offset = writer
        .write_record(&record, &mut block.as_slice(), block.len() as u64)
        .unwrap();
    writer.into_inner().unwrap();

    let records = read_all(ContainerReader::open(&path).unwrap());
    assert_eq!(records.len(), 2);
    assert!(records[0].0.is_file_header());
    assert_eq!(records[0].0.url.as_deref(), Some("filedesc://out.arc.gz"));
    assert_eq!(records[1].0.offset, offset);
    assert_eq!(records[1].0.date.as_deref(), Some("20240102030405"));
    assert_eq!(records[1].0.ip.as_deref(), Some("0.0.0.0"));
    assert_eq!(records[1].1, block);
}

#[test]
fn test_insert_arc_file_skips_filedesc_and_empty_records() {
    let temp = TempDir::new().unwrap();
    let (src, _) = write_container(
        temp.path(),
        "src.arc",
        &[
            arc_filedesc("src.arc"),
            arc_record("http://example.org/a", "text/html", &http_block("a")),
            arc_record("http://example.org/empty", "text/html", b""),
            arc_record("dns:example.org", "text/dns", b"example.org. 300 IN A 192.0.2.1"),
        ],
    );

    let mut dest = WarcWriter::new(Vec::new(), "dest.warc", false).unwrap();
    let copied = insert_arc_file(&src, &mut dest).unwrap();
    assert_eq!(copied, 2);

    let bytes = dest.into_inner().unwrap();
    let records = read_all(ContainerReader::from_reader(Cursor::new(bytes), "dest.warc", 0).unwrap());
    let urls: Vec<Option<String>> = records.iter().skip(1).map(|(h, _)| h.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            Some("http://example.org/a".to_string()),
            Some("dns:example.org".to_string())
        ]
    );
    assert_eq!(records[1].1, http_block("a"));
    assert_eq!(records[1].0.timestamp14().as_deref(), Some("20240102030405"));
}

#[test]
fn test_insert_warc_file_keeps_record_ids() {
    let temp = TempDir::new().unwrap();
    let (src, _) = write_gzip_container(
        temp.path(),
        "src.warc.gz",
        &[warcinfo(), warc_response("http://example.org/", "kept")],
    );
    let original = read_all(ContainerReader::open(&src).unwrap());

    let mut dest = WarcWriter::without_info(Vec::new(), true, 0);
    assert_eq!(insert_warc_file(&src, &mut dest).unwrap(), 2);

    let bytes = dest.into_inner().unwrap();
    let copied = read_all(ContainerReader::from_reader(Cursor::new(bytes), "dest.warc.gz", 0).unwrap());
    assert_eq!(copied.len(), 2);
    // The fixture warcinfo has no ID, so the copy gets a fresh one
    assert!(original[0].0.record_id().is_none());
    assert!(copied[0].0.record_id().is_some());
    assert!(original[1].0.record_id().is_some());
    assert_eq!(copied[1].0.record_id(), original[1].0.record_id());
    assert_eq!(copied[1].0.kind, RecordKind::Response);
    assert_eq!(copied[1].1, http_block("kept"));
}

#[test]
fn test_insert_rejects_wrong_dialect() {
    let temp = TempDir::new().unwrap();
    let (src, _) = write_container(
        temp.path(),
        "src.warc",
        &[warc_response("http://example.org/", "x")],
    );

    let mut dest = ArcWriter::without_filedesc(Vec::new(), false, 0);
    let err = insert_arc_file(&src, &mut dest).unwrap_err();
    assert!(matches!(err, EngineError::InvalidArgument(_)));
}

#[test]
fn test_write_file_as_record() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("crawl.log");
    std::fs::write(&file, b"line one\nline two\n").unwrap();

    let mut dest = WarcWriter::new(Vec::new(), "bundle.warc", false).unwrap();
    let offset = write_file_as_record(&mut dest, &file, "metadata://example/crawl/logs/crawl.log", "text/plain")
        .unwrap();
    let bytes = dest.into_inner().unwrap();

    let mut reader = ContainerReader::from_reader(Cursor::new(bytes), "bundle.warc", 0).unwrap();
    reader.next_record().unwrap();
    let mut record = reader.next_record().unwrap().unwrap();
    assert_eq!(record.header().offset, offset);
    assert_eq!(record.header().kind, RecordKind::Resource);
    assert_eq!(record.read_block().unwrap(), b"line one\nline two\n");
}

#[test]
fn test_invalid_records_are_refused() {
    let mut warc = WarcWriter::without_info(Vec::new(), false, 0);
    let empty = NewRecord::new(RecordKind::Resource, "http://example.org/", "text/plain");
    assert!(matches!(
        warc.write_record(&empty, &mut &b""[..], 0),
        Err(WriteError::InvalidRecord(_))
    ));
    assert!(matches!(
        warc.write_record(&empty, &mut &b"short"[..], 10),
        Err(WriteError::LengthMismatch {
            declared: 10,
            written: 5
        })
    ));
    let annotated = empty.clone().with_field("WARC-Refers-To", "<urn:uuid:x>");
    assert!(warc.write_record(&annotated, &mut &b""[..], 0).is_ok());

    let mut arc = ArcWriter::without_filedesc(Vec::new(), false, 0);
    let spaced = NewRecord::new(RecordKind::Response, "http://example.org/a b", "text/html");
    assert!(matches!(
        arc.write_record(&spaced, &mut &b"x"[..], 1),
        Err(WriteError::InvalidRecord(_))
    ));
    // ARC drops extra fields, so they cannot make an empty record valid.
    assert!(matches!(
        arc.write_record(&annotated, &mut &b""[..], 0),
        Err(WriteError::InvalidRecord(_))
    ));
    assert_eq!(arc.position(), 0);
}

#[test]
fn test_short_payload_leaves_no_partial_record() {
    for compress in [false, true] {
        let mut writer = WarcWriter::without_info(Vec::new(), compress, 0);
        let block = http_block("kept");
        writer
            .write_record(&capture(), &mut block.as_slice(), block.len() as u64)
            .unwrap();
        let before = writer.position();

        let err = writer
            .write_record(&capture(), &mut &b"cut"[..], 100)
            .unwrap_err();
        assert!(matches!(err, WriteError::LengthMismatch { declared: 100, written: 3 }));
        assert_eq!(writer.position(), before);

        let later = writer
            .write_record(&capture(), &mut block.as_slice(), block.len() as u64)
            .unwrap();
        assert_eq!(later, before);

        let data = writer.into_inner().unwrap();
        let records = read_all(ContainerReader::from_reader(Cursor::new(data), "out.warc", 0).unwrap());
        assert_eq!(records.len(), 2, "compress={}", compress);
        assert_eq!(records[1].0.offset, before);
        assert_eq!(records[1].1, block);
    }
}
