//! Container fixtures shared by the integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const WARC_DATE: &str = "2024-01-02T03:04:05Z";

pub fn http_block(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

pub fn warc_record(kind: &str, uri: &str, content_type: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "WARC/1.0\r\n\
         WARC-Type: {}\r\n\
         WARC-Record-ID: <urn:uuid:{}>\r\n\
         WARC-Date: {}\r\n\
         WARC-Target-URI: {}\r\n\
         WARC-IP-Address: 192.0.2.7\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\r\n",
        kind,
        uuid::Uuid::new_v4(),
        WARC_DATE,
        uri,
        content_type,
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

pub fn warc_response(uri: &str, body: &str) -> Vec<u8> {
    warc_record(
        "response",
        uri,
        "application/http; msgtype=response",
        &http_block(body),
    )
}

pub fn warcinfo() -> Vec<u8> {
    let fields = b"software: fixture\r\nformat: WARC File Format 1.0\r\n";
    let mut out = format!(
        "WARC/1.0\r\nWARC-Type: warcinfo\r\nWARC-Date: {}\r\nContent-Type: application/warc-fields\r\nContent-Length: {}\r\n\r\n",
        WARC_DATE,
        fields.len()
    )
    .into_bytes();
    out.extend_from_slice(fields);
    out.extend_from_slice(b"\r\n\r\n");
    out
}

pub fn arc_filedesc(name: &str) -> Vec<u8> {
    let body = "1 0 fixture\nURL IP-address Archive-date Content-type Archive-length\n";
    format!(
        "filedesc://{} 0.0.0.0 20240102030405 text/plain {}\n{}\n",
        name,
        body.len(),
        body
    )
    .into_bytes()
}

pub fn arc_record(url: &str, mime: &str, block: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "{} 192.0.2.9 20240102030405 {} {}\n",
        url,
        mime,
        block.len()
    )
    .into_bytes();
    out.extend_from_slice(block);
    out.push(b'\n');
    out
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Write `records` back to back and return the path plus each start offset
pub fn write_container(dir: &Path, name: &str, records: &[Vec<u8>]) -> (PathBuf, Vec<u64>) {
    let mut data = Vec::new();
    let mut offsets = Vec::new();
    for record in records {
        offsets.push(data.len() as u64);
        data.extend_from_slice(record);
    }
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    (path, offsets)
}

/// Like [`write_container`], one gzip member per record
pub fn write_gzip_container(dir: &Path, name: &str, records: &[Vec<u8>]) -> (PathBuf, Vec<u64>) {
    let members: Vec<Vec<u8>> = records.iter().map(|r| gzip(r)).collect();
    write_container(dir, name, &members)
}

pub fn output_lines(output: &[u8]) -> Vec<String> {
    String::from_utf8(output.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
