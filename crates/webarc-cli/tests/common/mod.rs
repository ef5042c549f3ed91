//! Shared fixtures for CLI tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use assert_cmd::Command;
use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use webarc_engine::writer::{ContainerWriter, NewRecord, WarcWriter};
use webarc_engine::RecordKind;

pub fn http_block(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

/// WARC holding one response per `(url, body)`; returns the path and record offsets
pub fn write_warc(dir: &Path, name: &str, pages: &[(&str, &str)], compress: bool) -> (PathBuf, Vec<u64>) {
    let path = dir.join(name);
    let mut writer = WarcWriter::create(&path, compress).unwrap();
    let mut offsets = Vec::new();
    for (url, body) in pages {
        let block = http_block(body);
        let record = NewRecord::new(RecordKind::Response, *url, "application/http; msgtype=response")
            .with_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_ip("192.0.2.7");
        offsets.push(
            writer
                .write_record(&record, &mut block.as_slice(), block.len() as u64)
                .unwrap(),
        );
    }
    writer.into_inner().unwrap();
    (path, offsets)
}

/// `webarc` with a clean environment rooted at `dir`
pub fn webarc(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("webarc").unwrap();
    cmd.current_dir(dir)
        .env_remove("WEBARC_STORAGE_DIRS")
        .env_remove("WEBARC_SERVER_URL")
        .env_remove("WEBARC_ORGANIZATION")
        .env_remove("WEBARC_LOG_LEVEL")
        .env("WEBARC_CACHE_DIR", dir.join("cache"));
    cmd
}
