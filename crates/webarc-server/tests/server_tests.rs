//! Integration tests for the archive node
//!
//! These tests verify:
//! - Health check endpoint works
//! - Container files honor `Range: bytes=N-` with 200 replies
//! - Batch, index and record endpoints return engine results
//! - The remote retrieval client can read records from a running node

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt; // for `oneshot`
use webarc_engine::config::RemoteConfig;
use webarc_engine::retrieval::{LocalRetriever, RecordRetriever, RemoteRetriever};
use webarc_engine::writer::{ContainerWriter, NewRecord, WarcWriter};
use webarc_engine::{LocalArchive, RecordKind};
use webarc_server::api::create_router;
use webarc_server::config::Config;
use webarc_server::AppState;

const CONTAINER: &str = "1-1-20240102.warc";

struct TestNode {
    _temp: TempDir,
    storage: std::path::PathBuf,
    offsets: Vec<u64>,
    app: Router,
}

fn http_block(body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes()
}

fn write_fixture(dir: &Path) -> Vec<u64> {
    let mut writer = WarcWriter::create(dir.join(CONTAINER), false).unwrap();
    let mut offsets = Vec::new();
    for (url, body) in [("http://example.org/b", "bee"), ("http://example.org/a", "ay")] {
        let block = http_block(body);
        let record = NewRecord::new(RecordKind::Response, url, "application/http; msgtype=response")
            .with_date(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_ip("192.0.2.7");
        offsets.push(
            writer
                .write_record(&record, &mut block.as_slice(), block.len() as u64)
                .unwrap(),
        );
    }
    writer.into_inner().unwrap();
    offsets
}

fn create_test_node() -> TestNode {
    let temp = TempDir::new().unwrap();
    let storage = temp.path().join("storage");
    std::fs::create_dir_all(&storage).unwrap();
    let offsets = write_fixture(&storage);

    let mut config = Config::default();
    config.engine.storage_dirs = vec![storage.clone()];
    config.engine.cache_dir = temp.path().join("cache");
    config.engine.cache_poll_interval_ms = 10;

    let app = create_router(AppState::new(&config.engine), &config);
    TestNode {
        _temp: temp,
        storage,
        offsets,
        app,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, body.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let node = create_test_node();

    let (status, _, body) = send(&node.app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["available"], 1);
}

#[tokio::test]
async fn test_files_full_and_ranged() {
    let node = create_test_node();
    let data = std::fs::read(node.storage.join(CONTAINER)).unwrap();

    let (status, headers, body) = send(&node.app, get(&format!("/files/{}", CONTAINER))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, data);
    assert_eq!(headers["x-archive-offset"], "0");

    let offset = node.offsets[1];
    let request = Request::builder()
        .uri(format!("/files/{}", CONTAINER))
        .header(header::RANGE, format!("bytes={}-", offset))
        .body(Body::empty())
        .unwrap();
    let (status, headers, body) = send(&node.app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, data[offset as usize..].to_vec());
    assert_eq!(headers["x-archive-offset"], offset.to_string().as_str());
    assert_eq!(
        headers[header::CONTENT_LENGTH],
        (data.len() as u64 - offset).to_string().as_str()
    );
}

#[tokio::test]
async fn test_files_errors() {
    let node = create_test_node();

    let (status, _, body) = send(&node.app, get("/files/unknown.warc")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"]["status"], 404);

    for range in ["bytes=5-10", "bytes=999999999-"] {
        let request = Request::builder()
            .uri(format!("/files/{}", CONTAINER))
            .header(header::RANGE, range)
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&node.app, request).await;
        assert_eq!(status, StatusCode::RANGE_NOT_SATISFIABLE, "range {}", range);
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_batch_cdx() {
    let node = create_test_node();

    let (status, _, body) = send(&node.app, post_json("/api/v1/batch/cdx", "{}")).await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"]["success"], true);
    assert_eq!(json["status"]["records_processed"], 2);
    let output = json["output"].as_str().unwrap();
    assert_eq!(output.lines().count(), 2);
    assert!(output.starts_with("http://example.org/b 192.0.2.7 20240102030405 text/html "));

    let (status, _, body) = send(
        &node.app,
        post_json("/api/v1/batch/cdx", r#"{"files": ["missing.warc"], "checksum": true}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"]["success"], false);
    assert_eq!(json["status"]["files_failed"][0], "missing.warc");

    let (status, _, _) = send(
        &node.app,
        post_json("/api/v1/batch/cdx", r#"{"files": [], "pattern": ".*"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_artifact() {
    let node = create_test_node();

    let (status, headers, body) = send(&node.app, get("/api/v1/index?jobs=1,1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["x-index-artifact"], "job-1-index.cdx");
    let text = String::from_utf8(body).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("http://example.org/a "));
    assert!(lines[1].starts_with("http://example.org/b "));

    let (status, _, _) = send(&node.app, get("/api/v1/index?jobs=one")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_lookup() {
    let node = create_test_node();
    let offset = node.offsets[0];

    let (status, headers, body) = send(
        &node.app,
        get(&format!("/api/v1/record?file={}&offset={}", CONTAINER, offset)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, http_block("bee"));
    assert_eq!(headers["x-record-url"], "http://example.org/b");
    assert_eq!(headers["x-record-type"], "response");
    assert_eq!(headers["x-record-offset"], offset.to_string().as_str());
    assert_eq!(headers["x-record-http-status"], "200");

    let (status, _, _) = send(
        &node.app,
        get(&format!("/api/v1/record?file={}&offset={}", CONTAINER, offset + 1)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_remote_retrieval_against_running_node() {
    let node = create_test_node();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = node.app.clone();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let remote =
        RemoteRetriever::new(format!("http://{}/files", addr), &RemoteConfig::default()).unwrap();
    let local = LocalRetriever::new(LocalArchive::new(vec![node.storage.clone()]));

    for offset in &node.offsets {
        let fetched = remote.get(CONTAINER, *offset).await.unwrap();
        let expected = local.get(CONTAINER, *offset).await.unwrap();
        assert_eq!(fetched, expected);
    }
    assert!(remote.get("unknown.warc", 0).await.is_none());
}
