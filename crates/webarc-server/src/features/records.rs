//! Single records by container name and offset

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use webarc_engine::retrieval::RecordRetriever;
use webarc_engine::RecordHeader;

use super::AppState;
use crate::error::AppResult;

#[derive(Debug, Deserialize)]
pub struct RecordQuery {
    pub file: String,
    pub offset: u64,
}

/// Record metadata as `x-record-*` headers; values that are not valid header text are left out
pub fn record_headers(record: &RecordHeader) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let mut put = |name: &'static str, value: Option<String>| {
        if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(HeaderName::from_static(name), value);
        }
    };

    put("x-record-format", Some(record.format.to_string()));
    put("x-record-type", Some(record.kind.as_warc_type().to_string()));
    put("x-record-url", record.url.clone());
    put("x-record-ip", record.ip.clone());
    put("x-record-date", record.date.clone());
    put("x-record-mimetype", record.mimetype.clone());
    put("x-record-length", Some(record.length.to_string()));
    put("x-record-offset", Some(record.offset.to_string()));
    put("x-record-content-begin", Some(record.content_begin.to_string()));
    put("x-record-id", record.record_id().map(str::to_string));
    put(
        "x-record-http-status",
        record.http.as_ref().map(|h| h.status.to_string()),
    );
    headers
}

#[tracing::instrument(skip(state), fields(file = %query.file, offset = query.offset))]
pub async fn get_record(
    State(state): State<AppState>,
    Query(query): Query<RecordQuery>,
) -> AppResult<Response> {
    let record = state.retriever.try_get(&query.file, query.offset).await?;

    let mut headers = record_headers(&record.header);
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );

    Ok((headers, Body::from(record.block)).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use webarc_common::ArchiveFormat;
    use webarc_engine::RecordKind;

    #[test]
    fn test_record_headers_skip_invalid_values() {
        let header = RecordHeader {
            format: ArchiveFormat::Warc,
            kind: RecordKind::Response,
            url: Some("http://example.org/\nbroken".to_string()),
            ip: None,
            date: Some("2024-01-02T03:04:05Z".to_string()),
            mimetype: Some("application/http; msgtype=response".to_string()),
            length: 120,
            content_begin: 44,
            offset: 512,
            fields: vec![("WARC-Record-ID".to_string(), "<urn:uuid:1>".to_string())],
            http: None,
        };

        let headers = record_headers(&header);
        assert!(headers.get("x-record-url").is_none());
        assert!(headers.get("x-record-ip").is_none());
        assert_eq!(headers["x-record-type"], "response");
        assert_eq!(headers["x-record-offset"], "512");
        assert_eq!(headers["x-record-content-begin"], "44");
        assert_eq!(headers["x-record-id"], "<urn:uuid:1>");
    }
}
