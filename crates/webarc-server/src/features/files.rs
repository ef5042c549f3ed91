//! Raw container access with open-ended byte ranges
//!
//! `GET /files/{filename}` with `Range: bytes=N-` answers 200 and streams the
//! file from `N` to its end. Retrieval clients parse that stream as a fresh
//! container starting at `N`, so partial-content framing is not used.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::get,
    Router,
};
use std::io::SeekFrom;
use tokio::io::AsyncSeekExt;
use tokio_util::io::ReaderStream;

use super::AppState;
use crate::error::{AppError, AppResult};

/// Response header echoing the start offset of the body
pub const ARCHIVE_OFFSET_HEADER: &str = "x-archive-offset";

pub fn files_routes() -> Router<AppState> {
    Router::new().route("/:filename", get(get_file))
}

/// Start offset of a `bytes=N-` range
pub fn parse_open_range(value: &str) -> AppResult<u64> {
    let malformed = || AppError::RangeNotSatisfiable(format!("unsupported range '{}'", value));
    let start = value
        .trim()
        .strip_prefix("bytes=")
        .and_then(|range| range.strip_suffix('-'))
        .ok_or_else(malformed)?;
    start.trim().parse::<u64>().map_err(|_| malformed())
}

#[tracing::instrument(skip(state, headers), fields(filename = %filename))]
async fn get_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let path = state
        .archive
        .lookup(&filename)
        .ok_or_else(|| AppError::NotFound(format!("Container {} not found", filename)))?;

    let offset = match headers.get(header::RANGE) {
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| AppError::RangeNotSatisfiable("range is not ASCII".to_string()))?;
            parse_open_range(value)?
        },
        None => 0,
    };

    let mut file = tokio::fs::File::open(&path).await?;
    let len = file.metadata().await?.len();
    if offset > len {
        return Err(AppError::RangeNotSatisfiable(format!(
            "offset {} is past the end of {} ({} bytes)",
            offset, filename, len
        )));
    }
    if offset > 0 {
        file.seek(SeekFrom::Start(offset)).await?;
    }

    tracing::debug!(offset, bytes = len - offset, "Serving container range");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, len - offset)
        .header(header::ACCEPT_RANGES, "bytes")
        .header(ARCHIVE_OFFSET_HEADER, offset)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}
