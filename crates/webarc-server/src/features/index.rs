//! Sorted CDX index artifacts for job-ID sets

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::Response,
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use super::AppState;
use crate::error::{AppError, AppResult};

pub const INDEX_ARTIFACT_HEADER: &str = "x-index-artifact";

#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    /// Comma separated job IDs
    pub jobs: String,
}

pub fn parse_job_ids(jobs: &str) -> AppResult<Vec<u64>> {
    let ids = jobs
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse::<u64>()
                .map_err(|_| AppError::BadRequest(format!("invalid job ID '{}'", id)))
        })
        .collect::<AppResult<Vec<u64>>>()?;
    if ids.is_empty() {
        return Err(AppError::BadRequest("no job IDs given".to_string()));
    }
    Ok(ids)
}

#[tracing::instrument(skip(state))]
pub async fn get_index(
    State(state): State<AppState>,
    Query(query): Query<IndexQuery>,
) -> AppResult<Response> {
    let ids = parse_job_ids(&query.jobs)?;
    let cache = state.cache.clone();

    // Building may take minutes and waits on other builders.
    let path = tokio::task::spawn_blocking(move || cache.get_or_build(&ids)).await??;

    let file = tokio::fs::File::open(&path).await?;
    let len = file.metadata().await?.len();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    tracing::debug!(artifact = %name, bytes = len, "Serving index artifact");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CONTENT_LENGTH, len)
        .header(INDEX_ARTIFACT_HEADER, name)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::Internal(e.to_string()))
}
