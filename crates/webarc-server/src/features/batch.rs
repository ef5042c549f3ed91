//! Batch jobs run on request over this node's storage

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;
use webarc_engine::cdx::CdxExtractionJob;
use webarc_engine::{BatchRepository, BatchStatus, EngineError, FileSelection};

use super::AppState;
use crate::error::{AppError, AppResult};

/// Which files a CDX batch covers and whether lines carry checksums
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub checksum: bool,
}

impl BatchRequest {
    pub fn selection(&self) -> AppResult<FileSelection> {
        match (&self.files, &self.pattern) {
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "give either files or pattern, not both".to_string(),
            )),
            (Some(files), None) => Ok(FileSelection::names(files.iter().cloned())),
            (None, Some(pattern)) => FileSelection::pattern(pattern)
                .map_err(|e| AppError::BadRequest(format!("invalid pattern: {}", e))),
            (None, None) => Ok(FileSelection::All),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub status: BatchStatus,
    pub output: String,
}

pub fn batch_routes() -> Router<AppState> {
    Router::new().route("/cdx", post(run_cdx))
}

#[tracing::instrument(skip(state, request), fields(checksum = request.checksum))]
async fn run_cdx(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> AppResult<Json<BatchResponse>> {
    let selection = request.selection()?;
    let archive = state.archive.clone();
    let checksum = request.checksum;

    let (status, output) = tokio::task::spawn_blocking(move || {
        let mut job = CdxExtractionJob::with_checksum(checksum);
        let mut output = Vec::new();
        let status = archive.batch(&mut job, &selection, &mut output)?;
        Ok::<_, EngineError>((status, output))
    })
    .await??;

    info!("{}", status.summary());

    Ok(Json(BatchResponse {
        status,
        output: String::from_utf8_lossy(&output).into_owned(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_request_selection() {
        let all: BatchRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(all.selection().unwrap(), FileSelection::All));

        let named: BatchRequest = serde_json::from_str(r#"{"files": ["b.warc", "a.warc"]}"#).unwrap();
        match named.selection().unwrap() {
            FileSelection::Names(names) => assert_eq!(names, vec!["b.warc", "a.warc"]),
            other => panic!("unexpected selection {:?}", other),
        }

        let both = BatchRequest {
            files: Some(vec![]),
            pattern: Some(".*".to_string()),
            checksum: false,
        };
        assert!(matches!(both.selection(), Err(AppError::BadRequest(_))));

        let broken: BatchRequest = serde_json::from_str(r#"{"pattern": "("}"#).unwrap();
        assert!(matches!(broken.selection(), Err(AppError::BadRequest(_))));
    }
}
