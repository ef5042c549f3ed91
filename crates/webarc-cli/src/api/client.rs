//! HTTP API client for the archive node

use crate::api::endpoints;
use crate::error::{CliError, Result};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::time::Duration;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via WEBARC_API_TIMEOUT_SECS environment variable.
/// Index builds can take a while on the node side.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 900;

/// Header carrying the artifact filename on index replies
pub const INDEX_ARTIFACT_HEADER: &str = "x-index-artifact";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Index artifact downloaded from a node
#[derive(Debug, Clone)]
pub struct FetchedIndex {
    pub artifact_name: Option<String>,
    pub body: Vec<u8>,
}

/// API client for the archive node
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: String) -> Result<Self> {
        let timeout_secs = std::env::var("WEBARC_API_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_API_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Download the sorted index for `job_ids`
    pub async fn fetch_index(&self, job_ids: &[u64]) -> Result<FetchedIndex> {
        let url = endpoints::index_url(&self.base_url, job_ids);
        let response = check(self.client.get(&url).send().await?).await?;

        let artifact_name = response
            .headers()
            .get(INDEX_ARTIFACT_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        Ok(FetchedIndex {
            artifact_name,
            body,
        })
    }
}

/// Turn a non-success reply into an API error carrying the node's message
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error.message)
        .unwrap_or(text);
    Err(CliError::api(format!("{} ({})", message, status)))
}
