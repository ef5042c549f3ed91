//! Retrieval from a remote archive node over HTTP range requests
//!
//! The node answers `GET <base>/<filename>` carrying `Range: bytes=N-` with
//! status 200 and the container bytes from `N` onwards. Only the first record
//! of that stream is read; the rest of the body is dropped unread.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode, Url};
use std::time::Duration;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;

use super::{read_single, RecordRetriever, RetrievedRecord};
use crate::config::RemoteConfig;
use crate::error::RetrievalError;
use crate::record::ContainerReader;

#[derive(Debug, Clone)]
pub struct RemoteRetriever {
    client: Client,
    base_url: String,
}

impl RemoteRetriever {
    /// Build a pooled client from configuration
    pub fn new(base_url: impl Into<String>, config: &RemoteConfig) -> Result<Self, RetrievalError> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/<filename>`, the name encoded as one path segment
    fn file_url(&self, filename: &str) -> Result<Url, RetrievalError> {
        let invalid = |reason: String| RetrievalError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot carry a path".to_string()))?
            .pop_if_empty()
            .push(filename);
        Ok(url)
    }
}

#[async_trait]
impl RecordRetriever for RemoteRetriever {
    async fn try_get(&self, filename: &str, offset: u64) -> Result<RetrievedRecord, RetrievalError> {
        let url = self.file_url(filename)?;
        debug!(%url, offset, "Requesting remote record");

        let response = self
            .client
            .get(url.clone())
            .header(RANGE, format!("bytes={}-", offset))
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(RetrievalError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let bridge = SyncIoBridge::new(StreamReader::new(body));
        let filename = filename.to_string();

        tokio::task::spawn_blocking(move || {
            read_single(ContainerReader::from_reader(bridge, filename.clone(), offset), &filename, offset)
        })
        .await
        .map_err(|e| RetrievalError::Io(std::io::Error::other(e)))?
    }
}
