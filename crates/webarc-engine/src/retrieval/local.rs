//! Retrieval from local storage directories

use async_trait::async_trait;

use super::{read_single, RecordRetriever, RetrievedRecord};
use crate::error::RetrievalError;
use crate::record::ContainerReader;
use crate::repository::LocalArchive;

#[derive(Debug, Clone)]
pub struct LocalRetriever {
    archive: LocalArchive,
}

impl LocalRetriever {
    pub fn new(archive: LocalArchive) -> Self {
        Self { archive }
    }

    pub fn archive(&self) -> &LocalArchive {
        &self.archive
    }

    /// Blocking variant for callers already off the async runtime
    pub fn get_blocking(&self, filename: &str, offset: u64) -> Result<RetrievedRecord, RetrievalError> {
        let path = self
            .archive
            .lookup(filename)
            .ok_or_else(|| RetrievalError::NotFound(filename.to_string()))?;
        read_single(ContainerReader::open_at(&path, offset), filename, offset)
    }
}

#[async_trait]
impl RecordRetriever for LocalRetriever {
    async fn try_get(&self, filename: &str, offset: u64) -> Result<RetrievedRecord, RetrievalError> {
        let this = self.clone();
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || this.get_blocking(&filename, offset))
            .await
            .map_err(|e| RetrievalError::Io(std::io::Error::other(e)))?
    }
}
