//! Fetching single records by container name and offset
//!
//! Lookups are independent: a failed lookup is logged and reported as
//! "no record" by [`RecordRetriever::get`], never raised into the caller.

pub mod local;
pub mod remote;

pub use local::LocalRetriever;
pub use remote::RemoteRetriever;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tracing::warn;

use crate::error::RetrievalError;
use crate::record::{ContainerReader, RecordHeader};

/// One record, fully read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRecord {
    pub filename: String,
    pub header: RecordHeader,
    /// Complete record block, embedded HTTP header included
    pub block: Vec<u8>,
}

impl RetrievedRecord {
    /// Block bytes after the embedded HTTP header
    pub fn content(&self) -> &[u8] {
        let begin = (self.header.content_begin as usize).min(self.block.len());
        &self.block[begin..]
    }
}

#[async_trait]
pub trait RecordRetriever: Send + Sync {
    /// Fetch the record starting at `offset` in `filename`
    async fn try_get(&self, filename: &str, offset: u64) -> Result<RetrievedRecord, RetrievalError>;

    /// Like [`try_get`](Self::try_get), with failures logged and flattened
    async fn get(&self, filename: &str, offset: u64) -> Option<RetrievedRecord> {
        match self.try_get(filename, offset).await {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(file = %filename, offset, error = %e, "Record unavailable");
                None
            },
        }
    }
}

/// Read the first record of a reader positioned at `offset`
pub(crate) fn read_single<R: Read>(
    reader: Result<ContainerReader<R>, crate::error::ContainerOpenError>,
    filename: &str,
    offset: u64,
) -> Result<RetrievedRecord, RetrievalError> {
    let unreadable = |reason: String| RetrievalError::Unreadable {
        filename: filename.to_string(),
        offset,
        reason,
    };

    let mut reader = match reader {
        Ok(reader) => reader,
        Err(crate::error::ContainerOpenError::Empty { .. }) => {
            return Err(RetrievalError::NoRecord {
                filename: filename.to_string(),
                offset,
            })
        },
        Err(e) => return Err(unreadable(e.to_string())),
    };

    let mut record = match reader.next_record() {
        Ok(Some(record)) => record,
        Ok(None) => {
            return Err(RetrievalError::NoRecord {
                filename: filename.to_string(),
                offset,
            })
        },
        Err(e) => return Err(unreadable(e.to_string())),
    };

    let block = record.read_block().map_err(|e| unreadable(e.to_string()))?;
    Ok(RetrievedRecord {
        filename: filename.to_string(),
        header: record.into_header(),
        block,
    })
}
