//! Feature modules of the archive node
//!
//! - **files**: raw container bytes with `Range: bytes=N-` semantics
//! - **batch**: CDX extraction over this node's storage on request
//! - **index**: cached, sorted index artifacts for job-ID sets
//! - **records**: single records by container name and offset

pub mod batch;
pub mod files;
pub mod index;
pub mod records;

use axum::{routing::get, Router};
use std::sync::Arc;
use webarc_engine::cache::IndexCache;
use webarc_engine::retrieval::LocalRetriever;
use webarc_engine::{EngineConfig, LocalArchive};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct AppState {
    pub archive: LocalArchive,
    pub cache: Arc<IndexCache>,
    pub retriever: LocalRetriever,
}

impl AppState {
    pub fn new(config: &EngineConfig) -> Self {
        let archive = LocalArchive::from_config(config);
        let cache = IndexCache::from_config(Arc::new(archive.clone()), config);
        Self {
            retriever: LocalRetriever::new(archive.clone()),
            archive,
            cache: Arc::new(cache),
        }
    }
}

/// API routes mounted under `/api/v1`
pub fn router(state: AppState) -> Router<()> {
    Router::new()
        .nest("/batch", batch::batch_routes())
        .route("/index", get(index::get_index))
        .route("/record", get(records::get_record))
        .with_state(state)
}
