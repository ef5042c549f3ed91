//! webarc engine
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Batch processing and record retrieval over ARC and WARC containers.
//!
//! # Overview
//!
//! - **Reader**: offset-tracked iteration over plain or gzip-per-record containers
//! - **Jobs**: the [`BatchJob`] contract and record filters
//! - **Engine**: runs one job over many containers with per-record and per-file fault isolation
//! - **CDX**: index line extraction, parsing and exact-URL lookup
//! - **Cache**: sorted index artifacts keyed by job-ID sets, one builder per key
//! - **Retrieval**: single records by name and offset, locally or over HTTP ranges
//! - **Writer**: appending records to ARC/WARC files, copying and bundling
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use webarc_engine::cdx::CdxExtractionJob;
//! use webarc_engine::engine::BatchEngine;
//!
//! fn main() -> webarc_engine::Result<()> {
//!     let mut job = CdxExtractionJob::with_checksum(false);
//!     let files = vec![PathBuf::from("1-1-20240101.warc.gz")];
//!     let status = BatchEngine::new().run(&mut job, &files, &mut std::io::stdout())?;
//!     eprintln!("{}", status.summary());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod cdx;
pub mod config;
pub mod engine;
pub mod error;
pub mod job;
pub mod metadata;
pub mod record;
pub mod repository;
pub mod retrieval;
pub mod writer;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{
    BatchEngine, BatchStatus, ExceptionOccurrence, FileSelection, ResumePoint, RunEntry,
};
pub use error::{EngineError, Result};
pub use job::{BatchJob, RecordFilter};
pub use record::{ArchiveRecord, ContainerReader, RecordHeader, RecordKind};
pub use repository::{BatchRepository, LocalArchive};
