//! webarc archive node
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! HTTP service in front of local ARC/WARC storage.
//!
//! # Overview
//!
//! - **Files**: container bytes from an offset to the end (`Range: bytes=N-`),
//!   the contract remote retrieval clients rely on
//! - **Batch**: CDX extraction over selected containers, returning the batch status
//! - **Index**: sorted index artifacts per job-ID set, built once and cached
//! - **Records**: one record by container name and offset
//!
//! # Example
//!
//! ```no_run
//! use webarc_server::{api, config::Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     api::serve(config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod features;
pub mod middleware;

// Re-export commonly used types
pub use error::{AppError, AppResult};
pub use features::AppState;
