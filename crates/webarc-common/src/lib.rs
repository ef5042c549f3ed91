//! webarc common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the webarc workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`WebarcError`] and the crate-wide [`Result`] alias
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Checksums**: streaming MD5 used by CDX extraction and cache naming
//! - **Formats**: ARC/WARC filename conventions and record locators
//!
//! # Example
//!
//! ```no_run
//! use webarc_common::checksum::md5_file;
//! use webarc_common::format::{is_arc, is_warc};
//!
//! fn describe(path: &std::path::Path) -> webarc_common::Result<()> {
//!     let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
//!     if is_arc(name) || is_warc(name) {
//!         println!("{} {}", name, md5_file(path)?);
//!     }
//!     Ok(())
//! }
//! ```

pub mod checksum;
pub mod error;
pub mod format;
pub mod logging;

// Re-export commonly used types
pub use error::{Result, WebarcError};
pub use format::{ArchiveFormat, RecordLocator};
