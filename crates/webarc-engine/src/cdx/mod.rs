//! CDX position index: line format, extraction jobs and lookup

pub mod extract;
pub mod harvest;
pub mod line;
pub mod reader;

pub use extract::CdxExtractionJob;
pub use harvest::CdxRecordHarvestJob;
pub use line::{CdxFields, CdxLine};
pub use reader::CdxReader;

/// Mimetype of records carrying CDX lines
pub const CDX_MIMETYPE: &str = "application/x-cdx";
