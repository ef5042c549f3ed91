//! Cache keys and artifact names derived from job-ID sets

use std::path::{Path, PathBuf};
use webarc_common::checksum::md5_hex;

/// IDs embedded literally before the name falls back to a digest
pub const MAX_LITERAL_IDS: usize = 4;

pub const MARKER_SUFFIX: &str = ".working";

/// Sorted, deduplicated job IDs
pub fn canonical_ids(ids: &[u64]) -> Vec<u64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn joined(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join("-")
}

/// Artifact filename for canonical `ids`
pub fn artifact_name(ids: &[u64]) -> String {
    if ids.len() <= MAX_LITERAL_IDS {
        format!("job-{}-index.cdx", joined(ids))
    } else {
        format!(
            "job-{}-{}-index.cdx",
            joined(&ids[..MAX_LITERAL_IDS]),
            md5_hex(joined(ids).as_bytes())
        )
    }
}

/// Work marker created next to an artifact while it is being built
pub fn marker_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_owned();
    name.push(MARKER_SUFFIX);
    PathBuf::from(name)
}

fn id_alternation(ids: &[u64]) -> String {
    ids.iter().map(u64::to_string).collect::<Vec<_>>().join("|")
}

/// Containers produced by the harvests of `ids`
pub fn harvest_file_pattern(ids: &[u64]) -> String {
    format!(r"({})-.*\.w?arc(\.gz)?", id_alternation(ids))
}

/// Metadata bundles of `ids`
pub fn metadata_file_pattern(ids: &[u64]) -> String {
    format!(r"({})-metadata-[0-9]+\.w?arc(\.gz)?", id_alternation(ids))
}
