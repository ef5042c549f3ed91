//! CDX metadata bundles
//!
//! A bundle stores the index lines of one harvest job inside a container,
//! one metadata record per indexed container file, so the index can later be
//! rebuilt from [`crate::cache::IndexSource::EmbeddedCdx`].

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use webarc_common::ArchiveFormat;

use crate::cdx::{CdxLine, CDX_MIMETYPE};
use crate::error::Result;
use crate::record::RecordKind;
use crate::writer::{ArcWriter, ContainerWriter, NewRecord, WarcWriter};

pub const CDX_MAJOR_VERSION: u32 = 3;
pub const CDX_MINOR_VERSION: u32 = 0;

/// `<jobid>-metadata-<version>.warc|arc[.gz]`
pub fn metadata_filename(job_id: u64, version: u32, format: ArchiveFormat, compress: bool) -> String {
    format!("{}-metadata-{}{}", job_id, version, format.extension(compress))
}

pub fn cdx_metadata_uri(organization: &str, job_id: u64, filename: &str) -> String {
    format!(
        "metadata://{}/crawl/index/cdx?majorversion={}&minorversion={}&jobid={}&filename={}",
        organization, CDX_MAJOR_VERSION, CDX_MINOR_VERSION, job_id, filename
    )
}

/// Write one metadata record per container named in `lines`
///
/// Lines are grouped by container filename; groups and the lines inside
/// them are written in sorted order. Lines that do not parse are skipped.
pub fn create_cdx_metadata_file<I, S>(
    organization: &str,
    job_id: u64,
    lines: I,
    dest: &mut dyn ContainerWriter,
) -> Result<usize>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for line in lines {
        let line = line.as_ref().trim_end();
        if line.is_empty() {
            continue;
        }
        match CdxLine::parse(line) {
            Ok(entry) => groups.entry(entry.filename).or_default().push(line.to_string()),
            Err(e) => warn!(job_id, error = %e, "Skipping unparsable CDX line"),
        }
    }

    let kind = match dest.format() {
        ArchiveFormat::Warc => RecordKind::Metadata,
        ArchiveFormat::Arc => RecordKind::Resource,
    };

    for (filename, group) in &mut groups {
        group.sort();
        let mut payload = Vec::new();
        for line in group.iter() {
            payload.write_all(line.as_bytes())?;
            payload.write_all(b"\n")?;
        }
        let record = NewRecord::new(
            kind.clone(),
            cdx_metadata_uri(organization, job_id, filename),
            CDX_MIMETYPE,
        );
        dest.write_record(&record, &mut payload.as_slice(), payload.len() as u64)?;
    }
    dest.flush()?;

    info!(job_id, containers = groups.len(), "Wrote CDX metadata records");
    Ok(groups.len())
}

/// Create `<dir>/<jobid>-metadata-<version>.*` holding the given CDX lines
pub fn write_cdx_metadata_bundle<I, S>(
    dir: &Path,
    organization: &str,
    job_id: u64,
    version: u32,
    format: ArchiveFormat,
    compress: bool,
    lines: I,
) -> Result<PathBuf>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let path = dir.join(metadata_filename(job_id, version, format, compress));
    match format {
        ArchiveFormat::Warc => {
            let mut writer = WarcWriter::create(&path, compress)?;
            create_cdx_metadata_file(organization, job_id, lines, &mut writer)?;
            writer.into_inner()?.flush()?;
        },
        ArchiveFormat::Arc => {
            let mut writer = ArcWriter::create(&path, compress)?;
            create_cdx_metadata_file(organization, job_id, lines, &mut writer)?;
            writer.into_inner()?.flush()?;
        },
    }
    Ok(path)
}
