//! Job copying CDX lines stored inside metadata records

use std::io::{Read, Write};

use super::CDX_MIMETYPE;
use crate::error::JobError;
use crate::job::{BatchJob, MimetypeFilter, RecordFilter};
use crate::record::ArchiveRecord;

/// Emits the payload lines of every `application/x-cdx` record
#[derive(Debug, Clone)]
pub struct CdxRecordHarvestJob {
    filter: MimetypeFilter,
}

impl CdxRecordHarvestJob {
    pub fn new() -> Self {
        Self {
            filter: cdx_filter(),
        }
    }
}

impl Default for CdxRecordHarvestJob {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::expect_used)]
fn cdx_filter() -> MimetypeFilter {
    MimetypeFilter::new(&regex::escape(CDX_MIMETYPE)).expect("escaped literal is a valid pattern")
}

impl BatchJob for CdxRecordHarvestJob {
    fn name(&self) -> &str {
        "cdx-harvest"
    }

    fn filter(&self) -> &dyn RecordFilter {
        &self.filter
    }

    fn process_record(
        &mut self,
        record: &mut ArchiveRecord<'_>,
        output: &mut dyn Write,
    ) -> Result<(), JobError> {
        let mut buf = [0u8; 8192];
        let mut last = b'\n';
        loop {
            let n = record.read(&mut buf)?;
            if n == 0 {
                break;
            }
            output.write_all(&buf[..n])?;
            last = buf[n - 1];
        }
        if last != b'\n' {
            output.write_all(b"\n")?;
        }
        Ok(())
    }
}
