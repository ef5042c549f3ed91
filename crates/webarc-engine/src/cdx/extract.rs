//! Job rendering one CDX line per accepted record

use std::io::Write;
use webarc_common::checksum::Md5Reader;

use super::line::{CdxFields, CdxLine};
use crate::error::JobError;
use crate::job::{BatchJob, ExcludeFileHeaders, RecordFilter};
use crate::record::ArchiveRecord;

#[derive(Debug, Clone, Default)]
pub struct CdxExtractionJob {
    fields: CdxFields,
}

impl CdxExtractionJob {
    pub fn new(fields: CdxFields) -> Self {
        Self { fields }
    }

    pub fn with_checksum(checksum: bool) -> Self {
        Self::new(if checksum {
            CdxFields::WithChecksum
        } else {
            CdxFields::Standard
        })
    }

    pub fn fields(&self) -> CdxFields {
        self.fields
    }
}

impl BatchJob for CdxExtractionJob {
    fn name(&self) -> &str {
        "cdx-extraction"
    }

    fn filter(&self) -> &dyn RecordFilter {
        &ExcludeFileHeaders
    }

    fn process_record(
        &mut self,
        record: &mut ArchiveRecord<'_>,
        output: &mut dyn Write,
    ) -> Result<(), JobError> {
        let mut line = CdxLine::from_header(record.header(), record.container());

        // Hashing consumes the block; the record is spent afterwards.
        if self.fields == CdxFields::WithChecksum {
            let digest = Md5Reader::new(&mut *record).finish()?;
            line = line.with_checksum(digest);
        }

        writeln!(output, "{}", line.render(self.fields))?;
        Ok(())
    }
}
