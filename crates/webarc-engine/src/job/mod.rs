//! Batch job contract
//!
//! A job sees the records its filter accepts, one at a time, and writes
//! whatever it produces to the shared output stream of the run. Counters and
//! the exception ledger belong to the run, see [`crate::engine::BatchStatus`].

pub mod filter;

pub use filter::{
    ExcludeFileHeaders, ExcludeHttpEntries, FilterChain, MimetypeFilter, NoFilter, OnlyHttpEntries,
    OnlyResponses, RecordFilter,
};

use std::io::{self, Read, Write};

use crate::error::JobError;
use crate::record::ArchiveRecord;

/// Unit of work run once per accepted record
pub trait BatchJob: Send {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Records the job wants to see; file headers are hidden by default
    fn filter(&self) -> &dyn RecordFilter {
        &ExcludeFileHeaders
    }

    /// Called once before the first record
    fn initialize(&mut self, _output: &mut dyn Write) -> Result<(), JobError> {
        Ok(())
    }

    /// Handle one record
    ///
    /// A recoverable error skips the record; an unrecoverable one abandons
    /// the rest of the current file.
    fn process_record(
        &mut self,
        record: &mut ArchiveRecord<'_>,
        output: &mut dyn Write,
    ) -> Result<(), JobError>;

    /// Called once after the last record of the last file, even after failures
    fn finish(&mut self, _output: &mut dyn Write) -> Result<(), JobError> {
        Ok(())
    }

    /// Reduce the concatenated outputs of several runs into one
    fn post_process(&mut self, input: &mut dyn Read, output: &mut dyn Write) -> Result<(), JobError> {
        io::copy(input, output)?;
        Ok(())
    }
}
