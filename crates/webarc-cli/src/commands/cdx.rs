//! `webarc cdx` command implementation
//!
//! Prints CDX lines for local containers; the run summary goes to stderr.

use crate::error::{CliError, Result};
use colored::Colorize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use webarc_engine::cdx::CdxExtractionJob;
use webarc_engine::BatchEngine;

/// Extract CDX lines from `files`
pub async fn run(files: Vec<PathBuf>, checksum: bool) -> Result<()> {
    let mut job = CdxExtractionJob::with_checksum(checksum);

    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    let status = BatchEngine::new().run(&mut job, &files, &mut output)?;
    output.flush()?;

    for occurrence in &status.exceptions {
        eprintln!("{} {}", "!".yellow(), occurrence);
    }
    if status.exceptions_dropped > 0 {
        eprintln!(
            "{} {} more exception(s) not shown",
            "!".yellow(),
            status.exceptions_dropped
        );
    }

    if status.success {
        eprintln!("{} {}", "✓".green(), status.summary());
        Ok(())
    } else {
        Err(CliError::BatchFailed(status.summary()))
    }
}
