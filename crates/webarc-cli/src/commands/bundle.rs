//! `webarc bundle` command implementation
//!
//! Stores the lines of a CDX file as metadata records, one per container.

use crate::config::Config;
use crate::error::{CliError, Result};
use crate::BundleFormat;
use colored::Colorize;
use std::path::PathBuf;
use webarc_engine::metadata::write_cdx_metadata_bundle;

pub struct BundleArgs {
    pub cdx_file: PathBuf,
    pub job_id: u64,
    pub version: u32,
    pub format: BundleFormat,
    pub compress: bool,
    pub output_dir: PathBuf,
}

/// Write `<output-dir>/<job>-metadata-<version>.*`
pub async fn run(config: &Config, args: BundleArgs) -> Result<()> {
    if !args.cdx_file.is_file() {
        return Err(CliError::FileNotFound(args.cdx_file.display().to_string()));
    }

    let text = tokio::fs::read_to_string(&args.cdx_file).await?;
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();

    tokio::fs::create_dir_all(&args.output_dir).await?;
    let path = write_cdx_metadata_bundle(
        &args.output_dir,
        &config.organization,
        args.job_id,
        args.version,
        args.format.into(),
        args.compress,
        &lines,
    )?;

    eprintln!("{} Bundled {} CDX line(s)", "✓".green(), lines.len());
    println!("{}", path.display());
    Ok(())
}
