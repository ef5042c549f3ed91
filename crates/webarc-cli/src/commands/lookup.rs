//! `webarc lookup` command implementation
//!
//! Exact-URL search over CDX files.

use crate::error::Result;
use colored::Colorize;
use std::path::PathBuf;
use webarc_engine::cdx::CdxReader;

pub struct LookupArgs {
    pub url: String,
    pub cdx_files: Vec<PathBuf>,
    pub filter: Vec<String>,
    pub all: bool,
}

/// Print matching CDX lines; nothing found is not an error
pub async fn run(args: LookupArgs) -> Result<()> {
    let mut reader = CdxReader::new(&args.cdx_files);
    for pattern in &args.filter {
        reader.add_filename_filter(pattern)?;
    }

    let found = if args.all {
        reader.lookup_all(&args.url)?
    } else {
        reader.lookup(&args.url)?.into_iter().collect()
    };

    if found.is_empty() {
        eprintln!("No entries for {}", args.url.yellow());
        return Ok(());
    }

    for line in &found {
        println!("{}", line);
    }
    Ok(())
}
