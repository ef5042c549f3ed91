//! `webarc copy` command implementation
//!
//! Consolidates the records of several containers into one destination.

use crate::error::{CliError, Result};
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};
use webarc_common::format::is_compressed;
use webarc_common::ArchiveFormat;
use webarc_engine::EngineError;
use webarc_engine::writer::{insert_arc_file, insert_warc_file, ArcWriter, ContainerWriter, WarcWriter};

pub struct CopyArgs {
    pub dest: PathBuf,
    pub sources: Vec<PathBuf>,
    pub compress: bool,
}

/// Copy every source into `dest`
pub async fn run(args: CopyArgs) -> Result<()> {
    let name = args
        .dest
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| CliError::invalid_argument("destination needs a file name"))?;
    let format = ArchiveFormat::from_filename(name).ok_or_else(|| {
        CliError::invalid_argument(format!(
            "cannot tell the format of '{}'; use a .arc or .warc extension",
            name
        ))
    })?;
    let compress = args.compress || is_compressed(name);

    if args.dest.exists() {
        return Err(CliError::invalid_argument(format!(
            "'{}' already exists",
            args.dest.display()
        )));
    }
    for source in &args.sources {
        if !source.is_file() {
            return Err(CliError::FileNotFound(source.display().to_string()));
        }
    }

    let copied = match write_copy(&args.dest, format, compress, &args.sources) {
        Ok(copied) => copied,
        Err(e) => {
            // Drop the partial destination.
            let _ = std::fs::remove_file(&args.dest);
            return Err(e);
        },
    };

    eprintln!(
        "{} Copied {} record(s) from {} file(s) into {}",
        "✓".green(),
        copied,
        args.sources.len(),
        args.dest.display()
    );
    Ok(())
}

fn write_copy(dest: &Path, format: ArchiveFormat, compress: bool, sources: &[PathBuf]) -> Result<usize> {
    match format {
        ArchiveFormat::Warc => {
            let mut writer = WarcWriter::create(dest, compress).map_err(EngineError::from)?;
            let copied = copy_all(&mut writer, sources, insert_warc_file)?;
            writer.into_inner().map_err(EngineError::from)?.flush()?;
            Ok(copied)
        },
        ArchiveFormat::Arc => {
            let mut writer = ArcWriter::create(dest, compress).map_err(EngineError::from)?;
            let copied = copy_all(&mut writer, sources, insert_arc_file)?;
            writer.into_inner().map_err(EngineError::from)?.flush()?;
            Ok(copied)
        },
    }
}

fn copy_all(
    dest: &mut dyn ContainerWriter,
    sources: &[PathBuf],
    insert: fn(&Path, &mut dyn ContainerWriter) -> webarc_engine::Result<usize>,
) -> Result<usize> {
    let mut copied = 0;
    for source in sources {
        copied += insert(source, dest)?;
    }
    Ok(copied)
}
