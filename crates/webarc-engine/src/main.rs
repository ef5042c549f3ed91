//! webarc-batch - run a batch job on the storage side

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use webarc_common::logging::{init_logging, LogConfig, LogLevel};
use webarc_engine::cdx::{CdxExtractionJob, CdxRecordHarvestJob};
use webarc_engine::{BatchJob, BatchRepository, EngineConfig, FileSelection, LocalArchive};

#[derive(Parser, Debug)]
#[command(name = "webarc-batch")]
#[command(author, version, about = "Run a batch job over local archive storage")]
struct Cli {
    /// Job to run
    #[arg(value_enum)]
    job: JobKind,

    /// Storage directories (defaults to WEBARC_STORAGE_DIRS)
    #[arg(short, long)]
    storage: Vec<PathBuf>,

    /// Only process files whose names match this pattern
    #[arg(short, long, conflicts_with = "files")]
    pattern: Option<String>,

    /// Only process these files, in this order
    #[arg(short, long, num_args = 1..)]
    files: Vec<String>,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the batch status as JSON here
    #[arg(long)]
    status: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum JobKind {
    /// CDX lines for every record
    Cdx,
    /// CDX lines with payload MD5
    CdxChecksum,
    /// CDX lines stored in metadata records
    HarvestCdx,
}

impl JobKind {
    fn job(self) -> Box<dyn BatchJob> {
        match self {
            JobKind::Cdx => Box::new(CdxExtractionJob::with_checksum(false)),
            JobKind::CdxChecksum => Box::new(CdxExtractionJob::with_checksum(true)),
            JobKind::HarvestCdx => Box::new(CdxRecordHarvestJob::new()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("webarc-batch".to_string())
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    let mut config = EngineConfig::load().context("Failed to load engine configuration")?;
    if !cli.storage.is_empty() {
        config.storage_dirs = cli.storage.clone();
    }

    let selection = match (&cli.pattern, cli.files.is_empty()) {
        (Some(pattern), _) => FileSelection::pattern(pattern).context("Invalid file pattern")?,
        (None, false) => FileSelection::names(cli.files.clone()),
        (None, true) => FileSelection::All,
    };

    let archive = LocalArchive::from_config(&config);
    let mut job = cli.job.job();

    let mut output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let status = archive.batch(job.as_mut(), &selection, &mut output)?;
    output.flush()?;

    if let Some(path) = &cli.status {
        std::fs::write(path, serde_json::to_vec_pretty(&status)?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!("{}", status.summary());
    for occurrence in &status.exceptions {
        eprintln!("{}", occurrence);
    }

    if !status.success {
        std::process::exit(2);
    }
    Ok(())
}
