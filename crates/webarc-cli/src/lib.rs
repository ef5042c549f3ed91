//! webarc CLI Library
//!
//! Command-line access to ARC/WARC archives.
//!
//! # Overview
//!
//! - **CDX extraction**: index lines for local containers (`webarc cdx`)
//! - **Index artifacts**: sorted, cached indexes per job-ID set (`webarc index`)
//! - **Record retrieval**: one record by container and offset, locally or from an archive node (`webarc get`)
//! - **Lookup**: exact-URL search in CDX files (`webarc lookup`)
//! - **Copying**: consolidating containers into one file (`webarc copy`)
//! - **Metadata bundles**: CDX lines stored as metadata records (`webarc bundle`)

pub mod api;
pub mod commands;
pub mod config;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, Result};

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use webarc_common::ArchiveFormat;

/// webarc - web archive batch processing and record retrieval
#[derive(Parser, Debug)]
#[command(name = "webarc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Archive node URL
    #[arg(
        long,
        env = "WEBARC_SERVER_URL",
        default_value = config::DEFAULT_SERVER_URL,
        global = true
    )]
    pub server_url: String,

    /// Print the command reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print CDX lines for ARC/WARC files
    Cdx {
        /// Container files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Append the MD5 of each record block
        #[arg(short, long)]
        checksum: bool,
    },

    /// Get or build the sorted index for a set of jobs and print its path
    Index {
        /// Job IDs
        #[arg(required = true)]
        job_ids: Vec<u64>,

        /// Storage directories (defaults to WEBARC_STORAGE_DIRS)
        #[arg(short, long)]
        storage: Vec<PathBuf>,

        /// Artifact directory (defaults to the user cache directory)
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Collect CDX records from metadata bundles instead of extracting
        #[arg(long)]
        embedded: bool,

        /// Download the index from the archive node at --server-url
        #[arg(long, conflicts_with_all = ["storage", "embedded"])]
        remote: bool,
    },

    /// Fetch one record by container name and offset
    Get {
        /// Container filename
        file: String,

        /// Offset of the record's first header byte
        offset: u64,

        /// Fetch over HTTP from this files URL (defaults to <server-url>/files)
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        remote: Option<String>,

        /// Storage directories (defaults to WEBARC_STORAGE_DIRS)
        #[arg(short, long, conflicts_with = "remote")]
        storage: Vec<PathBuf>,

        /// Print only the record header
        #[arg(long)]
        headers_only: bool,
    },

    /// Find CDX entries for an exact URL
    Lookup {
        /// URL to look up
        url: String,

        /// CDX files to search
        #[arg(required = true)]
        cdx_files: Vec<PathBuf>,

        /// Only entries whose container filename matches (repeatable)
        #[arg(short, long)]
        filter: Vec<String>,

        /// Print every entry instead of the first
        #[arg(short, long)]
        all: bool,
    },

    /// Copy the records of several containers into one
    Copy {
        /// Destination file; its extension picks the format
        dest: PathBuf,

        /// Source containers, same format as the destination
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Write gzip-per-record output
        #[arg(short, long)]
        compress: bool,
    },

    /// Store CDX lines as a metadata bundle
    Bundle {
        /// CDX file holding the lines
        cdx_file: PathBuf,

        /// Harvest job the lines belong to
        #[arg(short, long)]
        job_id: u64,

        /// Bundle version
        #[arg(short = 'V', long, default_value = "1")]
        version: u32,

        /// Bundle format
        #[arg(short, long, value_enum, default_value = "warc")]
        format: BundleFormat,

        /// Write gzip-per-record output
        #[arg(short, long)]
        compress: bool,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

/// Container dialect of a metadata bundle
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleFormat {
    Warc,
    Arc,
}

impl From<BundleFormat> for ArchiveFormat {
    fn from(format: BundleFormat) -> Self {
        match format {
            BundleFormat::Warc => ArchiveFormat::Warc,
            BundleFormat::Arc => ArchiveFormat::Arc,
        }
    }
}
