//! Build automation tasks for webarc
//!
//! - Generating the CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for webarc", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<webarc_cli::Cli>();

    let content = format!(
        r#"# webarc CLI Reference

This documentation is generated from the CLI source code. Last updated: {}.

## Overview

`webarc` extracts CDX indexes from ARC/WARC containers, builds cached index
artifacts per set of harvest jobs, and fetches single records by container
name and offset, either from local storage or from an archive node.

## Quick Start

```bash
# Index two containers, with payload checksums
webarc cdx --checksum 42-1-20240101.warc.gz 42-2-20240101.warc.gz > 42.cdx

# Build (or reuse) the sorted index for jobs 42 and 43
webarc index 42 43 --storage /srv/archive

# Find a URL and fetch the record it points at
webarc lookup http://example.org/ 42.cdx
webarc get 42-1-20240101.warc.gz 1234 --storage /srv/archive

# Same record from an archive node
webarc get 42-1-20240101.warc.gz 1234 --remote --server-url http://node:8070

# Store the index next to the harvest as a metadata bundle
webarc bundle 42.cdx --job-id 42 --compress --output-dir /srv/archive
```

## Commands

{}

## Environment Variables

- `WEBARC_SERVER_URL` - Archive node URL (default: `http://localhost:8070`)
- `WEBARC_STORAGE_DIRS` - Comma-separated local storage directories (default: `./archive`)
- `WEBARC_CACHE_DIR` - Index artifact directory (default: the user cache directory)
- `WEBARC_ORGANIZATION` - Organization named in metadata record URIs
- `WEBARC_API_TIMEOUT_SECS` - Timeout for archive node API calls
- `WEBARC_LOG_LEVEL` - Logging level (`trace`, `debug`, `info`, `warn`, `error`)

---

*To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("✅ Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
