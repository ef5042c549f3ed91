//! webarc CLI - Main entry point

use clap::Parser;
use std::process;
use tracing::error;
use webarc_cli::commands::{bundle, cdx, copy, get, index, lookup};
use webarc_cli::config::Config;
use webarc_cli::{Cli, Commands};
use webarc_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    // Verbose mode logs debug to the console; otherwise only warnings
    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        })
        .output(LogOutput::Console)
        .log_file_prefix("webarc-cli".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    let result = match Config::from_env() {
        Ok(mut config) => {
            config.server_url = cli.server_url.clone();
            execute_command(&config, command).await
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(config: &Config, command: Commands) -> webarc_cli::Result<()> {
    match command {
        Commands::Cdx { files, checksum } => cdx::run(files, checksum).await,

        Commands::Index {
            job_ids,
            storage,
            cache_dir,
            embedded,
            remote,
        } => {
            index::run(
                config,
                index::IndexArgs {
                    job_ids,
                    storage,
                    cache_dir,
                    embedded,
                    remote,
                },
            )
            .await
        },

        Commands::Get {
            file,
            offset,
            remote,
            storage,
            headers_only,
        } => {
            get::run(
                config,
                get::GetArgs {
                    file,
                    offset,
                    remote,
                    storage,
                    headers_only,
                },
            )
            .await
        },

        Commands::Lookup {
            url,
            cdx_files,
            filter,
            all,
        } => {
            lookup::run(lookup::LookupArgs {
                url,
                cdx_files,
                filter,
                all,
            })
            .await
        },

        Commands::Copy {
            dest,
            sources,
            compress,
        } => {
            copy::run(copy::CopyArgs {
                dest,
                sources,
                compress,
            })
            .await
        },

        Commands::Bundle {
            cdx_file,
            job_id,
            version,
            format,
            compress,
            output_dir,
        } => {
            bundle::run(
                config,
                bundle::BundleArgs {
                    cdx_file,
                    job_id,
                    version,
                    format,
                    compress,
                    output_dir,
                },
            )
            .await
        },
    }
}
