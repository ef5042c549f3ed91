//! `webarc get` command implementation
//!
//! Fetches one record by container name and offset, from local storage or
//! from an archive node over an HTTP range request.

use crate::config::Config;
use crate::error::{CliError, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use webarc_engine::config::RemoteConfig;
use webarc_engine::retrieval::{LocalRetriever, RecordRetriever, RemoteRetriever};
use webarc_engine::{LocalArchive, RecordHeader};

pub struct GetArgs {
    pub file: String,
    pub offset: u64,
    pub remote: Option<String>,
    pub storage: Vec<PathBuf>,
    pub headers_only: bool,
}

/// Fetch a record and print it
pub async fn run(config: &Config, args: GetArgs) -> Result<()> {
    let result = match &args.remote {
        Some(url) => {
            let base = if url.is_empty() {
                config.files_url()
            } else {
                url.clone()
            };
            let remote = RemoteRetriever::new(base, &RemoteConfig::default())
                .map_err(|e| CliError::config(e.to_string()))?;
            remote.try_get(&args.file, args.offset).await
        },
        None => {
            let local = LocalRetriever::new(LocalArchive::new(config.storage_dirs_or(&args.storage)));
            local.try_get(&args.file, args.offset).await
        },
    };

    let record = result.map_err(|e| CliError::RecordNotFound {
        file: args.file.clone(),
        offset: args.offset,
        reason: e.to_string(),
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.headers_only {
        out.write_all(render_header(&record.header).as_bytes())?;
    } else {
        out.write_all(&record.block)?;
    }
    out.flush()?;
    Ok(())
}

/// One `name: value` line per header field, known fields first
pub fn render_header(header: &RecordHeader) -> String {
    let mut lines = vec![
        format!("format: {}", header.format),
        format!("type: {}", header.kind.as_warc_type()),
    ];
    let optional = [
        ("url", &header.url),
        ("ip", &header.ip),
        ("date", &header.date),
        ("mimetype", &header.mimetype),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            lines.push(format!("{}: {}", name, value));
        }
    }
    lines.push(format!("length: {}", header.length));
    lines.push(format!("offset: {}", header.offset));
    if let Some(http) = &header.http {
        lines.push(format!("http-status: {}", http.status));
    }
    for (name, value) in &header.fields {
        lines.push(format!("{}: {}", name, value));
    }

    let mut text = lines.join("\n");
    text.push('\n');
    text
}
