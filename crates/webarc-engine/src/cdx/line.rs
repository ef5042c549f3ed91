//! CDX lines
//!
//! Field order is `A e b m n g v [c]`: URL, IP, 14-digit date, mimetype,
//! declared length, container filename, record offset and optionally the
//! MD5 of the record block. Absent values are written as `-`.

use serde::{Deserialize, Serialize};
use std::fmt;
use webarc_common::{RecordLocator, WebarcError};

use crate::record::RecordHeader;

pub const ABSENT: &str = "-";

/// Which fields a rendered line carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdxFields {
    #[default]
    Standard,
    WithChecksum,
}

impl CdxFields {
    /// Legend written in CDX file headers
    pub fn legend(&self) -> &'static str {
        match self {
            CdxFields::Standard => "A e b m n g v",
            CdxFields::WithChecksum => "A e b m n g v c",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CdxLine {
    pub url: String,
    pub ip: Option<String>,
    pub date: Option<String>,
    pub mimetype: Option<String>,
    pub length: u64,
    pub filename: String,
    pub offset: u64,
    pub checksum: Option<String>,
}

fn present(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != ABSENT).then(|| value.to_string())
}

/// Mimetype without parameters or embedded whitespace
fn clean_mimetype(mime: &str) -> Option<String> {
    let bare = mime.split(';').next().unwrap_or_default();
    let bare: String = bare.chars().filter(|c| !c.is_whitespace()).collect();
    present(&bare)
}

impl CdxLine {
    /// Line for one record read from `filename`
    pub fn from_header(header: &RecordHeader, filename: &str) -> Self {
        Self {
            url: header.url.clone().unwrap_or_default(),
            ip: header.ip.as_deref().and_then(present),
            date: header.timestamp14(),
            mimetype: header.content_mimetype().and_then(clean_mimetype),
            length: header.length,
            filename: filename.to_string(),
            offset: header.offset,
            checksum: None,
        }
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn locator(&self) -> RecordLocator {
        RecordLocator::new(self.filename.clone(), self.offset)
    }

    /// Parse a 7- or 8-field line
    pub fn parse(line: &str) -> Result<Self, WebarcError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 7 && fields.len() != 8 {
            return Err(WebarcError::Parse(format!(
                "CDX line has {} fields, expected 7 or 8",
                fields.len()
            )));
        }
        let number = |value: &str, what: &str| {
            value
                .parse::<u64>()
                .map_err(|_| WebarcError::Parse(format!("invalid CDX {} '{}'", what, value)))
        };

        Ok(Self {
            url: fields[0].replace("%20", " "),
            ip: present(fields[1]),
            date: present(fields[2]),
            mimetype: present(fields[3]),
            length: number(fields[4], "length")?,
            filename: fields[5].to_string(),
            offset: number(fields[6], "offset")?,
            checksum: fields.get(7).and_then(|c| present(c)),
        })
    }

    /// Render with the given field set, without the newline
    pub fn render(&self, fields: CdxFields) -> String {
        let opt = |value: &Option<String>| value.clone().unwrap_or_else(|| ABSENT.to_string());
        let url = if self.url.is_empty() {
            ABSENT.to_string()
        } else {
            self.url.replace(' ', "%20")
        };

        let mut parts = vec![
            url,
            opt(&self.ip),
            opt(&self.date),
            opt(&self.mimetype),
            self.length.to_string(),
            self.filename.clone(),
            self.offset.to_string(),
        ];
        if fields == CdxFields::WithChecksum {
            parts.push(opt(&self.checksum));
        }
        parts.join(" ")
    }
}

impl fmt::Display for CdxLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = if self.checksum.is_some() {
            CdxFields::WithChecksum
        } else {
            CdxFields::Standard
        };
        f.write_str(&self.render(fields))
    }
}
