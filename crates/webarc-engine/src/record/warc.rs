//! WARC header blocks
//!
//! A WARC record is a version line (`WARC/1.0`), named fields, a blank
//! line, `Content-Length` bytes of block and a `\r\n\r\n` terminator.

use webarc_common::ArchiveFormat;

use super::{RecordHeader, RecordKind};

pub const VERSION: &str = "WARC/1.0";
pub const TYPE: &str = "WARC-Type";
pub const RECORD_ID: &str = "WARC-Record-ID";
pub const DATE: &str = "WARC-Date";
pub const TARGET_URI: &str = "WARC-Target-URI";
pub const IP_ADDRESS: &str = "WARC-IP-Address";
pub const FILENAME: &str = "WARC-Filename";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_LENGTH: &str = "Content-Length";

/// Fields recomputed by the writer and therefore never copied as extras
pub const RECOMPUTED_FIELDS: [&str; 7] = [
    "content-type",
    "reader-identifier",
    "absolute-offset",
    "content-length",
    "warc-record-id",
    "warc-type",
    "warc-target-uri",
];

const CANONICAL_NAMES: [&str; 19] = [
    "WARC-Type",
    "WARC-Record-ID",
    "WARC-Date",
    "Content-Length",
    "Content-Type",
    "WARC-Concurrent-To",
    "WARC-Block-Digest",
    "WARC-Payload-Digest",
    "WARC-IP-Address",
    "WARC-Refers-To",
    "WARC-Target-URI",
    "WARC-Truncated",
    "WARC-Warcinfo-ID",
    "WARC-Filename",
    "WARC-Profile",
    "WARC-Identified-Payload-Type",
    "WARC-Segment-Origin-ID",
    "WARC-Segment-Number",
    "WARC-Segment-Total-Length",
];

/// Restore the standard casing of a known WARC field name
pub fn canonical_name(name: &str) -> String {
    CANONICAL_NAMES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(name))
        .map(|known| known.to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn is_recomputed(name: &str) -> bool {
    RECOMPUTED_FIELDS
        .iter()
        .any(|field| field.eq_ignore_ascii_case(name))
}

pub fn is_version_line(line: &str) -> bool {
    line.starts_with("WARC/")
}

fn strip_angle(value: &str) -> &str {
    value
        .strip_prefix('<')
        .and_then(|v| v.strip_suffix('>'))
        .unwrap_or(value)
}

/// Parse the named-field lines that follow the version line
pub fn parse_fields(lines: &[String], offset: u64) -> Result<RecordHeader, String> {
    let mut fields: Vec<(String, String)> = Vec::with_capacity(lines.len());

    for line in lines {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.starts_with([' ', '\t']) {
            match fields.last_mut() {
                Some((_, value)) => {
                    value.push(' ');
                    value.push_str(line.trim());
                },
                None => return Err("continuation line before any field".to_string()),
            }
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("malformed field line '{}'", line))?;
        fields.push((name.trim().to_string(), value.trim().to_string()));
    }

    let lookup = |name: &str| {
        fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };

    let kind = lookup(TYPE)
        .map(|t| RecordKind::from_warc_type(&t))
        .ok_or_else(|| format!("missing {} field", TYPE))?;
    let length: u64 = lookup(CONTENT_LENGTH)
        .ok_or_else(|| format!("missing {} field", CONTENT_LENGTH))?
        .parse()
        .map_err(|_| format!("invalid {} field", CONTENT_LENGTH))?;
    let url = lookup(TARGET_URI).map(|u| strip_angle(&u).to_string());

    Ok(RecordHeader {
        format: ArchiveFormat::Warc,
        kind,
        url,
        ip: lookup(IP_ADDRESS),
        date: lookup(DATE),
        mimetype: lookup(CONTENT_TYPE),
        length,
        content_begin: 0,
        offset,
        fields,
        http: None,
    })
}

/// Whether the block of a record is an HTTP message worth parsing
pub fn block_is_http_response(header: &RecordHeader) -> bool {
    matches!(header.kind, RecordKind::Response | RecordKind::Revisit)
        && header
            .mimetype
            .as_deref()
            .map(|m| m.to_lowercase().starts_with("application/http"))
            .unwrap_or(false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|l| format!("{}\r\n", l)).collect()
    }

    #[test]
    fn test_parse_fields() {
        let header = parse_fields(
            &lines(&[
                "WARC-Type: response",
                "WARC-Target-URI: <http://example.org/>",
                "WARC-Date: 2024-01-02T03:04:05Z",
                "WARC-IP-Address: 10.0.0.1",
                "Content-Type: application/http; msgtype=response",
                "Content-Length: 42",
            ]),
            512,
        )
        .unwrap();

        assert_eq!(header.kind, RecordKind::Response);
        assert_eq!(header.url.as_deref(), Some("http://example.org/"));
        assert_eq!(header.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(header.length, 42);
        assert_eq!(header.offset, 512);
        assert!(block_is_http_response(&header));
    }

    #[test]
    fn test_parse_fields_errors() {
        assert!(parse_fields(&lines(&["Content-Length: 1"]), 0).is_err());
        assert!(parse_fields(&lines(&["WARC-Type: resource", "Content-Length: x"]), 0).is_err());
        assert!(parse_fields(&lines(&["WARC-Type: resource", "no colon here"]), 0).is_err());
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_name("warc-block-digest"), "WARC-Block-Digest");
        assert_eq!(canonical_name("x-custom"), "x-custom");
        assert!(is_recomputed("Content-Length"));
        assert!(is_recomputed("WARC-Record-ID"));
        assert!(!is_recomputed("WARC-Date"));
    }
}
