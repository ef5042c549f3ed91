//! ARC header lines
//!
//! Each ARC record starts with one space-separated line:
//!
//! - version 1: `URL IP-address Archive-date Content-type Archive-length`
//! - version 2: `URL IP-address Archive-date Content-type Result-code Checksum Location Offset Filename Archive-length`
//!
//! The first record of a file is the `filedesc://` record describing it.

use webarc_common::ArchiveFormat;

use super::{RecordHeader, RecordKind};

pub const FILEDESC_SCHEME: &str = "filedesc:";

/// Field list written in the version-1 file header block
pub const V1_FIELD_NAMES: &str = "URL IP-address Archive-date Content-type Archive-length";

/// Parse one ARC header line (without the trailing newline)
pub fn parse_header_line(line: &str, offset: u64) -> Result<RecordHeader, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let fields: Vec<&str> = line.split(' ').filter(|f| !f.is_empty()).collect();

    // Version 2 lines have ten fields; anything else past five is a URL
    // containing spaces.
    let (url, ip, date, mime, length) = match fields.len() {
        n if n < 5 => {
            return Err(format!("expected at least 5 fields, found {}: '{}'", n, line));
        },
        10 => (
            fields[0].to_string(),
            fields[1],
            fields[2],
            fields[3],
            fields[9],
        ),
        n => (
            fields[..n - 4].join(" "),
            fields[n - 4],
            fields[n - 3],
            fields[n - 2],
            fields[n - 1],
        ),
    };

    let length: u64 = length
        .parse()
        .map_err(|_| format!("invalid length field '{}'", length))?;

    if !date.chars().all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid date field '{}'", date));
    }

    let kind = if url.starts_with(FILEDESC_SCHEME) {
        RecordKind::FileHeader
    } else if url.starts_with("http:") || url.starts_with("https:") {
        RecordKind::Response
    } else {
        RecordKind::Resource
    };

    Ok(RecordHeader {
        format: ArchiveFormat::Arc,
        kind,
        url: Some(url),
        ip: Some(ip.to_string()),
        date: Some(date.to_string()),
        mimetype: Some(mime.to_string()),
        length,
        content_begin: 0,
        offset,
        fields: Vec::new(),
        http: None,
    })
}

/// Cheap check used when scanning for the next record after corruption
pub fn looks_like_header_line(line: &str) -> bool {
    let candidate = line.trim_end_matches(['\r', '\n']);
    let first = candidate.split(' ').next().unwrap_or_default();
    first.contains(':') && parse_header_line(candidate, 0).is_ok()
}

/// Render a version-1 header line
pub fn format_header_line(url: &str, ip: &str, date14: &str, mime: &str, length: u64) -> String {
    format!("{} {} {} {} {}\n", url, ip, date14, mime, length)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_v1_line() {
        let header =
            parse_header_line("http://example.org/ 10.0.0.1 20050101120000 text/html 1234\n", 77)
                .unwrap();
        assert_eq!(header.url.as_deref(), Some("http://example.org/"));
        assert_eq!(header.ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(header.date.as_deref(), Some("20050101120000"));
        assert_eq!(header.mimetype.as_deref(), Some("text/html"));
        assert_eq!(header.length, 1234);
        assert_eq!(header.offset, 77);
        assert_eq!(header.kind, RecordKind::Response);
    }

    #[test]
    fn test_parse_filedesc_and_v2() {
        let header =
            parse_header_line("filedesc://1-1-2005.arc 0.0.0.0 20050101120000 text/plain 76", 0)
                .unwrap();
        assert!(header.is_file_header());

        let v2 = "dns:example.org 10.0.0.1 20050101120000 text/dns 200 - - 0 a.arc 56";
        let header = parse_header_line(v2, 0).unwrap();
        assert_eq!(header.length, 56);
        assert_eq!(header.kind, RecordKind::Resource);
    }

    #[test]
    fn test_url_with_spaces_is_folded() {
        let header =
            parse_header_line("http://example.org/a b.html 10.0.0.1 20050101120000 text/html 5", 0)
                .unwrap();
        assert_eq!(header.url.as_deref(), Some("http://example.org/a b.html"));
        assert_eq!(header.length, 5);
    }

    #[test]
    fn test_rejects_bad_lines() {
        assert!(parse_header_line("garbage", 0).is_err());
        assert!(parse_header_line("http://x 1.1.1.1 2005 text/html abc", 0).is_err());
        assert!(parse_header_line("http://x 1.1.1.1 20o5 text/html 12", 0).is_err());
        assert!(!looks_like_header_line("<html><body>hello there you all</body>"));
        assert!(looks_like_header_line("http://x 1.1.1.1 2005 text/html 12"));
    }
}
