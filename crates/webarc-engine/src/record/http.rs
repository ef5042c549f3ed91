//! Embedded HTTP response headers
//!
//! Captures of HTTP responses store the raw status line and header block at
//! the start of the record payload. The byte length of that block is the
//! record's content-begin offset.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Upper bound on the header block we are willing to buffer
pub const MAX_HTTP_HEADER_BYTES: usize = 64 * 1024;

#[allow(clippy::expect_used)]
static STATUS_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^HTTP/1\.[01] (\d+)(?: (.*))?$").expect("valid regex"));

/// Status line plus header fields of an embedded HTTP response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponseHeader {
    pub status: u16,
    pub reason: String,
    pub fields: Vec<(String, String)>,
    /// Length of the raw header block including the blank line
    pub raw_length: u64,
}

impl HttpResponseHeader {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Parse `HTTP/1.x <code> <reason>`
pub fn parse_status_line(line: &str) -> Option<(u16, String)> {
    let caps = STATUS_LINE.captures(line.trim_end_matches(['\r', '\n']))?;
    let status = caps.get(1)?.as_str().parse().ok()?;
    let reason = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
    Some((status, reason))
}

/// Parse a complete raw header block (status line through blank line)
pub fn parse_header_block(raw: &[u8]) -> Option<HttpResponseHeader> {
    let text = String::from_utf8_lossy(raw);
    let mut lines = text.split('\n');
    let (status, reason) = parse_status_line(lines.next()?)?;

    let mut fields: Vec<(String, String)> = Vec::new();
    for line in lines {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        // Servers send all sorts of junk; keep what parses.
        if let Some((name, value)) = line.split_once(':') {
            fields.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    Some(HttpResponseHeader {
        status,
        reason,
        fields,
        raw_length: raw.len() as u64,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_line() {
        assert_eq!(parse_status_line("HTTP/1.1 200 OK\r\n"), Some((200, "OK".to_string())));
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found"), Some((404, "Not Found".to_string())));
        assert_eq!(parse_status_line("HTTP/1.1 204"), Some((204, String::new())));
        assert_eq!(parse_status_line("HTTP/2 200 OK"), None);
        assert_eq!(parse_status_line("<html>"), None);
    }

    #[test]
    fn test_parse_header_block() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nX-Folded: a\r\n b\r\nbroken line\r\n\r\n";
        let header = parse_header_block(raw).unwrap();
        assert_eq!(header.status, 200);
        assert_eq!(header.field("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(header.field("X-Folded"), Some("a b"));
        assert_eq!(header.fields.len(), 2);
        assert_eq!(header.raw_length, raw.len() as u64);
    }
}
