//! Record filters deciding which records a job sees

use regex::Regex;

use crate::record::RecordHeader;

/// Pure predicate over record headers
pub trait RecordFilter: Send + Sync {
    fn accept(&self, header: &RecordHeader) -> bool;

    fn name(&self) -> &str;
}

/// Accepts every record
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFilter;

impl RecordFilter for NoFilter {
    fn accept(&self, _header: &RecordHeader) -> bool {
        true
    }

    fn name(&self) -> &str {
        "no-filter"
    }
}

/// Rejects ARC `filedesc` and WARC `warcinfo` records
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeFileHeaders;

impl RecordFilter for ExcludeFileHeaders {
    fn accept(&self, header: &RecordHeader) -> bool {
        !header.is_file_header()
    }

    fn name(&self) -> &str {
        "exclude-file-headers"
    }
}

/// Keeps WARC `response` records only
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlyResponses;

impl RecordFilter for OnlyResponses {
    fn accept(&self, header: &RecordHeader) -> bool {
        header.format == webarc_common::ArchiveFormat::Warc
            && header.kind == crate::record::RecordKind::Response
    }

    fn name(&self) -> &str {
        "only-responses"
    }
}

fn is_http_url(header: &RecordHeader) -> bool {
    header
        .url
        .as_deref()
        .map(|url| {
            let lower = url.to_ascii_lowercase();
            lower.starts_with("http:") || lower.starts_with("https:")
        })
        .unwrap_or(false)
}

/// Rejects captures of `http:` and `https:` URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcludeHttpEntries;

impl RecordFilter for ExcludeHttpEntries {
    fn accept(&self, header: &RecordHeader) -> bool {
        !is_http_url(header)
    }

    fn name(&self) -> &str {
        "exclude-http-entries"
    }
}

/// Keeps captures of `http:` and `https:` URLs only
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlyHttpEntries;

impl RecordFilter for OnlyHttpEntries {
    fn accept(&self, header: &RecordHeader) -> bool {
        is_http_url(header)
    }

    fn name(&self) -> &str {
        "only-http-entries"
    }
}

/// Keeps records whose declared mimetype matches a pattern in full
#[derive(Debug, Clone)]
pub struct MimetypeFilter {
    pattern: Regex,
    name: String,
}

impl MimetypeFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(&format!("^(?:{})$", pattern))?,
            name: format!("mimetype:{}", pattern),
        })
    }
}

impl RecordFilter for MimetypeFilter {
    fn accept(&self, header: &RecordHeader) -> bool {
        header
            .mimetype
            .as_deref()
            .map(|m| self.pattern.is_match(m.trim()))
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Accepts a record only when every member filter does
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn RecordFilter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, filter: impl RecordFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl RecordFilter for FilterChain {
    fn accept(&self, header: &RecordHeader) -> bool {
        self.filters.iter().all(|f| f.accept(header))
    }

    fn name(&self) -> &str {
        "filter-chain"
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}
