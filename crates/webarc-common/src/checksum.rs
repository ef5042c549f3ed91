//! MD5 checksum utilities
//!
//! CDX lines carry an MD5 of the record payload, and index cache names embed
//! an MD5 of the job-ID list. Both go through these helpers.

use crate::error::{Result, WebarcError};
use std::io::Read;
use std::path::Path;

const BUFFER_SIZE: usize = 8192;

/// Hex MD5 digest of an in-memory buffer
pub fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}

/// Compute the MD5 of any readable source, consuming it to EOF
pub fn compute_md5<R: Read>(reader: &mut R) -> Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = [0u8; BUFFER_SIZE];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", context.compute()))
}

/// Compute the MD5 of a file
pub fn md5_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    compute_md5(&mut file)
}

/// Verify the MD5 of a file
pub fn verify_md5_file(path: impl AsRef<Path>, expected: &str) -> Result<bool> {
    let actual = md5_file(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(true)
    } else {
        Err(WebarcError::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Reader adapter that hashes every byte passing through it
pub struct Md5Reader<R> {
    inner: R,
    context: md5::Context,
    bytes: u64,
}

impl<R: Read> Md5Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            context: md5::Context::new(),
            bytes: 0,
        }
    }

    /// Number of bytes hashed so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes
    }

    /// Drain the rest of the stream and return the hex digest
    pub fn finish(mut self) -> std::io::Result<String> {
        std::io::copy(&mut self, &mut std::io::sink())?;
        Ok(format!("{:x}", self.context.compute()))
    }
}

impl<R: Read> Read for Md5Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.context.consume(&buf[..n]);
        self.bytes += n as u64;
        Ok(n)
    }
}
