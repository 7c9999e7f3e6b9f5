//! Byte-range source abstraction.
//!
//! A [`BlockSource`] exposes the two capabilities the engine needs: discover
//! the total size of a logical file, and stream an inclusive byte range of
//! it. Two variants exist — a seekable local file and a remote HTTP
//! resource fetched with `Range` requests. Core logic is source-agnostic.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors surfaced by size discovery and range reads.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The total size of the source cannot be determined.
    #[error("cannot determine size of {source_id}: {reason}")]
    SizeUnknown { source_id: String, reason: String },

    /// A range request was answered with an unacceptable HTTP status.
    #[error("range request to {url} failed with HTTP {status}: {body}")]
    RangeStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// An HTTP request could not be issued or completed.
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// A local read failed.
    #[error("failed to read {source_id}: {source}")]
    Io {
        source_id: String,
        source: std::io::Error,
    },
}

/// Capability interface for reading byte ranges of a logical file.
pub trait BlockSource: Send + Sync {
    /// Path or URL identifying this source in records and errors.
    fn identifier(&self) -> &str;

    /// Total size of the source in bytes.
    fn resolve_size(&self) -> SourceResult<u64>;

    /// Stream the inclusive byte range `[start, end]`.
    fn read_range(&self, start: u64, end: u64) -> SourceResult<Box<dyn Read>>;
}

/// Local file source, read via seek.
pub struct LocalSource {
    path: PathBuf,
    identifier: String,
}

impl LocalSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path.display().to_string();
        Self { path, identifier }
    }

    fn io_error(&self, source: std::io::Error) -> SourceError {
        SourceError::Io {
            source_id: self.identifier.clone(),
            source,
        }
    }
}

impl BlockSource for LocalSource {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn resolve_size(&self) -> SourceResult<u64> {
        std::fs::metadata(&self.path)
            .map(|m| m.len())
            .map_err(|e| self.io_error(e))
    }

    fn read_range(&self, start: u64, end: u64) -> SourceResult<Box<dyn Read>> {
        let mut file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        file.seek(SeekFrom::Start(start))
            .map_err(|e| self.io_error(e))?;
        Ok(Box::new(file.take(end - start + 1)))
    }
}

/// Remote HTTP source, read via `Range` requests.
pub struct HttpSource {
    client: Client,
    url: String,
}

impl HttpSource {
    /// Create a source for `url` with the default timeout.
    pub fn new(url: impl Into<String>) -> SourceResult<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a source for `url` with a custom request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> SourceResult<Self> {
        let url = url.into();
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Request {
                url: url.clone(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self { client, url })
    }
}

impl BlockSource for HttpSource {
    fn identifier(&self) -> &str {
        &self.url
    }

    /// Issue a HEAD request and read `Content-Length`.
    fn resolve_size(&self) -> SourceResult<u64> {
        let size_unknown = |reason: String| SourceError::SizeUnknown {
            source_id: self.url.clone(),
            reason,
        };

        let response = self
            .client
            .head(&self.url)
            .send()
            .map_err(|e| size_unknown(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(size_unknown(format!("HEAD returned HTTP {}", status)));
        }

        response
            .headers()
            .get(reqwest::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| size_unknown("Content-Length header missing or invalid".to_string()))
    }

    /// Issue a GET with `Range: bytes=start-end`, accepting 200 or 206.
    fn read_range(&self, start: u64, end: u64) -> SourceResult<Box<dyn Read>> {
        let response = self
            .client
            .get(&self.url)
            .header(reqwest::header::RANGE, format!("bytes={}-{}", start, end))
            .send()
            .map_err(|e| SourceError::Request {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 && status != 206 {
            let body = response.text().unwrap_or_default();
            return Err(SourceError::RangeStatus {
                url: self.url.clone(),
                status,
                body,
            });
        }

        Ok(Box::new(response))
    }
}


#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::mock::MockSource;
    use super::*;

    #[test]
    fn test_local_source_resolve_size() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        File::create(&path).unwrap().write_all(&[0u8; 123]).unwrap();

        let source = LocalSource::new(&path);
        assert_eq!(source.resolve_size().unwrap(), 123);
    }

    #[test]
    fn test_local_source_missing_file() {
        let source = LocalSource::new("/nonexistent/data.bin");

        let err = source.resolve_size().unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/data.bin"));
    }

    #[test]
    fn test_local_source_read_range() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        let data: Vec<u8> = (0..100u8).collect();
        File::create(&path).unwrap().write_all(&data).unwrap();

        let source = LocalSource::new(&path);
        let mut reader = source.read_range(10, 19).unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).unwrap();

        assert_eq!(buf, &data[10..20]);
    }

    #[test]
    fn test_mock_source_range_failure() {
        let source = MockSource::new(vec![0u8; 100]).failing_from(50);

        assert!(source.read_range(0, 49).is_ok());

        let err = source.read_range(50, 99).err().unwrap();
        match err {
            SourceError::RangeStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected RangeStatus, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_source_size_unknown() {
        let source = MockSource::new(vec![0u8; 100]).without_size();

        let err = source.resolve_size().unwrap_err();
        assert!(matches!(err, SourceError::SizeUnknown { .. }));
        assert!(err.to_string().contains("Content-Length"));
    }
}
