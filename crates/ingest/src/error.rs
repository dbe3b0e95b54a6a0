//! Error types produced by the ingest boundary.
//!
//! All errors are typed, cloneable and comparable so callers can map them to
//! transport responses and assert on them in tests.
//!
//! | Error | Description | HTTP |
//! |-------|-------------|------|
//! | [`InvalidFileName`](IngestError::InvalidFileName) | Empty or path-like file name | 400 |
//! | [`PayloadTooLarge`](IngestError::PayloadTooLarge) | Body over `max_payload_bytes` | 413 |
use thiserror::Error;

/// Errors that reject an upload before it reaches the dispatch pipeline.
///
/// An empty body or a body that cannot be converted is *not* an ingest error:
/// those requests are accepted and end up on the dead-letter route.
///
/// ```rust
/// use ingest::IngestError;
///
/// let err = IngestError::InvalidFileName("file name is empty".to_string());
/// assert_eq!(err.to_string(), "invalid file name: file name is empty");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IngestError {
    /// The file name is empty after sanitization, or would escape the archive
    /// directory (`/`, `\`, `.` or `..`).
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// The body exceeds [`IngestConfig::max_payload_bytes`](crate::IngestConfig::max_payload_bytes).
    #[error("payload exceeds size limit: {0}")]
    PayloadTooLarge(String),
}

impl IngestError {
    /// Returns a suggested HTTP status code for this error.
    ///
    /// ```rust
    /// use ingest::IngestError;
    ///
    /// assert_eq!(IngestError::PayloadTooLarge("big".into()).http_status_code(), 413);
    /// assert_eq!(IngestError::InvalidFileName("".into()).http_status_code(), 400);
    /// ```
    pub fn http_status_code(&self) -> u16 {
        match self {
            IngestError::PayloadTooLarge(_) => 413,
            IngestError::InvalidFileName(_) => 400,
        }
    }
}
