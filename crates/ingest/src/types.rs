//! Core data model for inbound uploads.
//!
//! ```text
//! transport (path + headers + body)
//!        │  IngestRequest::new(.., &IngestConfig)
//!        ▼
//! IngestRequest
//! ├── id: String            (request id, generated or supplied)
//! ├── file_name: String     (sanitized, single path component)
//! ├── content_type: String  (as declared, compared verbatim downstream)
//! ├── body: Bytes           (untouched)
//! └── received_at: DateTime<Utc>
//! ```
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::IngestConfig;
use crate::error::IngestError;
use crate::sanitize::sanitize_file_name;

/// An accepted upload, immutable once built.
///
/// Construct through [`IngestRequest::new`], which applies the boundary
/// policy from [`IngestConfig`]. The body is never inspected here; whether it
/// can be converted is decided by the dispatch pipeline.
///
/// ```rust
/// use bytes::Bytes;
/// use ingest::{IngestConfig, IngestRequest};
///
/// let request = IngestRequest::new(
///     "orders.csv",
///     "text/csv",
///     Bytes::from_static(b"id,qty\n1,2\n"),
///     &IngestConfig::default(),
/// )
/// .unwrap();
///
/// assert_eq!(request.file_name(), "orders.csv");
/// assert_eq!(request.extension(), Some("csv"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRequest {
    id: String,
    file_name: String,
    content_type: String,
    #[serde(skip)]
    body: Bytes,
    received_at: DateTime<Utc>,
}

impl IngestRequest {
    /// Validates and builds a request with a freshly generated id.
    pub fn new(
        file_name: &str,
        content_type: &str,
        body: Bytes,
        cfg: &IngestConfig,
    ) -> Result<Self, IngestError> {
        let file_name = sanitize_file_name(file_name, cfg.strip_control_chars)?;

        if let Some(limit) = cfg.max_payload_bytes {
            if body.len() > limit {
                return Err(IngestError::PayloadTooLarge(format!(
                    "body size {} exceeds limit of {limit}",
                    body.len()
                )));
            }
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name,
            content_type: content_type.to_string(),
            body,
            received_at: Utc::now(),
        })
    }

    /// Replaces the generated id, e.g. with the transport's request id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !id.trim().is_empty() {
            self.id = id;
        }
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Cheap clone of the body (reference counted).
    pub fn body(&self) -> Bytes {
        self.body.clone()
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    /// Text after the final `.` of the file name, if there is one.
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty())
    }
}
