//! Filegate Ingest Layer
//!
//! This is where uploads enter filegate. The transport hands us a file name,
//! a declared content type and a body; we sanitize the file name, enforce the
//! boundary policy and return an immutable [`IngestRequest`] that the
//! dispatch pipeline owns for the rest of its life.
//!
//! ## What we do here
//!
//! - **Sanitize** - strip control characters and whitespace from the file
//!   name, which ends up in logs, headers and file paths. The content type is
//!   kept byte for byte; classification compares it verbatim.
//! - **Guard paths** - reject file names that are empty or would escape the
//!   archive directory.
//! - **Enforce limits** - reject oversized bodies before conversion.
//! - **Log** - structured `tracing` events for accepted and rejected uploads.
//!
//! What we deliberately don't do: look at the body or the content type
//! value. Unsupported types and unparseable bodies are routing decisions made
//! downstream.
//!
//! ## Example
//!
//! ```
//! use bytes::Bytes;
//! use ingest::{accept, IngestConfig};
//!
//! let request = accept(
//!     "orders.csv",
//!     "text/csv",
//!     Bytes::from_static(b"id,qty\n1,2\n"),
//!     &IngestConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(request.content_type(), "text/csv");
//! ```
use std::time::Instant;

use bytes::Bytes;
use tracing::{debug, warn};

mod config;
mod error;
mod sanitize;
mod types;

pub use crate::config::{ConfigError, IngestConfig};
pub use crate::error::IngestError;
pub use crate::types::IngestRequest;

/// Builds an [`IngestRequest`] and logs the result.
///
/// Thin wrapper over [`IngestRequest::new`] used by transports.
pub fn accept(
    file_name: &str,
    content_type: &str,
    body: Bytes,
    cfg: &IngestConfig,
) -> Result<IngestRequest, IngestError> {
    let start = Instant::now();
    let body_len = body.len();
    match IngestRequest::new(file_name, content_type, body, cfg) {
        Ok(request) => {
            debug!(
                request_id = %request.id(),
                file_name = %request.file_name(),
                content_type = ?request.content_type(),
                body_len,
                elapsed_micros = start.elapsed().as_micros(),
                "ingest_accepted"
            );
            Ok(request)
        }
        Err(err) => {
            warn!(
                file_name = ?file_name,
                content_type = ?content_type,
                body_len,
                error = %err,
                elapsed_micros = start.elapsed().as_micros(),
                "ingest_rejected"
            );
            Err(err)
        }
    }
}
