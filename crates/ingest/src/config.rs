//! Configuration types for the ingest boundary.
//!
//! [`IngestConfig`] controls how a raw upload (file name, declared content
//! type, body) is sanitized and constrained before it becomes an
//! [`IngestRequest`](crate::IngestRequest). It is cheap to clone and
//! deserializes from the `ingest` section of the pipeline YAML file.
//!
//! # Quick Start
//!
//! ```rust
//! use ingest::IngestConfig;
//!
//! let config = IngestConfig::default();
//! config.validate().expect("default config is valid");
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime configuration for the ingest boundary.
///
/// # Serialization
///
/// ```yaml
/// version: 1
/// strip_control_chars: true
/// max_payload_bytes: 10485760
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Version of the ingest configuration. `0` is reserved and rejected by
    /// [`IngestConfig::validate`].
    ///
    /// Default: `1`
    pub version: u32,

    /// Whether to strip ASCII control characters from the file name before
    /// validation. The declared content type is never rewritten.
    ///
    /// The file name ends up in log lines, message headers and archive paths,
    /// so this should stay enabled.
    ///
    /// Default: `true`
    pub strip_control_chars: bool,

    /// Maximum body size in bytes. Larger bodies are rejected with
    /// [`IngestError::PayloadTooLarge`](crate::IngestError::PayloadTooLarge)
    /// before any conversion runs.
    ///
    /// Default: `None` (unlimited)
    pub max_payload_bytes: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            version: 1,
            strip_control_chars: true,
            max_payload_bytes: None,
        }
    }
}

impl IngestConfig {
    /// Validates internal consistency of this configuration.
    ///
    /// Call once at start-up so misconfiguration fails fast instead of on the
    /// first upload.
    ///
    /// ```rust
    /// use ingest::{ConfigError, IngestConfig};
    ///
    /// let bad = IngestConfig { max_payload_bytes: Some(0), ..Default::default() };
    /// assert_eq!(bad.validate(), Err(ConfigError::ZeroPayloadLimit));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version == 0 {
            return Err(ConfigError::InvalidVersion(self.version));
        }
        if self.max_payload_bytes == Some(0) {
            return Err(ConfigError::ZeroPayloadLimit);
        }
        Ok(())
    }
}

/// Errors returned by [`IngestConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("ingest config version must be >= 1, got {0}")]
    InvalidVersion(u32),
    #[error("max_payload_bytes must be greater than zero when set")]
    ZeroPayloadLimit,
}
