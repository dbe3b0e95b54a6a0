//! Content-type classification.
use std::fmt;

use serde::{Deserialize, Serialize};

pub const CSV_CONTENT_TYPE: &str = "text/csv";
pub const XML_CONTENT_TYPE: &str = "application/xml";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Which conversion pipeline handles a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Csv,
    Xml,
    Json,
    /// No pipeline matches the declared content type.
    Unsupported,
}

impl PipelineKind {
    /// The three kinds that have a pipeline.
    pub const SUPPORTED: [PipelineKind; 3] = [PipelineKind::Csv, PipelineKind::Xml, PipelineKind::Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Csv => "csv",
            PipelineKind::Xml => "xml",
            PipelineKind::Json => "json",
            PipelineKind::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, PipelineKind::Unsupported)
    }

    /// The content type that selects this kind.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            PipelineKind::Csv => Some(CSV_CONTENT_TYPE),
            PipelineKind::Xml => Some(XML_CONTENT_TYPE),
            PipelineKind::Json => Some(JSON_CONTENT_TYPE),
            PipelineKind::Unsupported => None,
        }
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a declared content type to a pipeline.
///
/// Total and pure. The comparison is exact and case-sensitive: parameters
/// such as `; charset=utf-8` or a different case fall through to
/// [`PipelineKind::Unsupported`].
///
/// ```rust
/// use transform::{classify, PipelineKind};
///
/// assert_eq!(classify("text/csv"), PipelineKind::Csv);
/// assert_eq!(classify("Text/CSV"), PipelineKind::Unsupported);
/// ```
pub fn classify(content_type: &str) -> PipelineKind {
    match content_type {
        CSV_CONTENT_TYPE => PipelineKind::Csv,
        XML_CONTENT_TYPE => PipelineKind::Xml,
        JSON_CONTENT_TYPE => PipelineKind::Json,
        _ => PipelineKind::Unsupported,
    }
}
