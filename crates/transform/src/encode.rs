use bytes::Bytes;

use crate::error::EncodeError;
use crate::record::NormalizedRecord;

/// Renders a normalized record to its canonical text form.
///
/// One encoder instance is shared by every pipeline and every request, so
/// implementations must be stateless (or internally synchronized).
pub trait Encoder: Send + Sync {
    fn encode(&self, record: &NormalizedRecord) -> Result<Bytes, EncodeError>;

    /// File extension of the encoded form, without the dot.
    fn extension(&self) -> &'static str;

    fn media_type(&self) -> &'static str;
}

/// Canonical YAML encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlEncoder;

impl Encoder for YamlEncoder {
    fn encode(&self, record: &NormalizedRecord) -> Result<Bytes, EncodeError> {
        serde_yaml::to_string(record)
            .map(Bytes::from)
            .map_err(|e| EncodeError::Yaml(e.to_string()))
    }

    fn extension(&self) -> &'static str {
        "yaml"
    }

    fn media_type(&self) -> &'static str {
        "application/yaml"
    }
}
