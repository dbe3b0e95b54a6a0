use serde::Serialize;
use serde_json::Value;

use crate::classify::PipelineKind;

/// Output of a format transformation.
///
/// The dispatch executor never looks inside; it only hands the record to the
/// shared [`Encoder`](crate::Encoder).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    format: PipelineKind,
    data: Value,
}

impl NormalizedRecord {
    pub fn new(format: PipelineKind, data: Value) -> Self {
        Self { format, data }
    }

    pub fn format(&self) -> PipelineKind {
        self.format
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}
