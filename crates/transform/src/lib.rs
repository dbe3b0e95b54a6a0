//! Filegate Transform Layer
//!
//! Classifies an upload by its declared content type and converts the body to
//! one canonical YAML form.
//!
//! ```text
//! content type ── classify ──▶ PipelineKind ── PipelineSet::select ──▶ &dyn FormatPipeline
//!                                                                        │
//!                         body ── deserialize ─ Transformation ─ Encoder ┘──▶ Bytes (YAML)
//! ```
//!
//! ## Pipelines
//!
//! | Content type | Kind | Deserialize | Default transformation |
//! |--------------|------|-------------|------------------------|
//! | `text/csv` | [`PipelineKind::Csv`] | [`parse_csv`] | [`CsvRecords`] |
//! | `application/xml` | [`PipelineKind::Xml`] | [`parse_xml`] | [`XmlTree`] |
//! | `application/json` | [`PipelineKind::Json`] | none | [`JsonDocument`] |
//!
//! Anything else classifies as [`PipelineKind::Unsupported`] and has no
//! pipeline.
//!
//! All three pipelines share one [`Encoder`] ([`YamlEncoder`] by default), so
//! equal records encode to equal bytes whatever format they came from.
//!
//! ## Failures
//!
//! Every stage returns its own error type, and [`run_guarded`] also catches
//! panics, so the caller always gets a single [`ConversionError`] back instead
//! of an unwinding task.
//!
//! ```rust
//! use bytes::Bytes;
//! use transform::{classify, run_guarded, ConversionError, PipelineSet};
//!
//! let pipelines = PipelineSet::default();
//! let xml = pipelines.select(classify("application/xml")).unwrap();
//! let err = run_guarded(xml, Bytes::from_static(b"<open>")).unwrap_err();
//! assert!(matches!(err, ConversionError::Parse(_)));
//! ```

mod classify;
mod encode;
mod error;
pub mod formats;
mod pipeline;
mod record;
mod transformation;

pub use crate::classify::{
    classify, PipelineKind, CSV_CONTENT_TYPE, JSON_CONTENT_TYPE, XML_CONTENT_TYPE,
};
pub use crate::encode::{Encoder, YamlEncoder};
pub use crate::error::{ConversionError, EncodeError, ParseError, TransformError};
pub use crate::formats::{parse_csv, parse_xml, CsvTable, XmlDocument, XmlElement, XmlNode};
pub use crate::pipeline::{
    run_guarded, CsvPipeline, FormatPipeline, JsonPipeline, Pipeline, PipelineSet, XmlPipeline,
};
pub use crate::record::NormalizedRecord;
pub use crate::transformation::{CsvRecords, JsonDocument, Transformation, XmlTree};
