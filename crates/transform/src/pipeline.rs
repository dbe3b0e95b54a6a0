//! Per-content-type pipelines: deserialize, transform, encode.
//!
//! ```text
//! csv  : body ─ parse_csv ──▶ CsvTable    ─ Transformation<CsvTable>    ─┐
//! xml  : body ─ parse_xml ──▶ XmlDocument ─ Transformation<XmlDocument> ─┼─▶ NormalizedRecord ─ Encoder ─▶ Bytes
//! json : body ─ (as-is) ───▶ Bytes       ─ Transformation<Bytes>       ─┘
//! ```
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bytes::Bytes;

use crate::classify::PipelineKind;
use crate::encode::{Encoder, YamlEncoder};
use crate::error::{ConversionError, ParseError};
use crate::formats::{self, CsvTable, XmlDocument};
use crate::record::NormalizedRecord;
use crate::transformation::{CsvRecords, JsonDocument, Transformation, XmlTree};

/// What the dispatch executor sees of a pipeline.
pub trait FormatPipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Deserialize (where the format has a structural step) and transform.
    fn parse(&self, body: Bytes) -> Result<NormalizedRecord, ConversionError>;

    /// Canonical text form of a record.
    fn encode(&self, record: &NormalizedRecord) -> Result<Bytes, ConversionError>;

    fn run(&self, body: Bytes) -> Result<Bytes, ConversionError> {
        let record = self.parse(body)?;
        self.encode(&record)
    }
}

/// A pipeline whose structural intermediate is `I`.
pub struct Pipeline<I> {
    kind: PipelineKind,
    deserialize: fn(&Bytes) -> Result<I, ParseError>,
    transformation: Arc<dyn Transformation<I>>,
    encoder: Arc<dyn Encoder>,
}

pub type CsvPipeline = Pipeline<CsvTable>;
pub type XmlPipeline = Pipeline<XmlDocument>;
pub type JsonPipeline = Pipeline<Bytes>;

impl Pipeline<CsvTable> {
    pub fn csv(transformation: Arc<dyn Transformation<CsvTable>>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            kind: PipelineKind::Csv,
            deserialize: formats::parse_csv,
            transformation,
            encoder,
        }
    }
}

impl Pipeline<XmlDocument> {
    pub fn xml(
        transformation: Arc<dyn Transformation<XmlDocument>>,
        encoder: Arc<dyn Encoder>,
    ) -> Self {
        Self {
            kind: PipelineKind::Xml,
            deserialize: formats::parse_xml,
            transformation,
            encoder,
        }
    }
}

impl Pipeline<Bytes> {
    pub fn json(transformation: Arc<dyn Transformation<Bytes>>, encoder: Arc<dyn Encoder>) -> Self {
        Self {
            kind: PipelineKind::Json,
            deserialize: formats::pass_through,
            transformation,
            encoder,
        }
    }
}

impl<I> FormatPipeline for Pipeline<I> {
    fn kind(&self) -> PipelineKind {
        self.kind
    }

    fn parse(&self, body: Bytes) -> Result<NormalizedRecord, ConversionError> {
        let input = (self.deserialize)(&body)?;
        Ok(self.transformation.transform(input)?)
    }

    fn encode(&self, record: &NormalizedRecord) -> Result<Bytes, ConversionError> {
        Ok(self.encoder.encode(record)?)
    }
}

/// The fixed set of pipelines, one per supported [`PipelineKind`], sharing a
/// single encoder.
///
/// ```rust
/// use bytes::Bytes;
/// use transform::{classify, PipelineSet};
///
/// let pipelines = PipelineSet::default();
/// let csv = pipelines.select(classify("text/csv")).unwrap();
/// let yaml = transform::run_guarded(csv, Bytes::from_static(b"id\n1\n")).unwrap();
/// assert!(std::str::from_utf8(&yaml).unwrap().contains("id: '1'"));
///
/// assert!(pipelines.select(classify("image/png")).is_none());
/// ```
#[derive(Clone)]
pub struct PipelineSet {
    csv: Arc<CsvPipeline>,
    xml: Arc<XmlPipeline>,
    json: Arc<JsonPipeline>,
    encoder: Arc<dyn Encoder>,
}

impl PipelineSet {
    /// Default transformations for every kind, sharing `encoder`.
    pub fn new(encoder: Arc<dyn Encoder>) -> Self {
        Self {
            csv: Arc::new(Pipeline::csv(Arc::new(CsvRecords), encoder.clone())),
            xml: Arc::new(Pipeline::xml(Arc::new(XmlTree), encoder.clone())),
            json: Arc::new(Pipeline::json(Arc::new(JsonDocument), encoder.clone())),
            encoder,
        }
    }

    pub fn with_csv_transformation(mut self, transformation: Arc<dyn Transformation<CsvTable>>) -> Self {
        self.csv = Arc::new(Pipeline::csv(transformation, self.encoder.clone()));
        self
    }

    pub fn with_xml_transformation(
        mut self,
        transformation: Arc<dyn Transformation<XmlDocument>>,
    ) -> Self {
        self.xml = Arc::new(Pipeline::xml(transformation, self.encoder.clone()));
        self
    }

    pub fn with_json_transformation(mut self, transformation: Arc<dyn Transformation<Bytes>>) -> Self {
        self.json = Arc::new(Pipeline::json(transformation, self.encoder.clone()));
        self
    }

    /// The pipeline for `kind`; `None` for [`PipelineKind::Unsupported`].
    pub fn select(&self, kind: PipelineKind) -> Option<&dyn FormatPipeline> {
        match kind {
            PipelineKind::Csv => Some(self.csv.as_ref()),
            PipelineKind::Xml => Some(self.xml.as_ref()),
            PipelineKind::Json => Some(self.json.as_ref()),
            PipelineKind::Unsupported => None,
        }
    }

    pub fn encoder(&self) -> &Arc<dyn Encoder> {
        &self.encoder
    }
}

impl Default for PipelineSet {
    fn default() -> Self {
        Self::new(Arc::new(YamlEncoder))
    }
}

/// Runs a pipeline and turns a panic anywhere inside it into
/// [`ConversionError::Panicked`].
pub fn run_guarded(pipeline: &dyn FormatPipeline, body: Bytes) -> Result<Bytes, ConversionError> {
    match panic::catch_unwind(AssertUnwindSafe(|| pipeline.run(body))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(pipeline = %pipeline.kind(), panic = %message, "pipeline_panicked");
            Err(ConversionError::Panicked(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
