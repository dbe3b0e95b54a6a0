//! Format transformations: structural input in, [`NormalizedRecord`] out.
//!
//! Each pipeline holds one typed [`Transformation`]. The defaults below
//! produce a generic data tree; callers with a domain model plug in their own
//! through [`PipelineSet`](crate::PipelineSet).
use bytes::Bytes;
use serde_json::{Map, Value};

use crate::classify::PipelineKind;
use crate::error::TransformError;
use crate::formats::{CsvTable, XmlDocument, XmlElement};
use crate::record::NormalizedRecord;

/// Converts a format's structural form into a normalized record.
///
/// Implementations must be stateless or internally synchronized; one
/// instance serves every concurrent request.
pub trait Transformation<I>: Send + Sync {
    fn transform(&self, input: I) -> Result<NormalizedRecord, TransformError>;
}

impl<I, F> Transformation<I> for F
where
    F: Fn(I) -> Result<NormalizedRecord, TransformError> + Send + Sync,
{
    fn transform(&self, input: I) -> Result<NormalizedRecord, TransformError> {
        self(input)
    }
}

/// One mapping per data row, keyed by header. Blank headers become
/// `column_<n>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvRecords;

impl Transformation<CsvTable> for CsvRecords {
    fn transform(&self, table: CsvTable) -> Result<NormalizedRecord, TransformError> {
        let keys: Vec<String> = table
            .headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                if header.is_empty() {
                    format!("column_{}", idx + 1)
                } else {
                    header.clone()
                }
            })
            .collect();

        let rows = table
            .rows
            .into_iter()
            .map(|row| {
                let mut object = Map::with_capacity(keys.len());
                for (key, cell) in keys.iter().zip(row) {
                    object.insert(key.clone(), Value::String(cell));
                }
                Value::Object(object)
            })
            .collect();

        Ok(NormalizedRecord::new(PipelineKind::Csv, Value::Array(rows)))
    }
}

/// Element tree to nested mappings, keyed by the root element name.
///
/// Attributes become `@name` keys, mixed text becomes `$text`, repeated child
/// names become sequences and text-only elements collapse to strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlTree;

impl Transformation<XmlDocument> for XmlTree {
    fn transform(&self, doc: XmlDocument) -> Result<NormalizedRecord, TransformError> {
        let mut data = Map::new();
        data.insert(doc.root.name.clone(), element_to_value(&doc.root));
        Ok(NormalizedRecord::new(PipelineKind::Xml, Value::Object(data)))
    }
}

fn element_to_value(element: &XmlElement) -> Value {
    let text = element.text();
    if element.attributes.is_empty() && element.elements().next().is_none() {
        return Value::String(text);
    }

    let mut object = Map::new();
    for (key, value) in &element.attributes {
        object.insert(format!("@{key}"), Value::String(value.clone()));
    }
    for child in element.elements() {
        let value = element_to_value(child);
        match object.get_mut(&child.name) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                object.insert(child.name.clone(), value);
            }
        }
    }
    if !text.is_empty() {
        object.insert("$text".into(), Value::String(text));
    }
    Value::Object(object)
}

/// Parses the raw JSON body as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDocument;

impl Transformation<Bytes> for JsonDocument {
    fn transform(&self, body: Bytes) -> Result<NormalizedRecord, TransformError> {
        let value: Value = serde_json::from_slice(&body)
            .map_err(|e| TransformError::InvalidJson(e.to_string()))?;
        Ok(NormalizedRecord::new(PipelineKind::Json, value))
    }
}
