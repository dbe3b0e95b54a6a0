use bytes::Bytes;

use crate::classify::PipelineKind;
use crate::error::ParseError;

/// A CSV body split into its header row and data rows.
///
/// Every row has exactly as many cells as the header; ragged input is a
/// parse error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Deserializes a CSV body. The first record is the header row; cells are
/// trimmed.
pub fn parse_csv(body: &Bytes) -> Result<CsvTable, ParseError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ParseError::Empty {
            format: PipelineKind::Csv,
        });
    }

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(::csv::Trim::All)
        .from_reader(body.as_ref());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::malformed(PipelineKind::Csv, e))?
        .iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ParseError::malformed(PipelineKind::Csv, e))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(CsvTable { headers, rows })
}
