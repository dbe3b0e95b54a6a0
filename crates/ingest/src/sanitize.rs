//! String sanitization for request fields that flow into logs, message
//! headers and archive paths.
use crate::error::IngestError;

/// Strips control characters (when enabled) and trims surrounding whitespace.
pub(crate) fn sanitize_string(raw: &str, strip_control: bool) -> String {
    let filtered = if strip_control {
        raw.chars().filter(|c| !c.is_control()).collect::<String>()
    } else {
        raw.to_string()
    };
    let trimmed = filtered.trim();
    if trimmed.len() == filtered.len() {
        filtered
    } else {
        trimmed.to_string()
    }
}

/// Sanitizes a file name and rejects values that cannot safely be used as a
/// single path component under the archive directory.
///
/// Names without an extension separator are accepted.
pub(crate) fn sanitize_file_name(raw: &str, strip_control: bool) -> Result<String, IngestError> {
    let name = sanitize_string(raw, strip_control);
    if name.is_empty() {
        return Err(IngestError::InvalidFileName("file name is empty".into()));
    }
    if name == "." || name == ".." {
        return Err(IngestError::InvalidFileName(format!(
            "'{name}' is not a file name"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(IngestError::InvalidFileName(format!(
            "'{name}' contains a path separator"
        )));
    }
    Ok(name)
}
