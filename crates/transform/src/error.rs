//! Error types for the conversion stages.
//!
//! Each stage has its own error; [`ConversionError`] is the single typed value
//! the dispatch executor matches on to build a failure outcome.
//!
//! | Stage | Error |
//! |-------|-------|
//! | deserialize body (CSV rows, XML tree) | [`ParseError`] |
//! | format transformation | [`TransformError`] |
//! | canonical encoding | [`EncodeError`] |
//! | any panic in the above | [`ConversionError::Panicked`] |
use thiserror::Error;

use crate::classify::PipelineKind;

/// The body could not be deserialized into the format's structural form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{format} body is empty")]
    Empty { format: PipelineKind },
    #[error("malformed {format} body: {message}")]
    Malformed {
        format: PipelineKind,
        message: String,
    },
}

impl ParseError {
    pub(crate) fn malformed(format: PipelineKind, err: impl std::fmt::Display) -> Self {
        ParseError::Malformed {
            format,
            message: err.to_string(),
        }
    }
}

/// A transformation rejected its input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("body is not valid json: {0}")]
    InvalidJson(String),
    #[error("{0}")]
    Rejected(String),
}

/// The normalized record could not be rendered to canonical text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("yaml encoding failed: {0}")]
    Yaml(String),
}

/// Any failure while a pipeline runs. Every variant leads to the same
/// dead-letter route; the variant only feeds logs and the trace artifact.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("transform failed: {0}")]
    Transform(#[from] TransformError),
    #[error("encode failed: {0}")]
    Encode(#[from] EncodeError),
    #[error("conversion panicked: {0}")]
    Panicked(String),
}

impl ConversionError {
    /// Short name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            ConversionError::Parse(_) => "parse",
            ConversionError::Transform(_) => "transform",
            ConversionError::Encode(_) => "encode",
            ConversionError::Panicked(_) => "panic",
        }
    }
}
