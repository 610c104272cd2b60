use serde::Serialize;
use thiserror::Error;

use crate::parser::ParseError;
use crate::validate::Defect;

/// Everything a translation run can report. Fatal variants end up in
/// `TranslationResult::errors`, the rest are rendered into `warnings`.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TranslationError {
    /// Source text did not parse as the selected dialect
    #[error("parse error: {0}")]
    Parse(ParseError),

    /// Detection found no parser, or more than one, for the input
    #[error("cannot determine source dialect (requested {requested}, candidates: [{}])", candidates.join(", "))]
    AmbiguousOrUnsupportedSource {
        requested: String,
        candidates: Vec<String>,
    },

    /// No usable generator for the requested target
    #[error("unsupported target '{requested}': {reason}")]
    UnsupportedTarget { requested: String, reason: String },

    /// Generated code failed strict validation
    #[error("generated code failed validation with {} defect(s)", defects.len())]
    ValidationFailure { defects: Vec<Defect> },

    /// Refinement was requested but produced nothing usable
    #[error("refiner unavailable: {reason}")]
    RefinerUnavailable { reason: String },
}

impl TranslationError {
    /// Whether this error ends the run with `success = false`.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TranslationError::RefinerUnavailable { .. })
    }
}

impl From<ParseError> for TranslationError {
    fn from(e: ParseError) -> Self {
        TranslationError::Parse(e)
    }
}
