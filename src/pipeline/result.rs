use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::TranslationError;

/// Outcome of one `translate` call, assembled once at the end of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub success: bool,
    /// Empty when `success` is false
    pub target_code: String,
    pub confidence: f32,
    pub warnings: Vec<String>,
    pub todos: Vec<String>,
    pub statistics: BTreeMap<String, serde_json::Value>,
    pub errors: Vec<TranslationError>,
}

impl TranslationResult {
    pub(crate) fn failed(error: TranslationError, warnings: Vec<String>) -> Self {
        Self {
            success: false,
            target_code: String::new(),
            confidence: 0.0,
            warnings,
            todos: Vec::new(),
            statistics: BTreeMap::new(),
            errors: vec![error],
        }
    }

    /// Number of generated tests, 0 when absent.
    pub fn test_count(&self) -> u64 {
        self.stat_u64("tests")
    }

    pub fn stat_u64(&self, key: &str) -> u64 {
        self.statistics.get(key).and_then(serde_json::Value::as_u64).unwrap_or(0)
    }
}
