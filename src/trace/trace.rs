use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::intent::normalize::text_fingerprint;
use crate::pipeline::result::TranslationResult;

/// One JSONL record per translated file.
#[derive(Debug, Serialize)]
pub struct TranslationTraceEvent {
    pub timestamp_ms: u128,
    pub file: String,

    pub source_dialect: Option<String>,
    pub target_dialect: String,

    /// SHA-1 of the source text, so reruns on unchanged input can be matched
    pub source_sha1: String,

    pub success: bool,
    pub confidence: f32,

    pub tests: u64,
    pub todos: usize,
    pub warnings: usize,
    pub errors: Vec<String>,
}

impl TranslationTraceEvent {
    pub fn now(file: &str, source_text: &str, target_dialect: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or(0),
            file: file.to_string(),
            source_dialect: None,
            target_dialect: target_dialect.to_string(),
            source_sha1: text_fingerprint(source_text),
            success: false,
            confidence: 0.0,
            tests: 0,
            todos: 0,
            warnings: 0,
            errors: vec![],
        }
    }

    pub fn with_result(mut self, result: &TranslationResult) -> Self {
        self.source_dialect = result
            .statistics
            .get("source_dialect")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        self.success = result.success;
        self.confidence = result.confidence;
        self.tests = result.test_count();
        self.todos = result.todos.len();
        self.warnings = result.warnings.len();
        self.errors = result.errors.iter().map(|e| e.to_string()).collect();
        self
    }
}
