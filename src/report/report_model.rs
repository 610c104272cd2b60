use serde::Serialize;

use crate::pipeline::result::TranslationResult;

// ============================================================================
// Translation report: aggregates per-file TranslationResults
// ============================================================================

/// One source file and what happened to it.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source_path: String,

    /// Where the output went, or would have gone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    pub written: bool,

    /// Why a successful translation was not written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,

    pub result: TranslationResult,
}

/// Aggregated report for one CLI run.
///
/// Built from a `Vec<FileReport>` via `from_files()`. Consumed by the
/// console reporter and serialized as the `--json` report.
#[derive(Debug, Clone, Serialize)]
pub struct TranslationReport {
    pub target_dialect: String,

    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub written: usize,

    /// Sum of TODO entries across files
    pub todos: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub files: Vec<FileReport>,
}

impl TranslationReport {
    pub fn from_files(target_dialect: &str, files: Vec<FileReport>) -> Self {
        let total = files.len();
        let succeeded = files.iter().filter(|f| f.result.success).count();
        Self {
            target_dialect: target_dialect.to_string(),
            total,
            succeeded,
            failed: total - succeeded,
            written: files.iter().filter(|f| f.written).count(),
            todos: files.iter().map(|f| f.result.todos.len()).sum(),
            duration_ms: None,
            files,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}
