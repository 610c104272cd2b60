//! Translates automated tests between frameworks through a neutral intent
//! model: parsers lift source tests into `TestIntent`s, idioms rewrite them,
//! generators lower them into the target dialect, and every uncertain
//! step is flagged for review.

pub mod cli;
pub mod error;
pub mod generator;
pub mod intent;
pub mod parser;
pub mod pipeline;
pub mod refine;
pub mod registry;
pub mod report;
pub mod trace;
pub mod validate;

pub use error::TranslationError;
pub use intent::{Dialect, TestIntent, TestKind};
pub use pipeline::{Mode, TranslationConfig, TranslationResult, Translator};
pub use validate::{ValidationLevel, Validator};

/// Translate with the built-in parsers, generators, mappings and idioms.
///
/// `source_dialect` may be `"auto"`. Every expected failure is reported in
/// the returned result, never as a panic.
pub fn translate(
    source_text: &str,
    source_dialect: &str,
    target_dialect: &str,
    config: &TranslationConfig,
) -> TranslationResult {
    Translator::with_defaults().translate(source_text, source_dialect, target_dialect, config)
}
