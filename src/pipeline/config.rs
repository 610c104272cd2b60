use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::validate::ValidationLevel;

/// How a caller treats `todos` and `warnings`. The pipeline itself runs
/// the same way in every mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// A human reviews every output
    #[default]
    Assistive,
    /// Outputs with TODOs are not written
    Automated,
    /// Many files, summary only
    Batch,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "assistive" => Ok(Mode::Assistive),
            "automated" => Ok(Mode::Automated),
            "batch" => Ok(Mode::Batch),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Options for one `translate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub validation_level: ValidationLevel,

    /// Emitted nodes below this get a TODO marker
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f32,

    #[serde(default)]
    pub use_refiner: bool,

    /// Passed through to the refiner untouched
    #[serde(default)]
    pub refiner_budget: u32,

    /// Prefix the output with a dialect/confidence comment
    #[serde(default)]
    pub emit_header: bool,

    #[serde(default = "default_true")]
    pub apply_idioms: bool,
}

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            validation_level: ValidationLevel::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            use_refiner: false,
            refiner_budget: 0,
            emit_header: false,
            apply_idioms: true,
        }
    }
}

impl TranslationConfig {
    pub fn strict() -> Self {
        Self {
            validation_level: ValidationLevel::Strict,
            ..Self::default()
        }
    }
}

fn default_threshold() -> f32 { DEFAULT_CONFIDENCE_THRESHOLD }
fn default_true() -> bool { true }
