use thiserror::Error;

use crate::intent::intent_model::TestIntent;

/// Rewritten target text plus how much to move the confidence.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineResult {
    pub text: String,
    pub confidence_delta: f32,
}

#[derive(Debug, Error)]
pub enum RefinerError {
    #[error("refiner request failed: {0}")]
    Transport(String),

    #[error("refiner returned an unusable response: {0}")]
    BadResponse(String),

    #[error("refiner declined: {0}")]
    Declined(String),
}

/// Optional post-generation rewriter. Output is untrusted: the pipeline
/// re-validates it and drops it when it introduces defects.
pub trait Refiner: Send + Sync {
    fn refine(&self, target_text: &str, intents: &[TestIntent], budget: u32) -> Result<RefineResult, RefinerError>;
}
