use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intent::intent_model::TestIntent;
use crate::pipeline::refiner::{RefineResult, Refiner, RefinerError};

// ============================================================================
// Ollama Backend
// ============================================================================

pub const DEFAULT_OLLAMA_ENDPOINT: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_OLLAMA_MODEL: &str = "qwen2.5-coder:1.5b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Confidence bump for a refinement the validator accepted.
const REFINE_DELTA: f32 = 0.05;

/// Asks a local Ollama model to tidy generated code.
pub struct OllamaRefiner {
    pub endpoint: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for OllamaRefiner {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_OLLAMA_ENDPOINT.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

impl OllamaRefiner {
    pub fn new(endpoint: &str, model: &str, timeout_secs: u64) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    fn build_prompt(&self, target_text: &str, intents: &[TestIntent]) -> String {
        let tests = intents
            .iter()
            .map(|i| format!("  - {} ({} steps, {} assertions)", i.test_name, i.steps.len(), i.assertions.len()))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
r#"You are reviewing machine-translated test code. Improve naming and readability only.

RULES:
- Keep every step and assertion; do not add new behavior.
- Keep every TODO(testshift) comment.
- Respond with ONLY the complete file, no explanation and no markdown fences.

TESTS:
{}

CODE:
{}"#,
            if tests.is_empty() { "  (none)".to_string() } else { tests },
            target_text
        )
    }
}

impl Refiner for OllamaRefiner {
    fn refine(&self, target_text: &str, intents: &[TestIntent], budget: u32) -> Result<RefineResult, RefinerError> {
        let request = OllamaRequest {
            model: &self.model,
            prompt: self.build_prompt(target_text, intents),
            stream: false,
            options: (budget > 0).then_some(OllamaOptions { num_predict: budget }),
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RefinerError::Transport(e.to_string()))?;
        let response = client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| RefinerError::Transport(e.to_string()))?;

        let body: OllamaResponse = response
            .json()
            .map_err(|e| RefinerError::BadResponse(e.to_string()))?;
        let text = strip_fences(&body.response);
        if text.trim().is_empty() {
            return Err(RefinerError::BadResponse("empty completion".to_string()));
        }
        debug!(model = %self.model, bytes = text.len(), "refiner responded");

        Ok(RefineResult {
            text,
            confidence_delta: REFINE_DELTA,
        })
    }
}

/// Drop a surrounding ``` fence if the model added one anyway.
fn strip_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return ensure_newline(trimmed);
    };
    let body = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
    ensure_newline(body.trim_end().trim_end_matches("```").trim_end())
}

fn ensure_newline(s: &str) -> String {
    let mut out = s.to_string();
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ============================================================================
// Mock Backend (for testing without Ollama)
// ============================================================================

/// Canned refiner: returns a fixed result or a fixed failure.
pub enum MockRefiner {
    /// Hands the input back unchanged with this delta
    Echo(f32),
    /// Replaces the input with this text
    Replace { text: String, delta: f32 },
    Fail(String),
    Panic,
}

impl Refiner for MockRefiner {
    fn refine(&self, target_text: &str, _intents: &[TestIntent], _budget: u32) -> Result<RefineResult, RefinerError> {
        match self {
            MockRefiner::Echo(delta) => Ok(RefineResult {
                text: target_text.to_string(),
                confidence_delta: *delta,
            }),
            MockRefiner::Replace { text, delta } => Ok(RefineResult {
                text: text.clone(),
                confidence_delta: *delta,
            }),
            MockRefiner::Fail(reason) => Err(RefinerError::Declined(reason.clone())),
            MockRefiner::Panic => panic!("mock refiner panic"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fences() {
        assert_eq!(strip_fences("```python\nx = 1\n```"), "x = 1\n");
        assert_eq!(strip_fences("x = 1"), "x = 1\n");
    }
}
