use std::collections::BTreeSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};

use thiserror::Error;
use tracing::{debug, warn};

use crate::intent::dialect::Dialect;
use crate::intent::intent_model::{ActionType, BddPhase, OwnedNode, TestIntent};

pub const HARD_SLEEP_CONFIDENCE: f32 = 0.6;

/// Result of one idiom pass: a new intent plus human-readable notes.
#[derive(Debug, Clone)]
pub struct IdiomOutcome {
    pub intent: TestIntent,
    pub notes: Vec<String>,
}

#[derive(Debug, Error)]
pub enum IdiomError {
    #[error("idiom '{idiom}' failed: {message}")]
    Failed { idiom: String, message: String },

    #[error("idiom '{idiom}' panicked: {message}")]
    Panicked { idiom: String, message: String },
}

pub type Matcher = Box<dyn Fn(&TestIntent) -> bool + Send + Sync>;
pub type Rewriter = Box<dyn Fn(&TestIntent) -> Result<IdiomOutcome, IdiomError> + Send + Sync>;

/// A registered higher-order rewrite over a whole intent.
pub struct IdiomPattern {
    pub name: String,

    /// Patterns sharing a family compete; the first registered match wins
    pub family: String,

    pub description: String,

    /// Source or target dialects this pattern is scoped to
    pub applies_to: BTreeSet<Dialect>,

    matcher: Matcher,
    rewriter: Rewriter,
}

impl IdiomPattern {
    pub fn new(
        name: &str,
        family: &str,
        description: &str,
        applies_to: impl IntoIterator<Item = Dialect>,
        matcher: impl Fn(&TestIntent) -> bool + Send + Sync + 'static,
        rewriter: impl Fn(&TestIntent) -> Result<IdiomOutcome, IdiomError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            family: family.to_string(),
            description: description.to_string(),
            applies_to: applies_to.into_iter().collect(),
            matcher: Box::new(matcher),
            rewriter: Box::new(rewriter),
        }
    }

    pub fn applies(&self, source: Dialect, target: Option<Dialect>) -> bool {
        self.applies_to.contains(&source) || target.is_some_and(|t| self.applies_to.contains(&t))
    }

    pub fn matches(&self, intent: &TestIntent) -> bool {
        catch_unwind(AssertUnwindSafe(|| (self.matcher)(intent))).unwrap_or(false)
    }

    /// Run the rewriter, converting a panic into an `IdiomError`.
    pub fn rewrite(&self, intent: &TestIntent) -> Result<IdiomOutcome, IdiomError> {
        match catch_unwind(AssertUnwindSafe(|| (self.rewriter)(intent))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(IdiomError::Panicked {
                    idiom: self.name.clone(),
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for IdiomPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdiomPattern")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("applies_to", &self.applies_to)
            .finish_non_exhaustive()
    }
}

/// Everything one full idiom pass produced.
#[derive(Debug, Clone)]
pub struct IdiomPass {
    pub intent: TestIntent,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub applied: Vec<String>,
}

/// Ordered list of idiom patterns. Populated at setup, read-only afterwards.
#[derive(Debug, Default)]
pub struct IdiomRegistry {
    patterns: Vec<IdiomPattern>,
}

impl IdiomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(drop_explicit_waits());
        registry.register(flag_hard_sleeps());
        registry.register(fold_clear_before_fill());
        registry.register(bdd_phases_to_aaa());
        registry
    }

    pub fn register(&mut self, pattern: IdiomPattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[IdiomPattern] {
        &self.patterns
    }

    /// Patterns that would run on `intent`, in registration order, at most
    /// one per family.
    pub fn applicable(&self, intent: &TestIntent, target: Option<Dialect>) -> Vec<&IdiomPattern> {
        let mut families = BTreeSet::new();
        let mut out = Vec::new();
        for pattern in &self.patterns {
            if families.contains(&pattern.family)
                || !pattern.applies(intent.source_dialect, target)
                || !pattern.matches(intent)
            {
                continue;
            }
            families.insert(pattern.family.clone());
            out.push(pattern);
        }
        out
    }

    /// Run every applicable pattern in order. Each one sees the output of
    /// the previous; a failing pattern is recorded and skipped.
    pub fn apply_all(&self, intent: &TestIntent, target: Option<Dialect>) -> IdiomPass {
        let mut current = intent.clone();
        let mut pass = IdiomPass {
            intent: intent.clone(),
            notes: Vec::new(),
            warnings: Vec::new(),
            applied: Vec::new(),
        };
        let mut families = BTreeSet::new();

        for pattern in &self.patterns {
            if families.contains(&pattern.family)
                || !pattern.applies(current.source_dialect, target)
                || !pattern.matches(&current)
            {
                continue;
            }
            families.insert(pattern.family.clone());

            match pattern.rewrite(&current) {
                Ok(outcome) => {
                    debug!(idiom = %pattern.name, test = %current.test_name, "idiom applied");
                    current = outcome.intent;
                    pass.notes.extend(outcome.notes);
                    pass.applied.push(pattern.name.clone());
                }
                Err(e) => {
                    warn!(idiom = %pattern.name, error = %e, "idiom skipped");
                    pass.warnings.push(e.to_string());
                }
            }
        }

        pass.intent = current;
        pass
    }
}

// ============================================================================
// Built-in idioms
// ============================================================================

/// Auto-waiting runners make explicit waits redundant.
pub fn drop_explicit_waits() -> IdiomPattern {
    IdiomPattern::new(
        "drop-explicit-waits",
        "waits",
        "Remove explicit wait steps; the target runner auto-waits for actionability",
        [Dialect::PlaywrightTs, Dialect::PlaywrightPython],
        |intent| {
            intent
                .steps
                .iter()
                .chain(intent.setup_steps.iter())
                .chain(intent.teardown_steps.iter())
                .any(|s| s.action_type == ActionType::Wait)
        },
        |intent| {
            let removed: Vec<usize> = intent
                .steps
                .iter()
                .chain(intent.setup_steps.iter())
                .chain(intent.teardown_steps.iter())
                .filter(|s| s.action_type == ActionType::Wait)
                .map(|s| s.source_line)
                .collect();

            let mut next = intent.retain_steps(|s| s.action_type != ActionType::Wait);
            next.setup_steps.retain(|s| s.action_type != ActionType::Wait);
            next.teardown_steps.retain(|s| s.action_type != ActionType::Wait);
            next.recompute_confidence();

            let lines = removed
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Ok(IdiomOutcome {
                intent: next,
                notes: vec![format!(
                    "'{}': removed {} explicit wait(s) (line {}); the target auto-waits for elements",
                    intent.test_name,
                    removed.len(),
                    lines
                )],
            })
        },
    )
}

/// Hard sleeps survive translation but are marked for review.
pub fn flag_hard_sleeps() -> IdiomPattern {
    IdiomPattern::new(
        "flag-hard-sleeps",
        "sleeps",
        "Keep fixed sleeps but lower their confidence so they are reviewed",
        [Dialect::PlaywrightTs, Dialect::PlaywrightPython],
        |intent| intent.steps.iter().any(is_unflagged_sleep),
        |intent| {
            let mut flagged = 0;
            let program = intent
                .program()
                .into_iter()
                .map(|(mut node, phase)| {
                    if let OwnedNode::Step(step) = &mut node {
                        if is_unflagged_sleep(step) {
                            step.semantic_tags.set("idiom", "hard_sleep");
                            step.confidence = step.confidence.min(HARD_SLEEP_CONFIDENCE);
                            flagged += 1;
                        }
                    }
                    (node, phase)
                })
                .collect();

            Ok(IdiomOutcome {
                intent: intent.with_program(program),
                notes: vec![format!(
                    "'{}': {} fixed sleep(s) kept; prefer waiting on a condition",
                    intent.test_name, flagged
                )],
            })
        },
    )
}

fn is_unflagged_sleep(step: &crate::intent::intent_model::ActionIntent) -> bool {
    step.action_type == ActionType::Sleep && step.semantic_tags.get("idiom") != Some("hard_sleep")
}

/// `fill` already clears the field in Playwright.
pub fn fold_clear_before_fill() -> IdiomPattern {
    IdiomPattern::new(
        "fold-clear-before-fill",
        "inputs",
        "Drop a clear step that directly precedes a fill of the same element",
        [Dialect::PlaywrightTs, Dialect::PlaywrightPython],
        |intent| !redundant_clears(intent).is_empty(),
        |intent| {
            let redundant = redundant_clears(intent);
            let program = intent
                .program()
                .into_iter()
                .enumerate()
                .filter(|(pos, _)| !redundant.contains(pos))
                .map(|(_, node)| node)
                .collect();

            Ok(IdiomOutcome {
                intent: intent.with_program(program),
                notes: vec![format!(
                    "'{}': folded {} clear step(s) into the following fill",
                    intent.test_name,
                    redundant.len()
                )],
            })
        },
    )
}

/// Program positions of clear steps immediately followed by a fill on the
/// same target.
fn redundant_clears(intent: &TestIntent) -> BTreeSet<usize> {
    let program = intent.program();
    program
        .windows(2)
        .enumerate()
        .filter_map(|(pos, pair)| match (&pair[0].0, &pair[1].0) {
            (OwnedNode::Step(a), OwnedNode::Step(b))
                if a.action_type == ActionType::Clear
                    && b.action_type == ActionType::Fill
                    && a.target.is_some()
                    && a.target == b.target =>
            {
                Some(pos)
            }
            _ => None,
        })
        .collect()
}

/// Given/When/Then become Arrange/Act/Assert sections.
pub fn bdd_phases_to_aaa() -> IdiomPattern {
    IdiomPattern::new(
        "bdd-phases-to-aaa",
        "structure",
        "Map Given/When/Then phases onto Arrange/Act/Assert sections",
        [Dialect::Gherkin],
        |intent| {
            intent.bdd_phases.is_some() && intent.program().iter().any(|(n, _)| !n.tags().has("aaa"))
        },
        |intent| {
            let mut section = "arrange";
            let program = intent
                .program()
                .into_iter()
                .map(|(mut node, phase)| {
                    section = match phase {
                        Some(BddPhase::Given) => "arrange",
                        Some(BddPhase::When) => "act",
                        Some(BddPhase::Then) => "assert",
                        Some(BddPhase::And) | None => section,
                    };
                    node.tags_mut().set("aaa", section);
                    (node, phase)
                })
                .collect();

            Ok(IdiomOutcome {
                intent: intent.with_program(program),
                notes: vec![format!(
                    "'{}': mapped Given/When/Then to Arrange/Act/Assert",
                    intent.test_name
                )],
            })
        },
    )
}
