use std::sync::LazyLock;

use regex_lite::Regex;

use crate::intent::intent_model::{Locator, LocatorStrategy, OwnedNode, TestIntent};

static CSS_PLAIN_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([A-Za-z][\w-]*)$").expect("css id regex"));
static CSS_NAME_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\[name\s*=\s*['"]?([^'"\]]+)['"]?\]$"#).expect("css name regex")
});
static XPATH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^//\*\[@id\s*=\s*['"]([^'"]+)['"]\]$"#).expect("xpath id regex")
});

/// Deterministic canonicalization of an intent. Never changes what a test
/// does, only how its locators and scores are spelled.
pub fn normalize_intent(intent: &TestIntent) -> TestIntent {
    let program = intent
        .program()
        .into_iter()
        .map(|(mut node, phase)| {
            match &mut node {
                OwnedNode::Step(step) => {
                    step.target = step.target.take().map(normalize_locator);
                    step.confidence = clamp_confidence(step.confidence);
                    step.raw = step.raw.trim().to_string();
                }
                OwnedNode::Assertion(assertion) => {
                    assertion.target = assertion.target.take().map(normalize_locator);
                    assertion.confidence = clamp_confidence(assertion.confidence);
                    assertion.raw = assertion.raw.trim().to_string();
                }
            }
            (node, phase)
        })
        .collect();

    let mut next = intent.with_program(program);
    for step in next.setup_steps.iter_mut().chain(next.teardown_steps.iter_mut()) {
        step.target = step.target.take().map(normalize_locator);
        step.confidence = clamp_confidence(step.confidence);
        step.raw = step.raw.trim().to_string();
    }
    next.test_name = collapse_whitespace(&next.test_name);
    next.recompute_confidence();
    next
}

/// Canonical spelling of a locator.
pub fn normalize_locator(locator: Locator) -> Locator {
    let value = match locator.strategy {
        LocatorStrategy::Text => collapse_whitespace(&locator.value),
        _ => locator.value.trim().to_string(),
    };
    let name = locator.name.map(|n| collapse_whitespace(&n));

    match locator.strategy {
        LocatorStrategy::Css => {
            if let Some(caps) = CSS_PLAIN_ID.captures(&value) {
                return Locator::id(&caps[1]);
            }
            if let Some(caps) = CSS_NAME_ATTR.captures(&value) {
                return Locator::name(caps[1].trim());
            }
            Locator::css(value)
        }
        LocatorStrategy::Xpath => match XPATH_ID.captures(&value) {
            Some(caps) => Locator::id(caps[1].trim()),
            None => Locator::xpath(value),
        },
        LocatorStrategy::Role => Locator::role(value.to_lowercase(), name),
        LocatorStrategy::Id | LocatorStrategy::Text | LocatorStrategy::Name => Locator {
            strategy: locator.strategy,
            value,
            name,
        },
    }
}

pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable fingerprint of source text, used to correlate trace events.
pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
