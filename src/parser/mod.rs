//! Source-dialect front ends. Each parser lifts test files into
//! `TestIntent`s, one per test boundary.

pub mod cypress;
pub mod gherkin;
pub mod rest_assured;
pub mod scan;
pub mod selenium;
pub mod selenium_java;
pub mod selenium_python;
pub mod syntax;

use serde::Serialize;
use thiserror::Error;

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{ActionIntent, ActionType, Locator, OwnedNode, TestIntent, Value};
use crate::parser::scan::{BlockRole, TestBlock};
use crate::parser::syntax::{Expr, SyntaxError};

pub use cypress::CypressParser;
pub use gherkin::GherkinParser;
pub use rest_assured::RestAssuredParser;
pub use selenium_java::SeleniumJavaParser;
pub use selenium_python::SeleniumPythonParser;

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("input is not recognizable as {dialect}")]
    NotRecognized { dialect: Dialect },

    #[error("no test boundary found in '{source_label}' ({dialect})")]
    MissingTestBoundary { dialect: Dialect, source_label: String },

    #[error("malformed {dialect} input at line {line}: {message}")]
    Malformed {
        dialect: Dialect,
        line: usize,
        message: String,
    },
}

/// Lifts source text of one dialect into intents.
pub trait Parser: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Cheap structural sniff used for auto-detection.
    fn can_parse(&self, text: &str) -> bool;

    /// One intent per test boundary, in file order.
    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError>;
}

/// Every parser shipped with the crate.
pub fn builtin_parsers() -> Vec<Box<dyn Parser>> {
    vec![
        Box::new(SeleniumJavaParser),
        Box::new(SeleniumPythonParser),
        Box::new(CypressParser),
        Box::new(GherkinParser),
        Box::new(RestAssuredParser),
    ]
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Literal expression as a `Value`. Interpolated strings are not literals.
pub(crate) fn literal_value(expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Str {
            value,
            interpolated: false,
        } => Some(Value::Text(value.clone())),
        Expr::Num(n) => n
            .trim_end_matches(['L', 'l'])
            .parse::<i64>()
            .map(Value::Integer)
            .ok()
            .or_else(|| Some(Value::Text(n.clone()))),
        _ => match expr.as_ident()? {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            _ => None,
        },
    }
}

/// Selenium `By` strategy (any casing: `cssSelector`, `CSS_SELECTOR`) to a
/// neutral locator with its confidence.
pub(crate) fn selenium_locator(strategy: &str, value: &str) -> Option<(Locator, f32)> {
    let key: String = strategy
        .chars()
        .filter(|c| *c != '_')
        .flat_map(char::to_lowercase)
        .collect();
    match key.as_str() {
        "id" => Some((Locator::id(value), 1.0)),
        "name" => Some((Locator::name(value), 1.0)),
        "cssselector" | "css" => Some((Locator::css(value), 1.0)),
        "xpath" => Some(xpath_locator(value)),
        "linktext" => Some((Locator::role("link", Some(value.to_string())), 1.0)),
        "partiallinktext" => Some((Locator::text(value), 0.7)),
        "classname" if !value.trim().contains(' ') => Some((Locator::css(format!(".{}", value.trim())), 1.0)),
        "tagname" => Some((Locator::css(value), 1.0)),
        _ => None,
    }
}

/// XPath text lookups become text locators; anything else stays XPath.
fn xpath_locator(value: &str) -> (Locator, f32) {
    for marker in ["text()='", "text()=\"", "text(),'", "text(), '", "text(),\"", "text(), \""] {
        if let Some(start) = value.find(marker) {
            let rest = &value[start + marker.len()..];
            if let Some(end) = rest.find(['\'', '"']) {
                return (Locator::text(&rest[..end]), 0.7);
            }
        }
    }
    (Locator::xpath(value), 1.0)
}

/// Method or function name as human words:
/// `shouldLoginSuccessfully` / `test_login_ok` → "should login successfully" / "login ok".
pub fn humanize(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        let boundary = c.is_uppercase()
            && !current.is_empty()
            && (chars[i - 1].is_lowercase()
                || chars.get(i + 1).is_some_and(|n| n.is_lowercase()));
        if boundary {
            words.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    if words.len() > 1 && words[0].eq_ignore_ascii_case("test") {
        words.remove(0);
    }
    words
        .iter()
        .map(|w| {
            if w.len() > 1 && w.chars().all(|c| c.is_uppercase() || c.is_ascii_digit()) {
                w.clone()
            } else {
                w.to_lowercase()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Apply setup/teardown blocks and the shared finishing touches to an
/// intent built from a test block.
pub(crate) fn finish_intent(
    mut intent: TestIntent,
    setup: &[ActionIntent],
    teardown: &[ActionIntent],
) -> TestIntent {
    intent.setup_steps.extend(setup.iter().cloned());
    intent.teardown_steps.extend(teardown.iter().cloned());
    if intent.test_kind != TestKind::Bdd {
        intent.test_kind = intent.infer_kind();
    }
    intent.recompute_confidence();
    intent
}

/// Record the call shape on an assertion node that has none yet.
pub(crate) fn shaped(node: OwnedNode, shape: &str) -> OwnedNode {
    match node {
        OwnedNode::Assertion(a) if a.source_shape.is_none() && !shape.is_empty() => {
            OwnedNode::Assertion(a.with_shape(shape))
        }
        other => other,
    }
}

/// Hooks hold steps only; an assertion inside one is kept as pass-through.
pub(crate) fn hook_step(node: OwnedNode) -> ActionIntent {
    match node {
        OwnedNode::Step(step) => step,
        OwnedNode::Assertion(a) => ActionIntent::new(ActionType::Raw, a.source_line, a.raw)
            .with_confidence(0.5)
            .with_tag("hook_assertion"),
    }
}

/// A source the host-language parser could not load at all.
pub(crate) fn syntax_error(dialect: Dialect, error: SyntaxError) -> ParseError {
    ParseError::Malformed {
        dialect,
        line: error.line,
        message: error.message,
    }
}

/// Split located blocks by role, preserving order.
pub(crate) fn partition_blocks(blocks: Vec<TestBlock>) -> (Vec<TestBlock>, Vec<TestBlock>, Vec<TestBlock>) {
    let mut tests = Vec::new();
    let mut setup = Vec::new();
    let mut teardown = Vec::new();
    for block in blocks {
        match block.role {
            BlockRole::Test => tests.push(block),
            BlockRole::Setup => setup.push(block),
            BlockRole::Teardown => teardown.push(block),
        }
    }
    (tests, setup, teardown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::intent_model::LocatorStrategy;

    #[test]
    fn humanizes_method_names() {
        assert_eq!(humanize("shouldLoginSuccessfully"), "should login successfully");
        assert_eq!(humanize("test_login_ok"), "login ok");
        assert_eq!(humanize("testGetUserById"), "get user by id");
        assert_eq!(humanize("parseHTTPResponse"), "parse HTTP response");
    }

    #[test]
    fn maps_selenium_strategies() {
        let (loc, c) = selenium_locator("CSS_SELECTOR", "#main .item").unwrap();
        assert_eq!(loc.strategy, LocatorStrategy::Css);
        assert_eq!(c, 1.0);
        let (loc, c) = selenium_locator("xpath", "//button[text()='Save']").unwrap();
        assert_eq!(loc, Locator::text("Save"));
        assert_eq!(c, 0.7);
        let (loc, _) = selenium_locator("linkText", "Home").unwrap();
        assert_eq!(loc, Locator::role("link", Some("Home".to_string())));
        assert!(selenium_locator("shadowRoot", "x").is_none());
    }
}
