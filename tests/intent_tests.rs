mod common;

use std::str::FromStr;

use testshift::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, BddPhase, Locator, NodeRef, OwnedNode,
    TestIntent, Value,
};
use testshift::intent::normalize::{normalize_intent, normalize_locator, text_fingerprint};
use testshift::intent::{Dialect, TestKind};

fn login_intent() -> TestIntent {
    let mut intent = TestIntent::new("should  login", Dialect::SeleniumJava, TestKind::Ui);
    intent.push_step(
        ActionIntent::new(ActionType::Navigate, 3, "driver.get(\"/login\");").with_param(Value::text("/login")),
    );
    intent.push_step(
        ActionIntent::new(ActionType::Fill, 4, "  el.sendKeys(\"alice\");  ")
            .with_target(Locator::css("#username"))
            .with_param(Value::text("alice")),
    );
    intent.push_assertion(
        AssertionIntent::new(AssertionType::Visible, 5, "assertTrue(x)")
            .with_target(Locator::xpath("//*[@id='welcome']"))
            .with_confidence(0.9),
    );
    intent
}

// ============================================================================
// Dialects
// ============================================================================

#[test]
fn dialect_ids_round_trip_through_from_str() {
    for dialect in Dialect::ALL {
        assert_eq!(Dialect::from_str(dialect.id()), Ok(dialect));
    }
    assert_eq!(Dialect::from_str("Playwright_TS"), Ok(Dialect::PlaywrightTs));
    assert!(Dialect::from_str("robot-framework").is_err());
}

#[test]
fn only_playwright_targets_auto_wait() {
    let auto: Vec<Dialect> = Dialect::ALL.into_iter().filter(|d| d.auto_waits()).collect();
    assert_eq!(auto, vec![Dialect::PlaywrightTs, Dialect::PlaywrightPython]);
}

// ============================================================================
// Program order and traceability
// ============================================================================

#[test]
fn source_refs_follow_program_order() {
    let intent = login_intent();
    let nodes: Vec<NodeRef> = intent.source_refs.iter().map(|r| r.node).collect();
    assert_eq!(nodes, vec![NodeRef::Step(0), NodeRef::Step(1), NodeRef::Assertion(0)]);
    let lines: Vec<usize> = intent.nodes().map(|n| n.line()).collect();
    assert_eq!(lines, vec![3, 4, 5]);
    assert_eq!(intent.node_count(), 3);
}

#[test]
fn retain_steps_rebuilds_indices_and_phases() {
    let mut intent = TestIntent::new("bdd", Dialect::Gherkin, TestKind::Bdd);
    let a = intent.push_step(ActionIntent::new(ActionType::Wait, 1, "wait"));
    let b = intent.push_step(ActionIntent::new(ActionType::Click, 2, "click").with_target(Locator::id("go")));
    let c = intent.push_assertion(AssertionIntent::new(AssertionType::Visible, 3, "see"));
    intent.set_phase(a, BddPhase::Given);
    intent.set_phase(b, BddPhase::When);
    intent.set_phase(c, BddPhase::Then);

    let next = intent.retain_steps(|s| s.action_type != ActionType::Wait);
    assert_eq!(next.steps.len(), 1);
    assert_eq!(next.source_refs.len(), 2);
    assert_eq!(next.phase_of(0), Some(BddPhase::When));
    assert_eq!(next.phase_of(1), Some(BddPhase::Then));
}

#[test]
fn overall_confidence_is_the_minimum_including_hooks() {
    let mut intent = login_intent();
    intent.setup_steps.push(ActionIntent::new(ActionType::Raw, 1, "setup").with_confidence(0.4));
    intent.recompute_confidence();
    assert_eq!(intent.overall_confidence, 0.4);
    assert!(intent.covered_lines().contains(&1));
}

#[test]
fn request_only_programs_are_api_tests() {
    let mut intent = TestIntent::new("api", Dialect::RestAssured, TestKind::Ui);
    intent.push_step(ActionIntent::new(
        ActionType::Request(testshift::intent::intent_model::HttpMethod::Get),
        1,
        "get",
    ));
    intent.push(OwnedNode::Assertion(
        AssertionIntent::new(AssertionType::StatusCode, 2, "status").with_expected(Value::Integer(200)),
    ));
    assert_eq!(intent.infer_kind(), TestKind::Api);

    intent.push_step(ActionIntent::new(ActionType::Click, 3, "click").with_target(Locator::id("x")));
    assert_eq!(intent.infer_kind(), TestKind::Ui);
}

#[test]
fn unsupported_and_unrecognized_steps_are_pass_through() {
    let unsupported = ActionIntent::unsupported(7, "driver.manage().window().maximize();", "driver.manage.window.maximize");
    assert_eq!(unsupported.confidence, 0.0);
    assert!(unsupported.semantic_tags.has("unsupported"));
    assert!(unsupported.is_passthrough());

    let unrecognized = ActionIntent::unrecognized(8, "mystery();");
    assert!(unrecognized.confidence < 0.5);
    assert!(unrecognized.is_passthrough());
}

// ============================================================================
// Normalization
// ============================================================================

#[test]
fn normalization_canonicalizes_locators_and_text() {
    let normalized = normalize_intent(&login_intent());
    assert_eq!(normalized.test_name, "should login");
    assert_eq!(normalized.steps[1].target, Some(Locator::id("username")));
    assert_eq!(normalized.steps[1].raw, "el.sendKeys(\"alice\");");
    assert_eq!(normalized.assertions[0].target, Some(Locator::id("welcome")));
    assert_eq!(normalized.overall_confidence, 0.9);
}

#[test]
fn normalization_is_idempotent() {
    let once = normalize_intent(&login_intent());
    let twice = normalize_intent(&once);
    assert_eq!(once, twice);
}

#[test]
fn role_and_name_locators_normalize() {
    assert_eq!(
        normalize_locator(Locator::role("Button", Some("  Sign   in ".to_string()))),
        Locator::role("button", Some("Sign in".to_string()))
    );
    assert_eq!(normalize_locator(Locator::css("[name='email']")), Locator::name("email"));
    assert_eq!(normalize_locator(Locator::text("  Hello \n world ")), Locator::text("Hello world"));
}

#[test]
fn fingerprints_are_stable_sha1_hex() {
    let a = text_fingerprint("class LoginTest {}");
    assert_eq!(a.len(), 40);
    assert_eq!(a, text_fingerprint("class LoginTest {}"));
    assert_ne!(a, text_fingerprint("class LogoutTest {}"));
}

#[test]
fn intents_serialize_with_kebab_dialects() {
    let json = serde_json::to_value(login_intent()).unwrap();
    assert_eq!(json["source_dialect"], "selenium-java");
    assert_eq!(json["test_kind"], "ui");
    let back: TestIntent = serde_json::from_value(json).unwrap();
    assert_eq!(back, login_intent());
}
