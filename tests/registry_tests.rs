mod common;

use testshift::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, BddPhase, Locator, TestIntent, Value,
};
use testshift::intent::{Dialect, TestKind};
use testshift::registry::api_mapping::{ApiMapping, ApiMappingRegistry, render_template};
use testshift::registry::idiom::{HARD_SLEEP_CONFIDENCE, IdiomError, IdiomOutcome, IdiomPattern, IdiomRegistry};

fn waiting_intent() -> TestIntent {
    let mut intent = TestIntent::new("checkout", Dialect::SeleniumJava, TestKind::Ui);
    intent.push_step(ActionIntent::new(ActionType::Wait, 10, "new WebDriverWait(driver, 5)").with_kv("wait", "driver"));
    intent.push_step(ActionIntent::new(ActionType::Click, 11, "buy.click()").with_target(Locator::id("buy")));
    intent.push_step(ActionIntent::new(ActionType::Sleep, 12, "Thread.sleep(500)").with_param(Value::DurationMs(500)));
    intent.push_assertion(AssertionIntent::new(AssertionType::Visible, 13, "done").with_target(Locator::id("done")));
    intent
}

// ============================================================================
// API mappings
// ============================================================================

#[test]
fn builtin_mappings_cover_driver_lifecycle() {
    let registry = ApiMappingRegistry::with_builtins();
    assert!(!registry.is_empty());
    let quit = registry
        .lookup(Dialect::SeleniumJava, Dialect::PlaywrightTs, "driver.quit")
        .expect("driver.quit mapping");
    assert!(quit.target_template.starts_with("//"));
    assert_eq!(registry.for_shape(Dialect::SeleniumJava, "driver.quit").len(), 2);
    assert!(registry.lookup(Dialect::SeleniumJava, Dialect::PytestRequests, "driver.quit").is_none());
}

#[test]
fn later_registration_replaces_earlier() {
    let mut registry = ApiMappingRegistry::new();
    registry.register(ApiMapping::new(Dialect::Cypress, Dialect::PlaywrightTs, "cy.log", "console.log({arg0});", 1.0));
    registry.register(ApiMapping::new(Dialect::Cypress, Dialect::PlaywrightTs, "cy.log", "// {arg0}", 0.5));
    assert_eq!(registry.len(), 1);
    let mapping = registry.lookup(Dialect::Cypress, Dialect::PlaywrightTs, "cy.log").unwrap();
    assert_eq!(mapping.target_template, "// {arg0}");
    assert_eq!(mapping.confidence_hint, 0.5);
}

#[test]
fn templates_fill_positional_arguments() {
    let args = vec!["1280".to_string(), "720".to_string()];
    assert_eq!(
        render_template("setViewportSize({ width: {arg0}, height: {arg1} })", &args).as_deref(),
        Some("setViewportSize({ width: 1280, height: 720 })")
    );
    assert_eq!(render_template("evaluate({arg2})", &args), None);
    assert_eq!(render_template("no placeholders", &[]).as_deref(), Some("no placeholders"));
}

#[test]
fn mappings_deserialize_with_default_hint() {
    let yaml = "source_dialect: cypress\ntarget_dialect: playwright-python\nsource_call_shape: cy.tick\ntarget_template: page.clock.run_for({arg0})\n";
    let mapping: ApiMapping = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(mapping.source_dialect, Dialect::Cypress);
    assert_eq!(mapping.target_dialect, Dialect::PlaywrightPython);
    assert_eq!(mapping.confidence_hint, 1.0);
}

// ============================================================================
// Idioms
// ============================================================================

#[test]
fn waits_are_dropped_only_for_auto_waiting_targets() {
    let registry = IdiomRegistry::with_builtins();
    let intent = waiting_intent();

    let pass = registry.apply_all(&intent, Some(Dialect::PlaywrightTs));
    assert!(pass.applied.contains(&"drop-explicit-waits".to_string()));
    assert!(pass.intent.steps.iter().all(|s| s.action_type != ActionType::Wait));
    assert!(pass.notes.iter().any(|n| n.contains("explicit wait") && n.contains("line 10")));

    let untouched = registry.apply_all(&intent, Some(Dialect::PytestRequests));
    assert!(untouched.applied.is_empty());
    assert_eq!(untouched.intent, intent);
}

#[test]
fn waits_in_teardown_hooks_are_dropped_too() {
    let mut intent = waiting_intent();
    intent
        .teardown_steps
        .push(ActionIntent::new(ActionType::Wait, 30, "wait.until(invisibilityOf(spinner))").with_kv("wait", "driver"));
    intent
        .teardown_steps
        .push(ActionIntent::new(ActionType::Click, 31, "logout.click()").with_target(Locator::id("logout")));

    let pass = IdiomRegistry::with_builtins().apply_all(&intent, Some(Dialect::PlaywrightTs));
    assert_eq!(pass.intent.teardown_steps.len(), 1);
    assert_eq!(pass.intent.teardown_steps[0].action_type, ActionType::Click);
    assert!(pass.notes.iter().any(|n| n.contains("removed 2 explicit wait(s)") && n.contains("30")));
}

#[test]
fn hard_sleeps_are_kept_with_lowered_confidence() {
    let pass = IdiomRegistry::with_builtins().apply_all(&waiting_intent(), Some(Dialect::PlaywrightPython));
    let sleep = pass
        .intent
        .steps
        .iter()
        .find(|s| s.action_type == ActionType::Sleep)
        .expect("sleep kept");
    assert_eq!(sleep.confidence, HARD_SLEEP_CONFIDENCE);
    assert_eq!(sleep.semantic_tags.get("idiom"), Some("hard_sleep"));
    assert_eq!(pass.intent.overall_confidence, HARD_SLEEP_CONFIDENCE);
}

#[test]
fn clear_before_fill_on_same_element_is_folded() {
    let mut intent = TestIntent::new("search", Dialect::Cypress, TestKind::Ui);
    intent.push_step(ActionIntent::new(ActionType::Clear, 1, "clear").with_target(Locator::css("#q")));
    intent.push_step(
        ActionIntent::new(ActionType::Fill, 2, "type")
            .with_target(Locator::css("#q"))
            .with_param(Value::text("lamp")),
    );
    intent.push_step(ActionIntent::new(ActionType::Clear, 3, "clear other").with_target(Locator::css("#other")));

    let pass = IdiomRegistry::with_builtins().apply_all(&intent, Some(Dialect::PlaywrightTs));
    let kinds: Vec<ActionType> = pass.intent.steps.iter().map(|s| s.action_type).collect();
    assert_eq!(kinds, vec![ActionType::Fill, ActionType::Clear]);
    assert!(pass.applied.contains(&"fold-clear-before-fill".to_string()));
}

#[test]
fn gherkin_phases_map_to_arrange_act_assert() {
    let mut intent = TestIntent::new("scenario", Dialect::Gherkin, TestKind::Bdd);
    let given = intent.push_step(ActionIntent::new(ActionType::Navigate, 1, "Given").with_param(Value::text("/")));
    let when = intent.push_step(ActionIntent::new(ActionType::Click, 2, "When").with_target(Locator::text("Go")));
    let and = intent.push_step(ActionIntent::new(ActionType::Click, 3, "And").with_target(Locator::text("Ok")));
    let then = intent.push_assertion(AssertionIntent::new(AssertionType::Visible, 4, "Then").with_target(Locator::text("Done")));
    intent.set_phase(given, BddPhase::Given);
    intent.set_phase(when, BddPhase::When);
    intent.set_phase(and, BddPhase::And);
    intent.set_phase(then, BddPhase::Then);

    let pass = IdiomRegistry::with_builtins().apply_all(&intent, Some(Dialect::PlaywrightTs));
    let sections: Vec<Option<&str>> = pass.intent.nodes().map(|n| n.tags().get("aaa")).collect();
    assert_eq!(sections, vec![Some("arrange"), Some("act"), Some("act"), Some("assert")]);

    // Already mapped: nothing left to do
    let again = IdiomRegistry::with_builtins().apply_all(&pass.intent, Some(Dialect::PlaywrightTs));
    assert!(!again.applied.contains(&"bdd-phases-to-aaa".to_string()));
}

#[test]
fn first_pattern_in_a_family_wins() {
    let mut registry = IdiomRegistry::new();
    let note = |text: &'static str| {
        move |intent: &TestIntent| {
            Ok::<_, IdiomError>(IdiomOutcome {
                intent: intent.clone(),
                notes: vec![text.to_string()],
            })
        }
    };
    registry.register(IdiomPattern::new("first", "fam", "", [Dialect::SeleniumJava], |_| true, note("first")));
    registry.register(IdiomPattern::new("second", "fam", "", [Dialect::SeleniumJava], |_| true, note("second")));

    let intent = waiting_intent();
    assert_eq!(registry.applicable(&intent, None).len(), 1);
    let pass = registry.apply_all(&intent, None);
    assert_eq!(pass.applied, vec!["first".to_string()]);
    assert_eq!(pass.notes, vec!["first".to_string()]);
}

#[test]
fn failing_and_panicking_idioms_become_warnings() {
    let mut registry = IdiomRegistry::new();
    registry.register(IdiomPattern::new("fails", "a", "", [Dialect::SeleniumJava], |_| true, |_| {
        Err(IdiomError::Failed {
            idiom: "fails".to_string(),
            message: "nope".to_string(),
        })
    }));
    registry.register(IdiomPattern::new("panics", "b", "", [Dialect::SeleniumJava], |_| true, |_| {
        panic!("boom")
    }));

    let intent = waiting_intent();
    let pass = registry.apply_all(&intent, None);
    assert!(pass.applied.is_empty());
    assert_eq!(pass.warnings.len(), 2);
    assert!(pass.warnings[1].contains("boom"));
    assert_eq!(pass.intent, intent);
}
