mod common;

use common::fixtures::*;
use common::translate;
use proptest::prelude::*;
use testshift::intent::Dialect;
use testshift::intent::intent_model::{Locator, LocatorStrategy};
use testshift::intent::normalize::normalize_locator;
use testshift::parser::SeleniumJavaParser;
use testshift::refine::MockRefiner;
use testshift::{TranslationConfig, TranslationError, Translator, ValidationLevel};

// ============================================================================
// End to end
// ============================================================================

#[test]
fn selenium_login_becomes_auto_waiting_playwright() {
    let result = translate(SELENIUM_JAVA_LOGIN, "selenium-java", "playwright-ts");

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.errors.is_empty());
    assert!(!result.target_code.contains("WebDriverWait"));
    assert!(!result.target_code.contains("waitFor"));
    assert!(result.target_code.contains("await page.locator('#username').fill('alice');"));
    assert!(result.target_code.contains("await expect(page.locator('#welcome')).toBeVisible();"));
    assert!(result.target_code.contains("test.describe('LoginTest', () => {"));
    assert!(result.warnings.iter().any(|w| w.contains("explicit wait")));
    assert!(result.confidence >= 0.8);
    assert!(result.todos.is_empty());

    assert_eq!(result.test_count(), 1);
    assert_eq!(result.statistics["source_dialect"], "selenium-java");
    assert_eq!(result.statistics["mapped_nodes"], 2);
    let applied = result.statistics["idioms_applied"].as_array().expect("idioms array");
    assert!(applied.iter().any(|v| v == "drop-explicit-waits"));
}

#[test]
fn inline_selenium_wait_is_dropped_for_playwright() {
    let result = translate(SELENIUM_JAVA_INLINE_WAIT, "selenium-java", "playwright-ts");

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(!result.target_code.contains("WebDriverWait"));
    assert!(!result.target_code.contains("untranslated"));
    assert!(result.target_code.contains("await page.locator('#email').fill('a@b.c');"));
    assert!(result.warnings.iter().any(|w| w.contains("removed 1 explicit wait")));
    assert!(result.confidence >= 0.8);
}

#[test]
fn selenium_login_passes_strict_validation() {
    let result = Translator::with_defaults().translate(
        SELENIUM_JAVA_LOGIN,
        "selenium-java",
        "playwright-ts",
        &TranslationConfig::strict(),
    );
    assert!(result.success, "errors: {:?}", result.errors);
}

#[test]
fn rest_assured_becomes_pytest_requests() {
    let result = translate(REST_ASSURED_GET_USER, "rest-assured", "pytest-requests");

    assert!(result.success, "errors: {:?}", result.errors);
    let code = &result.target_code;
    assert!(code.contains("BASE_URL = os.environ.get(\"BASE_URL\", \"https://api.example.com\")"));
    assert!(code.contains(
        "response = requests.get(BASE_URL + \"/users/1\", headers={\"Accept\": \"application/json\"}, timeout=TIMEOUT)"
    ));
    assert!(code.contains("assert response.status_code == 200"));
    assert!(code.contains("assert response.json()[\"name\"] == \"Leanne\""));
}

#[test]
fn cypress_and_python_sources_translate() {
    let cypress = translate(CYPRESS_LOGIN, "auto", "playwright-python");
    assert!(cypress.success, "errors: {:?}", cypress.errors);
    assert!(cypress.target_code.contains("page.locator(\"#username\").fill(\"alice\")"));
    assert!(cypress.target_code.contains("def setup_and_teardown(page: Page):"));

    let python = translate(SELENIUM_PYTHON_SEARCH, "auto", "playwright-ts");
    assert!(python.success, "errors: {:?}", python.errors);
    assert!(python.target_code.contains("await page.locator('[name=\"q\"]').fill('rust');"));
}

#[test]
fn unsupported_call_is_flagged_not_dropped() {
    let result = translate(SELENIUM_JAVA_UNSUPPORTED, "selenium-java", "playwright-ts");

    assert!(result.success);
    assert_eq!(result.confidence, 0.0);
    assert!(result.target_code.contains("TODO(testshift)"));
    assert!(result.target_code.contains("// untranslated: driver.manage().window().maximize();"));
    assert_eq!(result.todos.len(), 1);
    assert!(result.todos[0].contains(&format!("line {}", common::line_of(SELENIUM_JAVA_UNSUPPORTED, "maximize"))));
    assert_eq!(result.statistics["pass_through_nodes"], 1);
}

#[test]
fn hard_sleeps_survive_with_a_todo() {
    let result = translate(SELENIUM_JAVA_SLEEPY, "selenium-java", "playwright-ts");

    assert!(result.success);
    assert!(result.target_code.contains("await page.waitForTimeout(2000);"));
    assert!(result.warnings.iter().any(|w| w.contains("fixed sleep")));
    assert_eq!(result.todos.len(), 1);
    assert!(result.confidence <= 0.6);
    // clear + sendKeys folded into a single fill
    assert!(!result.target_code.contains(".clear();"));
}

#[test]
fn cypress_api_test_targets_requests() {
    let result = translate(CYPRESS_API, "cypress", "pytest-requests");
    assert!(result.success, "errors: {:?}", result.errors);
    let code = &result.target_code;
    assert!(code.contains("requests.post(BASE_URL + \"/users\", json={\"name\": \"bob\"}, timeout=TIMEOUT)"));
    assert!(code.contains("assert response.status_code == 201"));
    assert!(code.contains("assert response.json()[\"name\"] == \"bob\""));
    assert!(code.contains("assert response.json()[\"id\"] is not None"));
    assert!(!code.contains("untranslated: cy.request('POST'"));
}

#[test]
fn gherkin_api_scenario_targets_requests() {
    let result = translate(GHERKIN_API, "gherkin", "pytest-requests");
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.target_code.contains("response = requests.post(BASE_URL + \"/users\""));
    assert!(result.target_code.contains("assert response.status_code == 201"));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn unknown_target_fails_without_code() {
    let result = translate(SELENIUM_JAVA_LOGIN, "selenium-java", "robot-framework");
    assert!(!result.success);
    assert!(result.target_code.is_empty());
    match &result.errors[..] {
        [TranslationError::UnsupportedTarget { requested, reason }] => {
            assert_eq!(requested, "robot-framework");
            assert_eq!(reason, "unknown dialect");
        }
        other => panic!("unexpected errors: {:?}", other),
    }
}

#[test]
fn target_without_generator_is_unsupported() {
    let mut translator = Translator::empty();
    translator.register_parser(Box::new(SeleniumJavaParser));
    let result = translator.translate(
        SELENIUM_JAVA_LOGIN,
        "selenium-java",
        "playwright-ts",
        &TranslationConfig::default(),
    );
    assert!(!result.success);
    assert!(matches!(
        &result.errors[0],
        TranslationError::UnsupportedTarget { reason, .. } if reason == "no generator registered"
    ));
}

#[test]
fn ui_tests_cannot_target_requests() {
    let result = translate(SELENIUM_JAVA_LOGIN, "selenium-java", "pytest-requests");
    assert!(!result.success);
    assert_eq!(
        result.errors[0].to_string(),
        "unsupported target 'pytest-requests': cannot express ui test 'should login successfully'"
    );
}

#[test]
fn undetectable_source_is_reported() {
    let result = translate(PROSE, "auto", "playwright-ts");
    assert!(!result.success);
    assert_eq!(
        result.errors[0],
        TranslationError::AmbiguousOrUnsupportedSource {
            requested: "auto".to_string(),
            candidates: Vec::new(),
        }
    );
    assert_eq!(
        Translator::with_defaults().detect(SELENIUM_JAVA_LOGIN),
        Ok(Dialect::SeleniumJava)
    );
}

#[test]
fn wrong_source_dialect_is_a_parse_error() {
    let result = translate(CYPRESS_LOGIN, "selenium-java", "playwright-ts");
    assert!(!result.success);
    assert!(matches!(result.errors[0], TranslationError::Parse(_)));
    assert!(result.errors[0].is_fatal());
}

// ============================================================================
// Options
// ============================================================================

#[test]
fn header_names_dialects_and_confidence() {
    let config = TranslationConfig {
        emit_header: true,
        ..TranslationConfig::default()
    };
    let result = Translator::with_defaults().translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &config);
    assert!(result
        .target_code
        .starts_with("// Translated by testshift from selenium-java to playwright-ts\n// Confidence: 1.00\n"));
}

#[test]
fn idioms_can_be_switched_off() {
    let config = TranslationConfig {
        apply_idioms: false,
        ..TranslationConfig::default()
    };
    let result = Translator::with_defaults().translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &config);
    assert!(result.success);
    assert!(result.target_code.contains("waitFor"));
    assert!(result.statistics["idioms_applied"].as_array().is_some_and(|a| a.is_empty()));
}

#[test]
fn skip_validation_accepts_anything() {
    let config = TranslationConfig {
        validation_level: ValidationLevel::Skip,
        ..TranslationConfig::default()
    };
    let result = Translator::with_defaults().translate(REST_ASSURED_GET_USER, "auto", "pytest-requests", &config);
    assert!(result.success);
    assert!(!result.warnings.iter().any(|w| w.starts_with("validation:")));
}

// ============================================================================
// Refiner
// ============================================================================

fn refining() -> TranslationConfig {
    TranslationConfig {
        use_refiner: true,
        ..TranslationConfig::default()
    }
}

#[test]
fn accepted_refinement_moves_confidence() {
    let translator = Translator::with_defaults().with_refiner(Box::new(MockRefiner::Echo(-0.25)));
    let result = translator.translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &refining());
    assert!(result.success);
    assert_eq!(result.confidence, 0.75);
    assert_eq!(result.statistics["refined"], true);
}

#[test]
fn refinement_that_breaks_the_code_is_discarded() {
    let translator = Translator::with_defaults().with_refiner(Box::new(MockRefiner::Replace {
        text: "import { test } from '@playwright/test';\ntest('x', async () => {\n".to_string(),
        delta: 0.1,
    }));
    let result = translator.translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &refining());
    assert!(result.success);
    assert!(result.target_code.contains("fill('alice')"));
    assert!(result.warnings.iter().any(|w| w.contains("refined output discarded")));
    assert_eq!(result.statistics["refined"], false);
}

#[test]
fn refiner_failures_are_warnings() {
    for refiner in [MockRefiner::Fail("offline".to_string()), MockRefiner::Panic] {
        let translator = Translator::with_defaults().with_refiner(Box::new(refiner));
        let result = translator.translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &refining());
        assert!(result.success);
        assert!(result.errors.is_empty());
        assert!(result.warnings.iter().any(|w| w.starts_with("refiner unavailable:")));
    }

    let result = Translator::with_defaults().translate(SELENIUM_JAVA_LOGIN, "auto", "playwright-ts", &refining());
    assert!(result.success);
    assert!(result
        .warnings
        .contains(&"refiner unavailable: no refiner configured".to_string()));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_locator() -> impl Strategy<Value = Locator> {
    let strategy = prop_oneof![
        Just(LocatorStrategy::Id),
        Just(LocatorStrategy::Css),
        Just(LocatorStrategy::Xpath),
        Just(LocatorStrategy::Text),
        Just(LocatorStrategy::Name),
    ];
    (strategy, "[a-z#\\[\\]=' @/*]{0,16}").prop_map(|(s, v)| Locator::new(s, v))
}

fn arb_field() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,10}"
}

proptest! {
    #[test]
    fn locator_normalization_is_idempotent(locator in arb_locator()) {
        let once = normalize_locator(locator);
        prop_assert_eq!(normalize_locator(once.clone()), once);
    }

    #[test]
    fn translation_is_deterministic(field in arb_field(), value in "[A-Za-z0-9 ]{0,12}") {
        let source = format!(
            "describe('Form', () => {{\n  it('fills {field}', () => {{\n    cy.get('#{field}').type('{value}');\n  }});\n}});\n"
        );
        let a = translate(&source, "cypress", "playwright-ts");
        let b = translate(&source, "cypress", "playwright-ts");
        prop_assert!(a.success);
        prop_assert_eq!(a, b);
    }
}

#[test]
fn idiom_pass_is_idempotent_on_every_fixture() {
    use testshift::intent::normalize::normalize_intent;
    use testshift::registry::idiom::IdiomRegistry;

    let translator = Translator::with_defaults();
    let registry = IdiomRegistry::with_builtins();
    let fixtures = [SELENIUM_JAVA_LOGIN, SELENIUM_JAVA_SLEEPY, CYPRESS_LOGIN, GHERKIN_LOGIN, REST_ASSURED_GET_USER];
    for source in fixtures {
        let dialect = translator.detect(source).unwrap();
        let intents = translator.parser(dialect).unwrap().parse(source, "fixture").unwrap();
        for target in [Dialect::PlaywrightTs, Dialect::PlaywrightPython] {
            for intent in &intents {
                let once = registry.apply_all(&normalize_intent(intent), Some(target));
                let twice = registry.apply_all(&once.intent, Some(target));
                assert_eq!(twice.intent, once.intent);
                assert!(twice.warnings.is_empty());
            }
        }
    }
}

#[test]
fn result_confidence_never_exceeds_emitted_minimum() {
    let fixtures = [
        (SELENIUM_JAVA_LOGIN, "playwright-python"),
        (SELENIUM_JAVA_UNSUPPORTED, "playwright-ts"),
        (SELENIUM_JAVA_SLEEPY, "playwright-python"),
        (GHERKIN_LOGIN, "playwright-ts"),
    ];
    for (source, target) in fixtures {
        let result = translate(source, "auto", target);
        assert!(result.success, "errors: {:?}", result.errors);
        let min = result.statistics["min_confidence"].as_f64().unwrap();
        assert!(f64::from(result.confidence) <= min + 0.005);
        assert!(result.statistics["average_confidence"].as_f64().unwrap() >= min);
    }
}

#[test]
fn strict_successes_revalidate_clean() {
    let cases = [
        (SELENIUM_JAVA_LOGIN, "playwright-ts"),
        (SELENIUM_PYTHON_SEARCH, "playwright-python"),
        (CYPRESS_LOGIN, "playwright-ts"),
        (GHERKIN_LOGIN, "playwright-python"),
        (REST_ASSURED_GET_USER, "pytest-requests"),
    ];
    let translator = Translator::with_defaults();
    for (source, target) in cases {
        let result = translator.translate(source, "auto", target, &TranslationConfig::strict());
        if result.success {
            let dialect: Dialect = target.parse().unwrap();
            assert!(testshift::Validator::check(&result.target_code, dialect).is_empty());
        } else {
            assert!(result.target_code.is_empty());
            assert!(matches!(result.errors[0], TranslationError::ValidationFailure { .. }));
        }
    }
}
