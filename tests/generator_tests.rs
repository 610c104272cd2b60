mod common;

use testshift::generator::{
    EmissionOrigin, GenerationContext, Generator, PlaywrightPythonGenerator, PlaywrightTsGenerator,
    PytestRequestsGenerator, Section, TODO_MARKER, builtin_generators,
};
use testshift::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, Locator, TestIntent, Value,
};
use testshift::intent::{Dialect, TestKind};
use testshift::registry::api_mapping::{ApiMapping, ApiMappingRegistry};
use testshift::{ValidationLevel, Validator};

fn ui_intent() -> TestIntent {
    let mut intent = TestIntent::new("should login", Dialect::SeleniumJava, TestKind::Ui);
    intent.metadata.insert("suite".to_string(), "LoginTest".to_string());
    intent.push_step(
        ActionIntent::new(ActionType::Navigate, 3, "driver.get(\"/login\");").with_param(Value::text("/login")),
    );
    intent.push_step(
        ActionIntent::new(ActionType::Fill, 4, "user.sendKeys(\"alice\");")
            .with_target(Locator::id("username"))
            .with_param(Value::text("alice")),
    );
    intent.push_step(
        ActionIntent::new(ActionType::Click, 5, "submit.click();")
            .with_target(Locator::role("button", Some("Sign in".to_string()))),
    );
    intent.push_assertion(
        AssertionIntent::new(AssertionType::TextEquals, 6, "assertEquals(\"Hi\", h.getText());")
            .with_target(Locator::css("h1"))
            .with_expected(Value::text("Hi")),
    );
    intent
}

fn api_intent() -> TestIntent {
    let mut intent = TestIntent::new("create user", Dialect::RestAssured, TestKind::Api);
    intent.metadata.insert("base_url".to_string(), "https://api.example.com".to_string());
    intent.push_step(
        ActionIntent::new(ActionType::Request(HttpMethod::Post), 10, "given().body(p).post(\"/users\")")
            .with_param(Value::text("/users"))
            .with_param(Value::Header {
                name: "Accept".to_string(),
                value: "application/json".to_string(),
            })
            .with_param(Value::Body("{\"name\": \"bob\"}".to_string())),
    );
    intent.push_assertion(
        AssertionIntent::new(AssertionType::StatusCode, 11, ".statusCode(201)").with_expected(Value::Integer(201)),
    );
    intent.push_assertion(
        AssertionIntent::new(AssertionType::ResponseBodyPath, 12, ".body(\"name\", equalTo(\"bob\"))")
            .with_kv("path", "name")
            .with_kv("matcher", "equals")
            .with_expected(Value::text("bob")),
    );
    intent
}

fn ctx(mappings: &ApiMappingRegistry, source: Dialect) -> GenerationContext<'_> {
    GenerationContext {
        source,
        threshold: 0.7,
        mappings,
    }
}

// ============================================================================
// Playwright TypeScript
// ============================================================================

#[test]
fn typescript_file_has_imports_suite_and_steps() {
    let mappings = ApiMappingRegistry::with_builtins();
    let generator = PlaywrightTsGenerator;
    let test = generator.generate(&ui_intent(), &ctx(&mappings, Dialect::SeleniumJava));
    let code = generator.render_file(&[test], None);

    assert!(code.starts_with("import { test, expect } from '@playwright/test';"));
    assert!(code.contains("test.describe('LoginTest', () => {"));
    assert!(code.contains("test('should login', async ({ page }) => {"));
    assert!(code.contains("await page.goto('/login');"));
    assert!(code.contains("await page.locator('#username').fill('alice');"));
    assert!(code.contains("await page.getByRole('button', { name: 'Sign in' }).click();"));
    assert!(code.contains("await expect(page.locator('h1')).toHaveText('Hi');"));
    assert!(Validator::check(&code, Dialect::PlaywrightTs).is_empty());
}

#[test]
fn low_confidence_emissions_get_a_marker_and_todo() {
    let mut intent = ui_intent();
    intent.steps[2].confidence = 0.5;
    let mappings = ApiMappingRegistry::new();
    let test = PlaywrightTsGenerator.generate(&intent, &ctx(&mappings, Dialect::SeleniumJava));

    assert_eq!(test.todos.len(), 1);
    assert_eq!(test.todos[0].source_line, 5);
    assert_eq!(test.todos[0].section, Section::Body);
    assert!(test.todos[0].text.contains("should login: line 5 (confidence 0.50)"));
    assert!(test.body.iter().any(|l| l.contains(TODO_MARKER) && l.contains("source line 5")));
    assert_eq!(test.min_confidence(), 0.5);
}

#[test]
fn unknown_raw_steps_pass_through_as_comments() {
    let mut intent = ui_intent();
    intent.push_step(ActionIntent::unsupported(
        7,
        "driver.manage().window().maximize();",
        "driver.manage.window.maximize",
    ));
    let mappings = ApiMappingRegistry::with_builtins();
    let test = PlaywrightTsGenerator.generate(&intent, &ctx(&mappings, Dialect::SeleniumJava));

    assert!(test
        .body
        .iter()
        .any(|l| l == "// untranslated: driver.manage().window().maximize();"));
    let pass_through: Vec<_> = test
        .emissions
        .iter()
        .filter(|e| e.origin == EmissionOrigin::PassThrough)
        .collect();
    assert_eq!(pass_through.len(), 1);
    assert_eq!(pass_through[0].confidence, 0.0);
    assert_eq!(test.todos.len(), 1);
}

#[test]
fn assertions_with_a_registered_shape_use_the_mapping() {
    let mut intent = ui_intent();
    intent.push_assertion(
        AssertionIntent::new(AssertionType::TextContains, 7, "assertThat(banner).contains(\"Welcome\");")
            .with_expected(Value::text("Welcome"))
            .with_confidence(0.4)
            .with_shape("assertThat.contains"),
    );
    let mut mappings = ApiMappingRegistry::new();
    mappings.register(ApiMapping::new(
        Dialect::SeleniumJava,
        Dialect::PlaywrightTs,
        "assertThat.contains",
        "await expect(page.locator('.banner')).toContainText({arg0});",
        0.9,
    ));
    let test = PlaywrightTsGenerator.generate(&intent, &ctx(&mappings, Dialect::SeleniumJava));

    assert!(test
        .body
        .iter()
        .any(|l| l == "await expect(page.locator('.banner')).toContainText('Welcome');"));
    let mapped: Vec<_> = test.emissions.iter().filter(|e| e.origin == EmissionOrigin::Mapping).collect();
    assert_eq!(mapped.len(), 1);
    assert_eq!(mapped[0].source_line, 7);
    assert_eq!(mapped[0].confidence, 0.9);
    assert!(test.todos.is_empty());

    // Without the mapping the same assertion falls back to native lowering
    let native = PlaywrightTsGenerator.generate(&intent, &ctx(&ApiMappingRegistry::new(), Dialect::SeleniumJava));
    assert!(native.emissions.iter().all(|e| e.origin != EmissionOrigin::Mapping));
}

#[test]
fn mapped_shapes_use_the_registry_template() {
    let mut intent = ui_intent();
    intent.teardown_steps.push(
        ActionIntent::unsupported(20, "driver.quit();", "driver.quit"),
    );
    let mappings = ApiMappingRegistry::with_builtins();
    let generator = PlaywrightTsGenerator;
    let test = generator.generate(&intent, &ctx(&mappings, Dialect::SeleniumJava));

    let teardown: Vec<_> = test.emissions_in(Section::Teardown).collect();
    assert_eq!(teardown.len(), 1);
    assert_eq!(teardown[0].origin, EmissionOrigin::Mapping);
    assert_eq!(teardown[0].confidence, 1.0);
    assert!(test.todos.is_empty());

    let code = generator.render_file(&[test], None);
    assert!(code.contains("test.afterEach(async ({ page }) => {"));
    assert!(code.contains("browser lifecycle is managed by the Playwright test runner"));
}

#[test]
fn typescript_api_tests_use_the_request_fixture() {
    let generator = PlaywrightTsGenerator;
    let mappings = ApiMappingRegistry::new();
    let test = generator.generate(&api_intent(), &ctx(&mappings, Dialect::RestAssured));
    let code = generator.render_file(&[test], None);

    assert!(code.contains("test.use({ baseURL: 'https://api.example.com' });"));
    assert!(code.contains("async ({ request }) =>"));
    assert!(code.contains(
        "const response = await request.post('/users', { headers: { 'Accept': 'application/json' }, data: {\"name\":\"bob\"} });"
    ));
    assert!(code.contains("expect(response.status()).toBe(201);"));
    assert!(code.contains("expect((await response.json()).name).toEqual('bob');"));
}

#[test]
fn header_comment_is_prefixed() {
    let generator = PlaywrightTsGenerator;
    let mappings = ApiMappingRegistry::new();
    let test = generator.generate(&ui_intent(), &ctx(&mappings, Dialect::SeleniumJava));
    let code = generator.render_file(&[test], Some("Translated by testshift\nConfidence: 1.00"));
    assert!(code.starts_with("// Translated by testshift\n// Confidence: 1.00\n\n"));
}

// ============================================================================
// Playwright Python
// ============================================================================

#[test]
fn python_playwright_file_is_valid_and_complete() {
    let generator = PlaywrightPythonGenerator;
    let mappings = ApiMappingRegistry::new();
    let test = generator.generate(&ui_intent(), &ctx(&mappings, Dialect::SeleniumJava));
    assert_eq!(test.function_name, "test_should_login");
    let code = generator.render_file(&[test], None);

    assert!(code.contains("from playwright.sync_api import Page, expect"));
    assert!(code.contains("def test_should_login(page: Page):"));
    assert!(code.contains("    page.goto(\"/login\")"));
    assert!(code.contains("    page.locator(\"#username\").fill(\"alice\")"));
    assert!(code.contains("    page.get_by_role(\"button\", name=\"Sign in\").click()"));
    assert!(code.contains("    expect(page.locator(\"h1\")).to_have_text(\"Hi\")"));
    assert!(Validator::check(&code, Dialect::PlaywrightPython).is_empty());
}

#[test]
fn python_playwright_hooks_become_an_autouse_fixture() {
    let mut intent = ui_intent();
    intent.setup_steps.push(
        ActionIntent::new(ActionType::Navigate, 2, "driver.get(\"/\");").with_param(Value::text("/")),
    );
    let generator = PlaywrightPythonGenerator;
    let mappings = ApiMappingRegistry::new();
    let code = generator.render_file(&[generator.generate(&intent, &ctx(&mappings, Dialect::SeleniumJava))], None);

    assert!(code.contains("import pytest"));
    assert!(code.contains("@pytest.fixture(autouse=True)\ndef setup_and_teardown(page: Page):\n    page.goto(\"/\")\n    yield\n"));
    assert_eq!(
        Validator::gate(ValidationLevel::Strict, &code, Dialect::PlaywrightPython),
        testshift::validate::GateOutcome::Clean
    );
}

#[test]
fn duplicate_test_names_get_suffixes() {
    let generator = PlaywrightPythonGenerator;
    let mappings = ApiMappingRegistry::new();
    let a = generator.generate(&ui_intent(), &ctx(&mappings, Dialect::SeleniumJava));
    let b = generator.generate(&ui_intent(), &ctx(&mappings, Dialect::SeleniumJava));
    let code = generator.render_file(&[a, b], None);
    assert!(code.contains("def test_should_login(page: Page):"));
    assert!(code.contains("def test_should_login_2(page: Page):"));
}

// ============================================================================
// pytest + requests
// ============================================================================

#[test]
fn requests_generator_rejects_ui_tests() {
    let generator = PytestRequestsGenerator;
    assert!(!generator.can_generate(&ui_intent()));
    assert!(generator.can_generate(&api_intent()));
    assert!(PlaywrightTsGenerator.can_generate(&api_intent()));
    assert!(!PlaywrightPythonGenerator.can_generate(&api_intent()));
}

#[test]
fn requests_file_uses_base_url_and_timeout() {
    let generator = PytestRequestsGenerator;
    let mappings = ApiMappingRegistry::new();
    let test = generator.generate(&api_intent(), &ctx(&mappings, Dialect::RestAssured));
    let code = generator.render_file(&[test], None);

    assert!(code.starts_with("import os\n\nimport requests\n"));
    assert!(code.contains("BASE_URL = os.environ.get(\"BASE_URL\", \"https://api.example.com\")"));
    assert!(code.contains("TIMEOUT = 30"));
    assert!(code.contains("def test_create_user():"));
    assert!(code.contains(
        "    response = requests.post(BASE_URL + \"/users\", headers={\"Accept\": \"application/json\"}, json={\"name\": \"bob\"}, timeout=TIMEOUT)"
    ));
    assert!(code.contains("    assert response.status_code == 201"));
    assert!(code.contains("    assert response.json()[\"name\"] == \"bob\""));
    assert!(Validator::check(&code, Dialect::PytestRequests).is_empty());
}

#[test]
fn output_file_names_follow_target_conventions() {
    let names: Vec<String> = builtin_generators()
        .iter()
        .map(|g| g.output_file_name("LoginTest"))
        .collect();
    assert_eq!(names, vec!["LoginTest.spec.ts", "test_logintest.py", "test_logintest.py"]);
}
