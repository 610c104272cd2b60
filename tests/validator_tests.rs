mod common;

use testshift::intent::Dialect;
use testshift::validate::{DefectKind, GateOutcome};
use testshift::{ValidationLevel, Validator};

const TS_OK: &str = "import { test, expect } from '@playwright/test';

test('logs in', async ({ page }) => {
  await page.goto('/login');
  await expect(page.getByText('Welcome')).toBeVisible();
});
";

const PY_OK: &str = "from playwright.sync_api import Page, expect


def test_logs_in(page: Page):
    page.goto(\"/login\")
    expect(page.get_by_text(\"Welcome\")).to_be_visible()
";

#[test]
fn well_formed_output_has_no_defects() {
    assert!(Validator::check(TS_OK, Dialect::PlaywrightTs).is_empty());
    assert!(Validator::check(PY_OK, Dialect::PlaywrightPython).is_empty());
}

#[test]
fn expect_without_import_is_reported() {
    let code = TS_OK.replace("import { test, expect }", "import { test }");
    let defects = Validator::check(&code, Dialect::PlaywrightTs);
    assert_eq!(defects.len(), 1);
    assert_eq!(defects[0].kind, DefectKind::MissingImport);
    assert_eq!(defects[0].line, 5);
    assert_eq!(defects[0].message, "'expect' is used but not imported from '@playwright/test'");
    assert_eq!(
        defects[0].to_string(),
        "line 5: 'expect' is used but not imported from '@playwright/test'"
    );
}

#[test]
fn missing_python_module_import_is_reported() {
    let code = "import os\n\n\ndef test_get():\n    response = requests.get(\"http://x\", timeout=30)\n";
    let defects = Validator::check(code, Dialect::PytestRequests);
    assert!(defects
        .iter()
        .any(|d| d.kind == DefectKind::MissingImport && d.message.contains("'requests'") && d.line == 5));
}

#[test]
fn unterminated_string_points_at_its_start() {
    let code = "import { test } from '@playwright/test';\ntest('oops, async () => {});\n";
    let defects = Validator::check(code, Dialect::PlaywrightTs);
    assert!(defects
        .iter()
        .any(|d| d.kind == DefectKind::UnterminatedString && d.line == 2));
}

#[test]
fn unclosed_block_comment_is_reported() {
    let code = "import { test } from '@playwright/test';\n/* start\ntest('a', async () => {});\n";
    let defects = Validator::check(code, Dialect::PlaywrightTs);
    assert!(defects
        .iter()
        .any(|d| d.kind == DefectKind::UnterminatedComment && d.line == 2));
}

#[test]
fn python_indentation_errors_are_found() {
    let code = "import requests\n\n\ndef test_a():\n    x = 1\n      y = 2\n";
    let defects = Validator::check(code, Dialect::PytestRequests);
    assert!(defects
        .iter()
        .any(|d| d.kind == DefectKind::Indentation && d.line == 6));
}

#[test]
fn gherkin_output_is_not_checked() {
    assert!(Validator::check("Feature: ((( unbalanced", Dialect::Gherkin).is_empty());
}

#[test]
fn gate_levels_decide_the_outcome() {
    let broken = "import { test } from '@playwright/test';\ntest('a', async () => {\n";
    assert_eq!(
        Validator::gate(ValidationLevel::Skip, broken, Dialect::PlaywrightTs),
        GateOutcome::Skipped
    );
    assert!(matches!(
        Validator::gate(ValidationLevel::Strict, broken, Dialect::PlaywrightTs),
        GateOutcome::Rejected(defects) if defects.iter().all(|d| d.kind == DefectKind::UnbalancedBracket)
    ));
    assert!(matches!(
        Validator::gate(ValidationLevel::Lenient, broken, Dialect::PlaywrightTs),
        GateOutcome::Warnings(_)
    ));
    assert_eq!(
        Validator::gate(ValidationLevel::Strict, TS_OK, Dialect::PlaywrightTs),
        GateOutcome::Clean
    );
}

#[test]
fn validation_levels_parse_case_insensitively() {
    assert_eq!("STRICT".parse::<ValidationLevel>(), Ok(ValidationLevel::Strict));
    assert_eq!("skip".parse::<ValidationLevel>(), Ok(ValidationLevel::Skip));
    assert!("loose".parse::<ValidationLevel>().is_err());
    assert_eq!(ValidationLevel::default(), ValidationLevel::Lenient);
}
