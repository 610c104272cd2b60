use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intent::dialect::Dialect;

/// One point-to-point call translation.
///
/// `target_template` may reference the source call's arguments as `{arg0}`,
/// `{arg1}`, ... which the generator fills with target-language literals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMapping {
    pub source_dialect: Dialect,
    pub target_dialect: Dialect,
    pub source_call_shape: String,
    pub target_template: String,
    #[serde(default = "default_hint")]
    pub confidence_hint: f32,
}

fn default_hint() -> f32 {
    1.0
}

impl ApiMapping {
    pub fn new(
        source_dialect: Dialect,
        target_dialect: Dialect,
        source_call_shape: &str,
        target_template: &str,
        confidence_hint: f32,
    ) -> Self {
        Self {
            source_dialect,
            target_dialect,
            source_call_shape: source_call_shape.to_string(),
            target_template: target_template.to_string(),
            confidence_hint,
        }
    }

    /// Fill the template placeholders. `None` when the template needs an
    /// argument the call did not supply.
    pub fn render(&self, args: &[String]) -> Option<String> {
        render_template(&self.target_template, args)
    }
}

type MappingKey = (Dialect, Dialect, String);

/// Keyed table of `ApiMapping`s. Populated at setup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ApiMappingRegistry {
    mappings: BTreeMap<MappingKey, ApiMapping>,
}

impl ApiMappingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the shipped dialect pairs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for mapping in builtin_mappings() {
            registry.register(mapping);
        }
        registry
    }

    /// Add a mapping. A later registration for the same key replaces the
    /// earlier one.
    pub fn register(&mut self, mapping: ApiMapping) {
        let key = (
            mapping.source_dialect,
            mapping.target_dialect,
            mapping.source_call_shape.clone(),
        );
        if self.mappings.contains_key(&key) {
            debug!(shape = %mapping.source_call_shape, "replacing api mapping");
        }
        self.mappings.insert(key, mapping);
    }

    pub fn lookup(&self, source: Dialect, target: Dialect, shape: &str) -> Option<&ApiMapping> {
        self.mappings.get(&(source, target, shape.to_string()))
    }

    /// All mappings registered for a source call shape, any target.
    pub fn for_shape(&self, source: Dialect, shape: &str) -> Vec<&ApiMapping> {
        self.mappings
            .values()
            .filter(|m| m.source_dialect == source && m.source_call_shape == shape)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}

/// Replace `{argN}` placeholders.
pub fn render_template(template: &str, args: &[String]) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{arg") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 4..];
        let end = after.find('}')?;
        let index: usize = after[..end].parse().ok()?;
        out.push_str(args.get(index)?);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

// ============================================================================
// Built-in table
// ============================================================================

const TS_LIFECYCLE: &str = "// browser lifecycle is managed by the Playwright test runner";
const PY_LIFECYCLE: &str = "# browser lifecycle is managed by pytest-playwright";

fn builtin_mappings() -> Vec<ApiMapping> {
    use Dialect::*;

    let mut out = Vec::new();

    // (source, shape, playwright-ts template, playwright-python template, hint)
    let ui_rows: &[(Dialect, &str, &str, &str, f32)] = &[
        (SeleniumJava, "driver.manage.deleteAllCookies", "await page.context().clearCookies();", "page.context.clear_cookies()", 1.0),
        (SeleniumJava, "driver.quit", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumJava, "driver.close", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumJava, "driver.create", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumJava, "driver.switchTo.alert.accept", "page.once('dialog', dialog => dialog.accept());", "page.once(\"dialog\", lambda dialog: dialog.accept())", 0.6),
        (SeleniumJava, "driver.switchTo.alert.dismiss", "page.once('dialog', dialog => dialog.dismiss());", "page.once(\"dialog\", lambda dialog: dialog.dismiss())", 0.6),
        (SeleniumJava, "driver.executeScript", "await page.evaluate({arg0});", "page.evaluate({arg0})", 0.6),
        (SeleniumJava, "driver.switchTo.frame", "// switch to frame {arg0}: use page.frameLocator() for the following steps", "# switch to frame {arg0}: use page.frame_locator() for the following steps", 0.4),
        (SeleniumPython, "driver.delete_all_cookies", "await page.context().clearCookies();", "page.context.clear_cookies()", 1.0),
        (SeleniumPython, "driver.quit", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumPython, "driver.close", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumPython, "driver.create", TS_LIFECYCLE, PY_LIFECYCLE, 1.0),
        (SeleniumPython, "driver.switch_to.alert.accept", "page.once('dialog', dialog => dialog.accept());", "page.once(\"dialog\", lambda dialog: dialog.accept())", 0.6),
        (SeleniumPython, "driver.switch_to.alert.dismiss", "page.once('dialog', dialog => dialog.dismiss());", "page.once(\"dialog\", lambda dialog: dialog.dismiss())", 0.6),
        (SeleniumPython, "driver.execute_script", "await page.evaluate({arg0});", "page.evaluate({arg0})", 0.6),
        (Cypress, "cy.clearCookies", "await page.context().clearCookies();", "page.context.clear_cookies()", 1.0),
        (Cypress, "cy.clearLocalStorage", "await page.evaluate(() => localStorage.clear());", "page.evaluate(\"() => localStorage.clear()\")", 0.9),
        (Cypress, "cy.viewport", "await page.setViewportSize({ width: {arg0}, height: {arg1} });", "page.set_viewport_size({\"width\": {arg0}, \"height\": {arg1}})", 0.9),
        (Cypress, "cy.log", "console.log({arg0});", "print({arg0})", 1.0),
        (Cypress, "cy.screenshot", "await page.screenshot();", "page.screenshot()", 0.9),
    ];

    for (source, shape, ts, py, hint) in ui_rows {
        out.push(ApiMapping::new(*source, PlaywrightTs, shape, ts, *hint));
        out.push(ApiMapping::new(*source, PlaywrightPython, shape, py, *hint));
    }

    out.push(ApiMapping::new(
        RestAssured,
        PytestRequests,
        "RestAssured.useRelaxedHTTPSValidation",
        "# TLS verification relaxed: pass verify=False to requests calls that need it",
        0.5,
    ));
    out.push(ApiMapping::new(
        RestAssured,
        PlaywrightTs,
        "RestAssured.useRelaxedHTTPSValidation",
        "// TLS verification relaxed: set ignoreHTTPSErrors in playwright.config",
        0.5,
    ));

    out
}
