use std::collections::BTreeSet;

use crate::generator::{
    GeneratedTest, GenerationContext, Generator, Lowered, Lowering, PathSegment, header_block, indent,
    js_string, lower_intent, mentions, page_path, path_segments, regex_escape,
};
use crate::intent::dialect::Dialect;
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, Locator, LocatorStrategy,
    TestIntent, Value,
};

/// TypeScript for `@playwright/test`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaywrightTsGenerator;

impl Generator for PlaywrightTsGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PlaywrightTs
    }

    fn can_generate(&self, _intent: &TestIntent) -> bool {
        // UI, API and BDD all map onto page/request fixtures
        true
    }

    fn generate(&self, intent: &TestIntent, ctx: &GenerationContext<'_>) -> GeneratedTest {
        let mut lowering = TsLowering::default();
        lower_intent(&mut lowering, intent, ctx, intent.test_name.clone())
    }

    fn render_file(&self, tests: &[GeneratedTest], header: Option<&str>) -> String {
        let mut out = header_block("//", header);

        let uses_expect = tests.iter().any(|t| t.uses.contains("expect"));
        out.push_str(if uses_expect {
            "import { test, expect } from '@playwright/test';\n"
        } else {
            "import { test } from '@playwright/test';\n"
        });
        out.push('\n');

        if let Some(base_url) = tests.iter().find_map(|t| t.base_url.as_deref()) {
            out.push_str(&format!("test.use({{ baseURL: {} }});\n\n", js_string(base_url)));
        }

        let suite = common_suite(tests);
        let pad = if suite.is_some() { "  " } else { "" };
        let mut blocks: Vec<String> = Vec::new();

        // Hooks come from the first test; one source file shares them
        if let Some(first) = tests.first() {
            if !first.setup.is_empty() {
                blocks.push(hook("test.beforeEach", &first.setup, pad));
            }
            if !first.teardown.is_empty() {
                blocks.push(hook("test.afterEach", &first.teardown, pad));
            }
        }

        for test in tests {
            let mut block = format!(
                "{}test({}, async ({}) => {{\n",
                pad,
                js_string(&test.function_name),
                fixtures(&test.body)
            );
            block.push_str(&indent(&test.body, &format!("{}  ", pad)));
            block.push_str(&format!("{}}});\n", pad));
            blocks.push(block);
        }

        match suite {
            Some(name) => {
                out.push_str(&format!("test.describe({}, () => {{\n", js_string(name)));
                out.push_str(&blocks.join("\n"));
                out.push_str("});\n");
            }
            None => out.push_str(&blocks.join("\n")),
        }
        out
    }

    fn output_file_name(&self, stem: &str) -> String {
        format!("{}.spec.ts", stem)
    }
}

fn hook(name: &str, lines: &[String], pad: &str) -> String {
    let mut block = format!("{}{}(async ({}) => {{\n", pad, name, fixtures(lines));
    block.push_str(&indent(lines, &format!("{}  ", pad)));
    block.push_str(&format!("{}}});\n", pad));
    block
}

/// Destructured fixture parameter for a block of lines.
fn fixtures(lines: &[String]) -> String {
    let mut names = Vec::new();
    if mentions(lines, "page", "//") {
        names.push("page");
    }
    if mentions(lines, "request", "//") {
        names.push("request");
    }
    if names.is_empty() {
        names.push("page");
    }
    format!("{{ {} }}", names.join(", "))
}

/// Suite name when every test carries the same one.
fn common_suite(tests: &[GeneratedTest]) -> Option<&str> {
    let first = tests.first()?.suite.as_deref()?;
    tests
        .iter()
        .all(|t| t.suite.as_deref() == Some(first))
        .then_some(first)
}

// ============================================================================
// Lowering rules
// ============================================================================

#[derive(Debug, Default)]
struct TsLowering {
    bindings: Vec<(Locator, String)>,
    responses: usize,
    uses: BTreeSet<&'static str>,
}

impl TsLowering {
    fn locator(&self, locator: &Locator) -> String {
        if let Some((_, name)) = self.bindings.iter().find(|(l, _)| l == locator) {
            return name.clone();
        }
        match locator.strategy {
            LocatorStrategy::Id if is_css_ident(&locator.value) => {
                format!("page.locator({})", js_string(&format!("#{}", locator.value)))
            }
            LocatorStrategy::Id => {
                format!("page.locator({})", js_string(&format!("[id=\"{}\"]", locator.value)))
            }
            LocatorStrategy::Css => format!("page.locator({})", js_string(&locator.value)),
            LocatorStrategy::Xpath => format!("page.locator({})", js_string(&format!("xpath={}", locator.value))),
            LocatorStrategy::Text => format!("page.getByText({})", js_string(&locator.value)),
            LocatorStrategy::Name => {
                format!("page.locator({})", js_string(&format!("[name=\"{}\"]", locator.value)))
            }
            LocatorStrategy::Role => match &locator.name {
                Some(name) => format!(
                    "page.getByRole({}, {{ name: {} }})",
                    js_string(&locator.value),
                    js_string(name)
                ),
                None => format!("page.getByRole({})", js_string(&locator.value)),
            },
        }
    }

    fn element(&self, target: Option<&Locator>) -> Option<String> {
        target.map(|l| self.locator(l))
    }

    fn response_var(&self) -> String {
        match self.responses {
            0 | 1 => "response".to_string(),
            n => format!("response{}", n),
        }
    }

    fn expect(&mut self, subject: &str, negated: bool, matcher: &str) -> String {
        self.uses.insert("expect");
        let not = if negated { ".not" } else { "" };
        format!("await expect({}){}.{};", subject, not, matcher)
    }

    fn expect_value(&mut self, subject: &str, negated: bool, matcher: &str) -> String {
        self.uses.insert("expect");
        let not = if negated { ".not" } else { "" };
        format!("expect({}){}.{};", subject, not, matcher)
    }

    fn request(&mut self, step: &ActionIntent, method: HttpMethod) -> Option<Lowered> {
        let url = step.parameters.first()?;
        let mut headers = Vec::new();
        let mut params = Vec::new();
        let mut data = None;
        let mut notes = Vec::new();
        for value in &step.parameters[1..] {
            match value {
                Value::Header { name, value } => headers.push(format!("{}: {}", js_string(name), js_string(value))),
                Value::Query { name, value } => params.push(format!("{}: {}", js_string(name), js_string(value))),
                Value::Body(body) => data = Some(js_body(body)),
                other => notes.push(format!("// request option not translated: {}", other.describe())),
            }
        }

        let mut options = Vec::new();
        if method == HttpMethod::Options {
            options.push("method: 'OPTIONS'".to_string());
        }
        if !headers.is_empty() {
            options.push(format!("headers: {{ {} }}", headers.join(", ")));
        }
        if !params.is_empty() {
            options.push(format!("params: {{ {} }}", params.join(", ")));
        }
        if let Some(data) = data {
            options.push(format!("data: {}", data));
        }

        let call = match method {
            HttpMethod::Options => "fetch",
            m => m.lower(),
        };
        let args = if options.is_empty() {
            self.literal(url)
        } else {
            format!("{}, {{ {} }}", self.literal(url), options.join(", "))
        };

        self.responses += 1;
        let mut code = notes;
        code.push(format!("const {} = await request.{}({});", self.response_var(), call, args));
        Some(Lowered::lines(code, step.confidence))
    }

    fn raw_step(&mut self, step: &ActionIntent) -> Option<Lowered> {
        let tags = &step.semantic_tags;
        let c = step.confidence;

        if let Some(name) = tags.get("const") {
            let value = step.parameters.first()?;
            return Some(Lowered::new(format!("const {} = {};", name, self.literal(value)), c));
        }
        if let Some(key) = tags.get("config") {
            let value = step.parameters.first().map(Value::describe).unwrap_or_default();
            return Some(match key {
                "base_url" => Lowered::new(format!("// base URL {} is applied with test.use({{ baseURL }})", value), c),
                _ => Lowered::new(format!("// {} = {}: set this in playwright.config", key, value), c.min(0.5)),
            });
        }
        if let Some(name) = tags.get("binding") {
            let locator = step.target.as_ref()?;
            let code = format!("const {} = {};", name, self.locator(locator));
            self.bindings.push((locator.clone(), name.to_string()));
            return Some(Lowered::new(code, c));
        }
        if tags.get("alias") == Some("driver") {
            return Some(Lowered::new("// driver alias: the page fixture is used directly", c));
        }
        if let Some(key) = tags.get("press") {
            let target = self.element(step.target.as_ref())?;
            return Some(Lowered::new(format!("await {}.press({});", target, js_string(key)), c));
        }
        match tags.get("extract") {
            Some("path") => {
                let var = tags.get("var")?;
                let path = step.text_param()?;
                let response = self.response_var();
                return Some(Lowered::new(
                    format!("const {} = {};", var, json_access(&format!("(await {}.json())", response), path)),
                    c,
                ));
            }
            Some("status") => {
                let var = tags.get("var")?;
                return Some(Lowered::new(format!("const {} = {}.status();", var, self.response_var()), c));
            }
            _ => {}
        }
        None
    }

    fn query(&self, step: &ActionIntent) -> Option<String> {
        let tags = &step.semantic_tags;
        let target = self.element(step.target.as_ref());
        Some(match tags.get("query").unwrap_or("text") {
            "title" => "await page.title()".to_string(),
            "url" => "page.url()".to_string(),
            "attribute" => format!(
                "await {}.getAttribute({})",
                target?,
                js_string(tags.get("attribute").unwrap_or_default())
            ),
            "count" => format!("await {}.count()", target?),
            "displayed" => format!("await {}.isVisible()", target?),
            "enabled" => format!("await {}.isEnabled()", target?),
            "selected" => format!("await {}.isChecked()", target?),
            _ => format!("await {}.innerText()", target?),
        })
    }
}

impl Lowering for TsLowering {
    fn target(&self) -> Dialect {
        Dialect::PlaywrightTs
    }

    fn comment(&self) -> &'static str {
        "//"
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Text(s) | Value::Raw(s) => js_string(s),
            Value::Integer(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DurationMs(ms) => ms.to_string(),
            Value::Header { name, value } | Value::Query { name, value } => {
                format!("{{ {}: {} }}", js_string(name), js_string(value))
            }
            Value::Body(body) => js_body(body),
        }
    }

    fn step(&mut self, step: &ActionIntent) -> Option<Lowered> {
        let tags = &step.semantic_tags;
        let c = step.confidence;

        let code = match step.action_type {
            ActionType::Navigate => {
                let url = step.parameters.first()?;
                let url = if tags.has("page_name") {
                    js_string(&page_path(&url.describe()))
                } else {
                    self.literal(url)
                };
                format!("await page.goto({});", url)
            }
            ActionType::Click => {
                let target = self.element(step.target.as_ref())?;
                if tags.get("clicks") == Some("2") {
                    format!("await {}.dblclick();", target)
                } else if tags.get("button") == Some("right") {
                    format!("await {}.click({{ button: 'right' }});", target)
                } else {
                    format!("await {}.click();", target)
                }
            }
            ActionType::Fill => {
                let target = self.element(step.target.as_ref())?;
                let value = step.parameters.first()?;
                let mut code = vec![format!("await {}.fill({});", target, self.literal(value))];
                if let Some(key) = tags.get("press") {
                    code.push(format!("await {}.press({});", target, js_string(key)));
                }
                return Some(Lowered::lines(code, c));
            }
            ActionType::Clear => format!("await {}.clear();", self.element(step.target.as_ref())?),
            ActionType::Select => {
                let target = self.element(step.target.as_ref())?;
                let value = step.parameters.first()?;
                let option = match tags.get("by") {
                    Some("index") => format!("{{ index: {} }}", self.literal(value)),
                    Some("value") => self.literal(value),
                    _ => format!("{{ label: {} }}", self.literal(value)),
                };
                format!("await {}.selectOption({});", target, option)
            }
            ActionType::Check => format!("await {}.check();", self.element(step.target.as_ref())?),
            ActionType::Uncheck => format!("await {}.uncheck();", self.element(step.target.as_ref())?),
            ActionType::GetText => {
                let query = self.query(step)?;
                match tags.get("var") {
                    Some(var) => format!("const {} = {};", var, query),
                    None => format!("{};", query),
                }
            }
            ActionType::Wait => {
                let Some(locator) = step.target.as_ref() else {
                    return Some(match tags.get("wait") {
                        Some("driver") | Some("implicit") => {
                            Lowered::new("// explicit wait dropped: Playwright waits for actionability", c)
                        }
                        _ => Lowered::new("await page.waitForLoadState();", c.min(0.5)),
                    });
                };
                let target = self.locator(locator);
                let state = match tags.get("wait") {
                    Some("hidden") => "{ state: 'hidden' }",
                    Some("present") => "{ state: 'attached' }",
                    _ => "",
                };
                let mut code = vec![format!("await {}.waitFor({});", target, state)];
                if let Some(name) = tags.get("binding") {
                    code.insert(0, format!("const {} = {};", name, target));
                    self.bindings.push((locator.clone(), name.to_string()));
                    code[1] = format!("await {}.waitFor({});", name, state);
                }
                return Some(Lowered::lines(code, c));
            }
            ActionType::Sleep => {
                let duration = step.parameters.first()?;
                format!("await page.waitForTimeout({});", self.literal(duration))
            }
            ActionType::Reload => "await page.reload();".to_string(),
            ActionType::GoBack => "await page.goBack();".to_string(),
            ActionType::GoForward => "await page.goForward();".to_string(),
            ActionType::Request(method) => return self.request(step, method),
            ActionType::Raw => return self.raw_step(step),
        };
        Some(Lowered::new(code, c))
    }

    fn assertion(&mut self, a: &AssertionIntent) -> Option<Lowered> {
        let tags = &a.semantic_tags;
        let negated = tags.has("negated");
        let c = a.confidence;
        let expected = a.expected_value.as_ref().map(|v| self.literal(v));
        let target = self.element(a.target.as_ref());

        let code = match a.assertion_type {
            AssertionType::Visible => self.expect(&target?, negated, "toBeVisible()"),
            AssertionType::Hidden => self.expect(&target?, negated, "toBeHidden()"),
            AssertionType::Exists => self.expect(&format!("{}.first()", target?), negated, "toBeAttached()"),
            AssertionType::TextEquals => match tags.get("subject") {
                Some("title") => self.expect("page", negated, &format!("toHaveTitle({})", expected?)),
                Some("url") => self.expect("page", negated, &format!("toHaveURL({})", expected?)),
                _ => self.expect(&target?, negated, &format!("toHaveText({})", expected?)),
            },
            AssertionType::TextContains => match tags.get("subject") {
                Some("title") => self.expect_value("await page.title()", negated, &format!("toContain({})", expected?)),
                Some("url") => self.expect_value("page.url()", negated, &format!("toContain({})", expected?)),
                _ => self.expect(&target?, negated, &format!("toContainText({})", expected?)),
            },
            AssertionType::ValueEquals => self.expect(&target?, negated, &format!("toHaveValue({})", expected?)),
            AssertionType::Checked => self.expect(&target?, negated, "toBeChecked()"),
            AssertionType::Enabled => self.expect(&target?, negated, "toBeEnabled()"),
            AssertionType::Disabled => self.expect(&target?, negated, "toBeDisabled()"),
            AssertionType::HasClass => {
                let class = a.expected_value.as_ref()?.describe();
                let matcher = if tags.has("exact") {
                    format!("toHaveClass({})", js_string(&class))
                } else {
                    format!("toHaveClass(/(^|\\s){}(\\s|$)/)", regex_escape(&class))
                };
                self.expect(&target?, negated, &matcher)
            }
            AssertionType::HasAttr => {
                if let Some(header) = tags.get("header") {
                    let subject = format!("{}.headers()[{}]", self.response_var(), js_string(&header.to_lowercase()));
                    let matcher = body_matcher(tags.get("matcher"), expected.as_deref())?;
                    self.expect_value(&subject, negated, &matcher)
                } else {
                    let attr = js_string(tags.get("attr")?);
                    let matcher = match expected {
                        Some(e) => format!("toHaveAttribute({}, {})", attr, e),
                        None => format!("toHaveAttribute({})", attr),
                    };
                    self.expect(&target?, negated, &matcher)
                }
            }
            AssertionType::LengthEquals => self.expect(&target?, negated, &format!("toHaveCount({})", expected?)),
            AssertionType::StatusCode => {
                let subject = format!("{}.status()", self.response_var());
                self.expect_value(&subject, negated, &format!("toBe({})", expected?))
            }
            AssertionType::ResponseBodyPath => {
                let body = format!("(await {}.json())", self.response_var());
                let subject = match tags.get("path") {
                    Some(path) => json_access(&body, path),
                    None => body,
                };
                let matcher = body_matcher(tags.get("matcher"), expected.as_deref())?;
                self.expect_value(&subject, negated, &matcher)
            }
        };
        Some(Lowered::new(code, c))
    }

    fn uses(&self) -> BTreeSet<&'static str> {
        self.uses.clone()
    }
}

fn body_matcher(matcher: Option<&str>, expected: Option<&str>) -> Option<String> {
    Some(match matcher.unwrap_or("equals") {
        "present" => "toBeDefined()".to_string(),
        "length" => format!("toHaveLength({})", expected?),
        "contains" => format!("toContain({})", expected?),
        _ => format!("toEqual({})", expected?),
    })
}

/// JSON request bodies stay object literals; anything else is a string.
fn js_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            serde_json::to_string(&value).unwrap_or_else(|_| js_string(body))
        }
        _ => js_string(body),
    }
}

fn json_access(base: &str, path: &str) -> String {
    let mut out = base.to_string();
    for segment in path_segments(path) {
        match segment {
            PathSegment::Key(key) if is_js_ident(&key) => {
                out.push('.');
                out.push_str(&key);
            }
            PathSegment::Key(key) => out.push_str(&format!("[{}]", js_string(&key))),
            PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}

fn is_js_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_locators() {
        let lowering = TsLowering::default();
        assert_eq!(lowering.locator(&Locator::id("user")), "page.locator('#user')");
        assert_eq!(lowering.locator(&Locator::id("a.b")), "page.locator('[id=\"a.b\"]')");
        assert_eq!(
            lowering.locator(&Locator::role("button", Some("Sign in".to_string()))),
            "page.getByRole('button', { name: 'Sign in' })"
        );
        assert_eq!(lowering.locator(&Locator::xpath("//div")), "page.locator('xpath=//div')");
    }

    #[test]
    fn accesses_json_paths() {
        assert_eq!(json_access("body", "data.items[0].first-name"), "body.data.items[0]['first-name']");
    }

    #[test]
    fn keeps_json_bodies_as_objects() {
        assert_eq!(js_body("{\"name\": \"bob\"}"), "{\"name\":\"bob\"}");
        assert_eq!(js_body("plain"), "'plain'");
    }
}
