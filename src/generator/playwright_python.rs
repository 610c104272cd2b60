use std::collections::BTreeSet;

use crate::generator::{
    GeneratedTest, GenerationContext, Generator, Lowered, Lowering, header_block, indent, lower_intent,
    page_path, py_json_access, py_json_literal, py_string, python_block, regex_escape, snake_case,
    unique_name,
};
use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, Locator, LocatorStrategy,
    TestIntent, Value,
};

/// Python for pytest-playwright, sync API.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaywrightPythonGenerator;

impl Generator for PlaywrightPythonGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PlaywrightPython
    }

    fn can_generate(&self, intent: &TestIntent) -> bool {
        matches!(intent.test_kind, TestKind::Ui | TestKind::Bdd)
    }

    fn generate(&self, intent: &TestIntent, ctx: &GenerationContext<'_>) -> GeneratedTest {
        let mut lowering = PyLowering::default();
        let name = format!("test_{}", snake_case(&intent.test_name));
        lower_intent(&mut lowering, intent, ctx, name)
    }

    fn render_file(&self, tests: &[GeneratedTest], header: Option<&str>) -> String {
        let mut out = header_block("#", header);

        let hooks = tests
            .first()
            .filter(|t| !t.setup.is_empty() || !t.teardown.is_empty());
        let base_url = tests.iter().find_map(|t| t.base_url.as_deref());

        let mut imports = Vec::new();
        if tests.iter().any(|t| t.uses.contains("re")) {
            imports.push("import re".to_string());
        }
        if hooks.is_some() || base_url.is_some() {
            imports.push("import pytest".to_string());
        }
        let uses_expect = tests.iter().any(|t| t.uses.contains("expect"));
        imports.push(if uses_expect {
            "from playwright.sync_api import Page, expect".to_string()
        } else {
            "from playwright.sync_api import Page".to_string()
        });
        out.push_str(&imports.join("\n"));
        out.push('\n');

        let mut blocks: Vec<String> = Vec::new();
        if let Some(base_url) = base_url {
            blocks.push(format!(
                "@pytest.fixture(scope=\"session\")\ndef browser_context_args(browser_context_args):\n    return {{**browser_context_args, \"base_url\": {}}}\n",
                py_string(base_url)
            ));
        }
        if let Some(first) = hooks {
            let mut lines = first.setup.clone();
            lines.push("yield".to_string());
            lines.extend(first.teardown.iter().cloned());
            let mut block = "@pytest.fixture(autouse=True)\ndef setup_and_teardown(page: Page):\n".to_string();
            block.push_str(&indent(&lines, "    "));
            blocks.push(block);
        }

        let mut taken = BTreeSet::new();
        for test in tests {
            let name = unique_name(test.function_name.clone(), &mut taken);
            let mut block = format!("def {}(page: Page):\n", name);
            block.push_str(&indent(&python_block(&test.body), "    "));
            blocks.push(block);
        }

        for block in blocks {
            out.push_str("\n\n");
            out.push_str(&block);
        }
        out
    }

    fn output_file_name(&self, stem: &str) -> String {
        format!("test_{}.py", snake_case(stem))
    }
}

// ============================================================================
// Lowering rules
// ============================================================================

#[derive(Debug, Default)]
struct PyLowering {
    bindings: Vec<(Locator, String)>,
    uses: BTreeSet<&'static str>,
}

impl PyLowering {
    fn locator(&self, locator: &Locator) -> String {
        if let Some((_, name)) = self.bindings.iter().find(|(l, _)| l == locator) {
            return name.clone();
        }
        match locator.strategy {
            LocatorStrategy::Id if is_css_ident(&locator.value) => {
                format!("page.locator({})", py_string(&format!("#{}", locator.value)))
            }
            LocatorStrategy::Id => {
                format!("page.locator({})", py_string(&format!("[id=\"{}\"]", locator.value)))
            }
            LocatorStrategy::Css => format!("page.locator({})", py_string(&locator.value)),
            LocatorStrategy::Xpath => format!("page.locator({})", py_string(&format!("xpath={}", locator.value))),
            LocatorStrategy::Text => format!("page.get_by_text({})", py_string(&locator.value)),
            LocatorStrategy::Name => {
                format!("page.locator({})", py_string(&format!("[name=\"{}\"]", locator.value)))
            }
            LocatorStrategy::Role => match &locator.name {
                Some(name) => format!(
                    "page.get_by_role({}, name={})",
                    py_string(&locator.value),
                    py_string(name)
                ),
                None => format!("page.get_by_role({})", py_string(&locator.value)),
            },
        }
    }

    fn element(&self, target: Option<&Locator>) -> Option<String> {
        target.map(|l| self.locator(l))
    }

    fn expect(&mut self, subject: &str, negated: bool, matcher: &str) -> String {
        self.uses.insert("expect");
        let not = if negated { "not_" } else { "" };
        format!("expect({}).{}{}", subject, not, matcher)
    }

    fn request(&mut self, step: &ActionIntent, method: HttpMethod) -> Option<Lowered> {
        let url = step.parameters.first()?;
        let mut args = vec![self.literal(url)];
        let mut headers = Vec::new();
        let mut params = Vec::new();
        let mut notes = Vec::new();
        if method == HttpMethod::Options {
            args.push("method=\"OPTIONS\"".to_string());
        }
        for value in &step.parameters[1..] {
            match value {
                Value::Header { name, value } => headers.push(format!("{}: {}", py_string(name), py_string(value))),
                Value::Query { name, value } => params.push(format!("{}: {}", py_string(name), py_string(value))),
                Value::Body(_) => args.push(format!("data={}", py_literal(value))),
                other => notes.push(format!("# request option not translated: {}", other.describe())),
            }
        }
        if !headers.is_empty() {
            args.push(format!("headers={{{}}}", headers.join(", ")));
        }
        if !params.is_empty() {
            args.push(format!("params={{{}}}", params.join(", ")));
        }

        let call = match method {
            HttpMethod::Options => "fetch",
            m => m.lower(),
        };
        let mut code = notes;
        code.push(format!("response = page.request.{}({})", call, args.join(", ")));
        Some(Lowered::lines(code, step.confidence))
    }

    fn raw_step(&mut self, step: &ActionIntent) -> Option<Lowered> {
        let tags = &step.semantic_tags;
        let c = step.confidence;

        if let Some(name) = tags.get("const") {
            let value = step.parameters.first()?;
            return Some(Lowered::new(format!("{} = {}", name, self.literal(value)), c));
        }
        if let Some(key) = tags.get("config") {
            let value = step.parameters.first().map(Value::describe).unwrap_or_default();
            return Some(match key {
                "base_url" => Lowered::new(format!("# base URL {} is set through browser_context_args", value), c),
                _ => Lowered::new(format!("# {} = {}: configure this in the pytest-playwright options", key, value), c.min(0.5)),
            });
        }
        if let Some(name) = tags.get("binding") {
            let locator = step.target.as_ref()?;
            let code = format!("{} = {}", name, self.locator(locator));
            self.bindings.push((locator.clone(), name.to_string()));
            return Some(Lowered::new(code, c));
        }
        if tags.get("alias") == Some("driver") {
            return Some(Lowered::new("# driver alias: the page fixture is used directly", c));
        }
        if let Some(key) = tags.get("press") {
            let target = self.element(step.target.as_ref())?;
            return Some(Lowered::new(format!("{}.press({})", target, py_string(key)), c));
        }
        match tags.get("extract") {
            Some("path") => {
                let var = tags.get("var")?;
                let path = step.text_param()?;
                Some(Lowered::new(format!("{} = {}", var, py_json_access("response.json()", path)), c))
            }
            Some("status") => Some(Lowered::new(format!("{} = response.status", tags.get("var")?), c)),
            _ => None,
        }
    }

    fn query(&self, step: &ActionIntent) -> Option<String> {
        let tags = &step.semantic_tags;
        let target = self.element(step.target.as_ref());
        Some(match tags.get("query").unwrap_or("text") {
            "title" => "page.title()".to_string(),
            "url" => "page.url".to_string(),
            "attribute" => format!(
                "{}.get_attribute({})",
                target?,
                py_string(tags.get("attribute").unwrap_or_default())
            ),
            "count" => format!("{}.count()", target?),
            "displayed" => format!("{}.is_visible()", target?),
            "enabled" => format!("{}.is_enabled()", target?),
            "selected" => format!("{}.is_checked()", target?),
            _ => format!("{}.inner_text()", target?),
        })
    }
}

impl Lowering for PyLowering {
    fn target(&self) -> Dialect {
        Dialect::PlaywrightPython
    }

    fn comment(&self) -> &'static str {
        "#"
    }

    fn literal(&self, value: &Value) -> String {
        py_literal(value)
    }

    fn step(&mut self, step: &ActionIntent) -> Option<Lowered> {
        let tags = &step.semantic_tags;
        let c = step.confidence;

        let code = match step.action_type {
            ActionType::Navigate => {
                let url = step.parameters.first()?;
                let url = if tags.has("page_name") {
                    py_string(&page_path(&url.describe()))
                } else {
                    self.literal(url)
                };
                format!("page.goto({})", url)
            }
            ActionType::Click => {
                let target = self.element(step.target.as_ref())?;
                if tags.get("clicks") == Some("2") {
                    format!("{}.dblclick()", target)
                } else if tags.get("button") == Some("right") {
                    format!("{}.click(button=\"right\")", target)
                } else {
                    format!("{}.click()", target)
                }
            }
            ActionType::Fill => {
                let target = self.element(step.target.as_ref())?;
                let value = step.parameters.first()?;
                let mut code = vec![format!("{}.fill({})", target, self.literal(value))];
                if let Some(key) = tags.get("press") {
                    code.push(format!("{}.press({})", target, py_string(key)));
                }
                return Some(Lowered::lines(code, c));
            }
            ActionType::Clear => format!("{}.clear()", self.element(step.target.as_ref())?),
            ActionType::Select => {
                let target = self.element(step.target.as_ref())?;
                let value = self.literal(step.parameters.first()?);
                match tags.get("by") {
                    Some("index") => format!("{}.select_option(index={})", target, value),
                    Some("value") => format!("{}.select_option(value={})", target, value),
                    _ => format!("{}.select_option(label={})", target, value),
                }
            }
            ActionType::Check => format!("{}.check()", self.element(step.target.as_ref())?),
            ActionType::Uncheck => format!("{}.uncheck()", self.element(step.target.as_ref())?),
            ActionType::GetText => {
                let query = self.query(step)?;
                match tags.get("var") {
                    Some(var) => format!("{} = {}", var, query),
                    None => query,
                }
            }
            ActionType::Wait => {
                let Some(locator) = step.target.as_ref() else {
                    return Some(match tags.get("wait") {
                        Some("driver") | Some("implicit") => {
                            Lowered::new("# explicit wait dropped: Playwright waits for actionability", c)
                        }
                        _ => Lowered::new("page.wait_for_load_state()", c.min(0.5)),
                    });
                };
                let state = match tags.get("wait") {
                    Some("hidden") => "state=\"hidden\"",
                    Some("present") => "state=\"attached\"",
                    _ => "",
                };
                let mut code = Vec::new();
                let subject = match tags.get("binding") {
                    Some(name) => {
                        code.push(format!("{} = {}", name, self.locator(locator)));
                        self.bindings.push((locator.clone(), name.to_string()));
                        name.to_string()
                    }
                    None => self.locator(locator),
                };
                code.push(format!("{}.wait_for({})", subject, state));
                return Some(Lowered::lines(code, c));
            }
            ActionType::Sleep => format!("page.wait_for_timeout({})", self.literal(step.parameters.first()?)),
            ActionType::Reload => "page.reload()".to_string(),
            ActionType::GoBack => "page.go_back()".to_string(),
            ActionType::GoForward => "page.go_forward()".to_string(),
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
        let (eq, is_in) = if negated { ("!=", "not in") } else { ("==", "in") };

        let code = match a.assertion_type {
            AssertionType::Visible => self.expect(&target?, negated, "to_be_visible()"),
            AssertionType::Hidden => self.expect(&target?, negated, "to_be_hidden()"),
            AssertionType::Exists => self.expect(&format!("{}.first", target?), negated, "to_be_attached()"),
            AssertionType::TextEquals => match tags.get("subject") {
                Some("title") => self.expect("page", negated, &format!("to_have_title({})", expected?)),
                Some("url") => self.expect("page", negated, &format!("to_have_url({})", expected?)),
                _ => self.expect(&target?, negated, &format!("to_have_text({})", expected?)),
            },
            AssertionType::TextContains => match tags.get("subject") {
                Some("title") => format!("assert {} {} page.title()", expected?, is_in),
                Some("url") => format!("assert {} {} page.url", expected?, is_in),
                _ => self.expect(&target?, negated, &format!("to_contain_text({})", expected?)),
            },
            AssertionType::ValueEquals => self.expect(&target?, negated, &format!("to_have_value({})", expected?)),
            AssertionType::Checked => self.expect(&target?, negated, "to_be_checked()"),
            AssertionType::Enabled => self.expect(&target?, negated, "to_be_enabled()"),
            AssertionType::Disabled => self.expect(&target?, negated, "to_be_disabled()"),
            AssertionType::HasClass => {
                let class = a.expected_value.as_ref()?.describe();
                let matcher = if tags.has("exact") {
                    format!("to_have_class({})", py_string(&class))
                } else {
                    self.uses.insert("re");
                    format!("to_have_class(re.compile(r\"(^|\\s){}(\\s|$)\"))", regex_escape(&class))
                };
                self.expect(&target?, negated, &matcher)
            }
            AssertionType::HasAttr => {
                if let Some(header) = tags.get("header") {
                    let subject = format!("response.headers[{}]", py_string(&header.to_lowercase()));
                    match tags.get("matcher") {
                        Some("contains") => format!("assert {} {} {}", expected?, is_in, subject),
                        _ => format!("assert {} {} {}", subject, eq, expected?),
                    }
                } else {
                    let attr = py_string(tags.get("attr")?);
                    let value = match expected {
                        Some(e) => e,
                        None => {
                            self.uses.insert("re");
                            "re.compile(\".*\")".to_string()
                        }
                    };
                    self.expect(&target?, negated, &format!("to_have_attribute({}, {})", attr, value))
                }
            }
            AssertionType::LengthEquals => self.expect(&target?, negated, &format!("to_have_count({})", expected?)),
            AssertionType::StatusCode => format!("assert response.status {} {}", eq, expected?),
            AssertionType::ResponseBodyPath => {
                let subject = match tags.get("path") {
                    Some(path) => py_json_access("response.json()", path),
                    None => "response.json()".to_string(),
                };
                body_check(&subject, tags.get("matcher"), expected, negated)?
            }
        };
        Some(Lowered::new(code, c))
    }

    fn uses(&self) -> BTreeSet<&'static str> {
        self.uses.clone()
    }
}

/// Python literal shared by both Python targets.
pub(crate) fn py_literal(value: &Value) -> String {
    match value {
        Value::Text(s) | Value::Raw(s) => py_string(s),
        Value::Integer(n) => n.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::DurationMs(ms) => ms.to_string(),
        Value::Header { name, value } | Value::Query { name, value } => {
            format!("{{{}: {}}}", py_string(name), py_string(value))
        }
        Value::Body(body) => py_json_literal(body).unwrap_or_else(|| py_string(body)),
    }
}

/// `assert` line for a JSON body matcher.
pub(crate) fn body_check(subject: &str, matcher: Option<&str>, expected: Option<String>, negated: bool) -> Option<String> {
    let (eq, is_in, none) = if negated { ("!=", "not in", "is") } else { ("==", "in", "is not") };
    Some(match matcher.unwrap_or("equals") {
        "present" => format!("assert {} {} None", subject, none),
        "length" => format!("assert len({}) {} {}", subject, eq, expected?),
        "contains" => format!("assert {} {} {}", expected?, is_in, subject),
        _ => format!("assert {} {} {}", subject, eq, expected?),
    })
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
        let lowering = PyLowering::default();
        assert_eq!(lowering.locator(&Locator::id("user")), "page.locator(\"#user\")");
        assert_eq!(
            lowering.locator(&Locator::role("link", Some("Home".to_string()))),
            "page.get_by_role(\"link\", name=\"Home\")"
        );
        assert_eq!(lowering.locator(&Locator::text("Welcome")), "page.get_by_text(\"Welcome\")");
    }

    #[test]
    fn negated_body_checks_flip_operators() {
        assert_eq!(
            body_check("response.json()[\"id\"]", Some("equals"), Some("1".to_string()), true).as_deref(),
            Some("assert response.json()[\"id\"] != 1")
        );
        assert_eq!(
            body_check("response.json()", Some("present"), None, false).as_deref(),
            Some("assert response.json() is not None")
        );
    }
}
