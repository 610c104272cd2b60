use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::generator::playwright_python::{body_check, py_literal};
use crate::generator::{
    GeneratedTest, GenerationContext, Generator, Lowered, Lowering, header_block, indent, lower_intent,
    py_json_access, py_json_literal, py_string, python_block, snake_case, unique_name,
};
use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, TestIntent, Value,
};

/// Fallback when neither the source nor the environment names a server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Seconds passed as `timeout=` on every call.
pub const REQUEST_TIMEOUT_SECS: u32 = 30;

static MODULE_ASSIGNMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]* = [^(]*$").expect("assignment regex"));

/// Plain pytest functions over `requests`. API tests only.
#[derive(Debug, Default, Clone, Copy)]
pub struct PytestRequestsGenerator;

impl Generator for PytestRequestsGenerator {
    fn dialect(&self) -> Dialect {
        Dialect::PytestRequests
    }

    fn can_generate(&self, intent: &TestIntent) -> bool {
        match intent.test_kind {
            TestKind::Api => true,
            TestKind::Bdd => intent.infer_kind() == TestKind::Api,
            TestKind::Ui => false,
        }
    }

    fn generate(&self, intent: &TestIntent, ctx: &GenerationContext<'_>) -> GeneratedTest {
        let mut lowering = RequestsLowering::default();
        let name = format!("test_{}", snake_case(&intent.test_name));
        lower_intent(&mut lowering, intent, ctx, name)
    }

    fn render_file(&self, tests: &[GeneratedTest], header: Option<&str>) -> String {
        let mut out = header_block("#", header);

        out.push_str("import os\n");
        if tests.iter().any(|t| t.uses.contains("time")) {
            out.push_str("import time\n");
        }
        out.push_str("\nimport requests\n\n");

        let base_url = tests
            .iter()
            .find_map(|t| t.base_url.as_deref())
            .unwrap_or(DEFAULT_BASE_URL);
        out.push_str(&format!(
            "BASE_URL = os.environ.get(\"BASE_URL\", {})\nTIMEOUT = {}\n",
            py_string(base_url),
            REQUEST_TIMEOUT_SECS
        ));

        let mut blocks = Vec::new();
        if let Some(first) = tests.first() {
            // Constants and comments stay at module scope so every test sees them.
            if first.setup.iter().all(|l| is_module_level(l)) {
                if !first.setup.is_empty() {
                    out.push('\n');
                    for line in &first.setup {
                        out.push_str(line);
                        out.push('\n');
                    }
                }
            } else {
                let mut block = "def setup_function():\n".to_string();
                block.push_str(&indent(&python_block(&first.setup), "    "));
                blocks.push(block);
            }
            if !first.teardown.is_empty() {
                let mut block = "def teardown_function():\n".to_string();
                block.push_str(&indent(&python_block(&first.teardown), "    "));
                blocks.push(block);
            }
        }

        let mut taken = BTreeSet::new();
        for test in tests {
            let name = unique_name(test.function_name.clone(), &mut taken);
            let mut block = format!("def {}():\n", name);
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

fn is_module_level(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#') || MODULE_ASSIGNMENT.is_match(line)
}

// ============================================================================
// Lowering rules
// ============================================================================

#[derive(Debug, Default)]
struct RequestsLowering {
    uses: BTreeSet<&'static str>,
}

impl RequestsLowering {
    fn url(&self, value: &Value) -> String {
        let path = value.describe();
        if path.starts_with("http://") || path.starts_with("https://") {
            py_string(&path)
        } else if path.is_empty() {
            "BASE_URL".to_string()
        } else if path.starts_with('/') {
            format!("BASE_URL + {}", py_string(&path))
        } else {
            format!("BASE_URL + {}", py_string(&format!("/{}", path)))
        }
    }

    fn request(&mut self, step: &ActionIntent, method: HttpMethod) -> Option<Lowered> {
        let url = step.parameters.first()?;
        let mut args = vec![self.url(url)];
        let mut headers = Vec::new();
        let mut params = Vec::new();
        let mut body = None;
        let mut notes = Vec::new();
        for value in &step.parameters[1..] {
            match value {
                Value::Header { name, value } => headers.push(format!("{}: {}", py_string(name), py_string(value))),
                Value::Query { name, value } => params.push(format!("{}: {}", py_string(name), py_string(value))),
                Value::Body(text) => {
                    body = Some(match py_json_literal(text) {
                        Some(json) => format!("json={}", json),
                        None => format!("data={}", py_string(text)),
                    })
                }
                other => notes.push(format!("# request option not translated: {}", other.describe())),
            }
        }
        if !headers.is_empty() {
            args.push(format!("headers={{{}}}", headers.join(", ")));
        }
        if !params.is_empty() {
            args.push(format!("params={{{}}}", params.join(", ")));
        }
        args.extend(body);
        args.push("timeout=TIMEOUT".to_string());

        let mut code = notes;
        code.push(format!("response = requests.{}({})", method.lower(), args.join(", ")));
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
                "base_url" => Lowered::new(format!("# base URL {} is the BASE_URL default", value), c),
                _ => Lowered::new(format!("# {} = {}: fold this into BASE_URL", key, value), c.min(0.5)),
            });
        }
        match tags.get("extract") {
            Some("path") => {
                let var = tags.get("var")?;
                let path = step.text_param()?;
                Some(Lowered::new(format!("{} = {}", var, py_json_access("response.json()", path)), c))
            }
            Some("status") => Some(Lowered::new(format!("{} = response.status_code", tags.get("var")?), c)),
            _ => None,
        }
    }
}

impl Lowering for RequestsLowering {
    fn target(&self) -> Dialect {
        Dialect::PytestRequests
    }

    fn comment(&self) -> &'static str {
        "#"
    }

    fn literal(&self, value: &Value) -> String {
        py_literal(value)
    }

    fn step(&mut self, step: &ActionIntent) -> Option<Lowered> {
        match step.action_type {
            ActionType::Request(method) => self.request(step, method),
            ActionType::Raw => self.raw_step(step),
            ActionType::Sleep => {
                let ms = match step.parameters.first()? {
                    Value::DurationMs(ms) => *ms,
                    other => u64::try_from(other.as_integer()?).ok()?,
                };
                self.uses.insert("time");
                Some(Lowered::new(format!("time.sleep({})", ms as f64 / 1000.0), step.confidence))
            }
            ActionType::Wait if step.target.is_none() => Some(Lowered::new(
                "# wait dropped: requests calls are synchronous",
                step.confidence.min(0.5),
            )),
            // Browser actions have no counterpart here.
            _ => None,
        }
    }

    fn assertion(&mut self, a: &AssertionIntent) -> Option<Lowered> {
        let tags = &a.semantic_tags;
        let negated = tags.has("negated");
        let expected = a.expected_value.as_ref().map(|v| self.literal(v));
        let (eq, is_in) = if negated { ("!=", "not in") } else { ("==", "in") };

        let code = match a.assertion_type {
            AssertionType::StatusCode => format!("assert response.status_code {} {}", eq, expected?),
            AssertionType::ResponseBodyPath => {
                let subject = match tags.get("path") {
                    Some(path) => py_json_access("response.json()", path),
                    None => "response.json()".to_string(),
                };
                body_check(&subject, tags.get("matcher"), expected, negated)?
            }
            AssertionType::HasAttr => {
                let subject = format!("response.headers.get({})", py_string(tags.get("header")?));
                match tags.get("matcher") {
                    Some("contains") => format!("assert {} {} {}", expected?, is_in, subject),
                    Some("present") => format!("assert {} {} None", subject, if negated { "is" } else { "is not" }),
                    _ => format!("assert {} {} {}", subject, eq, expected?),
                }
            }
            _ => return None,
        };
        Some(Lowered::new(code, a.confidence))
    }

    fn uses(&self) -> BTreeSet<&'static str> {
        self.uses.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_relative_urls_with_base() {
        let lowering = RequestsLowering::default();
        assert_eq!(lowering.url(&Value::text("/users/1")), "BASE_URL + \"/users/1\"");
        assert_eq!(lowering.url(&Value::text("users")), "BASE_URL + \"/users\"");
        assert_eq!(lowering.url(&Value::text("https://api.test/x")), "\"https://api.test/x\"");
    }

    #[test]
    fn module_level_setup_is_assignments_and_comments() {
        assert!(is_module_level("USER_ID = 42"));
        assert!(is_module_level("# base URL is the BASE_URL default"));
        assert!(!is_module_level("response = requests.get(BASE_URL, timeout=TIMEOUT)"));
    }
}
