use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, OwnedNode, TestIntent,
    Value,
};
use crate::parser::scan::{SourceFile, TestBlock};
use crate::parser::syntax::{Expr, Lang, Segment, Statement, Stmt};
use crate::parser::{
    ParseError, Parser, finish_intent, hook_step, humanize, literal_value, partition_blocks, shaped, syntax_error,
};

/// Chain links that carry no meaning of their own.
const NOISE: [&str; 10] = [
    "given",
    "with",
    "and",
    "when",
    "log",
    "all",
    "ifValidationFails",
    "ifError",
    "assertThat",
    "using",
];

/// Java REST Assured API tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct RestAssuredParser;

impl Parser for RestAssuredParser {
    fn dialect(&self) -> Dialect {
        Dialect::RestAssured
    }

    fn can_parse(&self, text: &str) -> bool {
        text.contains("io.restassured")
            || (text.contains("given()") && text.contains(".then()") && text.contains(';'))
    }

    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError> {
        if !self.can_parse(text) {
            return Err(ParseError::NotRecognized {
                dialect: self.dialect(),
            });
        }

        let file = SourceFile::parse(text, Lang::Java).map_err(|e| syntax_error(self.dialect(), e))?;
        let (tests, setup, teardown) = partition_blocks(file.blocks());
        if tests.is_empty() {
            return Err(ParseError::MissingTestBoundary {
                dialect: self.dialect(),
                source_label: source_label.to_string(),
            });
        }

        let suite = file.class_name();

        let mut base = ApiClassifier::default();
        let setup_steps = hook_steps(&mut base, &setup);
        let teardown_steps = hook_steps(&mut base.clone(), &teardown);

        let mut intents = Vec::with_capacity(tests.len());
        for block in &tests {
            let mut classifier = base.clone();
            let mut intent = TestIntent::new(humanize(&block.name), self.dialect(), TestKind::Api);
            intent.metadata.insert("source".to_string(), source_label.to_string());
            intent.metadata.insert("method".to_string(), block.name.clone());
            if let Some(suite) = &suite {
                intent.metadata.insert("suite".to_string(), suite.clone());
            }

            for statement in &block.statements {
                for node in classifier.classify(statement) {
                    intent.push(node);
                }
            }
            if let Some(base_url) = &classifier.base_url {
                intent.metadata.insert("base_url".to_string(), base_url.clone());
            }

            debug!(test = %intent.test_name, nodes = intent.node_count(), "parsed rest-assured test");
            intents.push(finish_intent(intent, &setup_steps, &teardown_steps));
        }

        Ok(intents)
    }
}

fn hook_steps(classifier: &mut ApiClassifier, blocks: &[TestBlock]) -> Vec<ActionIntent> {
    let mut steps = Vec::new();
    for block in blocks {
        for statement in &block.statements {
            steps.extend(classifier.classify(statement).into_iter().map(hook_step));
        }
    }
    steps
}

// ============================================================================
// Chain classification
// ============================================================================

/// Request under construction while walking a `given()...get()` chain.
#[derive(Debug, Default)]
struct RequestDraft {
    params: Vec<Value>,
    path_params: Vec<(String, String)>,
    confidence: f32,
}

impl RequestDraft {
    fn new() -> Self {
        Self {
            confidence: 1.0,
            ..Default::default()
        }
    }

    fn lower(&mut self, confidence: f32) {
        self.confidence = self.confidence.min(confidence);
    }
}

#[derive(Debug, Clone, Default)]
struct ApiClassifier {
    constants: BTreeMap<String, Value>,
    responses: BTreeSet<String>,
    base_url: Option<String>,
}

impl ApiClassifier {
    fn classify(&mut self, statement: &Statement) -> Vec<OwnedNode> {
        let raw = statement.text.trim();
        let line = statement.line;
        let stmt = match &statement.parsed {
            Ok(stmt) => stmt,
            Err(err) => {
                trace!(line, error = %err, "unparsed rest-assured statement");
                return vec![unrecognized(line, raw)];
            }
        };

        match stmt {
            Stmt::Assign { target, expr } => vec![self.assignment(target, expr, line, raw)],
            Stmt::Decl { name, expr } => self.declaration(name, expr, line, raw),
            Stmt::Expr(expr) => self.expression(expr, line, raw),
            Stmt::Assert { .. } => vec![unrecognized(line, raw)],
        }
    }

    /// `RestAssured.baseURI = "..."` and friends.
    fn assignment(&mut self, target: &Expr, expr: &Expr, line: usize, raw: &str) -> OwnedNode {
        let shape = target.shape();
        let key = match shape.as_str() {
            "RestAssured.baseURI" => "base_url",
            "RestAssured.basePath" => "base_path",
            "RestAssured.port" => "port",
            _ => return unrecognized(line, raw),
        };

        let (value, confidence) = self.value_of(expr);
        if key == "base_url" {
            if let Value::Text(url) = &value {
                self.base_url = Some(url.clone());
            }
        }
        OwnedNode::Step(
            ActionIntent::new(ActionType::Raw, line, raw)
                .with_kv("config", key)
                .with_param(value)
                .with_confidence(confidence),
        )
    }

    fn declaration(&mut self, name: &str, expr: &Expr, line: usize, raw: &str) -> Vec<OwnedNode> {
        if let Some(value) = literal_value(expr) {
            self.constants.insert(name.to_string(), value.clone());
            return vec![OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw)
                    .with_kv("const", name)
                    .with_param(value),
            )];
        }
        if self.is_chain(expr) {
            let nodes = self.chain(expr, line, raw, Some(name));
            let made_request = nodes.iter().any(|n| {
                matches!(n, OwnedNode::Step(s) if matches!(s.action_type, ActionType::Request(_)))
            });
            if made_request && !nodes.iter().any(|n| n.tags().has("extract")) {
                self.responses.insert(name.to_string());
            }
            return nodes;
        }
        vec![unrecognized(line, raw)]
    }

    fn expression(&mut self, expr: &Expr, line: usize, raw: &str) -> Vec<OwnedNode> {
        let shape = expr.shape();
        if shape.starts_with("RestAssured.") && !shape.starts_with("RestAssured.given") {
            return vec![OwnedNode::Step(ActionIntent::unsupported(line, raw, shape))];
        }
        if let Some(node) = self.assertion_call(expr, line, raw) {
            return vec![shaped(node, &shape)];
        }
        if self.is_chain(expr) {
            return self.chain(expr, line, raw, None);
        }
        vec![unrecognized(line, raw)]
    }

    fn is_chain(&self, expr: &Expr) -> bool {
        let segments = chain_segments(expr);
        let Some(first) = segments.first() else {
            return false;
        };
        match first.name.as_str() {
            "given" | "when" | "with" => first.is_call(),
            name if HttpMethod::from_name(name).is_some() => first.is_call(),
            name => !first.is_call() && self.responses.contains(name),
        }
    }

    /// Walk a request/response chain. The first node takes the statement
    /// line, later ones the line of their own link.
    fn chain(&self, expr: &Expr, line: usize, raw: &str, bind: Option<&str>) -> Vec<OwnedNode> {
        let segments = chain_segments(expr);
        let mut nodes: Vec<OwnedNode> = Vec::new();
        let mut draft = RequestDraft::new();
        let mut then = false;
        let mut extract = false;

        let mut i = 0;
        while i < segments.len() {
            let seg = &segments[i];
            let at = if nodes.is_empty() { line } else { seg.line.max(line) };
            i += 1;

            if !seg.is_call() {
                // Response variable at the chain root
                continue;
            }
            let name = seg.name.as_str();
            if NOISE.contains(&name) {
                continue;
            }
            match name {
                "then" => {
                    then = true;
                    continue;
                }
                "extract" => {
                    extract = true;
                    continue;
                }
                _ => {}
            }

            if extract {
                match name {
                    "response" | "asString" | "body" | "jsonPath" => {}
                    "path" | "getString" | "getInt" | "get" | "getBoolean" | "getList" => {
                        let Some(path) = seg.str_arg(0) else {
                            nodes.push(unrecognized(at, raw));
                            continue;
                        };
                        nodes.push(OwnedNode::Step(
                            ActionIntent::new(ActionType::Raw, at, raw)
                                .with_kv("extract", "path")
                                .with_kv("var", bind.unwrap_or("value"))
                                .with_param(Value::text(path))
                                .with_confidence(0.8),
                        ));
                    }
                    "statusCode" => nodes.push(OwnedNode::Step(
                        ActionIntent::new(ActionType::Raw, at, raw)
                            .with_kv("extract", "status")
                            .with_kv("var", bind.unwrap_or("status"))
                            .with_confidence(0.8),
                    )),
                    _ => nodes.push(unrecognized(at, raw)),
                }
                continue;
            }

            if then {
                let shape = format!("then.{}", name);
                nodes.extend(self.response_check(seg, at, raw).into_iter().map(|n| shaped(n, &shape)));
                continue;
            }

            if let Some(method) = HttpMethod::from_name(name) {
                nodes.push(OwnedNode::Step(self.request(method, seg, &mut draft, at, raw)));
                draft = RequestDraft::new();
                continue;
            }

            match name {
                "auth" => {
                    // `auth().oauth2(t)` / `auth().basic(u, p)` / `auth().preemptive().basic(..)`
                    while let Some(next) = segments.get(i) {
                        i += 1;
                        match next.name.as_str() {
                            "preemptive" => continue,
                            "oauth2" => {
                                let (token, c) = self.arg_text(next, 0);
                                draft.lower(c);
                                draft.params.push(Value::Header {
                                    name: "Authorization".to_string(),
                                    value: format!("Bearer {}", token),
                                });
                            }
                            "basic" => {
                                let (user, _) = self.arg_text(next, 0);
                                let (password, _) = self.arg_text(next, 1);
                                draft.lower(0.5);
                                draft.params.push(Value::Raw(format!("basic auth {}:{}", user, password)));
                            }
                            _ => {
                                draft.lower(0.3);
                                draft.params.push(Value::Raw(format!("auth.{}", next.name)));
                            }
                        }
                        break;
                    }
                }
                _ => {
                    if let Some(c) = self.spec_link(seg, &mut draft) {
                        draft.lower(c);
                    } else {
                        nodes.push(unrecognized(at, raw));
                    }
                }
            }
        }

        if nodes.is_empty() {
            nodes.push(unrecognized(line, raw));
        }
        nodes
    }

    /// Request-spec link such as `header(..)` or `body(..)`. Returns the
    /// confidence it contributes, `None` when the link is unknown.
    fn spec_link(&self, seg: &Segment, draft: &mut RequestDraft) -> Option<f32> {
        match seg.name.as_str() {
            "header" => {
                let (name, c1) = self.arg_text(seg, 0);
                let (value, c2) = self.arg_text(seg, 1);
                draft.params.push(Value::Header { name, value });
                Some(c1.min(c2))
            }
            "headers" if seg.args().len() >= 2 && seg.args().len() % 2 == 0 => {
                let mut c = 1.0_f32;
                for pair in seg.args().chunks(2) {
                    let (name, c1) = self.text_of(&pair[0]);
                    let (value, c2) = self.text_of(&pair[1]);
                    c = c.min(c1).min(c2);
                    draft.params.push(Value::Header { name, value });
                }
                Some(c)
            }
            "queryParam" | "param" => {
                let (name, c1) = self.arg_text(seg, 0);
                let (value, c2) = self.arg_text(seg, 1);
                draft.params.push(Value::Query { name, value });
                Some(c1.min(c2))
            }
            "pathParam" => {
                let (name, c1) = self.arg_text(seg, 0);
                let (value, c2) = self.arg_text(seg, 1);
                draft.path_params.push((name, value));
                Some(c1.min(c2))
            }
            "contentType" | "accept" => {
                let header = if seg.name == "accept" { "Accept" } else { "Content-Type" };
                let (value, c) = seg.arg(0).map(content_type).unwrap_or_default();
                draft.params.push(Value::Header {
                    name: header.to_string(),
                    value,
                });
                Some(c)
            }
            "cookie" => {
                let (name, c1) = self.arg_text(seg, 0);
                let (value, c2) = self.arg_text(seg, 1);
                draft.params.push(Value::Header {
                    name: "Cookie".to_string(),
                    value: format!("{}={}", name, value),
                });
                Some(c1.min(c2).min(0.8))
            }
            "body" => {
                let arg = seg.arg(0)?;
                match self.value_of(arg) {
                    (Value::Text(text), c) => {
                        draft.params.push(Value::Body(text));
                        Some(c)
                    }
                    (other, _) => {
                        draft.params.push(Value::Raw(other.describe()));
                        Some(0.5)
                    }
                }
            }
            "formParam" => {
                let (name, _) = self.arg_text(seg, 0);
                let (value, _) = self.arg_text(seg, 1);
                draft.params.push(Value::Raw(format!("form {}={}", name, value)));
                Some(0.5)
            }
            "relaxedHTTPSValidation" | "urlEncodingEnabled" => {
                draft.params.push(Value::Raw(format!("{}()", seg.name)));
                Some(0.0)
            }
            _ => None,
        }
    }

    fn request(
        &self,
        method: HttpMethod,
        seg: &Segment,
        draft: &mut RequestDraft,
        line: usize,
        raw: &str,
    ) -> ActionIntent {
        let (url, c) = match seg.arg(0) {
            Some(arg) => self.value_of(arg),
            None => (Value::text(""), 0.7),
        };
        draft.lower(c);

        let url = match url {
            Value::Text(mut url) => {
                for (name, value) in &draft.path_params {
                    url = url.replace(&format!("{{{}}}", name), value);
                }
                // Positional path params: get("/users/{id}", 42)
                for arg in seg.args().iter().skip(1) {
                    let (value, c) = self.text_of(arg);
                    draft.lower(c);
                    if let (Some(open), Some(close)) = (url.find('{'), url.find('}')) {
                        if open < close {
                            url.replace_range(open..=close, &value);
                        }
                    }
                }
                Value::Text(url)
            }
            other => other,
        };

        let mut step = ActionIntent::new(ActionType::Request(method), line, raw)
            .with_param(url)
            .with_confidence(draft.confidence);
        step.parameters.append(&mut draft.params);
        step
    }

    /// One `then()` link to assertion nodes.
    fn response_check(&self, seg: &Segment, line: usize, raw: &str) -> Vec<OwnedNode> {
        match seg.name.as_str() {
            "statusCode" => {
                let expected = seg.arg(0).and_then(|a| match matcher(a) {
                    Some(("equals", Some(v), _)) => v.as_integer(),
                    _ => a.as_int(),
                });
                match expected {
                    Some(code) => vec![OwnedNode::Assertion(
                        AssertionIntent::new(AssertionType::StatusCode, line, raw)
                            .with_expected(Value::Integer(code)),
                    )],
                    None => vec![unrecognized(line, raw)],
                }
            }
            "body" => {
                let args = seg.args();
                // body(matcher) checks the whole body
                if args.len() == 1 {
                    return vec![self.body_assertion(None, &args[0], line, raw)];
                }
                args.chunks(2)
                    .map(|pair| match pair {
                        [path, m] => self.body_assertion(path.as_str(), m, line, raw),
                        _ => unrecognized(line, raw),
                    })
                    .collect()
            }
            "header" | "contentType" => {
                let (name, expected_expr) = if seg.name == "contentType" {
                    ("Content-Type".to_string(), seg.arg(0))
                } else {
                    (self.arg_text(seg, 0).0, seg.arg(1))
                };
                let Some(expected_expr) = expected_expr else {
                    return vec![unrecognized(line, raw)];
                };
                let (kind, value, c) = match matcher(expected_expr) {
                    Some((kind, value, c)) => (kind, value, c),
                    None if seg.name == "contentType" => {
                        let (v, c) = content_type(expected_expr);
                        ("contains", Some(Value::Text(v)), c)
                    }
                    None => {
                        let (v, c) = self.value_of(expected_expr);
                        ("equals", Some(v), c)
                    }
                };
                let mut assertion = AssertionIntent::new(AssertionType::HasAttr, line, raw)
                    .with_kv("header", name)
                    .with_kv("matcher", kind)
                    .with_confidence(c);
                if let Some(value) = value {
                    assertion = assertion.with_expected(value);
                }
                vec![OwnedNode::Assertion(assertion)]
            }
            "time" | "statusLine" | "cookie" | "spec" => vec![OwnedNode::Step(ActionIntent::unsupported(
                line,
                raw,
                format!("then.{}", seg.name),
            ))],
            _ => vec![unrecognized(line, raw)],
        }
    }

    fn body_assertion(&self, path: Option<&str>, m: &Expr, line: usize, raw: &str) -> OwnedNode {
        let Some((kind, value, c)) = matcher(m) else {
            return unrecognized(line, raw);
        };
        let mut assertion = AssertionIntent::new(AssertionType::ResponseBodyPath, line, raw)
            .with_kv("matcher", kind)
            .with_confidence(c);
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            assertion = assertion.with_kv("path", path);
        }
        if let Some(value) = value {
            assertion = assertion.with_expected(self.resolve(value));
        }
        OwnedNode::Assertion(assertion)
    }

    /// JUnit/TestNG assertions over a stored response.
    fn assertion_call(&self, expr: &Expr, line: usize, raw: &str) -> Option<OwnedNode> {
        let segments = expr.effective_segments();
        let call = segments.last()?;
        let prefix_ok = segments.len() == 1
            || matches!(segments[0].name.as_str(), "Assert" | "Assertions" | "AssertJUnit");
        if !prefix_ok || !call.name.starts_with("assert") {
            return None;
        }

        let args = call.args();
        let (expected, actual) = match call.name.as_str() {
            "assertEquals" if args.len() >= 2 => (Some(&args[0]), &args[1]),
            "assertNotNull" if !args.is_empty() => (None, &args[0]),
            _ => return Some(unrecognized(line, raw)),
        };

        let root = actual.segments().first()?;
        if !self.responses.contains(&root.name) {
            return Some(unrecognized(line, raw));
        }
        let last = actual.last_segment()?;

        let node = match (last.name.as_str(), expected) {
            ("getStatusCode" | "statusCode", Some(expected)) => {
                let code = expected.as_int()?;
                AssertionIntent::new(AssertionType::StatusCode, line, raw).with_expected(Value::Integer(code))
            }
            ("getString" | "getInt" | "get" | "path" | "getBoolean", expected) => {
                let path = last.str_arg(0)?;
                let base = AssertionIntent::new(AssertionType::ResponseBodyPath, line, raw).with_kv("path", path);
                match expected {
                    Some(expected) => {
                        let (value, c) = self.value_of(expected);
                        base.with_kv("matcher", "equals").with_expected(value).with_confidence(c)
                    }
                    None => base.with_kv("matcher", "present"),
                }
            }
            ("getHeader" | "header", Some(expected)) => {
                let name = last.str_arg(0)?;
                let (value, c) = self.value_of(expected);
                AssertionIntent::new(AssertionType::HasAttr, line, raw)
                    .with_kv("header", name)
                    .with_kv("matcher", "equals")
                    .with_expected(value)
                    .with_confidence(c)
            }
            _ => return Some(unrecognized(line, raw)),
        };
        Some(OwnedNode::Assertion(node))
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    /// Literal or known constant, otherwise the source text at 0.5.
    fn value_of(&self, expr: &Expr) -> (Value, f32) {
        if let Some(value) = literal_value(expr) {
            return (value, 1.0);
        }
        if let Some(value) = expr.as_ident().and_then(|name| self.constants.get(name)) {
            return (value.clone(), 1.0);
        }
        (Value::Raw(expr.to_source()), 0.5)
    }

    fn text_of(&self, expr: &Expr) -> (String, f32) {
        let (value, c) = self.value_of(expr);
        (value.describe(), c)
    }

    fn arg_text(&self, seg: &Segment, index: usize) -> (String, f32) {
        seg.arg(index).map(|a| self.text_of(a)).unwrap_or((String::new(), 0.3))
    }

    fn resolve(&self, value: Value) -> Value {
        match &value {
            Value::Raw(src) => self.constants.get(src).cloned().unwrap_or(value),
            _ => value,
        }
    }
}

/// Chain segments with a leading `RestAssured.` class reference dropped.
fn chain_segments(expr: &Expr) -> &[Segment] {
    let segments = expr.effective_segments();
    match segments.first() {
        Some(first) if first.name == "RestAssured" && !first.is_call() => &segments[1..],
        _ => segments,
    }
}

/// Hamcrest matcher to `(matcher, expected, confidence)`.
fn matcher(expr: &Expr) -> Option<(&'static str, Option<Value>, f32)> {
    if let Some(value) = literal_value(expr) {
        return Some(("equals", Some(value), 1.0));
    }
    let segments = expr.effective_segments();
    let call = match segments {
        [only] => only,
        [class, call] if matches!(class.name.as_str(), "Matchers" | "CoreMatchers") => call,
        _ => return None,
    };
    if !call.is_call() {
        return None;
    }
    let arg = call.arg(0);
    let literal = |c: f32| match arg.and_then(literal_value) {
        Some(value) => (Some(value), c),
        None => (arg.map(|a| Value::Raw(a.to_source())), 0.5),
    };

    match call.name.as_str() {
        "equalTo" => {
            let (v, c) = literal(1.0);
            Some(("equals", v, c))
        }
        "is" => match arg {
            Some(inner) if !inner.segments().is_empty() => matcher(inner),
            _ => {
                let (v, c) = literal(1.0);
                Some(("equals", v, c))
            }
        },
        "hasSize" => {
            let (v, c) = literal(1.0);
            Some(("length", v, c))
        }
        "containsString" | "hasItem" | "hasItems" => {
            let (v, c) = literal(1.0);
            Some(("contains", v, c.min(if call.name == "hasItems" { 0.7 } else { 1.0 })))
        }
        "notNullValue" => Some(("present", None, 1.0)),
        _ => None,
    }
}

/// `ContentType.JSON`, `"application/json"` → header value.
fn content_type(expr: &Expr) -> (String, f32) {
    if let Some(s) = expr.as_str() {
        return (s.to_string(), 1.0);
    }
    match expr.shape().as_str() {
        "ContentType.JSON" => ("application/json".to_string(), 1.0),
        "ContentType.XML" => ("application/xml".to_string(), 1.0),
        "ContentType.TEXT" => ("text/plain".to_string(), 1.0),
        "ContentType.HTML" => ("text/html".to_string(), 1.0),
        "ContentType.URLENC" => ("application/x-www-form-urlencoded".to_string(), 1.0),
        _ => (expr.to_source(), 0.5),
    }
}

fn unrecognized(line: usize, raw: &str) -> OwnedNode {
    OwnedNode::Step(ActionIntent::unrecognized(line, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = r#"
import io.restassured.RestAssured;
import org.junit.jupiter.api.*;
import static io.restassured.RestAssured.given;
import static org.hamcrest.Matchers.*;

public class UserApiTest {
    @BeforeAll
    static void setup() {
        RestAssured.baseURI = "https://api.example.com";
    }

    @Test
    public void getUserById() {
        given()
            .header("Accept", "application/json")
            .queryParam("verbose", "true")
        .when()
            .get("/users/1")
        .then()
            .statusCode(200)
            .body("name", equalTo("Leanne"))
            .body("tags", hasSize(2));
    }

    @Test
    public void createUser() {
        String payload = "{\"name\":\"bob\"}";
        Response response = given().contentType(ContentType.JSON).body(payload).post("/users");
        assertEquals(201, response.getStatusCode());
    }
}
"#;

    #[test]
    fn parses_request_and_response_checks() {
        let intents = RestAssuredParser.parse(SRC, "UserApiTest.java").unwrap();
        assert_eq!(intents.len(), 2);

        let get = &intents[0];
        assert_eq!(get.test_name, "get user by id");
        assert_eq!(get.test_kind, TestKind::Api);
        assert_eq!(get.metadata.get("base_url").map(String::as_str), Some("https://api.example.com"));
        assert_eq!(get.setup_steps.len(), 1);
        assert!(get.setup_steps[0].semantic_tags.has("config"));

        assert_eq!(get.steps.len(), 1);
        let request = &get.steps[0];
        assert_eq!(request.action_type, ActionType::Request(HttpMethod::Get));
        assert_eq!(request.parameters[0], Value::text("/users/1"));
        assert!(request.parameters.contains(&Value::Query {
            name: "verbose".to_string(),
            value: "true".to_string()
        }));

        assert_eq!(get.assertions.len(), 3);
        assert_eq!(get.assertions[0].expected_value, Some(Value::Integer(200)));
        assert_eq!(get.assertions[1].semantic_tags.get("path"), Some("name"));
        assert_eq!(get.assertions[2].semantic_tags.get("matcher"), Some("length"));
        assert_eq!(get.overall_confidence, 1.0);
    }

    #[test]
    fn resolves_constants_and_stored_responses() {
        let intents = RestAssuredParser.parse(SRC, "UserApiTest.java").unwrap();
        let create = &intents[1];
        let request = create
            .steps
            .iter()
            .find(|s| matches!(s.action_type, ActionType::Request(HttpMethod::Post)))
            .unwrap();
        assert!(request.parameters.contains(&Value::Body("{\"name\":\"bob\"}".to_string())));
        assert!(request.parameters.contains(&Value::Header {
            name: "Content-Type".to_string(),
            value: "application/json".to_string()
        }));
        assert_eq!(create.assertions.len(), 1);
        assert_eq!(create.assertions[0].assertion_type, AssertionType::StatusCode);
        assert_eq!(create.assertions[0].expected_value, Some(Value::Integer(201)));
    }

    #[test]
    fn relaxed_validation_is_passed_through() {
        let src = "import io.restassured.RestAssured;\nclass T {\n  @Test\n  void t() {\n    RestAssured.useRelaxedHTTPSValidation();\n  }\n}";
        let intents = RestAssuredParser.parse(src, "T.java").unwrap();
        let step = &intents[0].steps[0];
        assert!(step.semantic_tags.has("unsupported"));
        assert_eq!(step.source_shape.as_deref(), Some("RestAssured.useRelaxedHTTPSValidation"));
    }
}
