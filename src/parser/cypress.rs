use std::collections::BTreeMap;

use serde_json::Value as Json;
use tracing::{debug, trace};

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, HttpMethod, Locator, LocatorStrategy,
    OwnedNode, TestIntent, Value,
};
use crate::parser::scan::{SourceFile, TestBlock};
use crate::parser::syntax::{Expr, Lang, Segment, Statement, Stmt};
use crate::parser::{ParseError, Parser, finish_intent, hook_step, literal_value, partition_blocks, syntax_error};

/// Commands the core has no neutral form for. They are looked up in the
/// mapping registry by shape and otherwise passed through.
const PASSTHROUGH_COMMANDS: [&str; 17] = [
    "clearCookies",
    "clearLocalStorage",
    "clearAllSessionStorage",
    "viewport",
    "log",
    "screenshot",
    "intercept",
    "fixture",
    "task",
    "exec",
    "session",
    "origin",
    "window",
    "document",
    "wrap",
    "stub",
    "spy",
];

/// What the current command in a chain operates on.
#[derive(Debug, Clone, PartialEq)]
enum Subject {
    Element(Locator, f32),
    Url,
    Title,
    Text(Locator),
    InputValue(Locator),
    Attr(Locator, String),
    Count(Locator),
    Response,
    Status,
    Body(Option<String>),
    Unknown,
}

/// JavaScript/TypeScript Cypress specs.
#[derive(Debug, Default, Clone, Copy)]
pub struct CypressParser;

impl Parser for CypressParser {
    fn dialect(&self) -> Dialect {
        Dialect::Cypress
    }

    fn can_parse(&self, text: &str) -> bool {
        text.contains("cy.")
            && (text.contains("it(") || text.contains("describe(") || text.contains("specify("))
    }

    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError> {
        if !self.can_parse(text) {
            return Err(ParseError::NotRecognized {
                dialect: self.dialect(),
            });
        }

        let file = SourceFile::parse(text, Lang::JavaScript).map_err(|e| syntax_error(self.dialect(), e))?;
        let (tests, setup, teardown) = partition_blocks(file.blocks());
        if tests.is_empty() {
            return Err(ParseError::MissingTestBoundary {
                dialect: self.dialect(),
                source_label: source_label.to_string(),
            });
        }

        let mut base = ChainClassifier::default();
        let setup_steps = hook_steps(&mut base, &setup);
        let teardown_steps = hook_steps(&mut base.clone(), &teardown);

        let mut intents = Vec::with_capacity(tests.len());
        for block in &tests {
            let mut classifier = base.clone();
            let name = if block.name.trim().is_empty() {
                format!("test at line {}", block.line)
            } else {
                block.name.trim().to_string()
            };
            let mut intent = TestIntent::new(name, self.dialect(), TestKind::Ui);
            intent.metadata.insert("source".to_string(), source_label.to_string());
            if let Some(suite) = block.markers.iter().find_map(|m| m.strip_prefix("suite=")) {
                intent.metadata.insert("suite".to_string(), suite.to_string());
            }

            for statement in &block.statements {
                for node in classifier.classify(statement) {
                    intent.push(node);
                }
            }

            debug!(test = %intent.test_name, nodes = intent.node_count(), "parsed cypress test");
            intents.push(finish_intent(intent, &setup_steps, &teardown_steps));
        }

        Ok(intents)
    }
}

fn hook_steps(classifier: &mut ChainClassifier, blocks: &[TestBlock]) -> Vec<ActionIntent> {
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

#[derive(Debug, Clone, Default)]
struct ChainClassifier {
    aliases: BTreeMap<String, Subject>,
    constants: BTreeMap<String, Value>,
}

impl ChainClassifier {
    /// One node per command in a `cy` chain; at least one per statement.
    fn classify(&mut self, statement: &Statement) -> Vec<OwnedNode> {
        let line = statement.line;
        let raw = statement.text.as_str();
        let unrecognized = || vec![OwnedNode::Step(ActionIntent::unrecognized(line, raw))];

        let parsed = match &statement.parsed {
            Ok(stmt) => stmt,
            Err(e) => {
                trace!(line, error = %e, "statement did not parse");
                return unrecognized();
            }
        };

        let expr = match parsed {
            Stmt::Expr(expr) => expr,
            Stmt::Decl { name, expr } => {
                let value = literal_value(expr).or_else(|| {
                    let json = expr.to_json_with(&|n| self.constants.get(n).and_then(json_of))?;
                    (json.is_object() || json.is_array()).then(|| Value::Body(json.to_string()))
                });
                return match value {
                    Some(value) => {
                        self.constants.insert(name.clone(), value.clone());
                        vec![OwnedNode::Step(
                            ActionIntent::new(ActionType::Raw, line, raw)
                                .with_kv("const", name)
                                .with_param(value),
                        )]
                    }
                    None => unrecognized(),
                };
            }
            _ => return unrecognized(),
        };

        let segments = expr.segments();
        match segments.first() {
            Some(root) if root.name == "cy" && !root.is_call() && expr.base().is_none() => {}
            _ => return unrecognized(),
        }

        let mut nodes = Vec::new();
        let mut subject = Subject::Unknown;
        let mut refined = false;
        for seg in &segments[1..] {
            let node_line = if nodes.is_empty() { line } else { seg.line };
            if seg.name == "then" && subject == Subject::Response {
                if let Some(Expr::Function { params, body, .. }) = seg.arg(0) {
                    nodes.extend(self.response_callback(params, body));
                    subject = Subject::Unknown;
                    continue;
                }
            }
            match self.command(seg, &mut subject, node_line, raw) {
                Ok(Some(node)) => nodes.push(node),
                Ok(None) => refined = true,
                Err(()) => {
                    nodes.push(OwnedNode::Step(
                        ActionIntent::unrecognized(node_line, raw).with_shape(format!("cy.{}", seg.name)),
                    ));
                    // The rest of the chain has no known subject
                    break;
                }
            }
        }

        if nodes.is_empty() {
            // A bare query still asserts presence; Cypress retries it
            nodes.push(match (&subject, refined) {
                (Subject::Element(locator, confidence), true) => OwnedNode::Assertion(
                    AssertionIntent::new(AssertionType::Exists, line, raw)
                        .with_target(locator.clone())
                        .with_confidence(confidence.min(0.8)),
                ),
                _ => OwnedNode::Step(ActionIntent::unrecognized(line, raw)),
            });
        }
        nodes
    }

    /// Apply one command. `Ok(None)` means the command only changed the
    /// subject; `Err` means it is unknown.
    fn command(
        &mut self,
        seg: &Segment,
        subject: &mut Subject,
        line: usize,
        raw: &str,
    ) -> Result<Option<OwnedNode>, ()> {
        let name = seg.name.as_str();
        let step = |action: ActionType| ActionIntent::new(action, line, raw).with_shape(format!("cy.{}", name));

        let node = match name {
            // Subject queries
            "get" => {
                let selector = seg.str_arg(0).ok_or(())?;
                *subject = match selector.strip_prefix('@') {
                    Some(alias) => self.aliases.get(alias).cloned().unwrap_or(Subject::Unknown),
                    None => Subject::Element(Locator::css(selector), 1.0),
                };
                return Ok(None);
            }
            "contains" => {
                *subject = match (seg.arg(0), seg.arg(1)) {
                    (Some(sel), Some(text)) => {
                        let (sel, text) = (sel.as_str().ok_or(())?, self.text_arg(text).ok_or(())?);
                        Subject::Element(Locator::css(format!("{}:has-text(\"{}\")", sel, text)), 0.9)
                    }
                    (Some(text), None) => Subject::Element(Locator::text(self.text_arg(text).ok_or(())?), 1.0),
                    _ => return Err(()),
                };
                return Ok(None);
            }
            "find" => {
                let selector = seg.str_arg(0).ok_or(())?;
                *subject = match &*subject {
                    Subject::Element(parent, c) if parent.strategy == LocatorStrategy::Css => {
                        Subject::Element(Locator::css(format!("{} {}", parent.value, selector)), *c)
                    }
                    _ => Subject::Element(Locator::css(selector), 0.7),
                };
                return Ok(None);
            }
            "first" | "last" | "eq" => {
                let nth = match name {
                    "first" => 0,
                    "last" => -1,
                    _ => seg.arg(0).and_then(Expr::as_int).ok_or(())?,
                };
                *subject = match &*subject {
                    Subject::Element(l, c) if l.strategy == LocatorStrategy::Css => {
                        Subject::Element(Locator::css(format!("{} >> nth={}", l.value, nth)), c.min(0.9))
                    }
                    _ => return Err(()),
                };
                return Ok(None);
            }
            "url" | "location" => {
                *subject = Subject::Url;
                return Ok(None);
            }
            "title" => {
                *subject = Subject::Title;
                return Ok(None);
            }
            "invoke" => {
                let locator = match &*subject {
                    Subject::Element(l, _) => l.clone(),
                    _ => return Err(()),
                };
                *subject = match seg.str_arg(0).ok_or(())? {
                    "text" => Subject::Text(locator),
                    "val" => Subject::InputValue(locator),
                    "attr" => Subject::Attr(locator, seg.str_arg(1).ok_or(())?.to_string()),
                    _ => return Err(()),
                };
                return Ok(None);
            }
            "its" => {
                let path = seg.str_arg(0).ok_or(())?;
                *subject = match (&*subject, path) {
                    (Subject::Response, "status") => Subject::Status,
                    (Subject::Response, "body") => Subject::Body(None),
                    (Subject::Response, p) if p.starts_with("body.") => {
                        Subject::Body(Some(p["body.".len()..].to_string()))
                    }
                    (Subject::Body(prefix), p) => Subject::Body(Some(join_path(prefix.as_deref(), p))),
                    (Subject::Element(l, _), "length") => Subject::Count(l.clone()),
                    _ => return Err(()),
                };
                return Ok(None);
            }
            "as" => {
                let alias = seg.str_arg(0).ok_or(())?;
                self.aliases.insert(alias.to_string(), subject.clone());
                return Ok(None);
            }

            // Actions
            "visit" => {
                let url = seg.arg(0).ok_or(())?;
                match self.value(url) {
                    Some(value) => step(ActionType::Navigate).with_param(value),
                    None => step(ActionType::Navigate)
                        .with_param(Value::Raw(url.to_source()))
                        .with_confidence(0.5),
                }
            }
            "click" | "dblclick" | "rightclick" | "submit" => {
                let (locator, confidence) = self.element_subject(subject)?;
                let s = step(ActionType::Click).with_target(locator);
                let s = match name {
                    "dblclick" => s.with_kv("clicks", 2).with_confidence(0.9),
                    "rightclick" => s.with_kv("button", "right").with_confidence(0.9),
                    "submit" => s.with_tag("submit").with_confidence(0.7),
                    _ => s,
                };
                cap(s, confidence)
            }
            "type" => {
                let (locator, confidence) = self.element_subject(subject)?;
                let arg = seg.arg(0).ok_or(())?;
                let s = step(ActionType::Fill).with_target(locator);
                let s = match self.text_arg(arg) {
                    Some(text) => type_sequence(s, &text),
                    None => s.with_param(Value::Raw(arg.to_source())).with_confidence(0.5),
                };
                cap(s, confidence)
            }
            "clear" => {
                let (locator, confidence) = self.element_subject(subject)?;
                cap(step(ActionType::Clear).with_target(locator), confidence)
            }
            "check" | "uncheck" => {
                let (locator, confidence) = self.element_subject(subject)?;
                let action = if name == "check" { ActionType::Check } else { ActionType::Uncheck };
                cap(step(action).with_target(locator), confidence)
            }
            "select" => {
                let (locator, confidence) = self.element_subject(subject)?;
                let value = self.text_arg(seg.arg(0).ok_or(())?).ok_or(())?;
                cap(step(ActionType::Select).with_target(locator).with_param(Value::Text(value)), confidence)
            }
            "reload" => step(ActionType::Reload),
            "go" => match seg.arg(0) {
                Some(a) if a.as_str() == Some("back") || a.as_int() == Some(-1) => step(ActionType::GoBack),
                Some(a) if a.as_str() == Some("forward") || a.as_int() == Some(1) => step(ActionType::GoForward),
                _ => return Err(()),
            },
            "wait" => {
                let arg = seg.arg(0).ok_or(())?;
                match (arg.as_int(), arg.as_str()) {
                    (Some(ms), _) if !matches!(arg, Expr::Str { .. }) => {
                        step(ActionType::Sleep).with_param(Value::DurationMs(ms.max(0) as u64))
                    }
                    (_, Some(alias)) if alias.starts_with('@') => step(ActionType::Wait)
                        .with_kv("wait", "alias")
                        .with_param(Value::text(alias))
                        .with_confidence(0.5),
                    _ => return Err(()),
                }
            }
            "request" => {
                *subject = Subject::Response;
                self.request(seg, line, raw).ok_or(())?
            }
            "then" | "each" | "within" | "spread" => {
                ActionIntent::unrecognized(line, raw).with_shape(format!("cy.{}", name))
            }

            // Assertions
            "should" | "and" => {
                return self
                    .should(seg, subject, line, raw)
                    .map(|a| Some(OwnedNode::Assertion(a.with_shape(format!("cy.{}", name)))));
            }

            n if PASSTHROUGH_COMMANDS.contains(&n) => {
                let mut s = ActionIntent::unsupported(line, raw, format!("cy.{}", n));
                s.parameters = seg
                    .args()
                    .iter()
                    .map(|a| self.value(a).unwrap_or_else(|| Value::Raw(a.to_source())))
                    .collect();
                s
            }
            _ => return Err(()),
        };

        Ok(Some(OwnedNode::Step(node)))
    }

    fn element_subject(&self, subject: &Subject) -> Result<(Locator, f32), ()> {
        match subject {
            Subject::Element(l, c) => Ok((l.clone(), *c)),
            _ => Err(()),
        }
    }

    /// Literal value, resolving string constants declared earlier in the test.
    fn value(&self, expr: &Expr) -> Option<Value> {
        literal_value(expr).or_else(|| expr.as_ident().and_then(|n| self.constants.get(n).cloned()))
    }

    fn text_arg(&self, expr: &Expr) -> Option<String> {
        match self.value(expr)? {
            Value::Text(t) => Some(t),
            Value::Integer(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn request(&self, seg: &Segment, line: usize, raw: &str) -> Option<ActionIntent> {
        let mut options = Vec::new();
        let mut confidence = 1.0_f32;
        let (method, url) = match seg.args() {
            [Expr::Object(fields)] => {
                let mut method = HttpMethod::Get;
                let mut url = None;
                for (key, value) in fields {
                    match key.as_str() {
                        "method" => method = HttpMethod::from_name(&self.text_arg(value)?)?,
                        "url" => url = Some(self.text_arg(value)?),
                        "body" => {
                            let (body, c) = self.body(value);
                            options.push(body);
                            confidence = confidence.min(c);
                        }
                        "headers" | "qs" => {
                            let Expr::Object(entries) = value else {
                                confidence = confidence.min(0.5);
                                continue;
                            };
                            for (name, entry) in entries {
                                let Some(entry) = self.text_arg(entry) else {
                                    confidence = confidence.min(0.5);
                                    continue;
                                };
                                options.push(match key.as_str() {
                                    "headers" => Value::Header {
                                        name: name.clone(),
                                        value: entry,
                                    },
                                    _ => Value::Query {
                                        name: name.clone(),
                                        value: entry,
                                    },
                                });
                            }
                        }
                        "failOnStatusCode" => {}
                        other => {
                            trace!(line, option = other, "untranslated request option");
                            confidence = confidence.min(0.6);
                        }
                    }
                }
                (method, url?)
            }
            [url] => (HttpMethod::Get, self.text_arg(url)?),
            [method, url] => (HttpMethod::from_name(method.as_str()?)?, self.text_arg(url)?),
            [method, url, body, ..] => {
                let (body, c) = self.body(body);
                options.push(body);
                confidence = c;
                (HttpMethod::from_name(method.as_str()?)?, self.text_arg(url)?)
            }
            [] => return None,
        };

        let mut step = ActionIntent::new(ActionType::Request(method), line, raw)
            .with_shape("cy.request")
            .with_param(Value::Text(url))
            .with_confidence(confidence);
        step.parameters.extend(options);
        Some(step)
    }

    /// Request body: strings as written, static object and array literals
    /// as JSON. A computed body is carried raw at low confidence.
    fn body(&self, expr: &Expr) -> (Value, f32) {
        let resolve = |name: &str| self.constants.get(name).and_then(json_of);
        match expr.to_json_with(&resolve) {
            Some(json @ (Json::Object(_) | Json::Array(_))) => (Value::Body(json.to_string()), 1.0),
            Some(Json::String(text)) => (Value::Body(text), 1.0),
            _ => (Value::Raw(expr.to_source()), 0.5),
        }
    }

    /// Chai assertions in `cy.request(..).then((resp) => { .. })`. Each
    /// callback statement becomes one node on its own line.
    fn response_callback(&self, params: &[String], body: &[Statement]) -> Vec<OwnedNode> {
        let response = params.first().map(String::as_str).unwrap_or("response");
        body.iter()
            .map(|statement| {
                let (line, raw) = (statement.line, statement.text.as_str());
                let assertion = match &statement.parsed {
                    Ok(Stmt::Expr(expr)) => self.expect(expr, response, line, raw).ok(),
                    _ => None,
                };
                match assertion {
                    Some(a) => OwnedNode::Assertion(a.with_shape("expect")),
                    None => OwnedNode::Step(ActionIntent::unrecognized(line, raw)),
                }
            })
            .collect()
    }

    /// `expect(resp.status).to.eq(201)`, `expect(resp.body).to.have.property('id')`.
    fn expect(&self, expr: &Expr, response: &str, line: usize, raw: &str) -> Result<AssertionIntent, ()> {
        let (first, rest) = expr.segments().split_first().ok_or(())?;
        if expr.base().is_some() || first.name != "expect" {
            return Err(());
        }
        let subject = response_subject(first.arg(0).ok_or(())?, response).ok_or(())?;
        let chainer = rest
            .iter()
            .map(|seg| seg.name.as_str())
            .filter(|name| !matches!(*name, "to" | "be" | "been" | "is" | "that"))
            .map(|name| if name == "lengthOf" { "length" } else { name })
            .collect::<Vec<_>>()
            .join(".");
        let args = rest.last().map(Segment::args).unwrap_or_default();
        self.assert_subject(&subject, &chainer, args, line, raw)
    }

    fn should(&self, seg: &Segment, subject: &Subject, line: usize, raw: &str) -> Result<AssertionIntent, ()> {
        let chainer = seg.str_arg(0).ok_or(())?;
        self.assert_subject(subject, chainer, seg.args().get(1..).unwrap_or_default(), line, raw)
    }

    /// One assertion on the current subject. `args` are the matcher
    /// arguments after the chainer.
    fn assert_subject(
        &self,
        subject: &Subject,
        chainer: &str,
        args: &[Expr],
        line: usize,
        raw: &str,
    ) -> Result<AssertionIntent, ()> {
        let (negated, chainer) = match chainer.strip_prefix("not.") {
            Some(rest) => (true, rest),
            None => (false, chainer),
        };
        let expected = args.first().map(|a| self.value(a).unwrap_or_else(|| Value::Raw(a.to_source())));
        let raw_expected = matches!(expected, Some(Value::Raw(_)));
        let assertion = |t: AssertionType| AssertionIntent::new(t, line, raw);
        let need = || expected.clone().ok_or(());

        let mut out = match (subject, chainer) {
            (Subject::Element(l, c), _) => {
                let a = match chainer {
                    "be.visible" if negated => assertion(AssertionType::Hidden),
                    "be.visible" => assertion(AssertionType::Visible),
                    "exist" if negated => assertion(AssertionType::LengthEquals).with_expected(Value::Integer(0)),
                    "exist" => assertion(AssertionType::Exists),
                    "have.text" => assertion(AssertionType::TextEquals).with_expected(need()?),
                    "contain" | "contain.text" | "include.text" | "have.contain" => {
                        assertion(AssertionType::TextContains).with_expected(need()?)
                    }
                    "have.value" => assertion(AssertionType::ValueEquals).with_expected(need()?),
                    "be.checked" => assertion(AssertionType::Checked),
                    "be.enabled" => assertion(AssertionType::Enabled),
                    "be.disabled" => assertion(AssertionType::Disabled),
                    "have.class" => assertion(AssertionType::HasClass).with_expected(need()?),
                    "have.attr" => {
                        let attr = args.first().and_then(Expr::as_str).ok_or(())?;
                        let a = assertion(AssertionType::HasAttr).with_kv("attr", attr);
                        match args.get(1) {
                            Some(v) => a.with_expected(self.value(v).unwrap_or_else(|| Value::Raw(v.to_source()))),
                            None => a,
                        }
                    }
                    "have.length" => assertion(AssertionType::LengthEquals).with_expected(need()?),
                    _ => return Err(()),
                };
                let a = a.with_target(l.clone()).with_confidence(c.min(1.0));
                let handled_negation = matches!(chainer, "be.visible" | "exist");
                if negated && !handled_negation { a.with_tag("negated") } else { a }
            }
            (Subject::Url | Subject::Title, _) => {
                let which = if *subject == Subject::Url { "url" } else { "title" };
                let t = match chainer {
                    "eq" | "equal" | "equals" => AssertionType::TextEquals,
                    "include" | "contain" | "contains" => AssertionType::TextContains,
                    _ => return Err(()),
                };
                let a = assertion(t).with_kv("subject", which).with_expected(need()?);
                if negated { a.with_tag("negated") } else { a }
            }
            (Subject::Text(l), _) => {
                let t = match chainer {
                    "eq" | "equal" => AssertionType::TextEquals,
                    "include" | "contain" => AssertionType::TextContains,
                    _ => return Err(()),
                };
                assertion(t).with_target(l.clone()).with_expected(need()?)
            }
            (Subject::InputValue(l), "eq" | "equal") => assertion(AssertionType::ValueEquals)
                .with_target(l.clone())
                .with_expected(need()?),
            (Subject::Attr(l, attr), "eq" | "equal") => assertion(AssertionType::HasAttr)
                .with_target(l.clone())
                .with_kv("attr", attr)
                .with_expected(need()?),
            (Subject::Count(l), "eq" | "equal") => assertion(AssertionType::LengthEquals)
                .with_target(l.clone())
                .with_expected(need()?),
            (Subject::Status, "eq" | "equal") => {
                let code = need()?.as_integer().ok_or(())?;
                assertion(AssertionType::StatusCode).with_expected(Value::Integer(code))
            }
            (Subject::Body(path), _) => {
                let a = assertion(AssertionType::ResponseBodyPath);
                match chainer {
                    "eq" | "equal" | "deep.equal" => {
                        with_path(a, path.as_deref()).with_kv("matcher", "equals").with_expected(need()?)
                    }
                    "have.property" => {
                        let prop = args.first().and_then(Expr::as_str).ok_or(())?;
                        let a = a.with_kv("path", join_path(path.as_deref(), prop));
                        match args.get(1) {
                            Some(v) => a
                                .with_kv("matcher", "equals")
                                .with_expected(self.value(v).unwrap_or_else(|| Value::Raw(v.to_source()))),
                            None => a.with_kv("matcher", "present"),
                        }
                    }
                    "have.length" => with_path(a, path.as_deref()).with_kv("matcher", "length").with_expected(need()?),
                    "include" | "contain" => {
                        with_path(a, path.as_deref()).with_kv("matcher", "contains").with_expected(need()?)
                    }
                    _ => return Err(()),
                }
            }
            _ => return Err(()),
        };

        if raw_expected {
            out.confidence = out.confidence.min(0.5);
        }
        Ok(out)
    }
}

fn cap(mut step: ActionIntent, confidence: f32) -> ActionIntent {
    step.confidence = step.confidence.min(confidence);
    step
}

fn join_path(prefix: Option<&str>, path: &str) -> String {
    match prefix {
        Some(p) if !p.is_empty() => format!("{}.{}", p, path),
        _ => path.to_string(),
    }
}

fn with_path(a: AssertionIntent, path: Option<&str>) -> AssertionIntent {
    match path {
        Some(p) => a.with_kv("path", p),
        None => a,
    }
}

/// `type()` text with Cypress `{key}` sequences. A trailing `{enter}` becomes
/// a key press after the fill; other sequences lower confidence.
fn type_sequence(step: ActionIntent, text: &str) -> ActionIntent {
    let (text, enter) = match text.strip_suffix("{enter}") {
        Some(rest) => (rest, true),
        None => (text, false),
    };
    let mut step = step.with_param(Value::text(text));
    if enter {
        step = step.with_kv("press", "Enter").with_confidence(0.7);
    }
    if text.contains('{') && text.contains('}') {
        step = step.with_tag("key_sequence").with_confidence(0.5);
    }
    step
}

/// Path below `response.body` in a chai subject, `None` for the body itself.
fn body_path(path: &[Segment]) -> Option<Option<String>> {
    if path.is_empty() {
        return Some(None);
    }
    let mut out = String::new();
    for seg in path {
        let key = match (seg.name.as_str(), seg.arg(0)) {
            ("[]", Some(index)) if matches!(index, Expr::Num(_)) => {
                out.push_str(&format!("[{}]", index.as_int()?));
                continue;
            }
            ("[]", Some(index)) => index.as_str()?,
            (name, _) if !seg.is_call() => name,
            _ => return None,
        };
        if !out.is_empty() {
            out.push('.');
        }
        out.push_str(key);
    }
    Some(Some(out))
}

/// Subject of `expect(<response>.status)` or `expect(<response>.body...)`.
fn response_subject(expr: &Expr, response: &str) -> Option<Subject> {
    let (root, rest) = expr.segments().split_first()?;
    if expr.base().is_some() || root.is_call() || root.name != response {
        return None;
    }
    let (field, path) = rest.split_first()?;
    match field.name.as_str() {
        "status" if path.is_empty() => Some(Subject::Status),
        "body" => body_path(path).map(Subject::Body),
        _ => None,
    }
}

/// JSON form of a constant folded into a request body.
fn json_of(value: &Value) -> Option<Json> {
    match value {
        Value::Text(text) => Some(Json::String(text.clone())),
        Value::Integer(n) => Some(Json::from(*n)),
        Value::Bool(b) => Some(Json::Bool(*b)),
        Value::Body(body) => serde_json::from_str(body).ok(),
        _ => None,
    }
}
