//! Target-dialect back ends. Each generator lowers `TestIntent`s into
//! source text for one runner, with a per-node record of how every
//! step and assertion was emitted.

pub mod playwright_python;
pub mod playwright_ts;
pub mod pytest_requests;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{ActionIntent, AssertionIntent, Node, TestIntent, Value};
use crate::registry::api_mapping::ApiMappingRegistry;

pub use playwright_python::PlaywrightPythonGenerator;
pub use playwright_ts::PlaywrightTsGenerator;
pub use pytest_requests::PytestRequestsGenerator;

/// Marker placed in generated code next to anything that needs review.
pub const TODO_MARKER: &str = "TODO(testshift)";

/// Lowers intents into one target dialect.
pub trait Generator: Send + Sync {
    fn dialect(&self) -> Dialect;

    /// Whether this target can express tests of the intent's kind.
    fn can_generate(&self, intent: &TestIntent) -> bool;

    fn generate(&self, intent: &TestIntent, ctx: &GenerationContext<'_>) -> GeneratedTest;

    /// Assemble a whole file: imports and shared scaffolding once, then
    /// every test in order.
    fn render_file(&self, tests: &[GeneratedTest], header: Option<&str>) -> String;

    fn output_file_name(&self, stem: &str) -> String;
}

/// Every generator shipped with the crate.
pub fn builtin_generators() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(PlaywrightTsGenerator),
        Box::new(PlaywrightPythonGenerator),
        Box::new(PytestRequestsGenerator),
    ]
}

/// What a generator needs besides the intent itself.
#[derive(Debug, Clone, Copy)]
pub struct GenerationContext<'a> {
    pub source: Dialect,
    /// Emissions below this get an inline marker and a TODO entry
    pub threshold: f32,
    pub mappings: &'a ApiMappingRegistry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Setup,
    Body,
    Teardown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionOrigin {
    /// Synthesized by the generator's own rules
    Native,
    /// Rendered from an `ApiMapping` template
    Mapping,
    /// Source kept as a comment
    PassThrough,
}

/// How one intent node ended up in the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Emission {
    pub section: Section,
    pub source_line: usize,
    pub confidence: f32,
    pub origin: EmissionOrigin,
    pub assertion: bool,
}

/// A review entry for an emission below the confidence threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Todo {
    pub section: Section,
    pub source_line: usize,
    pub text: String,
}

/// One lowered test, not yet placed in a file.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTest {
    pub test_name: String,
    pub function_name: String,
    pub test_kind: TestKind,
    pub suite: Option<String>,
    pub base_url: Option<String>,

    pub setup: Vec<String>,
    pub body: Vec<String>,
    pub teardown: Vec<String>,

    /// Scaffolding the lines rely on (fixtures, imports), generator-specific
    pub uses: BTreeSet<&'static str>,

    pub emissions: Vec<Emission>,
    pub todos: Vec<Todo>,
}

impl GeneratedTest {
    /// Minimum over emitted nodes, 1.0 for an empty test.
    pub fn min_confidence(&self) -> f32 {
        self.emissions.iter().map(|e| e.confidence).fold(1.0_f32, f32::min)
    }

    pub fn emissions_in(&self, section: Section) -> impl Iterator<Item = &Emission> {
        self.emissions.iter().filter(move |e| e.section == section)
    }
}

// ============================================================================
// Shared lowering driver
// ============================================================================

/// Native synthesis of one node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Lowered {
    pub code: Vec<String>,
    pub confidence: f32,
}

impl Lowered {
    pub fn new(code: impl Into<String>, confidence: f32) -> Self {
        Self {
            code: vec![code.into()],
            confidence,
        }
    }

    pub fn lines(code: Vec<String>, confidence: f32) -> Self {
        Self { code, confidence }
    }
}

/// Per-test state of a target's synthesis rules.
pub(crate) trait Lowering {
    fn target(&self) -> Dialect;

    fn comment(&self) -> &'static str;

    /// Target-language literal for a value.
    fn literal(&self, value: &Value) -> String;

    fn step(&mut self, step: &ActionIntent) -> Option<Lowered>;

    fn assertion(&mut self, assertion: &AssertionIntent) -> Option<Lowered>;

    fn uses(&self) -> BTreeSet<&'static str>;
}

/// Collects emitted lines together with their emission records.
struct Writer<'a> {
    comment: &'static str,
    threshold: f32,
    test_name: &'a str,
    lines: Vec<String>,
    emissions: Vec<Emission>,
    todos: Vec<Todo>,
}

impl<'a> Writer<'a> {
    fn new(comment: &'static str, threshold: f32, test_name: &'a str) -> Self {
        Self {
            comment,
            threshold,
            test_name,
            lines: Vec::new(),
            emissions: Vec::new(),
            todos: Vec::new(),
        }
    }

    fn comment_line(&mut self, text: &str) {
        self.lines.push(format!("{} {}", self.comment, text));
    }

    #[allow(clippy::too_many_arguments)]
    fn emit(
        &mut self,
        section: Section,
        source_line: usize,
        raw: &str,
        confidence: f32,
        origin: EmissionOrigin,
        assertion: bool,
        code: Vec<String>,
    ) {
        let confidence = confidence.clamp(0.0, 1.0);
        if confidence < self.threshold {
            let summary = first_line(raw);
            self.lines.push(format!(
                "{} {}: source line {} (confidence {:.2}) needs review",
                self.comment, TODO_MARKER, source_line, confidence
            ));
            self.todos.push(Todo {
                section,
                source_line,
                text: format!(
                    "{}: line {} (confidence {:.2}): {}",
                    self.test_name, source_line, confidence, summary
                ),
            });
        }
        self.lines.extend(code);
        self.emissions.push(Emission {
            section,
            source_line,
            confidence,
            origin,
            assertion,
        });
    }

    fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

/// Lower an intent through `lowering`: mapping registry first, then the
/// target's own rules, then a pass-through comment.
pub(crate) fn lower_intent<L: Lowering>(
    lowering: &mut L,
    intent: &TestIntent,
    ctx: &GenerationContext<'_>,
    function_name: String,
) -> GeneratedTest {
    let mut writer = Writer::new(lowering.comment(), ctx.threshold, &intent.test_name);

    for step in &intent.setup_steps {
        lower_step(lowering, ctx, &mut writer, step, Section::Setup);
    }
    let setup = writer.take_lines();

    let mut section: Option<String> = None;
    for node in intent.nodes() {
        if let Some(aaa) = node.tags().get("aaa") {
            if section.as_deref() != Some(aaa) {
                writer.comment_line(&title_case(aaa));
                section = Some(aaa.to_string());
            }
        }
        if node.tags().has("bdd_phase") {
            writer.comment_line(first_line(node.raw()));
        }
        match node {
            Node::Step(step) => lower_step(lowering, ctx, &mut writer, step, Section::Body),
            Node::Assertion(assertion) => lower_assertion(lowering, ctx, &mut writer, assertion),
        }
    }
    let body = writer.take_lines();

    for step in &intent.teardown_steps {
        lower_step(lowering, ctx, &mut writer, step, Section::Teardown);
    }
    let teardown = writer.take_lines();

    GeneratedTest {
        test_name: intent.test_name.clone(),
        function_name,
        test_kind: intent.test_kind,
        suite: intent.metadata.get("suite").cloned(),
        base_url: intent.metadata.get("base_url").cloned(),
        setup,
        body,
        teardown,
        uses: lowering.uses(),
        emissions: writer.emissions,
        todos: writer.todos,
    }
}

/// Code from a registered mapping for `shape`, with `params` rendered as
/// target literals.
fn mapped<L: Lowering>(
    lowering: &L,
    ctx: &GenerationContext<'_>,
    shape: Option<&str>,
    params: &[Value],
) -> Option<(Vec<String>, f32)> {
    let mapping = ctx.mappings.lookup(ctx.source, lowering.target(), shape?)?;
    let args: Vec<String> = params.iter().map(|v| lowering.literal(v)).collect();
    let code = mapping.render(&args)?;
    Some((code.lines().map(str::to_string).collect(), mapping.confidence_hint))
}

fn lower_step<L: Lowering>(
    lowering: &mut L,
    ctx: &GenerationContext<'_>,
    writer: &mut Writer<'_>,
    step: &ActionIntent,
    section: Section,
) {
    if let Some((code, confidence)) = mapped(lowering, ctx, step.source_shape.as_deref(), &step.parameters) {
        writer.emit(
            section,
            step.source_line,
            &step.raw,
            confidence,
            EmissionOrigin::Mapping,
            false,
            code,
        );
        return;
    }

    match lowering.step(step) {
        Some(lowered) => writer.emit(
            section,
            step.source_line,
            &step.raw,
            lowered.confidence,
            EmissionOrigin::Native,
            false,
            lowered.code,
        ),
        None => {
            let code = pass_through(writer.comment, &step.raw);
            writer.emit(section, step.source_line, &step.raw, 0.0, EmissionOrigin::PassThrough, false, code);
        }
    }
}

fn lower_assertion<L: Lowering>(
    lowering: &mut L,
    ctx: &GenerationContext<'_>,
    writer: &mut Writer<'_>,
    assertion: &AssertionIntent,
) {
    let expected: Vec<Value> = assertion.expected_value.iter().cloned().collect();
    if let Some((code, confidence)) = mapped(lowering, ctx, assertion.source_shape.as_deref(), &expected) {
        writer.emit(
            Section::Body,
            assertion.source_line,
            &assertion.raw,
            confidence,
            EmissionOrigin::Mapping,
            true,
            code,
        );
        return;
    }

    match lowering.assertion(assertion) {
        Some(lowered) => writer.emit(
            Section::Body,
            assertion.source_line,
            &assertion.raw,
            lowered.confidence,
            EmissionOrigin::Native,
            true,
            lowered.code,
        ),
        None => {
            let code = pass_through(writer.comment, &assertion.raw);
            writer.emit(
                Section::Body,
                assertion.source_line,
                &assertion.raw,
                0.0,
                EmissionOrigin::PassThrough,
                true,
                code,
            );
        }
    }
}

fn pass_through(comment: &str, raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| format!("{} untranslated: {}", comment, l))
        .collect()
}

// ============================================================================
// Text helpers
// ============================================================================

fn first_line(text: &str) -> &str {
    text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Single-quoted JavaScript/TypeScript string literal.
pub fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Double-quoted Python string literal.
pub fn py_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `snake_case` identifier from human words.
pub fn snake_case(words: &str) -> String {
    let mut out = String::new();
    for c in words.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let out = out.trim_end_matches('_').to_string();
    match out.chars().next() {
        None => "unnamed".to_string(),
        Some(c) if c.is_ascii_digit() => format!("t_{}", out),
        Some(_) => out,
    }
}

/// Python literal for a JSON document, `None` when `body` is not JSON.
pub fn py_json_literal(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    Some(py_value(&value))
}

fn py_value(value: &serde_json::Value) -> String {
    use serde_json::Value as J;
    match value {
        J::Null => "None".to_string(),
        J::Bool(true) => "True".to_string(),
        J::Bool(false) => "False".to_string(),
        J::Number(n) => n.to_string(),
        J::String(s) => py_string(s),
        J::Array(items) => format!("[{}]", items.iter().map(py_value).collect::<Vec<_>>().join(", ")),
        J::Object(fields) => format!(
            "{{{}}}",
            fields
                .iter()
                .map(|(k, v)| format!("{}: {}", py_string(k), py_value(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

/// `base["a"][0]` style access for a dotted JSON path.
pub fn py_json_access(base: &str, path: &str) -> String {
    let mut out = base.to_string();
    for segment in path_segments(path) {
        match segment {
            PathSegment::Key(key) => out.push_str(&format!("[{}]", py_string(&key))),
            PathSegment::Index(i) => out.push_str(&format!("[{}]", i)),
        }
    }
    out
}

/// Regex-escape for class-name matchers.
pub fn regex_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if "\\.+*?()|[]{}^$/-".contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split a dotted JSON path (`data.items.0.id`) into keys and indices.
pub fn path_segments(path: &str) -> Vec<PathSegment> {
    path.split('.')
        .filter(|p| !p.is_empty())
        .flat_map(|part| {
            // `items[0]` splits into key + index
            let mut out = Vec::new();
            let (key, rest) = match part.find('[') {
                Some(i) => (&part[..i], &part[i..]),
                None => (part, ""),
            };
            if !key.is_empty() {
                match key.parse::<usize>() {
                    Ok(n) => out.push(PathSegment::Index(n)),
                    Err(_) => out.push(PathSegment::Key(key.to_string())),
                }
            }
            for index in rest.split(['[', ']']).filter(|s| !s.is_empty()) {
                match index.parse::<usize>() {
                    Ok(n) => out.push(PathSegment::Index(n)),
                    Err(_) => out.push(PathSegment::Key(index.trim_matches(['\'', '"']).to_string())),
                }
            }
            out
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Name with `_2`, `_3`... appended until it is not in `taken`.
pub(crate) fn unique_name(base: String, taken: &mut BTreeSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    taken.insert(name.clone());
    name
}

/// Python block body: a lone `pass` when there is no statement.
pub(crate) fn python_block(lines: &[String]) -> Vec<String> {
    let has_code = lines
        .iter()
        .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'));
    let mut out = lines.to_vec();
    if !has_code {
        out.push("pass".to_string());
    }
    out
}

pub(crate) fn indent(lines: &[String], pad: &str) -> String {
    let mut out = String::new();
    for line in lines {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(pad);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Whether any non-comment line refers to `ident` as a free name (not a
/// member access such as `page.request`).
pub(crate) fn mentions(lines: &[String], ident: &str, comment: &str) -> bool {
    lines
        .iter()
        .map(|l| l.trim_start())
        .filter(|l| !l.starts_with(comment))
        .any(|line| {
            line.match_indices(ident).any(|(i, _)| {
                let before = line[..i].chars().next_back();
                let after = line[i + ident.len()..].chars().next();
                let boundary = |c: Option<char>| c.is_none_or(|c| !(c.is_alphanumeric() || c == '_'));
                boundary(before) && before != Some('.') && boundary(after)
            })
        })
}

/// Header lines prefixed with the target's comment marker.
pub(crate) fn header_block(comment: &str, header: Option<&str>) -> String {
    match header {
        Some(text) => {
            let mut out: String = text
                .lines()
                .map(|l| format!("{} {}\n", comment, l))
                .collect();
            out.push('\n');
            out
        }
        None => String::new(),
    }
}

/// Page-name navigation ("the login page") as a path.
pub(crate) fn page_path(name: &str) -> String {
    let slug = name
        .trim()
        .trim_start_matches('/')
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-");
    match slug.as_str() {
        "home" | "main" | "landing" | "" => "/".to_string(),
        _ => format!("/{}", slug),
    }
}
