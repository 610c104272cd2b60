use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intent::dialect::{Dialect, TestKind};

// ============================================================================
// Vocabulary
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "get" => Some(HttpMethod::Get),
            "post" => Some(HttpMethod::Post),
            "put" => Some(HttpMethod::Put),
            "patch" => Some(HttpMethod::Patch),
            "delete" => Some(HttpMethod::Delete),
            "head" => Some(HttpMethod::Head),
            "options" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Lowercase method name, as used by most client libraries.
    pub fn lower(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
        }
    }
}

/// What a step does. Closed on purpose: anything the core cannot represent
/// travels as `Raw` with its original text and `SemanticTags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Navigate,
    Click,
    Fill,
    Clear,
    Select,
    Check,
    Uncheck,
    GetText,
    Request(HttpMethod),
    Wait,
    Sleep,
    Reload,
    GoBack,
    GoForward,
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionType {
    Visible,
    Hidden,
    Exists,
    TextEquals,
    TextContains,
    ValueEquals,
    Checked,
    Enabled,
    Disabled,
    HasClass,
    HasAttr,
    LengthEquals,
    StatusCode,
    ResponseBodyPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    Id,
    Css,
    Xpath,
    Role,
    Text,
    Name,
}

/// How a step or assertion finds its element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub strategy: LocatorStrategy,
    pub value: String,

    /// Accessible name, only meaningful for `Role`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Locator {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        Self {
            strategy,
            value: value.into(),
            name: None,
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Id, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Css, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Xpath, value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Text, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Name, value)
    }

    pub fn role(role: impl Into<String>, name: Option<String>) -> Self {
        Self {
            strategy: LocatorStrategy::Role,
            value: role.into(),
            name,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match self.strategy {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Css => "css",
            LocatorStrategy::Xpath => "xpath",
            LocatorStrategy::Role => "role",
            LocatorStrategy::Text => "text",
            LocatorStrategy::Name => "name",
        };
        match &self.name {
            Some(name) => write!(f, "{}={}[name={}]", strategy, self.value, name),
            None => write!(f, "{}={}", strategy, self.value),
        }
    }
}

/// A typed step parameter or expected value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Text(String),
    Integer(i64),
    Bool(bool),
    DurationMs(u64),
    Header { name: String, value: String },
    Query { name: String, value: String },
    Body(String),
    /// Source expression that is not a literal
    Raw(String),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Plain rendering used in notes and TODO entries.
    pub fn describe(&self) -> String {
        match self {
            Value::Text(s) | Value::Raw(s) | Value::Body(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::DurationMs(ms) => format!("{}ms", ms),
            Value::Header { name, value } => format!("{}: {}", name, value),
            Value::Query { name, value } => format!("{}={}", name, value),
        }
    }
}

// ============================================================================
// Semantic tags
// ============================================================================

/// Ordered set of `key=value` strings and bare flags carried alongside a node.
///
/// Lets idiom passes and generators exchange metadata without widening the
/// closed action/assertion enums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SemanticTags(BTreeSet<String>);

impl SemanticTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tag: impl Into<String>) {
        self.0.insert(tag.into());
    }

    /// Set `key=value`, replacing any previous value for `key`.
    pub fn set(&mut self, key: &str, value: impl fmt::Display) {
        self.remove(key);
        self.0.insert(format!("{}={}", key, value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|t| {
            t.strip_prefix(key)
                .and_then(|rest| rest.strip_prefix('='))
        })
    }

    /// True for a bare flag `key` or any `key=...` entry.
    pub fn has(&self, key: &str) -> bool {
        self.0
            .iter()
            .any(|t| t == key || t.strip_prefix(key).is_some_and(|r| r.starts_with('=')))
    }

    pub fn remove(&mut self, key: &str) {
        self.0
            .retain(|t| !(t == key || t.strip_prefix(key).is_some_and(|r| r.starts_with('='))));
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SemanticTags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionIntent {
    pub action_type: ActionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Locator>,

    #[serde(default)]
    pub parameters: Vec<Value>,

    pub confidence: f32,

    #[serde(default)]
    pub semantic_tags: SemanticTags,

    /// 1-based line in the source file
    pub source_line: usize,

    /// Original statement text
    pub raw: String,

    /// Canonical call shape, the API-mapping lookup key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_shape: Option<String>,
}

impl ActionIntent {
    pub fn new(action_type: ActionType, source_line: usize, raw: impl Into<String>) -> Self {
        Self {
            action_type,
            target: None,
            parameters: Vec::new(),
            confidence: 1.0,
            semantic_tags: SemanticTags::new(),
            source_line,
            raw: raw.into(),
            source_shape: None,
        }
    }

    /// A pass-through step for a construct the parser knows but the core
    /// cannot represent.
    pub fn unsupported(source_line: usize, raw: impl Into<String>, shape: impl Into<String>) -> Self {
        let mut step = Self::new(ActionType::Raw, source_line, raw).with_confidence(0.0);
        step.semantic_tags.insert("unsupported");
        step.source_shape = Some(shape.into());
        step
    }

    /// A pass-through step for a statement the parser could not classify.
    pub fn unrecognized(source_line: usize, raw: impl Into<String>) -> Self {
        let mut step = Self::new(ActionType::Raw, source_line, raw).with_confidence(0.3);
        step.semantic_tags.insert("unrecognized");
        step
    }

    pub fn with_target(mut self, target: Locator) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_param(mut self, value: Value) -> Self {
        self.parameters.push(value);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.semantic_tags.insert(tag);
        self
    }

    pub fn with_kv(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.semantic_tags.set(key, value);
        self
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.source_shape = Some(shape.into());
        self
    }

    /// First text parameter (fill value, URL, option label...).
    pub fn text_param(&self) -> Option<&str> {
        self.parameters.iter().find_map(Value::as_text)
    }

    pub fn is_passthrough(&self) -> bool {
        self.action_type == ActionType::Raw
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionIntent {
    pub assertion_type: AssertionType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Locator>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_value: Option<Value>,

    pub confidence: f32,

    #[serde(default)]
    pub semantic_tags: SemanticTags,

    pub source_line: usize,
    pub raw: String,

    /// Canonical call shape, the API-mapping lookup key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_shape: Option<String>,
}

impl AssertionIntent {
    pub fn new(assertion_type: AssertionType, source_line: usize, raw: impl Into<String>) -> Self {
        Self {
            assertion_type,
            target: None,
            expected_value: None,
            confidence: 1.0,
            semantic_tags: SemanticTags::new(),
            source_line,
            raw: raw.into(),
            source_shape: None,
        }
    }

    pub fn with_target(mut self, target: Locator) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_shape(mut self, shape: impl Into<String>) -> Self {
        self.source_shape = Some(shape.into());
        self
    }

    pub fn with_expected(mut self, value: Value) -> Self {
        self.expected_value = Some(value);
        self
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.semantic_tags.insert(tag);
        self
    }

    pub fn with_kv(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.semantic_tags.set(key, value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BddPhase {
    Given,
    When,
    Then,
    And,
}

impl BddPhase {
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word {
            "Given" => Some(BddPhase::Given),
            "When" => Some(BddPhase::When),
            "Then" => Some(BddPhase::Then),
            "And" | "But" | "*" => Some(BddPhase::And),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BddPhase::Given => "given",
            BddPhase::When => "when",
            BddPhase::Then => "then",
            BddPhase::And => "and",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum NodeRef {
    Step(usize),
    Assertion(usize),
}

/// Traceability record; `TestIntent::source_refs` lists these in program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub node: NodeRef,
    pub line: usize,
}

/// Borrowed view of a node in program order.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Step(&'a ActionIntent),
    Assertion(&'a AssertionIntent),
}

impl<'a> Node<'a> {
    pub fn confidence(&self) -> f32 {
        match self {
            Node::Step(s) => s.confidence,
            Node::Assertion(a) => a.confidence,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Node::Step(s) => s.source_line,
            Node::Assertion(a) => a.source_line,
        }
    }

    pub fn raw(&self) -> &'a str {
        match *self {
            Node::Step(s) => &s.raw,
            Node::Assertion(a) => &a.raw,
        }
    }

    pub fn tags(&self) -> &'a SemanticTags {
        match *self {
            Node::Step(s) => &s.semantic_tags,
            Node::Assertion(a) => &a.semantic_tags,
        }
    }
}

/// Owned node, used when idiom passes rebuild an intent.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedNode {
    Step(ActionIntent),
    Assertion(AssertionIntent),
}

impl OwnedNode {
    pub fn tags(&self) -> &SemanticTags {
        match self {
            OwnedNode::Step(s) => &s.semantic_tags,
            OwnedNode::Assertion(a) => &a.semantic_tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut SemanticTags {
        match self {
            OwnedNode::Step(s) => &mut s.semantic_tags,
            OwnedNode::Assertion(a) => &mut a.semantic_tags,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            OwnedNode::Step(s) => s.source_line,
            OwnedNode::Assertion(a) => a.source_line,
        }
    }
}

/// Program-ordered node together with its BDD phase, if any.
pub type ProgramNode = (OwnedNode, Option<BddPhase>);

// ============================================================================
// TestIntent
// ============================================================================

/// The unit of translation: one test, independent of any dialect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestIntent {
    pub test_name: String,
    pub source_dialect: Dialect,
    pub test_kind: TestKind,

    pub steps: Vec<ActionIntent>,
    pub assertions: Vec<AssertionIntent>,

    /// Phase per program-order node index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bdd_phases: Option<BTreeMap<usize, BddPhase>>,

    #[serde(default)]
    pub setup_steps: Vec<ActionIntent>,

    #[serde(default)]
    pub teardown_steps: Vec<ActionIntent>,

    #[serde(default)]
    pub metadata: BTreeMap<String, String>,

    pub overall_confidence: f32,

    /// One entry per step/assertion, in program order
    pub source_refs: Vec<SourceRef>,
}

impl TestIntent {
    pub fn new(test_name: impl Into<String>, source_dialect: Dialect, test_kind: TestKind) -> Self {
        Self {
            test_name: test_name.into(),
            source_dialect,
            test_kind,
            steps: Vec::new(),
            assertions: Vec::new(),
            bdd_phases: None,
            setup_steps: Vec::new(),
            teardown_steps: Vec::new(),
            metadata: BTreeMap::new(),
            overall_confidence: 1.0,
            source_refs: Vec::new(),
        }
    }

    /// Append a step in program order. Returns its program-order index.
    pub fn push_step(&mut self, step: ActionIntent) -> usize {
        self.source_refs.push(SourceRef {
            node: NodeRef::Step(self.steps.len()),
            line: step.source_line,
        });
        self.steps.push(step);
        self.source_refs.len() - 1
    }

    /// Append an assertion in program order. Returns its program-order index.
    pub fn push_assertion(&mut self, assertion: AssertionIntent) -> usize {
        self.source_refs.push(SourceRef {
            node: NodeRef::Assertion(self.assertions.len()),
            line: assertion.source_line,
        });
        self.assertions.push(assertion);
        self.source_refs.len() - 1
    }

    pub fn push(&mut self, node: OwnedNode) -> usize {
        match node {
            OwnedNode::Step(s) => self.push_step(s),
            OwnedNode::Assertion(a) => self.push_assertion(a),
        }
    }

    pub fn set_phase(&mut self, position: usize, phase: BddPhase) {
        self.bdd_phases
            .get_or_insert_with(BTreeMap::new)
            .insert(position, phase);
    }

    pub fn phase_of(&self, position: usize) -> Option<BddPhase> {
        self.bdd_phases.as_ref()?.get(&position).copied()
    }

    pub fn resolve(&self, node: NodeRef) -> Option<Node<'_>> {
        match node {
            NodeRef::Step(i) => self.steps.get(i).map(Node::Step),
            NodeRef::Assertion(i) => self.assertions.get(i).map(Node::Assertion),
        }
    }

    /// Steps and assertions in program order.
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> {
        self.source_refs.iter().filter_map(|r| self.resolve(r.node))
    }

    pub fn node_count(&self) -> usize {
        self.steps.len() + self.assertions.len()
    }

    /// Owned copy of the program, ready to be rewritten.
    pub fn program(&self) -> Vec<ProgramNode> {
        self.source_refs
            .iter()
            .enumerate()
            .filter_map(|(pos, r)| {
                let node = match r.node {
                    NodeRef::Step(i) => OwnedNode::Step(self.steps.get(i)?.clone()),
                    NodeRef::Assertion(i) => OwnedNode::Assertion(self.assertions.get(i)?.clone()),
                };
                Some((node, self.phase_of(pos)))
            })
            .collect()
    }

    /// New intent with the same header, setup and teardown but a different
    /// program. Indices, phases and confidence are rebuilt.
    pub fn with_program(&self, program: Vec<ProgramNode>) -> TestIntent {
        let mut next = TestIntent {
            test_name: self.test_name.clone(),
            source_dialect: self.source_dialect,
            test_kind: self.test_kind,
            steps: Vec::new(),
            assertions: Vec::new(),
            bdd_phases: None,
            setup_steps: self.setup_steps.clone(),
            teardown_steps: self.teardown_steps.clone(),
            metadata: self.metadata.clone(),
            overall_confidence: 1.0,
            source_refs: Vec::new(),
        };
        for (node, phase) in program {
            let pos = next.push(node);
            if let Some(phase) = phase {
                next.set_phase(pos, phase);
            }
        }
        next.recompute_confidence();
        next
    }

    /// New intent keeping only the steps `keep` accepts.
    pub fn retain_steps(&self, keep: impl Fn(&ActionIntent) -> bool) -> TestIntent {
        let program = self
            .program()
            .into_iter()
            .filter(|(node, _)| match node {
                OwnedNode::Step(s) => keep(s),
                OwnedNode::Assertion(_) => true,
            })
            .collect();
        self.with_program(program)
    }

    /// Minimum confidence across all nodes, setup and teardown included.
    pub fn min_confidence(&self) -> f32 {
        self.steps
            .iter()
            .map(|s| s.confidence)
            .chain(self.assertions.iter().map(|a| a.confidence))
            .chain(self.setup_steps.iter().map(|s| s.confidence))
            .chain(self.teardown_steps.iter().map(|s| s.confidence))
            .fold(1.0_f32, f32::min)
    }

    pub fn recompute_confidence(&mut self) {
        self.overall_confidence = self.min_confidence();
    }

    /// Source lines covered by the program, setup and teardown.
    pub fn covered_lines(&self) -> BTreeSet<usize> {
        self.source_refs
            .iter()
            .map(|r| r.line)
            .chain(self.setup_steps.iter().map(|s| s.source_line))
            .chain(self.teardown_steps.iter().map(|s| s.source_line))
            .collect()
    }

    /// Infer `Ui` or `Api` from the steps. Requests-only programs are API tests.
    pub fn infer_kind(&self) -> TestKind {
        let mut saw_request = false;
        for step in self.steps.iter().chain(self.setup_steps.iter()) {
            match step.action_type {
                ActionType::Request(_) => saw_request = true,
                ActionType::Raw => {}
                _ => return TestKind::Ui,
            }
        }
        if saw_request { TestKind::Api } else { TestKind::Ui }
    }
}
