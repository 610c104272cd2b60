//! Host-language syntax shared by the Java, JavaScript and Python front ends.
//!
//! Sources are parsed with tree-sitter and every statement is lowered into a
//! small call-chain model the classifiers match on: call chains
//! (`driver.findElement(By.id("q")).click()`), constructor calls,
//! comparisons, tuples, object literals and callbacks. Anything else
//! degrades to `Expr::Other` with its source text so callers can still
//! record the statement.

use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Java,
    JavaScript,
    Python,
}

impl Lang {
    pub fn grammar(self) -> Language {
        match self {
            Lang::Java => tree_sitter_java::language(),
            Lang::JavaScript => tree_sitter_javascript::language(),
            Lang::Python => tree_sitter_python::language(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole source file.
pub fn parse_tree(src: &str, lang: Lang) -> Result<Tree, SyntaxError> {
    let mut parser = Parser::new();
    parser.set_language(lang.grammar()).map_err(|e| SyntaxError {
        line: 1,
        message: e.to_string(),
    })?;
    parser.parse(src, None).ok_or_else(|| SyntaxError {
        line: 1,
        message: "parser returned no tree".to_string(),
    })
}

/// Parse a standalone snippet and lower its first statement.
pub fn parse_statement(src: &str, lang: Lang) -> Result<Statement, SyntaxError> {
    let tree = parse_tree(src, lang)?;
    let first = named(tree.root_node()).into_iter().next();
    let statement = first.map(|node| Lowerer::new(src, lang).statement(node));
    statement.ok_or_else(|| SyntaxError {
        line: 1,
        message: "empty source".to_string(),
    })
}

// ============================================================================
// Model
// ============================================================================

/// One link of a call chain: `.name`, `.name(args)` or `[index]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    pub args: Option<Vec<Expr>>,
    pub line: usize,
}

impl Segment {
    fn field(name: &str, line: usize) -> Self {
        Segment {
            name: name.to_string(),
            args: None,
            line,
        }
    }

    pub fn is_call(&self) -> bool {
        self.args.is_some()
    }

    pub fn args(&self) -> &[Expr] {
        self.args.as_deref().unwrap_or(&[])
    }

    pub fn arg(&self, index: usize) -> Option<&Expr> {
        self.args().get(index)
    }

    pub fn str_arg(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Expr::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Str { value: String, interpolated: bool },
    Num(String),
    /// `a.b(c)[0].d`; `base` is set when the chain starts from something
    /// other than a plain identifier (constructor call, literal)
    Path {
        base: Option<Box<Expr>>,
        segments: Vec<Segment>,
    },
    New { class: String, args: Vec<Expr>, line: usize },
    Tuple(Vec<Expr>),
    List(Vec<Expr>),
    /// Object literal with static keys, in source order
    Object(Vec<(String, Expr)>),
    /// JavaScript arrow function or function expression
    Function {
        params: Vec<String>,
        body: Vec<Statement>,
        raw: String,
    },
    Not(Box<Expr>),
    Binary { op: String, lhs: Box<Expr>, rhs: Box<Expr> },
    /// Python keyword argument
    Keyword { name: String, value: Box<Expr> },
    /// Lambdas, computed objects and other constructs kept as source text
    Other(String),
}

impl Expr {
    fn ident(name: &str, line: usize) -> Expr {
        Expr::Path {
            base: None,
            segments: vec![Segment::field(name, line)],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Expr::Str { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self, Expr::Str { interpolated: true, .. })
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Expr::Num(n) => n.trim_end_matches(['L', 'l']).parse().ok(),
            Expr::Str { value, .. } => value.trim().parse().ok(),
            _ => None,
        }
    }

    /// Single identifier, e.g. a variable reference.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Path { base: None, segments } if segments.len() == 1 && !segments[0].is_call() => {
                Some(&segments[0].name)
            }
            _ => None,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        match self {
            Expr::Path { segments, .. } => segments,
            _ => &[],
        }
    }

    pub fn base(&self) -> Option<&Expr> {
        match self {
            Expr::Path { base, .. } => base.as_deref(),
            _ => None,
        }
    }

    /// Dotted call shape without arguments, `self.`/`this.` dropped:
    /// `driver.manage().window().maximize()` → `driver.manage.window.maximize`.
    pub fn shape(&self) -> String {
        match self {
            Expr::Path { base, segments } => {
                let mut parts: Vec<String> = Vec::new();
                if let Some(b) = base {
                    let inner = b.shape();
                    if !inner.is_empty() {
                        parts.push(inner);
                    }
                }
                for (i, seg) in segments.iter().enumerate() {
                    if i == 0 && base.is_none() && (seg.name == "self" || seg.name == "this") {
                        continue;
                    }
                    if seg.name != "[]" && !seg.name.is_empty() {
                        parts.push(seg.name.clone());
                    }
                }
                parts.join(".")
            }
            Expr::New { class, .. } => format!("new.{}", class),
            _ => String::new(),
        }
    }

    /// Segments with a leading `self`/`this` removed.
    pub fn effective_segments(&self) -> &[Segment] {
        let segs = self.segments();
        match segs.first() {
            Some(first)
                if self.base().is_none()
                    && !first.is_call()
                    && (first.name == "self" || first.name == "this") =>
            {
                &segs[1..]
            }
            _ => segs,
        }
    }

    pub fn find_segment(&self, name: &str) -> Option<&Segment> {
        self.segments().iter().find(|s| s.name == name)
    }

    pub fn last_segment(&self) -> Option<&Segment> {
        self.segments().last()
    }

    /// The same chain without its last `n` segments. A chain cut down to
    /// its base is the base itself (`new X().until(..)` → `new X()`).
    pub fn truncated(&self, n: usize) -> Expr {
        match self {
            Expr::Path { base, segments } => {
                let kept = &segments[..segments.len().saturating_sub(n)];
                match base {
                    Some(base) if kept.is_empty() => (**base).clone(),
                    _ => Expr::Path {
                        base: base.clone(),
                        segments: kept.to_vec(),
                    },
                }
            }
            other => other.clone(),
        }
    }

    /// JSON value of a statically known literal. Identifiers other than
    /// `true`/`false`/`null` go through `resolve`.
    pub fn to_json_with(&self, resolve: &dyn Fn(&str) -> Option<serde_json::Value>) -> Option<serde_json::Value> {
        use serde_json::Value as J;
        match self {
            Expr::Str {
                value,
                interpolated: false,
            } => Some(J::String(value.clone())),
            Expr::Num(n) => {
                let n = n.trim_end_matches(['L', 'l']);
                n.parse::<i64>()
                    .ok()
                    .map(J::from)
                    .or_else(|| n.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(J::Number))
            }
            Expr::List(items) | Expr::Tuple(items) => items
                .iter()
                .map(|item| item.to_json_with(resolve))
                .collect::<Option<Vec<_>>>()
                .map(J::Array),
            Expr::Object(fields) => fields
                .iter()
                .map(|(key, value)| Some((key.clone(), value.to_json_with(resolve)?)))
                .collect::<Option<serde_json::Map<_, _>>>()
                .map(J::Object),
            _ => match self.as_ident()? {
                "true" | "True" => Some(J::Bool(true)),
                "false" | "False" => Some(J::Bool(false)),
                "null" | "None" => Some(J::Null),
                name => resolve(name),
            },
        }
    }

    pub fn to_json(&self) -> Option<serde_json::Value> {
        self.to_json_with(&|_| None)
    }

    /// Approximate source rendering, used for pass-through payloads.
    pub fn to_source(&self) -> String {
        match self {
            Expr::Str { value, .. } => format!("{:?}", value),
            Expr::Num(n) => n.clone(),
            Expr::Path { base, segments } => {
                let mut out = base.as_ref().map(|b| b.to_source()).unwrap_or_default();
                for (i, seg) in segments.iter().enumerate() {
                    if seg.name == "[]" {
                        out.push('[');
                        out.push_str(&join_source(seg.args()));
                        out.push(']');
                        continue;
                    }
                    if (i > 0 || base.is_some()) && !seg.name.is_empty() {
                        out.push('.');
                    }
                    out.push_str(&seg.name);
                    if let Some(args) = &seg.args {
                        out.push('(');
                        out.push_str(&join_source(args));
                        out.push(')');
                    }
                }
                out
            }
            Expr::New { class, args, .. } => format!("new {}({})", class, join_source(args)),
            Expr::Tuple(items) => format!("({})", join_source(items)),
            Expr::List(items) => format!("[{}]", join_source(items)),
            Expr::Object(fields) => {
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, value.to_source()))
                    .collect();
                format!("{{ {} }}", fields.join(", "))
            }
            Expr::Function { raw, .. } => raw.clone(),
            Expr::Not(inner) => format!("!{}", inner.to_source()),
            Expr::Binary { op, lhs, rhs } => {
                format!("{} {} {}", lhs.to_source(), op, rhs.to_source())
            }
            Expr::Keyword { name, value } => format!("{}={}", name, value.to_source()),
            Expr::Other(raw) => raw.clone(),
        }
    }
}

fn join_source(items: &[Expr]) -> String {
    items.iter().map(Expr::to_source).collect::<Vec<_>>().join(", ")
}

/// A lowered statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `Type name = expr`, `const name = expr`, Python `name = expr`
    Decl { name: String, expr: Expr },
    /// `a.b = expr`
    Assign { target: Expr, expr: Expr },
    /// Python `assert expr[, message]`
    Assert { expr: Expr },
    Expr(Expr),
}

/// One source statement: its text (terminator included), the 1-based line
/// it starts on and its lowered form.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub line: usize,
    pub parsed: Result<Stmt, SyntaxError>,
}

// ============================================================================
// Lowering
// ============================================================================

pub(crate) fn line_of(node: Node) -> usize {
    node.start_position().row + 1
}

pub(crate) fn is_comment(node: Node) -> bool {
    node.kind().ends_with("comment")
}

/// Named children without comments.
pub(crate) fn named<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).filter(|c| !is_comment(*c)).collect()
}

fn first_error(node: Node) -> Option<Node> {
    if !node.has_error() {
        return None;
    }
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let inner = node.children(&mut cursor).find_map(first_error);
    inner.or(Some(node))
}

/// Lowers the nodes of one parsed source into `Stmt`/`Expr`.
#[derive(Debug, Clone, Copy)]
pub struct Lowerer<'s> {
    src: &'s str,
    lang: Lang,
}

impl<'s> Lowerer<'s> {
    pub fn new(src: &'s str, lang: Lang) -> Self {
        Lowerer { src, lang }
    }

    pub fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.src.as_bytes()).unwrap_or_default()
    }

    fn other(&self, node: Node) -> Expr {
        Expr::Other(self.text(node).trim().to_string())
    }

    /// Statements of a block body, comments and docstrings skipped.
    pub fn statements(&self, block: Node) -> Vec<Statement> {
        named(block)
            .into_iter()
            .filter(|node| !self.is_docstring(*node))
            .map(|node| self.statement(node))
            .collect()
    }

    fn is_docstring(&self, node: Node) -> bool {
        self.lang == Lang::Python
            && node.kind() == "expression_statement"
            && matches!(named(node).as_slice(), [only] if only.kind() == "string")
    }

    pub fn statement(&self, node: Node) -> Statement {
        let line = line_of(node);
        let text = dedent(self.text(node).trim_end(), node.start_position().column);
        let parsed = match first_error(node) {
            Some(error) => Err(SyntaxError {
                line: line_of(error),
                message: format!("cannot parse `{}`", self.text(error).trim()),
            }),
            None => self.stmt(node),
        };
        Statement { text, line, parsed }
    }

    fn stmt(&self, node: Node) -> Result<Stmt, SyntaxError> {
        let unsupported = || Ok(Stmt::Expr(self.other(node)));
        match node.kind() {
            "expression_statement" => match named(node).first() {
                Some(inner) => Ok(self.expression_stmt(*inner)),
                None => unsupported(),
            },
            "local_variable_declaration" => {
                let Some(declarator) = node.child_by_field_name("declarator") else {
                    return unsupported();
                };
                self.declarator(declarator).map_or_else(unsupported, Ok)
            }
            "lexical_declaration" | "variable_declaration" => {
                let declarator = named(node).into_iter().find(|c| c.kind() == "variable_declarator");
                declarator.and_then(|d| self.declarator(d)).map_or_else(unsupported, Ok)
            }
            "assert_statement" => match named(node).first() {
                Some(expr) => Ok(Stmt::Assert { expr: self.expr(*expr) }),
                None => Err(SyntaxError {
                    line: line_of(node),
                    message: "empty assert".to_string(),
                }),
            },
            _ => unsupported(),
        }
    }

    fn declarator(&self, node: Node) -> Option<Stmt> {
        let name = node.child_by_field_name("name").filter(|n| n.kind() == "identifier")?;
        let value = node.child_by_field_name("value")?;
        Some(Stmt::Decl {
            name: self.text(name).to_string(),
            expr: self.expr(value),
        })
    }

    fn expression_stmt(&self, node: Node) -> Stmt {
        if !matches!(node.kind(), "assignment_expression" | "assignment") {
            return Stmt::Expr(self.expr(node));
        }
        let plain = node
            .child_by_field_name("operator")
            .is_none_or(|op| self.text(op) == "=");
        match (node.child_by_field_name("left"), node.child_by_field_name("right")) {
            (Some(left), Some(right)) if plain => {
                let expr = self.expr(right);
                if left.kind() == "identifier" {
                    Stmt::Decl {
                        name: self.text(left).to_string(),
                        expr,
                    }
                } else {
                    Stmt::Assign {
                        target: self.expr(left),
                        expr,
                    }
                }
            }
            _ => Stmt::Expr(self.other(node)),
        }
    }

    pub fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "parenthesized_expression" | "await_expression" | "await" => match named(node).first() {
                Some(inner) => self.expr(*inner),
                None => self.other(node),
            },
            "cast_expression" => match node.child_by_field_name("value") {
                Some(value) => self.expr(value),
                None => self.other(node),
            },
            "string_literal" | "character_literal" | "text_block" | "string" | "template_string" => {
                self.string(node)
            }
            "concatenated_string" => {
                let parts: Vec<Expr> = named(node).into_iter().map(|part| self.string(part)).collect();
                Expr::Str {
                    value: parts.iter().filter_map(Expr::as_str).collect(),
                    interpolated: parts.iter().any(Expr::is_interpolated),
                }
            }
            "decimal_integer_literal"
            | "hex_integer_literal"
            | "octal_integer_literal"
            | "binary_integer_literal"
            | "decimal_floating_point_literal"
            | "number"
            | "integer"
            | "float" => Expr::Num(self.text(node).to_string()),
            "true" | "false" | "null_literal" | "null" | "undefined" | "none" => {
                Expr::ident(self.text(node), line_of(node))
            }
            "object_creation_expression" | "new_expression" => self.construct(node),
            "tuple" | "expression_list" => Expr::Tuple(self.items(node)),
            "list" | "array" | "array_initializer" => Expr::List(self.items(node)),
            "unary_expression" | "unary_operator" | "not_operator" => self.unary(node),
            "binary_expression" | "binary_operator" | "boolean_operator" | "comparison_operator" => {
                self.binary(node)
            }
            "keyword_argument" => match (node.child_by_field_name("name"), node.child_by_field_name("value")) {
                (Some(name), Some(value)) => Expr::Keyword {
                    name: self.text(name).to_string(),
                    value: Box::new(self.expr(value)),
                },
                _ => self.other(node),
            },
            "object" => self.object(node),
            "arrow_function" | "function" | "function_expression" => self.function(node),
            "method_invocation" | "call_expression" | "call" | "field_access" | "member_expression"
            | "attribute" | "subscript_expression" | "subscript" | "array_access" | "identifier" | "this"
            | "super" | "property_identifier" | "type_identifier" | "scoped_identifier" => {
                let (base, segments) = self.chain(node);
                match base {
                    Some(base) if segments.is_empty() => *base,
                    base => Expr::Path { base, segments },
                }
            }
            _ => self.other(node),
        }
    }

    /// Flatten member access and calls into a base plus segments.
    fn chain(&self, node: Node) -> (Option<Box<Expr>>, Vec<Segment>) {
        let line = line_of(node);
        match node.kind() {
            "identifier" | "this" | "super" | "property_identifier" | "type_identifier" => {
                (None, vec![Segment::field(self.text(node), line)])
            }
            "scoped_identifier" => (
                None,
                self.text(node).split('.').map(|part| Segment::field(part.trim(), line)).collect(),
            ),
            "parenthesized_expression" | "await_expression" | "await" => match named(node).first() {
                Some(inner) => self.chain(*inner),
                None => (Some(Box::new(self.other(node))), Vec::new()),
            },
            "cast_expression" => match node.child_by_field_name("value") {
                Some(value) => self.chain(value),
                None => (Some(Box::new(self.other(node))), Vec::new()),
            },
            "field_access" | "member_expression" | "attribute" => {
                let (object, property) = match node.kind() {
                    "field_access" => ("object", "field"),
                    "member_expression" => ("object", "property"),
                    _ => ("object", "attribute"),
                };
                let (base, mut segments) = node
                    .child_by_field_name(object)
                    .map(|o| self.chain(o))
                    .unwrap_or_default();
                if let Some(property) = node.child_by_field_name(property) {
                    segments.push(Segment::field(self.text(property), line_of(property)));
                }
                (base, segments)
            }
            "method_invocation" => {
                let (base, mut segments) = node
                    .child_by_field_name("object")
                    .map(|o| self.chain(o))
                    .unwrap_or_default();
                let name = node.child_by_field_name("name");
                segments.push(Segment {
                    name: name.map(|n| self.text(n)).unwrap_or_default().to_string(),
                    args: Some(self.arguments(node.child_by_field_name("arguments"))),
                    line: name.map_or(line, line_of),
                });
                (base, segments)
            }
            "call_expression" | "call" => {
                let args = self.arguments(node.child_by_field_name("arguments"));
                let (base, mut segments) = node
                    .child_by_field_name("function")
                    .map(|f| self.chain(f))
                    .unwrap_or_default();
                match segments.last_mut() {
                    Some(last) if !last.is_call() => last.args = Some(args),
                    _ => segments.push(Segment {
                        name: String::new(),
                        args: Some(args),
                        line,
                    }),
                }
                (base, segments)
            }
            "subscript_expression" | "subscript" | "array_access" => {
                let (object, index) = match node.kind() {
                    "subscript_expression" => ("object", "index"),
                    "subscript" => ("value", "subscript"),
                    _ => ("array", "index"),
                };
                let (base, mut segments) = node
                    .child_by_field_name(object)
                    .map(|o| self.chain(o))
                    .unwrap_or_default();
                let index = match node.child_by_field_name(index) {
                    Some(index) => self.expr(index),
                    None => self.other(node),
                };
                segments.push(Segment {
                    name: "[]".to_string(),
                    args: Some(vec![index]),
                    line,
                });
                (base, segments)
            }
            _ => (Some(Box::new(self.expr(node))), Vec::new()),
        }
    }

    fn arguments(&self, node: Option<Node>) -> Vec<Expr> {
        match node {
            Some(list) if matches!(list.kind(), "argument_list" | "arguments") => self.items(list),
            Some(single) => vec![self.expr(single)],
            None => Vec::new(),
        }
    }

    fn items(&self, node: Node) -> Vec<Expr> {
        named(node).into_iter().map(|item| self.expr(item)).collect()
    }

    fn string(&self, node: Node) -> Expr {
        let raw = self.text(node);
        let interpolated = match self.lang {
            Lang::JavaScript => raw.starts_with('`') && raw.contains("${"),
            Lang::Python => {
                let prefix = &raw[..raw.len() - raw.trim_start_matches(|c: char| c.is_ascii_alphabetic()).len()];
                prefix.to_ascii_lowercase().contains('f') && raw.contains('{')
            }
            Lang::Java => false,
        };
        Expr::Str {
            value: decode_string(raw),
            interpolated,
        }
    }

    fn construct(&self, node: Node) -> Expr {
        let class = node
            .child_by_field_name("type")
            .or_else(|| node.child_by_field_name("constructor"))
            .map(|n| class_name(self.text(n)))
            .unwrap_or_default();
        Expr::New {
            class,
            args: self.arguments(node.child_by_field_name("arguments")),
            line: line_of(node),
        }
    }

    fn unary(&self, node: Node) -> Expr {
        let Some(operand) = named(node).pop() else {
            return self.other(node);
        };
        let op = self
            .src
            .get(node.start_byte()..operand.start_byte())
            .unwrap_or_default()
            .trim();
        match (op, self.expr(operand)) {
            ("!" | "not", inner) => Expr::Not(Box::new(inner)),
            ("-", Expr::Num(n)) => Expr::Num(format!("-{}", n)),
            ("+", Expr::Num(n)) => Expr::Num(n),
            _ => self.other(node),
        }
    }

    /// Left-folded operator chain; `and`/`or` become `&&`/`||` and
    /// `not in`/`is not` keep a single space.
    fn binary(&self, node: Node) -> Expr {
        let operands = named(node);
        let Some((first, rest)) = operands.split_first() else {
            return self.other(node);
        };
        let mut acc = self.expr(*first);
        let mut prev = *first;
        for next in rest {
            let op = self
                .src
                .get(prev.end_byte()..next.start_byte())
                .unwrap_or_default()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            let op = match op.as_str() {
                "and" => "&&".to_string(),
                "or" => "||".to_string(),
                _ => op,
            };
            acc = Expr::Binary {
                op,
                lhs: Box::new(acc),
                rhs: Box::new(self.expr(*next)),
            };
            prev = *next;
        }
        acc
    }

    fn object(&self, node: Node) -> Expr {
        let mut fields = Vec::new();
        for child in named(node) {
            match child.kind() {
                "pair" => {
                    let (Some(key), Some(value)) = (child.child_by_field_name("key"), child.child_by_field_name("value"))
                    else {
                        return self.other(node);
                    };
                    let key = match key.kind() {
                        "property_identifier" | "identifier" | "number" => self.text(key).to_string(),
                        "string" => decode_string(self.text(key)),
                        _ => return self.other(node),
                    };
                    fields.push((key, self.expr(value)));
                }
                "shorthand_property_identifier" => {
                    let name = self.text(child);
                    fields.push((name.to_string(), Expr::ident(name, line_of(child))));
                }
                _ => return self.other(node),
            }
        }
        Expr::Object(fields)
    }

    fn function(&self, node: Node) -> Expr {
        let params = match node.child_by_field_name("parameter") {
            Some(single) => vec![self.text(single).to_string()],
            None => node
                .child_by_field_name("parameters")
                .map(|list| named(list).into_iter().map(|p| self.text(p).to_string()).collect())
                .unwrap_or_default(),
        };
        let body = match node.child_by_field_name("body") {
            Some(block) if block.kind() == "statement_block" => self.statements(block),
            Some(expr) => vec![Statement {
                text: self.text(expr).to_string(),
                line: line_of(expr),
                parsed: Ok(Stmt::Expr(self.expr(expr))),
            }],
            None => Vec::new(),
        };
        Expr::Function {
            params,
            body,
            raw: self.text(node).to_string(),
        }
    }
}

/// `org.openqa.WebDriverWait<T>` → `WebDriverWait`.
fn class_name(text: &str) -> String {
    let plain = text.split('<').next().unwrap_or(text);
    plain.rsplit('.').next().unwrap_or(plain).trim().to_string()
}

/// Strip prefix and quotes from a string literal and resolve escapes.
fn decode_string(raw: &str) -> String {
    let body = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let verbatim = raw[..raw.len() - body.len()].to_ascii_lowercase().contains('r');
    let inner = ["\"\"\"", "'''", "\"", "'", "`"]
        .into_iter()
        .find(|q| body.len() >= 2 * q.len() && body.starts_with(q) && body.ends_with(q))
        .map_or(body, |q| &body[q.len()..body.len() - q.len()]);
    if verbatim {
        return inner.to_string();
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Remove the statement's own indentation from its continuation lines.
fn dedent(text: &str, column: usize) -> String {
    let mut lines = text.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        out.push_str(&line[indent.min(column)..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(src: &str, lang: Lang) -> Stmt {
        parse_statement(src, lang).unwrap().parsed.unwrap()
    }

    fn expr(src: &str, lang: Lang) -> Expr {
        match parsed(src, lang) {
            Stmt::Expr(expr) => expr,
            other => panic!("expected expression, got {:?}", other),
        }
    }

    #[test]
    fn decodes_string_literals() {
        assert_eq!(decode_string("\"https://x\""), "https://x");
        assert_eq!(decode_string("'a\\'b'"), "a'b");
        assert_eq!(decode_string("r'\\d+'"), "\\d+");
        assert_eq!(decode_string("\"\"\"doc\"\"\""), "doc");
    }

    #[test]
    fn parses_selenium_chain() {
        let statement = parse_statement("driver.findElement(By.id(\"login\")).sendKeys(\"alice\");", Lang::Java).unwrap();
        assert_eq!(statement.text, "driver.findElement(By.id(\"login\")).sendKeys(\"alice\");");
        let Ok(Stmt::Expr(expr)) = statement.parsed else { panic!("expected expression") };
        assert_eq!(expr.shape(), "driver.findElement.sendKeys");
        let find = expr.find_segment("findElement").unwrap();
        let by = find.arg(0).unwrap();
        assert_eq!(by.shape(), "By.id");
        assert_eq!(by.last_segment().unwrap().str_arg(0), Some("login"));
    }

    #[test]
    fn parses_java_declaration_and_cast() {
        match parsed("WebElement box = driver.findElement(By.name(\"q\"));", Lang::Java) {
            Stmt::Decl { name, expr } => {
                assert_eq!(name, "box");
                assert_eq!(expr.shape(), "driver.findElement");
            }
            other => panic!("expected declaration, got {:?}", other),
        }
        let cast = expr("((JavascriptExecutor) driver).executeScript(\"return 1\");", Lang::Java);
        assert_eq!(cast.shape(), "driver.executeScript");
    }

    #[test]
    fn constructor_chains_collapse_to_their_base() {
        let chain = expr("new WebDriverWait(driver, Duration.ofSeconds(5)).until(x);", Lang::Java);
        assert_eq!(chain.shape(), "new.WebDriverWait.until");
        match chain.truncated(1) {
            Expr::New { class, args, .. } => {
                assert_eq!(class, "WebDriverWait");
                assert_eq!(args.len(), 2);
            }
            other => panic!("expected constructor, got {:?}", other),
        }
    }

    #[test]
    fn parses_python_assert_comparison() {
        match parsed("assert \"Welcome\" in driver.page_source, \"missing\"", Lang::Python) {
            Stmt::Assert {
                expr: Expr::Binary { op, lhs, rhs },
            } => {
                assert_eq!(op, "in");
                assert_eq!(lhs.as_str(), Some("Welcome"));
                assert_eq!(rhs.shape(), "driver.page_source");
            }
            other => panic!("unexpected {:?}", other),
        }
        match parsed("assert \"x\" not in driver.title", Lang::Python) {
            Stmt::Assert {
                expr: Expr::Binary { op, .. },
            } => assert_eq!(op, "not in"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_python_tuple_locator_and_kwargs() {
        let expr = expr(
            "WebDriverWait(driver, timeout=10).until(EC.visibility_of_element_located((By.ID, \"x\")))",
            Lang::Python,
        );
        assert_eq!(expr.shape(), "WebDriverWait.until");
        let wait = &expr.segments()[0];
        assert!(matches!(wait.arg(1), Some(Expr::Keyword { name, .. }) if name == "timeout"));
        let until = expr.find_segment("until").unwrap();
        let cond = until.arg(0).unwrap();
        match cond.last_segment().unwrap().arg(0) {
            Some(Expr::Tuple(items)) => assert_eq!(items[1].as_str(), Some("x")),
            other => panic!("expected tuple, got {:?}", other),
        }
    }

    #[test]
    fn lowers_callbacks_with_their_statements() {
        let expr = expr(
            "cy.request('/users').then((resp) => {\n  expect(resp.status).to.eq(200)\n  count = resp.body.length\n})",
            Lang::JavaScript,
        );
        let then = expr.find_segment("then").unwrap();
        match then.arg(0) {
            Some(Expr::Function { params, body, raw }) => {
                assert_eq!(params, &["resp".to_string()]);
                assert!(raw.starts_with("(resp) =>"));
                assert_eq!(body.len(), 2);
                assert_eq!(body[0].line, 2);
                assert_eq!(body[0].text, "expect(resp.status).to.eq(200)");
            }
            other => panic!("expected callback, got {:?}", other),
        }
    }

    #[test]
    fn static_object_literals_become_json() {
        let expr = expr("f({ name: 'bob', 'age': 3, tags: ['a'], ok: true })", Lang::JavaScript);
        let body = expr.last_segment().unwrap().arg(0).unwrap();
        assert_eq!(
            body.to_json(),
            Some(serde_json::json!({"name": "bob", "age": 3, "tags": ["a"], "ok": true}))
        );
        let dynamic = self::expr("f({ name: user.name })", Lang::JavaScript);
        assert_eq!(dynamic.last_segment().unwrap().arg(0).unwrap().to_json(), None);
    }

    #[test]
    fn segment_lines_follow_newlines() {
        let expr = expr("\n\ngiven()\n  .when()\n  .get(\"/users\");", Lang::Java);
        let lines: Vec<_> = expr.segments().iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![3, 4, 5]);
    }

    #[test]
    fn assignment_to_member_is_not_a_declaration() {
        match parsed("RestAssured.baseURI = \"https://api.example.com\";", Lang::Java) {
            Stmt::Assign { target, expr } => {
                assert_eq!(target.shape(), "RestAssured.baseURI");
                assert_eq!(expr.as_str(), Some("https://api.example.com"));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn broken_statements_report_their_line() {
        let statement = parse_statement("driver.get(\"x\"", Lang::Java).unwrap();
        assert!(statement.parsed.is_err());
        assert_eq!(statement.line, 1);
    }
}
