//! Static checks over generated text: bracket balance, string
//! termination, Python block structure and the imports each target needs.
//! Nothing here executes or fully parses the output.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::intent::dialect::{Dialect, SyntaxFamily};

static TS_NAMED_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s*(?:type\s+)?\{([^}]*)\}\s*from\s*['"]([^'"]+)['"]"#).expect("ts import regex")
});
static PY_FROM_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+\(?([^)#]+)\)?").expect("py from-import regex"));
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+([\w., ]+)").expect("py import regex"));

/// How much the pipeline trusts the validator's verdict.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    /// Any defect fails the translation
    Strict,
    /// Defects become warnings
    #[default]
    Lenient,
    Skip,
}

impl std::str::FromStr for ValidationLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationLevel::Strict),
            "lenient" => Ok(ValidationLevel::Lenient),
            "skip" => Ok(ValidationLevel::Skip),
            other => Err(format!("unknown validation level '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefectKind {
    UnbalancedBracket,
    UnterminatedString,
    UnterminatedComment,
    Indentation,
    MissingImport,
}

/// One structural problem in generated code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defect {
    pub kind: DefectKind,
    pub line: usize,
    pub message: String,
}

impl Defect {
    fn new(kind: DefectKind, line: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// What `Validator::gate` decided.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Clean,
    Skipped,
    /// Lenient run with defects; translation still succeeds
    Warnings(Vec<Defect>),
    /// Strict run with defects
    Rejected(Vec<Defect>),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    /// Every defect found in `code` as `target` text, in line order.
    pub fn check(code: &str, target: Dialect) -> Vec<Defect> {
        let family = target.syntax();
        if family == SyntaxFamily::Gherkin {
            return Vec::new();
        }

        let scan = Scanner::new(family).run(code);
        let mut defects = scan.defects.clone();
        if family == SyntaxFamily::Python {
            defects.extend(python_indentation(&scan));
        }
        defects.extend(missing_imports(code, &scan.cleaned, target));
        defects.sort_by_key(|d| d.line);

        if !defects.is_empty() {
            debug!(dialect = target.id(), defects = defects.len(), "validator found defects");
        }
        defects
    }

    pub fn gate(level: ValidationLevel, code: &str, target: Dialect) -> GateOutcome {
        if level == ValidationLevel::Skip {
            return GateOutcome::Skipped;
        }
        let defects = Self::check(code, target);
        match (level, defects.is_empty()) {
            (_, true) => GateOutcome::Clean,
            (ValidationLevel::Strict, false) => GateOutcome::Rejected(defects),
            (_, false) => GateOutcome::Warnings(defects),
        }
    }
}

// ============================================================================
// Lexical scan
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Code,
    LineComment,
    BlockComment { start: usize },
    Str { quote: char, triple: bool, start: usize },
    Template { start: usize },
    Regex { in_class: bool },
}

#[derive(Debug, Clone, Default)]
struct Scan {
    /// Source lines with comments removed and string contents blanked
    cleaned: Vec<String>,
    /// Line starts inside an open bracket or a multi-line string
    continued: Vec<bool>,
    defects: Vec<Defect>,
}

struct Scanner {
    family: SyntaxFamily,
    state: State,
    stack: Vec<(char, usize)>,
    line: usize,
    current: String,
    last_significant: Option<char>,
    scan: Scan,
}

impl Scanner {
    fn new(family: SyntaxFamily) -> Self {
        Self {
            family,
            state: State::Code,
            stack: Vec::new(),
            line: 1,
            current: String::new(),
            last_significant: None,
            scan: Scan {
                continued: vec![false],
                ..Scan::default()
            },
        }
    }

    fn python(&self) -> bool {
        self.family == SyntaxFamily::Python
    }

    fn js(&self) -> bool {
        matches!(self.family, SyntaxFamily::JavaScript | SyntaxFamily::TypeScript)
    }

    fn defect(&mut self, kind: DefectKind, line: usize, message: String) {
        self.scan.defects.push(Defect::new(kind, line, message));
    }

    fn newline(&mut self) {
        match self.state {
            State::LineComment => self.state = State::Code,
            State::Str { triple: false, start, .. } => {
                self.defect(DefectKind::UnterminatedString, start, "string literal is not closed".to_string());
                self.state = State::Code;
            }
            _ => {}
        }
        self.scan.cleaned.push(std::mem::take(&mut self.current));
        self.line += 1;
        let continued = !self.stack.is_empty() || !matches!(self.state, State::Code);
        self.scan.continued.push(continued);
    }

    fn regex_allowed(&self) -> bool {
        self.last_significant
            .is_none_or(|c| "(,=:[!&|?{};+-*%<>~^".contains(c))
    }

    fn run(mut self, code: &str) -> Scan {
        let chars: Vec<char> = code.chars().collect();
        let at = |i: usize| chars.get(i).copied();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '\n' {
                self.newline();
                i += 1;
                continue;
            }

            match self.state {
                State::Code => {
                    if self.python() && c == '#' {
                        self.state = State::LineComment;
                    } else if !self.python() && c == '/' && at(i + 1) == Some('/') {
                        self.state = State::LineComment;
                        i += 2;
                        continue;
                    } else if !self.python() && c == '/' && at(i + 1) == Some('*') {
                        self.state = State::BlockComment { start: self.line };
                        i += 2;
                        continue;
                    } else if self.js() && c == '/' && self.regex_allowed() {
                        self.state = State::Regex { in_class: false };
                        self.current.push(c);
                    } else if self.js() && c == '`' {
                        self.state = State::Template { start: self.line };
                        self.current.push(c);
                    } else if c == '"' || c == '\'' {
                        let triple = self.python() && at(i + 1) == Some(c) && at(i + 2) == Some(c);
                        self.state = State::Str {
                            quote: c,
                            triple,
                            start: self.line,
                        };
                        let width = if triple { 3 } else { 1 };
                        self.current.extend(std::iter::repeat_n(c, width));
                        i += width;
                        continue;
                    } else if matches!(c, '(' | '[' | '{') {
                        self.stack.push((c, self.line));
                        self.current.push(c);
                    } else if matches!(c, ')' | ']' | '}') {
                        self.close(c);
                        self.current.push(c);
                    } else {
                        self.current.push(c);
                    }
                    if !c.is_whitespace() {
                        self.last_significant = Some(c);
                    }
                }
                State::LineComment => {}
                State::BlockComment { .. } => {
                    if c == '*' && at(i + 1) == Some('/') {
                        self.state = State::Code;
                        i += 2;
                        continue;
                    }
                }
                State::Str { quote, triple, .. } => {
                    if c == '\\' {
                        // An escaped newline continues the literal on the next line.
                        if at(i + 1) == Some('\n') {
                            self.scan.cleaned.push(std::mem::take(&mut self.current));
                            self.line += 1;
                            self.scan.continued.push(true);
                        }
                        i += 2;
                        continue;
                    }
                    let closes = c == quote && (!triple || (at(i + 1) == Some(quote) && at(i + 2) == Some(quote)));
                    if closes {
                        let width = if triple { 3 } else { 1 };
                        self.current.extend(std::iter::repeat_n(quote, width));
                        self.state = State::Code;
                        self.last_significant = Some(quote);
                        i += width;
                        continue;
                    }
                }
                State::Template { .. } => {
                    if c == '\\' {
                        i += 2;
                        continue;
                    }
                    if c == '`' {
                        self.current.push(c);
                        self.state = State::Code;
                        self.last_significant = Some(c);
                    }
                }
                State::Regex { in_class } => {
                    if c == '\\' {
                        i += 2;
                        continue;
                    }
                    match c {
                        '[' => self.state = State::Regex { in_class: true },
                        ']' if in_class => self.state = State::Regex { in_class: false },
                        '/' if !in_class => {
                            self.current.push(c);
                            self.state = State::Code;
                            // a following `/` divides
                            self.last_significant = Some('r');
                        }
                        _ => {}
                    }
                }
            }
            i += 1;
        }

        self.finish()
    }

    fn close(&mut self, c: char) {
        let open = match c {
            ')' => '(',
            ']' => '[',
            _ => '{',
        };
        match self.stack.pop() {
            Some((o, _)) if o == open => {}
            Some((o, line)) => {
                let message = format!("'{}' opened at line {} is closed by '{}'", o, line, c);
                self.defect(DefectKind::UnbalancedBracket, self.line, message);
            }
            None => {
                let message = format!("unmatched closing '{}'", c);
                self.defect(DefectKind::UnbalancedBracket, self.line, message);
            }
        }
    }

    fn finish(mut self) -> Scan {
        match self.state {
            State::Str { start, .. } | State::Template { start } => {
                self.defect(DefectKind::UnterminatedString, start, "string literal is not closed".to_string());
            }
            State::BlockComment { start } => {
                self.defect(DefectKind::UnterminatedComment, start, "block comment is not closed".to_string());
            }
            _ => {}
        }
        for (open, line) in std::mem::take(&mut self.stack) {
            self.defect(DefectKind::UnbalancedBracket, line, format!("'{}' is never closed", open));
        }
        self.scan.cleaned.push(std::mem::take(&mut self.current));
        self.scan
    }
}

// ============================================================================
// Python blocks
// ============================================================================

fn python_indentation(scan: &Scan) -> Vec<Defect> {
    let mut defects = Vec::new();
    let mut levels = vec![0usize];
    let mut pending_block: Option<usize> = None;

    for (idx, text) in scan.cleaned.iter().enumerate() {
        let line = idx + 1;
        let code = text.trim_end();
        if code.trim().is_empty() {
            continue;
        }
        let continued = scan.continued.get(idx).copied().unwrap_or(false);

        if !continued {
            let width = code.len() - code.trim_start().len();
            let top = levels.last().copied().unwrap_or(0);
            if pending_block.take().is_some() {
                if width <= top {
                    defects.push(Defect::new(DefectKind::Indentation, line, "expected an indented block"));
                } else {
                    levels.push(width);
                }
            } else if width > top {
                defects.push(Defect::new(DefectKind::Indentation, line, "unexpected indent"));
            } else if width < top {
                while levels.last().is_some_and(|&l| l > width) {
                    levels.pop();
                }
                if levels.last().copied().unwrap_or(0) != width {
                    defects.push(Defect::new(
                        DefectKind::Indentation,
                        line,
                        "unindent does not match any outer level",
                    ));
                    levels.push(width);
                }
            }
        }

        let next_continued = scan.continued.get(idx + 1).copied().unwrap_or(false);
        if code.ends_with(':') && !next_continued {
            pending_block = Some(line);
        }
    }

    if let Some(line) = pending_block {
        defects.push(Defect::new(DefectKind::Indentation, line, "block has no body"));
    }
    defects
}

// ============================================================================
// Imports
// ============================================================================

struct ImportRule {
    name: &'static str,
    /// Module the name must come from; `None` for `import name`
    from: Option<&'static str>,
}

const fn named(name: &'static str, from: &'static str) -> ImportRule {
    ImportRule { name, from: Some(from) }
}

const fn module(name: &'static str) -> ImportRule {
    ImportRule { name, from: None }
}

fn rules_for(target: Dialect) -> &'static [ImportRule] {
    const TS: &[ImportRule] = &[named("test", "@playwright/test"), named("expect", "@playwright/test")];
    const PW_PY: &[ImportRule] = &[
        named("expect", "playwright.sync_api"),
        named("Page", "playwright.sync_api"),
        module("re"),
        module("pytest"),
    ];
    const REQUESTS: &[ImportRule] = &[module("requests"), module("os"), module("time"), module("pytest")];
    match target {
        Dialect::PlaywrightTs => TS,
        Dialect::PlaywrightPython => PW_PY,
        Dialect::PytestRequests => REQUESTS,
        _ => &[],
    }
}

/// (module, imported name) pairs; plain `import x` yields (x, x).
fn imported_names(code: &str, family: SyntaxFamily) -> BTreeSet<(String, String)> {
    let mut out = BTreeSet::new();
    for line in code.lines() {
        match family {
            SyntaxFamily::Python => {
                if let Some(caps) = PY_FROM_IMPORT.captures(line) {
                    for name in caps[2].split(',') {
                        if let Some(name) = bound_name(name) {
                            out.insert((caps[1].to_string(), name));
                        }
                    }
                } else if let Some(caps) = PY_IMPORT.captures(line) {
                    for name in caps[1].split(',') {
                        if let Some(name) = bound_name(name) {
                            out.insert((name.clone(), name));
                        }
                    }
                }
            }
            _ => {
                if let Some(caps) = TS_NAMED_IMPORT.captures(line) {
                    for name in caps[1].split(',') {
                        if let Some(name) = bound_name(name) {
                            out.insert((caps[2].to_string(), name));
                        }
                    }
                }
            }
        }
    }
    out
}

/// `x as y` binds `y`.
fn bound_name(item: &str) -> Option<String> {
    let name = item.split(" as ").last()?.trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn missing_imports(code: &str, cleaned: &[String], target: Dialect) -> Vec<Defect> {
    let rules = rules_for(target);
    if rules.is_empty() {
        return Vec::new();
    }
    let imported = imported_names(code, target.syntax());

    let mut defects = Vec::new();
    for rule in rules {
        let Some(line) = first_free_use(cleaned, rule.name) else {
            continue;
        };
        let present = match rule.from {
            Some(from) => imported.contains(&(from.to_string(), rule.name.to_string())),
            None => imported.contains(&(rule.name.to_string(), rule.name.to_string())),
        };
        if !present {
            let source = rule.from.unwrap_or(rule.name);
            defects.push(Defect::new(
                DefectKind::MissingImport,
                line,
                format!("'{}' is used but not imported from '{}'", rule.name, source),
            ));
        }
    }
    defects
}

/// Line of the first use of `name` as a free identifier outside import
/// lines. String contents are already blanked.
fn first_free_use(cleaned: &[String], name: &str) -> Option<usize> {
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    cleaned.iter().enumerate().find_map(|(idx, line)| {
        let trimmed = line.trim_start();
        if trimmed.starts_with("import ") || trimmed.starts_with("from ") {
            return None;
        }
        let used = line.match_indices(name).any(|(i, _)| {
            let before = line[..i].chars().next_back();
            let after = line[i + name.len()..].chars().next();
            before.is_none_or(|c| !is_ident(c) && c != '.') && after.is_none_or(|c| !is_ident(c))
                && !line[i + name.len()..].trim_start().starts_with('=')
                && !line[i + name.len()..].trim_start().starts_with(':')
        });
        used.then_some(idx + 1)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brackets_inside_strings_and_comments_are_ignored() {
        let code = "const s = ')';\n// (\n/* { */\nconst r = /\\(x/;\n";
        assert!(Scanner::new(SyntaxFamily::TypeScript).run(code).defects.is_empty());
    }

    #[test]
    fn reports_unclosed_and_mismatched_brackets() {
        let scan = Scanner::new(SyntaxFamily::TypeScript).run("foo(bar];\nbaz(\n");
        assert_eq!(scan.defects.len(), 2);
        assert!(scan.defects.iter().all(|d| d.kind == DefectKind::UnbalancedBracket));
    }

    #[test]
    fn python_triple_quoted_strings_span_lines() {
        let code = "x = \"\"\"a\n(b\n\"\"\"\n";
        let scan = Scanner::new(SyntaxFamily::Python).run(code);
        assert!(scan.defects.is_empty());
        assert_eq!(scan.continued, vec![false, true, true, false]);
    }

    #[test]
    fn python_block_needs_a_body() {
        let defects = Validator::check("def test_x():\nx = 1\n", Dialect::PytestRequests);
        assert!(defects.iter().any(|d| d.kind == DefectKind::Indentation && d.line == 2));
    }

    #[test]
    fn keyword_arguments_are_not_uses() {
        let cleaned = vec!["foo(expect=1)".to_string()];
        assert_eq!(first_free_use(&cleaned, "expect"), None);
    }
}
