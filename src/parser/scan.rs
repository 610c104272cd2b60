//! Test-block discovery: finds test, setup and teardown bodies in a parsed
//! Java, JavaScript or Python file and lowers their statements.

use tracing::debug;
use tree_sitter::{Node, Tree};

use crate::parser::syntax::{Lang, Lowerer, Statement, SyntaxError, line_of, named, parse_tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRole {
    Test,
    Setup,
    Teardown,
}

/// A test, setup or teardown body located in a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct TestBlock {
    pub role: BlockRole,
    pub name: String,
    /// Line of the declaration (first annotation, decorator target or call)
    pub line: usize,
    pub statements: Vec<Statement>,
    /// Annotations, decorators or the Mocha call kind
    pub markers: Vec<String>,
}

const JS_BLOCK_CALLS: [&str; 9] = [
    "it",
    "specify",
    "test",
    "beforeEach",
    "before",
    "afterEach",
    "after",
    "describe",
    "context",
];

/// A source file parsed once and queried by a front end.
pub struct SourceFile<'s> {
    src: &'s str,
    lang: Lang,
    tree: Tree,
}

impl<'s> SourceFile<'s> {
    pub fn parse(src: &'s str, lang: Lang) -> Result<Self, SyntaxError> {
        let tree = parse_tree(src, lang)?;
        Ok(SourceFile { src, lang, tree })
    }

    fn lowerer(&self) -> Lowerer<'s> {
        Lowerer::new(self.src, self.lang)
    }

    /// Name of the first class declared in the file.
    pub fn class_name(&self) -> Option<String> {
        let class = find_first(self.tree.root_node(), &|n| {
            matches!(n.kind(), "class_declaration" | "class_definition")
        })?;
        let name = class.child_by_field_name("name")?;
        Some(self.lowerer().text(name).to_string())
    }

    /// Test, setup and teardown blocks in source order.
    pub fn blocks(&self) -> Vec<TestBlock> {
        let root = self.tree.root_node();
        let mut blocks = Vec::new();
        match self.lang {
            Lang::Java => self.java_blocks(root, &mut blocks),
            Lang::JavaScript => self.js_blocks(root, &mut Vec::new(), &mut blocks),
            Lang::Python => self.python_blocks(root, &mut blocks),
        }
        debug!(lang = ?self.lang, blocks = blocks.len(), recovered = root.has_error(), "scanned source");
        blocks
    }

    // ------------------------------------------------------------------
    // Java: annotated methods
    // ------------------------------------------------------------------

    fn java_blocks(&self, node: Node, blocks: &mut Vec<TestBlock>) {
        if node.kind() == "method_declaration" {
            blocks.extend(self.java_method(node));
            return;
        }
        for child in named(node) {
            self.java_blocks(child, blocks);
        }
    }

    fn java_method(&self, node: Node) -> Option<TestBlock> {
        let lowerer = self.lowerer();
        let markers: Vec<String> = named(node)
            .into_iter()
            .filter(|child| child.kind() == "modifiers")
            .flat_map(named)
            .filter(|child| matches!(child.kind(), "marker_annotation" | "annotation"))
            .filter_map(|annotation| annotation.child_by_field_name("name"))
            .map(|name| {
                let name = lowerer.text(name);
                name.rsplit('.').next().unwrap_or(name).to_string()
            })
            .collect();
        let role = markers.iter().find_map(|m| java_role(m))?;
        let name = lowerer.text(node.child_by_field_name("name")?).to_string();
        let body = node.child_by_field_name("body")?;
        Some(TestBlock {
            role,
            name,
            line: line_of(node),
            statements: lowerer.statements(body),
            markers,
        })
    }

    // ------------------------------------------------------------------
    // JavaScript: Mocha-style calls
    // ------------------------------------------------------------------

    fn js_blocks(&self, node: Node, suites: &mut Vec<String>, blocks: &mut Vec<TestBlock>) {
        let kind = (node.kind() == "call_expression")
            .then(|| self.js_block_kind(node))
            .flatten();
        let Some(kind) = kind else {
            for child in named(node) {
                self.js_blocks(child, suites, blocks);
            }
            return;
        };

        let lowerer = self.lowerer();
        let args = node.child_by_field_name("arguments").map(named).unwrap_or_default();
        let name = args
            .first()
            .filter(|arg| matches!(arg.kind(), "string" | "template_string"))
            .and_then(|arg| lowerer.expr(*arg).as_str().map(str::to_string))
            .unwrap_or_default();
        let callback = args
            .iter()
            .copied()
            .find(|arg| matches!(arg.kind(), "arrow_function" | "function" | "function_expression"));

        if matches!(kind, "describe" | "context") {
            suites.push(name);
            if let Some(callback) = callback {
                self.js_blocks(callback, suites, blocks);
            }
            suites.pop();
            return;
        }

        let body = callback
            .and_then(|c| c.child_by_field_name("body"))
            .filter(|b| b.kind() == "statement_block");
        let Some(body) = body else { return };
        let mut markers = vec![kind.to_string()];
        if let Some(suite) = suites.last() {
            markers.push(format!("suite={}", suite));
        }
        blocks.push(TestBlock {
            role: js_role(kind),
            name,
            line: line_of(node),
            statements: lowerer.statements(body),
            markers,
        });
    }

    /// `it(...)`, `it.only(...)`, `describe.skip(...)`; member calls such
    /// as `obj.it(...)` are not blocks.
    fn js_block_kind(&self, call: Node) -> Option<&'static str> {
        let function = call.child_by_field_name("function")?;
        let callee = match function.kind() {
            "identifier" => function,
            "member_expression" => {
                let property = function.child_by_field_name("property")?;
                if !matches!(self.lowerer().text(property), "only" | "skip") {
                    return None;
                }
                function.child_by_field_name("object").filter(|o| o.kind() == "identifier")?
            }
            _ => return None,
        };
        let name = self.lowerer().text(callee);
        JS_BLOCK_CALLS.into_iter().find(|kind| *kind == name)
    }

    // ------------------------------------------------------------------
    // Python: test functions and xUnit hooks
    // ------------------------------------------------------------------

    fn python_blocks(&self, node: Node, blocks: &mut Vec<TestBlock>) {
        if node.kind() == "function_definition" {
            blocks.extend(self.python_function(node));
            return;
        }
        for child in named(node) {
            self.python_blocks(child, blocks);
        }
    }

    fn python_function(&self, node: Node) -> Option<TestBlock> {
        let lowerer = self.lowerer();
        let name = lowerer.text(node.child_by_field_name("name")?);
        let role = python_role(name)?;
        let markers = node
            .parent()
            .filter(|parent| parent.kind() == "decorated_definition")
            .map(|parent| {
                named(parent)
                    .into_iter()
                    .filter(|child| child.kind() == "decorator")
                    .map(|d| lowerer.text(d).trim().trim_start_matches('@').trim().to_string())
                    .collect()
            })
            .unwrap_or_default();
        let body = node.child_by_field_name("body")?;
        Some(TestBlock {
            role,
            name: name.to_string(),
            line: line_of(node),
            statements: lowerer.statements(body),
            markers,
        })
    }
}

fn find_first<'t>(node: Node<'t>, matches: &dyn Fn(Node) -> bool) -> Option<Node<'t>> {
    if matches(node) {
        return Some(node);
    }
    named(node).into_iter().find_map(|child| find_first(child, matches))
}

fn java_role(annotation: &str) -> Option<BlockRole> {
    if annotation.starts_with("Before") {
        Some(BlockRole::Setup)
    } else if annotation.starts_with("After") {
        Some(BlockRole::Teardown)
    } else if annotation.ends_with("Test") {
        Some(BlockRole::Test)
    } else {
        None
    }
}

fn js_role(kind: &str) -> BlockRole {
    match kind {
        "beforeEach" | "before" => BlockRole::Setup,
        "afterEach" | "after" => BlockRole::Teardown,
        _ => BlockRole::Test,
    }
}

fn python_role(name: &str) -> Option<BlockRole> {
    if name.starts_with("test") {
        Some(BlockRole::Test)
    } else if matches!(name, "setUp" | "setup_method" | "setup_function" | "setup") {
        Some(BlockRole::Setup)
    } else if matches!(name, "tearDown" | "teardown_method" | "teardown_function" | "teardown") {
        Some(BlockRole::Teardown)
    } else {
        None
    }
}
