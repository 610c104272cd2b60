use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use tracing::debug;

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, BddPhase, HttpMethod, Locator,
    OwnedNode, TestIntent, Value,
};
use crate::parser::{ParseError, Parser, finish_intent, hook_step};

/// Cucumber feature files.
#[derive(Debug, Default, Clone, Copy)]
pub struct GherkinParser;

/// One step line with its attached table or docstring.
#[derive(Debug, Clone)]
struct GherkinStep {
    keyword: String,
    text: String,
    line: usize,
    /// Data table rows or docstring body following the step
    argument: Option<String>,
}

#[derive(Debug, Clone)]
enum Section {
    Background,
    Scenario { name: String, outline: bool, tags: Vec<String> },
}

#[derive(Debug, Clone)]
struct Block {
    section: Section,
    line: usize,
    steps: Vec<GherkinStep>,
    examples: Vec<String>,
}

impl Parser for GherkinParser {
    fn dialect(&self) -> Dialect {
        Dialect::Gherkin
    }

    fn can_parse(&self, text: &str) -> bool {
        let mut feature = false;
        let mut scenario = false;
        for line in text.lines().map(str::trim) {
            feature |= line.starts_with("Feature:");
            scenario |= line.starts_with("Scenario") || line.starts_with("Example:");
        }
        feature && scenario
    }

    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError> {
        if !self.can_parse(text) {
            return Err(ParseError::NotRecognized {
                dialect: self.dialect(),
            });
        }

        let (feature, blocks) = self.split_blocks(text)?;

        let background: Vec<ActionIntent> = blocks
            .iter()
            .filter(|b| matches!(b.section, Section::Background))
            .flat_map(|b| lower_steps(&b.steps))
            .map(|(node, _)| hook_step(node))
            .collect();

        let mut intents = Vec::new();
        for block in &blocks {
            let Section::Scenario { name, outline, tags } = &block.section else {
                continue;
            };

            let variants = if *outline { outline_rows(&block.examples) } else { Vec::new() };
            if variants.is_empty() {
                let mut intent = self.scenario(name.clone(), block, &block.steps, source_label, &feature, tags);
                if *outline {
                    intent.metadata.insert("outline".to_string(), "true".to_string());
                }
                intents.push(finish_intent(intent, &background, &[]));
                continue;
            }

            for (idx, row) in variants.iter().enumerate() {
                let label = row.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(", ");
                let steps: Vec<GherkinStep> = block.steps.iter().map(|step| substitute(step, row)).collect();
                let mut intent =
                    self.scenario(format!("{name} ({label})"), block, &steps, source_label, &feature, tags);
                intent.metadata.insert("outline".to_string(), "true".to_string());
                intent.metadata.insert("example_row".to_string(), (idx + 1).to_string());
                intents.push(finish_intent(intent, &background, &[]));
            }
        }

        if intents.is_empty() {
            return Err(ParseError::MissingTestBoundary {
                dialect: self.dialect(),
                source_label: source_label.to_string(),
            });
        }
        Ok(intents)
    }
}

impl GherkinParser {
    fn scenario(
        &self,
        name: String,
        block: &Block,
        steps: &[GherkinStep],
        source_label: &str,
        feature: &Option<String>,
        tags: &[String],
    ) -> TestIntent {
        let mut intent = TestIntent::new(name, self.dialect(), TestKind::Bdd);
        intent.metadata.insert("source".to_string(), source_label.to_string());
        intent.metadata.insert("line".to_string(), block.line.to_string());
        if let Some(feature) = feature {
            intent.metadata.insert("suite".to_string(), feature.clone());
        }
        if !tags.is_empty() {
            intent.metadata.insert("tags".to_string(), tags.join(" "));
        }

        for (node, phase) in lower_steps(steps) {
            let pos = intent.push(node);
            intent.set_phase(pos, phase);
        }
        // Phase-annotated even when the scenario is empty
        if intent.bdd_phases.is_none() {
            intent.bdd_phases = Some(Default::default());
        }

        debug!(scenario = %intent.test_name, nodes = intent.node_count(), "parsed gherkin scenario");
        intent
    }

    fn split_blocks(&self, text: &str) -> Result<(Option<String>, Vec<Block>), ParseError> {
        let mut feature = None;
        let mut blocks: Vec<Block> = Vec::new();
        let mut pending_tags: Vec<String> = Vec::new();
        let mut in_examples = false;
        let mut docstring: Option<(String, usize)> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            // Docstrings attach verbatim to the previous step
            if let Some((delim, _)) = &docstring {
                if line.starts_with(delim.as_str()) {
                    docstring = None;
                } else if let Some(step) = blocks.last_mut().and_then(|b| b.steps.last_mut()) {
                    append_argument(step, line);
                }
                continue;
            }

            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.starts_with("\"\"\"") || line.starts_with("```") {
                docstring = Some((line[..3].to_string(), line_no));
                if let Some(step) = blocks.last_mut().and_then(|b| b.steps.last_mut()) {
                    step.argument.get_or_insert_with(String::new);
                }
                continue;
            }
            if line.starts_with('@') {
                pending_tags.extend(line.split_whitespace().map(str::to_string));
                continue;
            }
            if let Some(rest) = line.strip_prefix("Feature:") {
                feature = Some(rest.trim().to_string());
                pending_tags.clear();
                continue;
            }
            if line.starts_with("Background:") {
                in_examples = false;
                blocks.push(Block {
                    section: Section::Background,
                    line: line_no,
                    steps: Vec::new(),
                    examples: Vec::new(),
                });
                continue;
            }
            if let Some((keyword, rest)) = line.split_once(':') {
                let outline = matches!(keyword, "Scenario Outline" | "Scenario Template");
                if outline || matches!(keyword, "Scenario" | "Example") {
                    in_examples = false;
                    blocks.push(Block {
                        section: Section::Scenario {
                            name: rest.trim().to_string(),
                            outline,
                            tags: std::mem::take(&mut pending_tags),
                        },
                        line: line_no,
                        steps: Vec::new(),
                        examples: Vec::new(),
                    });
                    continue;
                }
                if matches!(keyword, "Examples" | "Scenarios") {
                    in_examples = true;
                    continue;
                }
                if matches!(keyword, "Rule") {
                    continue;
                }
            }
            if line.starts_with('|') {
                let Some(block) = blocks.last_mut() else { continue };
                if in_examples {
                    block.examples.push(line.to_string());
                } else if let Some(step) = block.steps.last_mut() {
                    append_argument(step, line);
                }
                continue;
            }

            let (keyword, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
            if BddPhase::from_keyword(keyword).is_some() {
                let Some(block) = blocks.last_mut() else {
                    return Err(ParseError::Malformed {
                        dialect: Dialect::Gherkin,
                        line: line_no,
                        message: "step outside of a scenario".to_string(),
                    });
                };
                block.steps.push(GherkinStep {
                    keyword: keyword.to_string(),
                    text: rest.trim().to_string(),
                    line: line_no,
                    argument: None,
                });
                continue;
            }
            // Free-form description text under Feature/Scenario headers is ignored
        }

        if let Some((_, start)) = docstring {
            return Err(ParseError::Malformed {
                dialect: Dialect::Gherkin,
                line: start,
                message: "unterminated docstring".to_string(),
            });
        }
        Ok((feature, blocks))
    }
}

/// Examples table as one `(column, value)` list per data row. The first
/// row is the header; repeated header rows from extra Examples blocks are
/// skipped.
fn outline_rows(examples: &[String]) -> Vec<Vec<(String, String)>> {
    let mut rows = examples.iter().map(|line| table_cells(line));
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    rows.filter(|cells| *cells != header)
        .map(|cells| header.iter().cloned().zip(cells).collect())
        .collect()
}

fn table_cells(line: &str) -> Vec<String> {
    let inner = line.trim().trim_start_matches('|').trim_end_matches('|');
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

fn substitute(step: &GherkinStep, row: &[(String, String)]) -> GherkinStep {
    let fill = |text: &str| {
        row.iter()
            .fold(text.to_string(), |acc, (k, v)| acc.replace(&format!("<{k}>"), v))
    };
    GherkinStep {
        keyword: step.keyword.clone(),
        text: fill(&step.text),
        line: step.line,
        argument: step.argument.as_deref().map(fill),
    }
}

fn append_argument(step: &mut GherkinStep, line: &str) {
    let arg = step.argument.get_or_insert_with(String::new);
    if !arg.is_empty() {
        arg.push('\n');
    }
    arg.push_str(line);
}

// ============================================================================
// Step lowering
// ============================================================================

/// Lower steps to nodes with their resolved phase. `And`/`But` keep the
/// keyword in the phase map and inherit meaning from the previous step.
fn lower_steps(steps: &[GherkinStep]) -> Vec<(OwnedNode, BddPhase)> {
    let mut effective = BddPhase::Given;
    steps
        .iter()
        .map(|step| {
            let phase = BddPhase::from_keyword(&step.keyword).unwrap_or(BddPhase::And);
            if phase != BddPhase::And {
                effective = phase;
            }
            let mut node = lower_step(step, effective);
            node.tags_mut().set("bdd_phase", phase.as_str());
            (node, phase)
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum StepPattern {
    Navigate,
    PageName,
    Click,
    FillInto,
    FillWith,
    Select,
    Check,
    Uncheck,
    Sleep,
    Reload,
    Back,
    Request,
    SeeText,
    NotSeeText,
    ElementVisible,
    Title,
    UrlContains,
    UrlIs,
    OnPage,
    FieldContains,
    Status,
    BodyField,
}

static STEP_PATTERNS: LazyLock<Vec<(Regex, StepPattern)>> = LazyLock::new(|| {
    use StepPattern::*;
    let table: &[(&str, StepPattern)] = &[
        (r#"^I (?:am on|open|visit|navigate to|go to|browse to) "([^"]+)"$"#, Navigate),
        (r#"^I (?:am on|open|visit|navigate to|go to) the (.+?) page$"#, PageName),
        (r#"^I (?:click|press|tap)(?: on)?(?: the)? "([^"]+)"(?: (button|link))?$"#, Click),
        (r#"^I (?:enter|type|input) "([^"]*)" (?:in|into)(?: the)? "([^"]+)"(?: field)?$"#, FillInto),
        (r#"^I fill in "([^"]+)" with "([^"]*)"$"#, FillWith),
        (r#"^I select "([^"]+)" from(?: the)? "([^"]+)"(?: dropdown)?$"#, Select),
        (r#"^I check(?: the)? "([^"]+)"(?: checkbox)?$"#, Check),
        (r#"^I uncheck(?: the)? "([^"]+)"(?: checkbox)?$"#, Uncheck),
        (r#"^I wait (?:for )?(\d+) (seconds?|milliseconds?|ms)$"#, Sleep),
        (r#"^I (?:reload|refresh) the page$"#, Reload),
        (r#"^I go back$"#, Back),
        (r#"^I (?:send|make) an? (GET|POST|PUT|PATCH|DELETE) request to "([^"]+)"$"#, Request),
        (r#"^I should see "([^"]+)"$"#, SeeText),
        (r#"^I should not see "([^"]+)"$"#, NotSeeText),
        (r#"^the "([^"]+)" (button|link|element|field|checkbox) should be (visible|hidden|enabled|disabled)$"#, ElementVisible),
        (r#"^the (?:page )?title should (?:be|equal) "([^"]+)"$"#, Title),
        (r#"^the (?:url|URL) should (?:contain|include) "([^"]+)"$"#, UrlContains),
        (r#"^the (?:url|URL) should (?:be|equal) "([^"]+)"$"#, UrlIs),
        (r#"^I should be (?:on|redirected to) the (.+?) page$"#, OnPage),
        (r#"^the "([^"]+)" field should (?:contain|have value) "([^"]*)"$"#, FieldContains),
        (r#"^the response status(?: code)? should be (\d+)$"#, Status),
        (r#"^the response (?:body )?(?:field )?"([^"]+)" should (?:be|equal) "([^"]*)"$"#, BodyField),
    ];
    table
        .iter()
        .map(|(pattern, kind)| (Regex::new(pattern).expect("gherkin step regex"), *kind))
        .collect()
});

fn lower_step(step: &GherkinStep, effective: BddPhase) -> OwnedNode {
    let raw = format!("{} {}", step.keyword, step.text);
    let line = step.line;

    let matched = STEP_PATTERNS
        .iter()
        .find_map(|(re, kind)| re.captures(&step.text).map(|caps| (*kind, caps)));

    let Some((kind, caps)) = matched else {
        return OwnedNode::Step(ActionIntent::unrecognized(line, raw).with_kv("phase", effective.as_str()));
    };

    let mut node = build(kind, &caps, line, &raw);

    // Outline placeholders and attached tables are carried but need review
    if step.text.contains('<') && step.text.contains('>') {
        node = with_confidence_cap(node, 0.7).tagged("outline_placeholder");
    }
    if let Some(argument) = &step.argument {
        node = match node {
            OwnedNode::Step(mut s) if matches!(s.action_type, ActionType::Request(_)) => {
                s.parameters.push(Value::Body(argument.clone()));
                OwnedNode::Step(s)
            }
            OwnedNode::Step(mut s) => {
                s.parameters.push(Value::Raw(argument.clone()));
                with_confidence_cap(OwnedNode::Step(s), 0.7).tagged("table")
            }
            other => with_confidence_cap(other, 0.7).tagged("table"),
        };
    }
    node
}

fn capture(caps: &Captures<'_>, i: usize) -> String {
    caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default()
}

fn build(kind: StepPattern, caps: &Captures<'_>, line: usize, raw: &str) -> OwnedNode {
    use StepPattern::*;
    let step = |action: ActionType| ActionIntent::new(action, line, raw);
    let assertion = |t: AssertionType| AssertionIntent::new(t, line, raw);
    let c1 = capture(caps, 1);
    let c2 = capture(caps, 2);

    match kind {
        Navigate => {
            let looks_like_url = c1.starts_with('/') || c1.contains("://");
            let s = step(ActionType::Navigate).with_param(Value::Text(c1));
            if looks_like_url { s } else { s.with_tag("page_name").with_confidence(0.6) }.into_node()
        }
        PageName => step(ActionType::Navigate)
            .with_param(Value::Text(c1))
            .with_tag("page_name")
            .with_confidence(0.5)
            .into_node(),
        Click => {
            let locator = match c2.as_str() {
                "button" | "link" => Locator::role(c2.as_str(), Some(c1)),
                _ => Locator::text(c1),
            };
            step(ActionType::Click).with_target(locator).with_confidence(0.8).into_node()
        }
        FillInto => step(ActionType::Fill)
            .with_target(Locator::role("textbox", Some(c2)))
            .with_param(Value::Text(c1))
            .with_confidence(0.8)
            .into_node(),
        FillWith => step(ActionType::Fill)
            .with_target(Locator::role("textbox", Some(c1)))
            .with_param(Value::Text(c2))
            .with_confidence(0.8)
            .into_node(),
        Select => step(ActionType::Select)
            .with_target(Locator::role("combobox", Some(c2)))
            .with_param(Value::Text(c1))
            .with_confidence(0.8)
            .into_node(),
        Check | Uncheck => {
            let action = if matches!(kind, Check) { ActionType::Check } else { ActionType::Uncheck };
            step(action)
                .with_target(Locator::role("checkbox", Some(c1)))
                .with_confidence(0.8)
                .into_node()
        }
        Sleep => {
            let n: u64 = c1.parse().unwrap_or(0);
            let ms = if c2.starts_with("second") { n * 1000 } else { n };
            step(ActionType::Sleep).with_param(Value::DurationMs(ms)).into_node()
        }
        Reload => step(ActionType::Reload).into_node(),
        Back => step(ActionType::GoBack).into_node(),
        Request => match HttpMethod::from_name(&c1) {
            Some(method) => step(ActionType::Request(method)).with_param(Value::Text(c2)).into_node(),
            None => ActionIntent::unrecognized(line, raw).into_node(),
        },
        SeeText => OwnedNode::Assertion(
            assertion(AssertionType::Visible)
                .with_target(Locator::text(c1))
                .with_confidence(0.9),
        ),
        NotSeeText => OwnedNode::Assertion(
            assertion(AssertionType::Hidden)
                .with_target(Locator::text(c1))
                .with_confidence(0.9),
        ),
        ElementVisible => {
            let role = match c2.as_str() {
                "field" => "textbox",
                "element" => "",
                other => other,
            };
            let locator = if role.is_empty() { Locator::text(c1) } else { Locator::role(role, Some(c1)) };
            let t = match capture(caps, 3).as_str() {
                "hidden" => AssertionType::Hidden,
                "enabled" => AssertionType::Enabled,
                "disabled" => AssertionType::Disabled,
                _ => AssertionType::Visible,
            };
            OwnedNode::Assertion(assertion(t).with_target(locator).with_confidence(0.9))
        }
        Title => OwnedNode::Assertion(
            assertion(AssertionType::TextEquals)
                .with_kv("subject", "title")
                .with_expected(Value::Text(c1)),
        ),
        UrlContains => OwnedNode::Assertion(
            assertion(AssertionType::TextContains)
                .with_kv("subject", "url")
                .with_expected(Value::Text(c1)),
        ),
        UrlIs => OwnedNode::Assertion(
            assertion(AssertionType::TextEquals)
                .with_kv("subject", "url")
                .with_expected(Value::Text(c1)),
        ),
        OnPage => OwnedNode::Assertion(
            assertion(AssertionType::TextContains)
                .with_kv("subject", "url")
                .with_expected(Value::Text(c1.to_lowercase().replace(' ', "-")))
                .with_confidence(0.6),
        ),
        FieldContains => OwnedNode::Assertion(
            assertion(AssertionType::ValueEquals)
                .with_target(Locator::role("textbox", Some(c1)))
                .with_expected(Value::Text(c2))
                .with_confidence(0.8),
        ),
        Status => OwnedNode::Assertion(
            assertion(AssertionType::StatusCode).with_expected(Value::Integer(c1.parse().unwrap_or(0))),
        ),
        BodyField => OwnedNode::Assertion(
            assertion(AssertionType::ResponseBodyPath)
                .with_kv("path", c1)
                .with_kv("matcher", "equals")
                .with_expected(Value::Text(c2)),
        ),
    }
}

trait NodeExt {
    fn into_node(self) -> OwnedNode;
}

impl NodeExt for ActionIntent {
    fn into_node(self) -> OwnedNode {
        OwnedNode::Step(self)
    }
}

trait Tagged {
    fn tagged(self, tag: &str) -> Self;
}

impl Tagged for OwnedNode {
    fn tagged(mut self, tag: &str) -> Self {
        self.tags_mut().insert(tag);
        self
    }
}

fn with_confidence_cap(node: OwnedNode, cap: f32) -> OwnedNode {
    match node {
        OwnedNode::Step(mut s) => {
            s.confidence = s.confidence.min(cap);
            OwnedNode::Step(s)
        }
        OwnedNode::Assertion(mut a) => {
            a.confidence = a.confidence.min(cap);
            OwnedNode::Assertion(a)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEATURE: &str = r#"@smoke
Feature: Login

  Background:
    Given I am on "/login"

  Scenario: Valid login
    When I fill in "Username" with "alice"
    And I click "Sign in" button
    Then I should see "Welcome"
    But I should not see "Error"

  Scenario: Unknown phrasing
    Given the moon is full
"#;

    #[test]
    fn splits_scenarios_and_background() {
        let intents = GherkinParser.parse(FEATURE, "login.feature").unwrap();
        assert_eq!(intents.len(), 2);
        let first = &intents[0];
        assert_eq!(first.test_name, "Valid login");
        assert_eq!(first.test_kind, TestKind::Bdd);
        assert_eq!(first.metadata.get("suite").map(String::as_str), Some("Login"));
        assert_eq!(first.setup_steps.len(), 1);
        assert_eq!(first.setup_steps[0].action_type, ActionType::Navigate);
        assert_eq!(first.steps.len(), 2);
        assert_eq!(first.assertions.len(), 2);
        assert_eq!(first.phase_of(0), Some(BddPhase::When));
        assert_eq!(first.phase_of(1), Some(BddPhase::And));
        assert_eq!(first.phase_of(2), Some(BddPhase::Then));
    }

    #[test]
    fn unmatched_step_is_unrecognized() {
        let intents = GherkinParser.parse(FEATURE, "login.feature").unwrap();
        let step = &intents[1].steps[0];
        assert_eq!(step.action_type, ActionType::Raw);
        assert!(step.semantic_tags.has("unrecognized"));
        assert!(intents[1].overall_confidence < 0.5);
    }

    #[test]
    fn tables_attach_to_previous_step() {
        let src = "Feature: API\n  Scenario: create\n    When I send a POST request to \"/users\"\n      \"\"\"\n      {\"name\": \"bob\"}\n      \"\"\"\n    Then the response status should be 201\n";
        let intents = GherkinParser.parse(src, "api.feature").unwrap();
        let request = &intents[0].steps[0];
        assert_eq!(request.action_type, ActionType::Request(HttpMethod::Post));
        assert!(request.parameters.contains(&Value::Body("{\"name\": \"bob\"}".to_string())));
        assert_eq!(intents[0].assertions[0].assertion_type, AssertionType::StatusCode);
    }

    #[test]
    fn unterminated_docstring_is_malformed() {
        let src = "Feature: x\n  Scenario: y\n    Given I am on \"/\"\n    \"\"\"\n    body\n";
        assert!(matches!(
            GherkinParser.parse(src, "x.feature"),
            Err(ParseError::Malformed { line: 4, .. })
        ));
    }
}
