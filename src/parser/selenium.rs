//! Statement classification shared by the Selenium Java and Python front ends.
//!
//! Both bindings expose the same WebDriver surface under different casing
//! (`findElement`/`find_element`, `getText()`/`.text`), so method names are
//! canonicalized to the Java spelling before matching.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use crate::intent::intent_model::{
    ActionIntent, ActionType, AssertionIntent, AssertionType, Locator, OwnedNode, Value,
};
use crate::parser::syntax::{Expr, Lang, Segment, Statement, Stmt};
use crate::parser::{literal_value, selenium_locator, shaped};

/// A value-producing WebDriver query, remembered when bound to a variable.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Query {
    Text(Locator),
    Attr(Locator, String),
    Title,
    Url,
    Count(Locator),
    Displayed(Locator),
    Enabled(Locator),
    Selected(Locator),
}

impl Query {
    fn kind(&self) -> &'static str {
        match self {
            Query::Text(_) => "text",
            Query::Attr(..) => "attribute",
            Query::Title => "title",
            Query::Url => "url",
            Query::Count(_) => "count",
            Query::Displayed(_) => "displayed",
            Query::Enabled(_) => "enabled",
            Query::Selected(_) => "selected",
        }
    }

    fn locator(&self) -> Option<&Locator> {
        match self {
            Query::Text(l)
            | Query::Attr(l, _)
            | Query::Count(l)
            | Query::Displayed(l)
            | Query::Enabled(l)
            | Query::Selected(l) => Some(l),
            Query::Title | Query::Url => None,
        }
    }
}

/// Per-test classification state: variables bound to elements, queries,
/// waits and driver aliases.
#[derive(Debug, Clone)]
pub(crate) struct SeleniumClassifier {
    lang: Lang,
    elements: BTreeMap<String, Locator>,
    lists: BTreeMap<String, Locator>,
    selects: BTreeMap<String, Locator>,
    queries: BTreeMap<String, Query>,
    waits: BTreeSet<String>,
    drivers: BTreeSet<String>,
}

impl SeleniumClassifier {
    pub(crate) fn new(lang: Lang) -> Self {
        Self {
            lang,
            elements: BTreeMap::new(),
            lists: BTreeMap::new(),
            selects: BTreeMap::new(),
            queries: BTreeMap::new(),
            waits: BTreeSet::new(),
            drivers: ["driver".to_string()].into_iter().collect(),
        }
    }

    /// Classify one statement. Always yields exactly one node.
    pub(crate) fn classify(&mut self, statement: &Statement) -> OwnedNode {
        let line = statement.line;
        let raw = statement.text.as_str();

        let parsed = match &statement.parsed {
            Ok(stmt) => stmt,
            Err(e) => {
                trace!(line, error = %e, "statement did not parse");
                return OwnedNode::Step(ActionIntent::unrecognized(line, raw));
            }
        };

        let node = match parsed {
            Stmt::Decl { name, expr } => self.declaration(name, expr, line, raw),
            Stmt::Assign { target, expr } => {
                let name = target.shape();
                let name = name.rsplit('.').next().unwrap_or_default().to_string();
                self.declaration(&name, expr, line, raw)
            }
            Stmt::Assert { expr } => self
                .condition(expr, false, line, raw)
                .map(|a| OwnedNode::Assertion(a.with_shape("assert"))),
            Stmt::Expr(expr) => self.expression(expr, line, raw).map(|node| shaped(node, &expr.shape())),
        };

        node.unwrap_or_else(|| OwnedNode::Step(ActionIntent::unrecognized(line, raw)))
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Method name in the Java spelling.
    fn canon(&self, name: &str) -> String {
        if self.lang != Lang::Python {
            return name.to_string();
        }
        let mut out = String::with_capacity(name.len());
        let mut upper = false;
        for c in name.chars() {
            if c == '_' {
                upper = !out.is_empty();
            } else if upper {
                out.extend(c.to_uppercase());
                upper = false;
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Segments after the driver root, if `expr` is rooted at a driver.
    fn driver_path<'e>(&self, expr: &'e Expr) -> Option<&'e [Segment]> {
        if expr.base().is_some() {
            return None;
        }
        let segs = expr.effective_segments();
        let first = segs.first()?;
        (!first.is_call() && self.drivers.contains(&first.name)).then(|| &segs[1..])
    }

    fn driver_shape(&self, rest: &[Segment]) -> String {
        let mut shape = String::from("driver");
        for seg in rest {
            shape.push('.');
            shape.push_str(&seg.name);
        }
        shape
    }

    fn is_driver(&self, expr: &Expr) -> bool {
        self.driver_path(expr).is_some_and(|rest| rest.is_empty())
    }

    // ========================================================================
    // Locators and elements
    // ========================================================================

    /// Locator from `By.id("x")` (Java) or the `(By.ID, "x")` argument pair
    /// (Python). Returns the locator and its confidence.
    fn by(&self, args: &[Expr]) -> Option<(Locator, f32)> {
        match args {
            [single] => match single {
                Expr::Tuple(pair) => self.by(pair),
                by => {
                    let seg = by.last_segment()?;
                    if by.segments().first().map(|s| s.name.as_str()) != Some("By") {
                        return None;
                    }
                    let value = seg.arg(0)?;
                    if value.is_interpolated() {
                        return None;
                    }
                    selenium_locator(&seg.name, value.as_str()?)
                }
            },
            [strategy, value, ..] => {
                let segs = strategy.segments();
                if segs.first().map(|s| s.name.as_str()) != Some("By") || value.is_interpolated() {
                    return None;
                }
                selenium_locator(&segs.last()?.name, value.as_str()?)
            }
            [] => None,
        }
    }

    /// Resolve an expression denoting a single element.
    fn element(&self, expr: &Expr) -> Option<(Locator, f32)> {
        if let Some(name) = expr.as_ident().or_else(|| self_field(expr)) {
            return self.elements.get(name).map(|l| (l.clone(), 1.0));
        }
        let last = expr.last_segment()?;
        let method = self.canon(&last.name);
        match method.as_str() {
            "findElement" => {
                let receiver = expr.truncated(1);
                if !self.is_driver(&receiver) && self.element(&receiver).is_none() {
                    return None;
                }
                self.by(last.args())
            }
            // Legacy `find_element_by_id("x")`
            m if m.starts_with("findElementBy") => {
                let strategy = &m["findElementBy".len()..];
                selenium_locator(strategy, last.str_arg(0)?)
            }
            "until" => self.wait_condition(expr).and_then(|(_, target)| target),
            _ => None,
        }
    }

    fn element_list(&self, expr: &Expr) -> Option<Locator> {
        if let Some(name) = expr.as_ident().or_else(|| self_field(expr)) {
            return self.lists.get(name).cloned();
        }
        let last = expr.last_segment()?;
        if self.canon(&last.name) != "findElements" {
            return None;
        }
        self.by(last.args()).map(|(l, _)| l)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Recognize an expression that reads a value from the page.
    fn query(&self, expr: &Expr) -> Option<Query> {
        if let Some(name) = expr.as_ident().or_else(|| self_field(expr)) {
            return self.queries.get(name).cloned();
        }

        // Python `len(driver.find_elements(...))`
        if let [seg] = expr.segments() {
            if seg.name == "len" && seg.is_call() {
                return seg.arg(0).and_then(|a| self.element_list(a)).map(Query::Count);
            }
        }

        let last = expr.last_segment()?;
        let method = self.canon(&last.name);
        let receiver = expr.truncated(1);

        if self.is_driver(&receiver) {
            return match method.as_str() {
                "getTitle" | "title" => Some(Query::Title),
                "getCurrentUrl" | "currentUrl" => Some(Query::Url),
                _ => None,
            };
        }

        if matches!(method.as_str(), "size" | "length") {
            return self.element_list(&receiver).map(Query::Count);
        }

        let (locator, _) = self.element(&receiver)?;
        match method.as_str() {
            "getText" | "text" => Some(Query::Text(locator)),
            "getAttribute" | "getDomAttribute" | "getDomProperty" => {
                Some(Query::Attr(locator, last.str_arg(0)?.to_string()))
            }
            "isDisplayed" => Some(Query::Displayed(locator)),
            "isEnabled" => Some(Query::Enabled(locator)),
            "isSelected" => Some(Query::Selected(locator)),
            _ => None,
        }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn declaration(&mut self, name: &str, expr: &Expr, line: usize, raw: &str) -> Option<OwnedNode> {
        // Driver construction and aliases
        if is_driver_constructor(expr) {
            self.drivers.insert(name.to_string());
            return Some(OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw)
                    .with_shape("driver.create")
                    .with_tag("lifecycle"),
            ));
        }
        if self.is_driver(expr) {
            self.drivers.insert(name.to_string());
            return Some(OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw).with_kv("alias", "driver"),
            ));
        }

        if let Some(duration) = self.wait_constructor(expr) {
            self.waits.insert(name.to_string());
            let mut step = ActionIntent::new(ActionType::Wait, line, raw).with_kv("wait", "driver");
            if let Some(ms) = duration {
                step = step.with_param(Value::DurationMs(ms));
            }
            return Some(OwnedNode::Step(step));
        }

        if let Some((condition, target)) = self.wait_condition(expr) {
            let mut step = ActionIntent::new(ActionType::Wait, line, raw).with_kv("wait", condition);
            if let Some((locator, confidence)) = target {
                self.elements.insert(name.to_string(), locator.clone());
                step = step
                    .with_target(locator)
                    .with_confidence(confidence)
                    .with_kv("binding", name);
            }
            return Some(OwnedNode::Step(step));
        }

        if let Some(locator) = self.select_wrapper(expr) {
            self.selects.insert(name.to_string(), locator.clone());
            return Some(OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw)
                    .with_target(locator)
                    .with_kv("binding", name)
                    .with_tag("select"),
            ));
        }

        if let Some((locator, confidence)) = self.element(expr) {
            self.elements.insert(name.to_string(), locator.clone());
            return Some(OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw)
                    .with_target(locator)
                    .with_confidence(confidence)
                    .with_kv("binding", name),
            ));
        }

        if let Some(locator) = self.element_list(expr) {
            self.lists.insert(name.to_string(), locator.clone());
            return Some(OwnedNode::Step(
                ActionIntent::new(ActionType::Raw, line, raw)
                    .with_target(locator)
                    .with_kv("binding", name)
                    .with_tag("many"),
            ));
        }

        if let Some(query) = self.query(expr) {
            let mut step = ActionIntent::new(ActionType::GetText, line, raw)
                .with_kv("var", name)
                .with_kv("query", query.kind());
            if let Some(locator) = query.locator() {
                step = step.with_target(locator.clone());
            }
            if let Query::Attr(_, attr) = &query {
                step = step.with_kv("attribute", attr);
            }
            self.queries.insert(name.to_string(), query);
            return Some(OwnedNode::Step(step));
        }

        None
    }

    /// `new Select(el)` / `Select(el)`, or a variable holding one.
    fn select_wrapper(&self, expr: &Expr) -> Option<Locator> {
        if let Some(name) = expr.as_ident().or_else(|| self_field(expr)) {
            return self.selects.get(name).cloned();
        }
        let arg = match expr {
            Expr::New { class, args, .. } if class == "Select" => args.first()?,
            Expr::Path { base: None, segments } if segments.len() == 1 && segments[0].name == "Select" => {
                segments[0].arg(0)?
            }
            _ => return None,
        };
        self.element(arg).map(|(l, _)| l)
    }

    // ========================================================================
    // Waits
    // ========================================================================

    /// `new WebDriverWait(driver, Duration.ofSeconds(10))` / `WebDriverWait(driver, 10)`.
    fn wait_constructor(&self, expr: &Expr) -> Option<Option<u64>> {
        let args = match expr {
            Expr::New { class, args, .. } if class == "WebDriverWait" || class == "FluentWait" => args,
            Expr::Path { base: None, segments }
                if segments.len() == 1 && segments[0].name == "WebDriverWait" && segments[0].is_call() =>
            {
                segments[0].args()
            }
            _ => return None,
        };
        Some(args.get(1).and_then(|a| self.duration_ms(a)))
    }

    /// `<wait>.until(<condition>)`: the condition name and its element.
    fn wait_condition(&self, expr: &Expr) -> Option<(String, Option<(Locator, f32)>)> {
        let last = expr.last_segment()?;
        if last.name != "until" {
            return None;
        }
        let receiver = expr.truncated(1);
        let is_wait = match receiver.as_ident().or_else(|| self_field(&receiver)) {
            Some(name) => self.waits.contains(name),
            None => self.wait_constructor(&receiver).is_some(),
        };
        if !is_wait {
            return None;
        }

        let Some(condition) = last.arg(0) else {
            return Some(("condition".to_string(), None));
        };
        let Some(cond_seg) = condition.last_segment() else {
            return Some(("condition".to_string(), None));
        };
        let cond_name = self.canon(&cond_seg.name);
        let kind = if cond_name.starts_with("visibilityOf") {
            "visible"
        } else if cond_name.starts_with("invisibilityOf") {
            "hidden"
        } else if cond_name.starts_with("elementToBeClickable") {
            "clickable"
        } else if cond_name.starts_with("presenceOf") {
            "present"
        } else if cond_name.starts_with("titleIs") || cond_name.starts_with("titleContains") {
            "title"
        } else if cond_name.starts_with("urlContains") || cond_name.starts_with("urlToBe") {
            "url"
        } else {
            "condition"
        };

        let target = self.by(cond_seg.args()).or_else(|| {
            cond_seg.arg(0).and_then(|a| self.element(a))
        });
        Some((kind.to_string(), target))
    }

    fn duration_ms(&self, expr: &Expr) -> Option<u64> {
        match expr {
            Expr::Num(n) => n
                .trim_end_matches(['L', 'l'])
                .parse::<f64>()
                .ok()
                .map(|s| (s * 1000.0) as u64),
            Expr::Keyword { value, .. } => self.duration_ms(value),
            _ => {
                let seg = expr.last_segment()?;
                let n = seg.arg(0)?.as_int()?.max(0) as u64;
                match seg.name.as_str() {
                    "ofSeconds" => Some(n * 1000),
                    "ofMillis" => Some(n),
                    "ofMinutes" => Some(n * 60_000),
                    _ => None,
                }
            }
        }
    }

    // ========================================================================
    // Expression statements
    // ========================================================================

    fn expression(&self, expr: &Expr, line: usize, raw: &str) -> Option<OwnedNode> {
        if let Some(assertion) = self.assertion_call(expr, line, raw) {
            return Some(OwnedNode::Assertion(assertion));
        }

        let shape = expr.shape();

        // Fixed sleeps
        if matches!(shape.as_str(), "Thread.sleep" | "time.sleep" | "sleep") {
            let seg = expr.last_segment()?;
            let arg = seg.arg(0)?;
            let step = ActionIntent::new(ActionType::Sleep, line, raw);
            let ms = if shape == "Thread.sleep" {
                arg.as_int().map(|n| n.max(0) as u64)
            } else {
                self.duration_ms(arg)
            };
            return Some(OwnedNode::Step(match ms {
                Some(ms) => step.with_param(Value::DurationMs(ms)),
                None => step.with_param(Value::Raw(arg.to_source())).with_confidence(0.5),
            }));
        }

        if let Some((condition, target)) = self.wait_condition(expr) {
            let mut step = ActionIntent::new(ActionType::Wait, line, raw).with_kv("wait", condition);
            if let Some((locator, confidence)) = target {
                step = step.with_target(locator).with_confidence(confidence);
            }
            return Some(OwnedNode::Step(step));
        }

        if let Some(last) = expr.last_segment() {
            let method = self.canon(&last.name);
            let receiver = expr.truncated(1);

            if let Some(locator) = self.select_wrapper(&receiver) {
                if let Some(node) = self.select_call(locator, &method, last, line, raw) {
                    return Some(node);
                }
            } else if let Some((locator, confidence)) = self.element(&receiver) {
                if let Some(step) = self.element_call(locator, &method, last, line, raw) {
                    return Some(OwnedNode::Step(cap(step, confidence)));
                }
            }
        }

        if let Some(rest) = self.driver_path(expr) {
            return Some(OwnedNode::Step(self.driver_call(rest, line, raw)));
        }

        // Known WebDriver helpers without a neutral equivalent
        if shape.starts_with("new.Actions") || shape.starts_with("ActionChains") || shape.starts_with("new.Alert") {
            return Some(OwnedNode::Step(ActionIntent::unsupported(line, raw, shape)));
        }

        None
    }

    fn driver_call(&self, rest: &[Segment], line: usize, raw: &str) -> ActionIntent {
        let shape = self.driver_shape(rest);
        let names: Vec<String> = rest.iter().map(|s| self.canon(&s.name)).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let last_arg = rest.last().and_then(|s| s.arg(0));

        let step = match names.as_slice() {
            ["get"] | ["navigate", "to"] => {
                let step = ActionIntent::new(ActionType::Navigate, line, raw);
                match last_arg.and_then(literal_value) {
                    Some(value) => step.with_param(value),
                    None => step
                        .with_param(Value::Raw(last_arg.map(Expr::to_source).unwrap_or_default()))
                        .with_confidence(0.5),
                }
            }
            ["navigate", "refresh"] | ["refresh"] => ActionIntent::new(ActionType::Reload, line, raw),
            ["navigate", "back"] | ["back"] => ActionIntent::new(ActionType::GoBack, line, raw),
            ["navigate", "forward"] | ["forward"] => ActionIntent::new(ActionType::GoForward, line, raw),
            ["manage", "timeouts", "implicitlyWait"] | ["implicitlyWait"] => {
                let step = ActionIntent::new(ActionType::Wait, line, raw).with_kv("wait", "implicit");
                match last_arg.and_then(|a| self.duration_ms(a)) {
                    Some(ms) => step.with_param(Value::DurationMs(ms)),
                    None => step,
                }
            }
            _ => {
                // Everything else is looked up in the mapping registry by shape
                let args: Vec<Value> = rest
                    .last()
                    .map(|s| {
                        s.args()
                            .iter()
                            .map(|a| literal_value(a).unwrap_or_else(|| Value::Raw(a.to_source())))
                            .collect()
                    })
                    .unwrap_or_default();
                let mut step = ActionIntent::unsupported(line, raw, shape.clone());
                step.parameters = args;
                step
            }
        };
        step.with_shape(shape)
    }

    fn element_call(
        &self,
        locator: Locator,
        method: &str,
        seg: &Segment,
        line: usize,
        raw: &str,
    ) -> Option<ActionIntent> {
        let step = match method {
            "click" => ActionIntent::new(ActionType::Click, line, raw),
            "submit" => ActionIntent::new(ActionType::Click, line, raw)
                .with_tag("submit")
                .with_confidence(0.7),
            "clear" => ActionIntent::new(ActionType::Clear, line, raw),
            "sendKeys" => {
                let arg = seg.arg(0)?;
                if let Some(key) = special_key(arg) {
                    ActionIntent::new(ActionType::Raw, line, raw)
                        .with_kv("press", key)
                        .with_confidence(0.8)
                } else {
                    let step = ActionIntent::new(ActionType::Fill, line, raw);
                    match literal_value(arg) {
                        Some(Value::Integer(n)) => step.with_param(Value::Text(n.to_string())),
                        Some(value) => step.with_param(value),
                        None => step
                            .with_param(Value::Raw(arg.to_source()))
                            .with_confidence(0.5),
                    }
                }
            }
            "getText" | "text" => ActionIntent::new(ActionType::GetText, line, raw).with_kv("query", "text"),
            _ => return None,
        };
        Some(step.with_target(locator).with_shape(format!("element.{}", method)))
    }

    fn select_call(
        &self,
        locator: Locator,
        method: &str,
        seg: &Segment,
        line: usize,
        raw: &str,
    ) -> Option<OwnedNode> {
        let arg = seg.arg(0)?;
        let step = ActionIntent::new(ActionType::Select, line, raw).with_target(locator);
        let step = match method {
            "selectByVisibleText" => step.with_param(Value::text(arg.as_str()?)),
            "selectByValue" => step.with_param(Value::text(arg.as_str()?)).with_kv("by", "value"),
            "selectByIndex" => step
                .with_param(Value::Integer(arg.as_int()?))
                .with_kv("by", "index")
                .with_confidence(0.6),
            _ => return None,
        };
        Some(OwnedNode::Step(step))
    }

    // ========================================================================
    // Assertions
    // ========================================================================

    /// JUnit/TestNG/unittest/AssertJ/Hamcrest assertion calls.
    fn assertion_call(&self, expr: &Expr, line: usize, raw: &str) -> Option<AssertionIntent> {
        let segs = expr.effective_segments();
        let (call, chained) = match segs {
            [call] => (call, None),
            [owner, call] if matches!(owner.name.as_str(), "Assert" | "Assertions" | "AssertJUnit") => (call, None),
            [call, chained] if call.name == "assertThat" => (call, Some(chained)),
            _ => return None,
        };
        if !call.is_call() || !call.name.starts_with("assert") {
            return None;
        }

        let name = self.canon(&call.name);
        let args = call.args();
        match (name.as_str(), chained) {
            ("assertTrue", None) => self.condition(args.first()?, false, line, raw),
            ("assertFalse", None) => self.condition(args.first()?, true, line, raw),
            ("assertEquals" | "assertEqual", None) => self.equality(args.first()?, args.get(1)?, line, raw),
            ("assertIn", None) => self.contains(args.get(1)?, args.first()?, false, line, raw),
            ("assertNotIn", None) => self.contains(args.get(1)?, args.first()?, true, line, raw),
            ("assertThat", Some(matcher)) => {
                let actual = args.first()?;
                match matcher.name.as_str() {
                    "isEqualTo" => self.equality(actual, matcher.arg(0)?, line, raw),
                    "contains" => self.contains(actual, matcher.arg(0)?, false, line, raw),
                    "isTrue" => self.condition(actual, false, line, raw),
                    "isFalse" => self.condition(actual, true, line, raw),
                    "hasSize" => self.count(actual, matcher.arg(0)?, line, raw),
                    _ => None,
                }
            }
            // Hamcrest: assertThat(actual, is(x)) / equalTo(x) / containsString(x)
            ("assertThat", None) => {
                let actual = args.first()?;
                let matcher = args.get(1)?;
                let mseg = matcher.last_segment()?;
                let inner = mseg.arg(0)?;
                let inner = match inner.last_segment() {
                    Some(s) if s.name == "equalTo" => s.arg(0)?,
                    _ => inner,
                };
                match mseg.name.as_str() {
                    "is" | "equalTo" => self.equality(actual, inner, line, raw),
                    "containsString" => self.contains(actual, inner, false, line, raw),
                    "hasSize" => self.count(actual, inner, line, raw),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// A boolean expression asserted true (or false when `negated`).
    fn condition(&self, expr: &Expr, negated: bool, line: usize, raw: &str) -> Option<AssertionIntent> {
        match expr {
            Expr::Not(inner) => self.condition(inner, !negated, line, raw),
            Expr::Binary { op, lhs, rhs } => match (op.as_str(), negated) {
                ("==" | "===", false) => self.equality(lhs, rhs, line, raw),
                ("in", _) => self.contains(rhs, lhs, negated, line, raw),
                ("not in", _) => self.contains(rhs, lhs, !negated, line, raw),
                (">" | ">=", false) => {
                    let threshold = rhs.as_int()?;
                    let locator = match self.query(lhs)? {
                        Query::Count(l) => l,
                        _ => return None,
                    };
                    if (op == ">" && threshold != 0) || (op == ">=" && threshold != 1) {
                        return None;
                    }
                    Some(
                        AssertionIntent::new(AssertionType::Exists, line, raw)
                            .with_target(locator)
                            .with_confidence(0.8),
                    )
                }
                _ => None,
            },
            _ => {
                let last = expr.last_segment()?;
                let method = self.canon(&last.name);
                let receiver = expr.truncated(1);

                // `x.contains("y")` / `"y".equals(x)`
                if method == "contains" && last.is_call() {
                    return self.contains(&receiver, last.arg(0)?, negated, line, raw);
                }
                if method == "equals" && last.is_call() && !negated {
                    return self.equality(&receiver, last.arg(0)?, line, raw);
                }
                if method == "isEmpty" && last.is_call() {
                    let locator = self.element_list(&receiver)?;
                    return Some(if negated {
                        AssertionIntent::new(AssertionType::Exists, line, raw)
                            .with_target(locator)
                            .with_confidence(0.8)
                    } else {
                        AssertionIntent::new(AssertionType::LengthEquals, line, raw)
                            .with_target(locator)
                            .with_expected(Value::Integer(0))
                    });
                }

                let (assertion_type, locator, confidence) = match (self.query(expr)?, negated) {
                    (Query::Displayed(l), false) => (AssertionType::Visible, l, 1.0),
                    (Query::Displayed(l), true) => (AssertionType::Hidden, l, 1.0),
                    (Query::Enabled(l), false) => (AssertionType::Enabled, l, 1.0),
                    (Query::Enabled(l), true) => (AssertionType::Disabled, l, 1.0),
                    (Query::Selected(l), negated) => {
                        let a = AssertionIntent::new(AssertionType::Checked, line, raw).with_target(l);
                        return Some(if negated { a.with_tag("negated") } else { a });
                    }
                    _ => return None,
                };
                Some(
                    AssertionIntent::new(assertion_type, line, raw)
                        .with_target(locator)
                        .with_confidence(confidence),
                )
            }
        }
    }

    /// Equality where either side may be the page query.
    fn equality(&self, a: &Expr, b: &Expr, line: usize, raw: &str) -> Option<AssertionIntent> {
        let (query, expected) = match (self.query(a), self.query(b)) {
            (Some(q), _) => (q, b),
            (None, Some(q)) => (q, a),
            (None, None) => return None,
        };
        let (value, confidence): (Value, f32) = match literal_value(expected) {
            Some(v) => (v, 1.0),
            None => (Value::Raw(expected.to_source()), 0.5),
        };

        let assertion = match query {
            Query::Text(l) => AssertionIntent::new(AssertionType::TextEquals, line, raw).with_target(l),
            Query::Attr(l, attr) if attr == "value" => {
                AssertionIntent::new(AssertionType::ValueEquals, line, raw).with_target(l)
            }
            Query::Attr(l, attr) if attr == "class" => AssertionIntent::new(AssertionType::HasClass, line, raw)
                .with_target(l)
                .with_tag("exact")
                .with_confidence(0.9),
            Query::Attr(l, attr) => AssertionIntent::new(AssertionType::HasAttr, line, raw)
                .with_target(l)
                .with_kv("attr", attr),
            Query::Title => AssertionIntent::new(AssertionType::TextEquals, line, raw).with_kv("subject", "title"),
            Query::Url => AssertionIntent::new(AssertionType::TextEquals, line, raw).with_kv("subject", "url"),
            Query::Count(l) => {
                let n = value.as_integer()?;
                return Some(
                    AssertionIntent::new(AssertionType::LengthEquals, line, raw)
                        .with_target(l)
                        .with_expected(Value::Integer(n)),
                );
            }
            Query::Displayed(l) if value == Value::Bool(true) => {
                AssertionIntent::new(AssertionType::Visible, line, raw).with_target(l)
            }
            Query::Displayed(l) if value == Value::Bool(false) => {
                return Some(AssertionIntent::new(AssertionType::Hidden, line, raw).with_target(l));
            }
            _ => return None,
        };
        let confidence = confidence.min(assertion.confidence);
        Some(assertion.with_expected(value).with_confidence(confidence))
    }

    /// `needle` contained in the value `container` reads.
    fn contains(
        &self,
        container: &Expr,
        needle: &Expr,
        negated: bool,
        line: usize,
        raw: &str,
    ) -> Option<AssertionIntent> {
        let (value, confidence): (Value, f32) = match literal_value(needle) {
            Some(v) => (v, 0.9),
            None => (Value::Raw(needle.to_source()), 0.5),
        };
        let assertion = match self.query(container)? {
            Query::Text(l) => AssertionIntent::new(AssertionType::TextContains, line, raw).with_target(l),
            Query::Title => {
                AssertionIntent::new(AssertionType::TextContains, line, raw).with_kv("subject", "title")
            }
            Query::Url => AssertionIntent::new(AssertionType::TextContains, line, raw).with_kv("subject", "url"),
            Query::Attr(l, attr) if attr == "class" => {
                AssertionIntent::new(AssertionType::HasClass, line, raw).with_target(l)
            }
            _ => return None,
        };
        let assertion = assertion.with_expected(value).with_confidence(confidence);
        Some(if negated { assertion.with_tag("negated") } else { assertion })
    }

    fn count(&self, actual: &Expr, expected: &Expr, line: usize, raw: &str) -> Option<AssertionIntent> {
        let locator = self.element_list(actual)?;
        Some(
            AssertionIntent::new(AssertionType::LengthEquals, line, raw)
                .with_target(locator)
                .with_expected(Value::Integer(expected.as_int()?)),
        )
    }
}

/// `self.name` / `this.name` field reference.
fn self_field(expr: &Expr) -> Option<&str> {
    match expr.effective_segments() {
        [seg] if !seg.is_call() && expr.segments().len() == 2 => Some(&seg.name),
        _ => None,
    }
}

fn is_driver_constructor(expr: &Expr) -> bool {
    match expr {
        Expr::New { class, .. } => class.ends_with("Driver"),
        Expr::Path { base: None, segments } => {
            matches!(segments.first().map(|s| s.name.as_str()), Some("webdriver"))
                && segments.last().is_some_and(Segment::is_call)
        }
        _ => false,
    }
}

/// `Keys.ENTER` and friends, as Playwright key names.
fn special_key(expr: &Expr) -> Option<String> {
    match expr.segments() {
        [keys, key] if keys.name == "Keys" && !key.is_call() => {
            let name: String = key
                .name
                .split('_')
                .map(|part| {
                    let lower = part.to_ascii_lowercase();
                    let mut chars = lower.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                        None => String::new(),
                    }
                })
                .collect();
            Some(match name.as_str() {
                "Return" => "Enter".to_string(),
                "Down" => "ArrowDown".to_string(),
                "Up" => "ArrowUp".to_string(),
                "Left" => "ArrowLeft".to_string(),
                "Right" => "ArrowRight".to_string(),
                _ => name,
            })
        }
        _ => None,
    }
}

fn cap(mut step: ActionIntent, confidence: f32) -> ActionIntent {
    step.confidence = step.confidence.min(confidence);
    step
}
