use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::error::TranslationError;
use crate::generator::{
    EmissionOrigin, GeneratedTest, GenerationContext, Generator, Section, builtin_generators,
};
use crate::intent::dialect::Dialect;
use crate::intent::intent_model::TestIntent;
use crate::intent::normalize::normalize_intent;
use crate::parser::{Parser, builtin_parsers};
use crate::pipeline::config::TranslationConfig;
use crate::pipeline::refiner::Refiner;
use crate::pipeline::result::TranslationResult;
use crate::registry::api_mapping::ApiMappingRegistry;
use crate::registry::idiom::IdiomRegistry;
use crate::validate::{GateOutcome, Validator};

/// Source dialect id that asks for detection.
pub const AUTO_DETECT: &str = "auto";

/// Registries plus the parser and generator tables. Set up once, then
/// shared read-only across any number of `translate` calls.
pub struct Translator {
    parsers: Vec<Box<dyn Parser>>,
    generators: Vec<Box<dyn Generator>>,
    mappings: ApiMappingRegistry,
    idioms: IdiomRegistry,
    refiner: Option<Box<dyn Refiner>>,
}

impl Default for Translator {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("parsers", &self.parsers.iter().map(|p| p.dialect()).collect::<Vec<_>>())
            .field("generators", &self.generators.iter().map(|g| g.dialect()).collect::<Vec<_>>())
            .field("mappings", &self.mappings.len())
            .field("idioms", &self.idioms.patterns().len())
            .field("refiner", &self.refiner.is_some())
            .finish()
    }
}

impl Translator {
    /// No parsers, generators, mappings or idioms.
    pub fn empty() -> Self {
        Self {
            parsers: Vec::new(),
            generators: Vec::new(),
            mappings: ApiMappingRegistry::new(),
            idioms: IdiomRegistry::new(),
            refiner: None,
        }
    }

    /// Every built-in parser, generator, mapping and idiom.
    pub fn with_defaults() -> Self {
        let mut translator = Self::empty();
        for parser in builtin_parsers() {
            translator.register_parser(parser);
        }
        for generator in builtin_generators() {
            translator.register_generator(generator);
        }
        translator.mappings = ApiMappingRegistry::with_builtins();
        translator.idioms = IdiomRegistry::with_builtins();
        translator
    }

    /// Add a parser; replaces any parser already registered for its dialect.
    pub fn register_parser(&mut self, parser: Box<dyn Parser>) {
        let dialect = parser.dialect();
        self.parsers.retain(|p| p.dialect() != dialect);
        self.parsers.push(parser);
    }

    /// Add a generator; replaces any generator already registered for its dialect.
    pub fn register_generator(&mut self, generator: Box<dyn Generator>) {
        let dialect = generator.dialect();
        self.generators.retain(|g| g.dialect() != dialect);
        self.generators.push(generator);
    }

    pub fn with_refiner(mut self, refiner: Box<dyn Refiner>) -> Self {
        self.refiner = Some(refiner);
        self
    }

    pub fn mappings(&self) -> &ApiMappingRegistry {
        &self.mappings
    }

    pub fn mappings_mut(&mut self) -> &mut ApiMappingRegistry {
        &mut self.mappings
    }

    pub fn idioms(&self) -> &IdiomRegistry {
        &self.idioms
    }

    pub fn idioms_mut(&mut self) -> &mut IdiomRegistry {
        &mut self.idioms
    }

    pub fn parser(&self, dialect: Dialect) -> Option<&dyn Parser> {
        self.parsers.iter().find(|p| p.dialect() == dialect).map(|p| p.as_ref())
    }

    pub fn generator(&self, dialect: Dialect) -> Option<&dyn Generator> {
        self.generators.iter().find(|g| g.dialect() == dialect).map(|g| g.as_ref())
    }

    pub fn source_dialects(&self) -> Vec<Dialect> {
        self.parsers.iter().map(|p| p.dialect()).collect()
    }

    pub fn target_dialects(&self) -> Vec<Dialect> {
        self.generators.iter().map(|g| g.dialect()).collect()
    }

    /// The single registered parser that claims `text`.
    pub fn detect(&self, text: &str) -> Result<Dialect, TranslationError> {
        let candidates: Vec<Dialect> = self
            .parsers
            .iter()
            .filter(|p| p.can_parse(text))
            .map(|p| p.dialect())
            .collect();
        match candidates.as_slice() {
            [only] => Ok(*only),
            _ => Err(TranslationError::AmbiguousOrUnsupportedSource {
                requested: AUTO_DETECT.to_string(),
                candidates: candidates.iter().map(|d| d.id().to_string()).collect(),
            }),
        }
    }

    pub fn translate(
        &self,
        source_text: &str,
        source_dialect: &str,
        target_dialect: &str,
        config: &TranslationConfig,
    ) -> TranslationResult {
        self.translate_labeled(source_text, "<input>", source_dialect, target_dialect, config)
    }

    /// `translate` with a label used in parse errors and TODO entries.
    pub fn translate_labeled(
        &self,
        source_text: &str,
        source_label: &str,
        source_dialect: &str,
        target_dialect: &str,
        config: &TranslationConfig,
    ) -> TranslationResult {
        let mut warnings = Vec::new();

        // ---- 1. parser selection ----
        let source = match self.select_parser(source_text, source_dialect) {
            Ok(parser) => parser,
            Err(e) => {
                warn!(source = source_label, error = %e, "no parser selected");
                return TranslationResult::failed(e, warnings);
            }
        };
        let target = Dialect::from_str(target_dialect).ok();
        debug!(source = source_label, from = %source.dialect(), to = target_dialect, "translating");

        // ---- 2. parse ----
        let parsed = match source.parse(source_text, source_label) {
            Ok(intents) => intents,
            Err(e) => {
                warn!(source = source_label, error = %e, "parse failed");
                return TranslationResult::failed(e.into(), warnings);
            }
        };

        // ---- 3. normalize, 4. idioms ----
        let mut applied = Vec::new();
        let intents: Vec<TestIntent> = parsed
            .iter()
            .map(|intent| {
                let normalized = normalize_intent(intent);
                if !config.apply_idioms {
                    return normalized;
                }
                let pass = self.idioms.apply_all(&normalized, target);
                warnings.extend(pass.notes);
                warnings.extend(pass.warnings);
                for name in pass.applied {
                    if !applied.contains(&name) {
                        applied.push(name);
                    }
                }
                pass.intent
            })
            .collect();

        // ---- 5. generator selection ----
        let generator = match self.select_generator(target_dialect, target, &intents) {
            Ok(generator) => generator,
            Err(e) => {
                warn!(to = target_dialect, error = %e, "no generator selected");
                return TranslationResult::failed(e, warnings);
            }
        };

        // ---- 6. generate (TODO markers are placed here) ----
        let ctx = GenerationContext {
            source: source.dialect(),
            threshold: config.confidence_threshold,
            mappings: &self.mappings,
        };
        let tests: Vec<GeneratedTest> = intents.iter().map(|i| generator.generate(i, &ctx)).collect();
        let tally = Tally::of(&tests);

        let header = config.emit_header.then(|| {
            format!(
                "Translated by testshift from {} to {}\nConfidence: {:.2}",
                source.dialect(),
                generator.dialect(),
                tally.min
            )
        });
        let mut code = generator.render_file(&tests, header.as_deref());
        let mut confidence = tally.min;

        // ---- 7. refine ----
        let mut refined = false;
        if config.use_refiner {
            match self.refine(&code, &intents, generator.dialect(), config.refiner_budget) {
                Ok(Some((text, delta))) => {
                    code = text;
                    confidence = (confidence + delta).clamp(0.0, 1.0);
                    refined = true;
                }
                Ok(None) => warnings.push("refined output discarded: it introduced validation defects".to_string()),
                Err(e) => {
                    warn!(error = %e, "refiner skipped");
                    warnings.push(e.to_string());
                }
            }
        }

        // ---- 8. validate ----
        match Validator::gate(config.validation_level, &code, generator.dialect()) {
            GateOutcome::Clean | GateOutcome::Skipped => {}
            GateOutcome::Warnings(defects) => {
                warn!(defects = defects.len(), "generated code has validation defects");
                warnings.extend(defects.iter().map(|d| format!("validation: {}", d)));
            }
            GateOutcome::Rejected(defects) => {
                warn!(defects = defects.len(), "strict validation rejected generated code");
                return TranslationResult::failed(TranslationError::ValidationFailure { defects }, warnings);
            }
        }

        // ---- 9. TODO collection and result assembly ----
        let todos: Vec<String> = tests
            .iter()
            .enumerate()
            .flat_map(|(i, t)| t.todos.iter().filter(move |todo| i == 0 || todo.section == Section::Body))
            .map(|todo| todo.text.clone())
            .collect();

        let mut statistics = BTreeMap::new();
        statistics.insert("source_dialect".to_string(), json!(source.dialect().id()));
        statistics.insert("target_dialect".to_string(), json!(generator.dialect().id()));
        statistics.insert("tests".to_string(), json!(tests.len()));
        statistics.insert("steps".to_string(), json!(intents.iter().map(|i| i.steps.len()).sum::<usize>()));
        statistics.insert(
            "assertions".to_string(),
            json!(intents.iter().map(|i| i.assertions.len()).sum::<usize>()),
        );
        statistics.insert("emitted_nodes".to_string(), json!(tally.emitted));
        statistics.insert("mapped_nodes".to_string(), json!(tally.mapped));
        statistics.insert("pass_through_nodes".to_string(), json!(tally.pass_through));
        statistics.insert("todos".to_string(), json!(todos.len()));
        statistics.insert("min_confidence".to_string(), json!(round2(tally.min)));
        statistics.insert("average_confidence".to_string(), json!(round2(tally.average())));
        statistics.insert("idioms_applied".to_string(), json!(applied));
        statistics.insert("refined".to_string(), json!(refined));

        info!(
            source = source_label,
            tests = tests.len(),
            confidence = confidence,
            todos = todos.len(),
            "translation complete"
        );

        TranslationResult {
            success: true,
            target_code: code,
            confidence,
            warnings,
            todos,
            statistics,
            errors: Vec::new(),
        }
    }

    fn select_parser(&self, text: &str, requested: &str) -> Result<&dyn Parser, TranslationError> {
        let registered = || -> Vec<String> { self.parsers.iter().map(|p| p.dialect().id().to_string()).collect() };
        if requested.trim().eq_ignore_ascii_case(AUTO_DETECT) || requested.trim().is_empty() {
            let dialect = self.detect(text)?;
            return self.parser(dialect).ok_or_else(|| TranslationError::AmbiguousOrUnsupportedSource {
                requested: requested.to_string(),
                candidates: registered(),
            });
        }
        Dialect::from_str(requested)
            .ok()
            .and_then(|d| self.parser(d))
            .ok_or_else(|| TranslationError::AmbiguousOrUnsupportedSource {
                requested: requested.to_string(),
                candidates: registered(),
            })
    }

    fn select_generator(
        &self,
        requested: &str,
        target: Option<Dialect>,
        intents: &[TestIntent],
    ) -> Result<&dyn Generator, TranslationError> {
        let unsupported = |reason: String| TranslationError::UnsupportedTarget {
            requested: requested.to_string(),
            reason,
        };
        let Some(target) = target else {
            return Err(unsupported("unknown dialect".to_string()));
        };
        let generator = self
            .generator(target)
            .ok_or_else(|| unsupported("no generator registered".to_string()))?;
        if let Some(intent) = intents.iter().find(|i| !generator.can_generate(i)) {
            return Err(unsupported(format!(
                "cannot express {} test '{}'",
                intent.test_kind, intent.test_name
            )));
        }
        Ok(generator)
    }

    /// `Ok(None)` when the refined text was rejected by the validator.
    fn refine(
        &self,
        code: &str,
        intents: &[TestIntent],
        target: Dialect,
        budget: u32,
    ) -> Result<Option<(String, f32)>, TranslationError> {
        let unavailable = |reason: String| TranslationError::RefinerUnavailable { reason };
        let refiner = self
            .refiner
            .as_ref()
            .ok_or_else(|| unavailable("no refiner configured".to_string()))?;

        let outcome = catch_unwind(AssertUnwindSafe(|| refiner.refine(code, intents, budget)))
            .map_err(|_| unavailable("refiner panicked".to_string()))?
            .map_err(|e| unavailable(e.to_string()))?;

        let before = Validator::check(code, target).len();
        let after = Validator::check(&outcome.text, target).len();
        if after > before {
            debug!(before, after, "refined output rejected");
            return Ok(None);
        }
        Ok(Some((outcome.text, outcome.confidence_delta)))
    }
}

/// Emission counts for one file. Setup and teardown are rendered once,
/// from the first test, so only that test's copies count.
struct Tally {
    emitted: usize,
    mapped: usize,
    pass_through: usize,
    min: f32,
    sum: f32,
}

impl Tally {
    fn of(tests: &[GeneratedTest]) -> Self {
        let mut tally = Tally {
            emitted: 0,
            mapped: 0,
            pass_through: 0,
            min: 1.0,
            sum: 0.0,
        };
        for (i, test) in tests.iter().enumerate() {
            for emission in test.emissions.iter().filter(|e| i == 0 || e.section == Section::Body) {
                tally.emitted += 1;
                tally.sum += emission.confidence;
                tally.min = tally.min.min(emission.confidence);
                match emission.origin {
                    EmissionOrigin::Mapping => tally.mapped += 1,
                    EmissionOrigin::PassThrough => tally.pass_through += 1,
                    EmissionOrigin::Native => {}
                }
            }
        }
        tally
    }

    fn average(&self) -> f32 {
        if self.emitted == 0 { 1.0 } else { self.sum / self.emitted as f32 }
    }
}

fn round2(x: f32) -> f64 {
    (f64::from(x) * 100.0).round() / 100.0
}
