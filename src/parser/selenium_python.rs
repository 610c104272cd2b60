use tracing::debug;

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{ActionIntent, TestIntent};
use crate::parser::scan::{SourceFile, TestBlock};
use crate::parser::selenium::SeleniumClassifier;
use crate::parser::syntax::Lang;
use crate::parser::{ParseError, Parser, finish_intent, hook_step, humanize, partition_blocks, syntax_error};

/// Python + Selenium under pytest or unittest.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeleniumPythonParser;

impl Parser for SeleniumPythonParser {
    fn dialect(&self) -> Dialect {
        Dialect::SeleniumPython
    }

    fn can_parse(&self, text: &str) -> bool {
        (text.contains("from selenium") || text.contains("import selenium")) && text.contains("def ")
    }

    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError> {
        if !self.can_parse(text) {
            return Err(ParseError::NotRecognized {
                dialect: self.dialect(),
            });
        }

        let file = SourceFile::parse(text, Lang::Python).map_err(|e| syntax_error(self.dialect(), e))?;
        let (tests, setup, teardown) = partition_blocks(file.blocks());
        if tests.is_empty() {
            return Err(ParseError::MissingTestBoundary {
                dialect: self.dialect(),
                source_label: source_label.to_string(),
            });
        }

        let suite = file.class_name();

        let mut base = SeleniumClassifier::new(Lang::Python);
        let setup_steps = hook_steps(&mut base, &setup);
        let teardown_steps = hook_steps(&mut base.clone(), &teardown);

        let mut intents = Vec::with_capacity(tests.len());
        for block in &tests {
            let mut classifier = base.clone();
            let mut intent = TestIntent::new(humanize(&block.name), self.dialect(), TestKind::Ui);
            intent.metadata.insert("source".to_string(), source_label.to_string());
            intent.metadata.insert("function".to_string(), block.name.clone());
            if let Some(suite) = &suite {
                intent.metadata.insert("suite".to_string(), suite.clone());
            }

            for statement in &block.statements {
                intent.push(classifier.classify(statement));
            }

            debug!(test = %intent.test_name, nodes = intent.node_count(), "parsed selenium-python test");
            intents.push(finish_intent(intent, &setup_steps, &teardown_steps));
        }

        Ok(intents)
    }
}

fn hook_steps(classifier: &mut SeleniumClassifier, blocks: &[TestBlock]) -> Vec<ActionIntent> {
    blocks
        .iter()
        .flat_map(|block| &block.statements)
        .map(|statement| hook_step(classifier.classify(statement)))
        .collect()
}
