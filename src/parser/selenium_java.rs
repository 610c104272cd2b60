use tracing::debug;

use crate::intent::dialect::{Dialect, TestKind};
use crate::intent::intent_model::{ActionIntent, TestIntent};
use crate::parser::scan::{SourceFile, TestBlock};
use crate::parser::selenium::SeleniumClassifier;
use crate::parser::syntax::Lang;
use crate::parser::{ParseError, Parser, finish_intent, hook_step, humanize, partition_blocks, syntax_error};

/// Java + Selenium WebDriver under JUnit 4/5 or TestNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeleniumJavaParser;

impl Parser for SeleniumJavaParser {
    fn dialect(&self) -> Dialect {
        Dialect::SeleniumJava
    }

    fn can_parse(&self, text: &str) -> bool {
        let java = text.contains("import ") && text.contains(';') && text.contains("class ");
        java && (text.contains("org.openqa.selenium") || text.contains("WebDriver"))
            && !text.contains("io.restassured")
    }

    fn parse(&self, text: &str, source_label: &str) -> Result<Vec<TestIntent>, ParseError> {
        if !self.can_parse(text) {
            return Err(ParseError::NotRecognized {
                dialect: self.dialect(),
            });
        }

        let file = SourceFile::parse(text, Lang::Java).map_err(|e| syntax_error(self.dialect(), e))?;
        let (tests, setup, teardown) = partition_blocks(file.blocks());
        if tests.is_empty() {
            return Err(ParseError::MissingTestBoundary {
                dialect: self.dialect(),
                source_label: source_label.to_string(),
            });
        }

        let suite = file.class_name();

        // Hooks run first so their bindings are visible to every test
        let mut base = SeleniumClassifier::new(Lang::Java);
        let setup_steps = hook_steps(&mut base, &setup);
        let teardown_steps = hook_steps(&mut base.clone(), &teardown);

        let mut intents = Vec::with_capacity(tests.len());
        for block in &tests {
            let mut classifier = base.clone();
            let mut intent = TestIntent::new(humanize(&block.name), self.dialect(), TestKind::Ui);
            intent.metadata.insert("source".to_string(), source_label.to_string());
            intent.metadata.insert("method".to_string(), block.name.clone());
            if let Some(suite) = &suite {
                intent.metadata.insert("suite".to_string(), suite.clone());
            }

            for statement in &block.statements {
                intent.push(classifier.classify(statement));
            }

            debug!(test = %intent.test_name, nodes = intent.node_count(), "parsed selenium-java test");
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
