use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A (host language, automation library) pairing that a parser recognizes
/// or a generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    SeleniumJava,
    SeleniumPython,
    Cypress,
    Gherkin,
    RestAssured,
    PlaywrightTs,
    PlaywrightPython,
    PytestRequests,
}

/// Which generators can consume an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    Ui,
    Api,
    Bdd,
}

/// Comment and literal conventions of the language a dialect is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxFamily {
    Java,
    JavaScript,
    TypeScript,
    Python,
    Gherkin,
}

impl Dialect {
    pub const ALL: [Dialect; 8] = [
        Dialect::SeleniumJava,
        Dialect::SeleniumPython,
        Dialect::Cypress,
        Dialect::Gherkin,
        Dialect::RestAssured,
        Dialect::PlaywrightTs,
        Dialect::PlaywrightPython,
        Dialect::PytestRequests,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Dialect::SeleniumJava => "selenium-java",
            Dialect::SeleniumPython => "selenium-python",
            Dialect::Cypress => "cypress",
            Dialect::Gherkin => "gherkin",
            Dialect::RestAssured => "rest-assured",
            Dialect::PlaywrightTs => "playwright-ts",
            Dialect::PlaywrightPython => "playwright-python",
            Dialect::PytestRequests => "pytest-requests",
        }
    }

    pub fn syntax(&self) -> SyntaxFamily {
        match self {
            Dialect::SeleniumJava | Dialect::RestAssured => SyntaxFamily::Java,
            Dialect::Cypress => SyntaxFamily::JavaScript,
            Dialect::PlaywrightTs => SyntaxFamily::TypeScript,
            Dialect::SeleniumPython | Dialect::PlaywrightPython | Dialect::PytestRequests => {
                SyntaxFamily::Python
            }
            Dialect::Gherkin => SyntaxFamily::Gherkin,
        }
    }

    /// Targets whose runner auto-waits for actionability.
    pub fn auto_waits(&self) -> bool {
        matches!(self, Dialect::PlaywrightTs | Dialect::PlaywrightPython)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Dialect::ALL
            .iter()
            .copied()
            .find(|d| d.id() == wanted)
            .ok_or_else(|| format!("unknown dialect '{}'", s.trim()))
    }
}

impl SyntaxFamily {
    pub fn line_comment(&self) -> &'static str {
        match self {
            SyntaxFamily::Python | SyntaxFamily::Gherkin => "#",
            _ => "//",
        }
    }
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Ui => f.write_str("ui"),
            TestKind::Api => f.write_str("api"),
            TestKind::Bdd => f.write_str("bdd"),
        }
    }
}
