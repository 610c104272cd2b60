#![allow(dead_code)]

pub mod fixtures;

use testshift::{TranslationConfig, TranslationResult};

/// Translate with default settings, auto-detecting nothing.
pub fn translate(source: &str, from: &str, to: &str) -> TranslationResult {
    testshift::translate(source, from, to, &TranslationConfig::default())
}

/// 1-based line of `source` holding `needle`, first match.
pub fn line_of(source: &str, needle: &str) -> usize {
    source
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i + 1)
        .unwrap_or_else(|| panic!("'{}' not in fixture", needle))
}
