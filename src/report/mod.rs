pub mod console;
pub mod report_model;

pub use report_model::{FileReport, TranslationReport};
