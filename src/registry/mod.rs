pub mod api_mapping;
pub mod idiom;

pub use api_mapping::{ApiMapping, ApiMappingRegistry};
pub use idiom::{IdiomError, IdiomOutcome, IdiomPass, IdiomPattern, IdiomRegistry};
