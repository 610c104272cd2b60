//! Parse, normalize, rewrite, generate, refine and validate, with every
//! outcome folded into one `TranslationResult`.

pub mod config;
pub mod refiner;
pub mod result;
pub mod translator;

pub use config::{Mode, TranslationConfig};
pub use refiner::{RefineResult, Refiner, RefinerError};
pub use result::TranslationResult;
pub use translator::{AUTO_DETECT, Translator};
