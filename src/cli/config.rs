use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::pipeline::config::{Mode, TranslationConfig};
use crate::refine::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::registry::api_mapping::ApiMapping;
use crate::validate::ValidationLevel;

pub const DEFAULT_CONFIG_FILE: &str = "testshift.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "testshift",
    version,
    about = "Translate automated tests between frameworks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Ollama API endpoint for --refine
    #[arg(long, global = true)]
    pub ollama_endpoint: Option<String>,

    /// Ollama model name for --refine
    #[arg(long, global = true)]
    pub ollama_model: Option<String>,

    /// Path to config file (default: testshift.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Translate a test file, or every recognized file in a directory
    Translate {
        /// Source file or directory
        #[arg(long)]
        source: String,

        /// Source dialect, or "auto" to detect per file
        #[arg(long, default_value = "auto")]
        from: String,

        /// Target dialect
        #[arg(long)]
        to: String,

        /// Where translated files go (default: print to stdout)
        #[arg(short, long)]
        output_dir: Option<String>,

        /// Validation level: strict, lenient, skip
        #[arg(long)]
        validation: Option<String>,

        /// Confidence below which emissions get a TODO marker
        #[arg(long)]
        threshold: Option<f32>,

        /// Mode: assistive, automated, batch
        #[arg(long)]
        mode: Option<String>,

        /// Prefix output with a dialect/confidence header
        #[arg(long)]
        header: bool,

        /// Pass output through the Ollama refiner
        #[arg(long)]
        refine: bool,

        /// Write a JSON report to this path
        #[arg(long)]
        json: Option<String>,

        /// Append one JSONL trace record per file to this path
        #[arg(long)]
        trace: Option<String>,
    },

    /// Report which dialect a file is detected as
    Detect {
        #[arg(long)]
        source: String,
    },

    /// List supported source and target dialects
    Dialects,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `testshift.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Extra API mappings registered before any translation
    #[serde(default)]
    pub mappings: Vec<ApiMapping>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: Option<String>,
    pub json_report: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub endpoint: Option<String>,
    pub model: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Serde default helpers
fn default_timeout() -> u64 { DEFAULT_TIMEOUT_SECS }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_FILE);
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Per-run overrides taken from `translate` flags.
#[derive(Debug, Clone, Default)]
pub struct TranslateOverrides {
    pub validation: Option<String>,
    pub threshold: Option<f32>,
    pub mode: Option<String>,
    pub header: bool,
    pub refine: bool,
}

/// CLI flags over the config file over defaults.
pub fn build_translation_config(
    base: &TranslationConfig,
    overrides: &TranslateOverrides,
) -> Result<TranslationConfig, Box<dyn std::error::Error>> {
    let mut config = base.clone();
    if let Some(level) = &overrides.validation {
        config.validation_level = level.parse::<ValidationLevel>()?;
    }
    if let Some(threshold) = overrides.threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(format!("threshold {} is outside 0.0..=1.0", threshold).into());
        }
        config.confidence_threshold = threshold;
    }
    if let Some(mode) = &overrides.mode {
        config.mode = mode.parse::<Mode>()?;
    }
    config.emit_header |= overrides.header;
    config.use_refiner |= overrides.refine;
    Ok(config)
}

/// Resolved Ollama settings: CLI > config > defaults.
pub fn resolve_ollama(cli: &Cli, config: &AppConfig) -> (String, String, u64) {
    let endpoint = cli
        .ollama_endpoint
        .clone()
        .or_else(|| config.ollama.endpoint.clone())
        .unwrap_or_else(|| DEFAULT_OLLAMA_ENDPOINT.to_string());
    let model = cli
        .ollama_model
        .clone()
        .or_else(|| config.ollama.model.clone())
        .unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string());
    (endpoint, model, config.ollama.timeout_secs)
}
