use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{debug, info};

use crate::cli::config::AppConfig;
use crate::intent::dialect::Dialect;
use crate::pipeline::config::{Mode, TranslationConfig};
use crate::pipeline::translator::Translator;
use crate::refine::OllamaRefiner;
use crate::report::console::{format_console_report, format_summary_line};
use crate::report::report_model::{FileReport, TranslationReport};
use crate::trace::logger::TraceLogger;
use crate::trace::trace::TranslationTraceEvent;

/// File extensions picked up when `--source` is a directory.
pub const SOURCE_EXTENSIONS: &[&str] = &["java", "py", "js", "ts", "feature"];

// ============================================================================
// translator setup
// ============================================================================

/// Built-in translator plus config-file mappings and, when asked, the
/// Ollama refiner.
pub fn build_translator(config: &AppConfig, ollama: Option<(String, String, u64)>) -> Translator {
    let mut translator = Translator::with_defaults();
    for mapping in &config.mappings {
        translator.mappings_mut().register(mapping.clone());
    }
    match ollama {
        Some((endpoint, model, timeout_secs)) => {
            translator.with_refiner(Box::new(OllamaRefiner::new(&endpoint, &model, timeout_secs)))
        }
        None => translator,
    }
}

// ============================================================================
// translate subcommand
// ============================================================================

/// One `translate` invocation, resolved from flags and config.
#[derive(Debug, Clone)]
pub struct TranslateJob {
    pub source: String,
    pub from: String,
    pub to: String,
    pub output_dir: Option<String>,
    pub json_report: Option<String>,
    pub trace: Option<String>,
    pub config: TranslationConfig,
}

/// Translate every source file and return whether all of them succeeded.
pub fn cmd_translate(
    translator: &Translator,
    job: &TranslateJob,
    verbose: u8,
) -> Result<bool, Box<dyn std::error::Error>> {
    let sources = collect_sources(&job.source)?;
    if sources.is_empty() {
        eprintln!("No test sources found at: {}", job.source);
        return Ok(true);
    }

    let generator = Dialect::from_str(&job.to).ok().and_then(|d| translator.generator(d));
    let tracer = match &job.trace {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    if let Some(dir) = &job.output_dir {
        std::fs::create_dir_all(dir)?;
    }

    if verbose > 0 {
        eprintln!("Translating {} file(s) to {}...", sources.len(), job.to);
    }

    let start = std::time::Instant::now();
    let mut files = Vec::new();
    for path in &sources {
        let label = path.display().to_string();
        let text = std::fs::read_to_string(path)?;
        debug!(file = %label, bytes = text.len(), "read source");

        let result = translator.translate_labeled(&text, &label, &job.from, &job.to, &job.config);
        tracer.log(&TranslationTraceEvent::now(&label, &text, &job.to).with_result(&result));

        let mut report = FileReport {
            source_path: label,
            output_path: None,
            written: false,
            skipped_reason: None,
            result,
        };

        if report.result.success {
            if job.config.mode == Mode::Automated && !report.result.todos.is_empty() {
                report.skipped_reason = Some(format!(
                    "{} TODO(s) need review; automated mode writes only complete translations",
                    report.result.todos.len()
                ));
            } else if let (Some(dir), Some(generator)) = (&job.output_dir, generator) {
                let out = Path::new(dir).join(generator.output_file_name(&source_stem(path)));
                std::fs::write(&out, &report.result.target_code)?;
                info!(file = %out.display(), "wrote translation");
                report.output_path = Some(out.display().to_string());
                report.written = true;
            } else if job.config.mode != Mode::Batch {
                println!("{}", report.result.target_code);
            }
        }
        files.push(report);
    }

    if tracer.is_enabled() {
        debug!(records = tracer.records(), "trace events written");
    }

    let duration = start.elapsed().as_millis();
    let report = TranslationReport::from_files(&job.to, files).with_duration(duration);

    let summary = match job.config.mode {
        Mode::Batch => format_summary_line(&report),
        Mode::Assistive => format_console_report(&report, true),
        Mode::Automated => format_console_report(&report, false),
    };
    // Keep stdout clean for translated code when nothing is written to disk.
    if job.output_dir.is_some() {
        print!("{}", summary);
    } else {
        eprint!("{}", summary);
    }

    if let Some(path) = &job.json_report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(report.all_succeeded())
}

/// A single file, or every file under a directory with a known test
/// extension, sorted for deterministic order.
pub fn collect_sources(path: &str) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_dir() {
        return Ok(vec![PathBuf::from(path)]);
    }

    let mut out = Vec::new();
    let mut pending = vec![PathBuf::from(path)];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let p = entry?.path();
            if p.is_dir() {
                pending.push(p);
            } else if p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| SOURCE_EXTENSIONS.contains(&e))
            {
                out.push(p);
            }
        }
    }
    out.sort();
    Ok(out)
}

/// File name without its extension and any `.cy`/`.spec`/`.test` suffix.
pub fn source_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("translated");
    [".cy", ".spec", ".test"]
        .iter()
        .find_map(|suffix| stem.strip_suffix(suffix))
        .unwrap_or(stem)
        .to_string()
}

// ============================================================================
// detect / dialects subcommands
// ============================================================================

/// Print the detected dialect; false when detection fails.
pub fn cmd_detect(translator: &Translator, source: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(source)?;
    match translator.detect(&text) {
        Ok(dialect) => {
            println!("{}: {}", source, dialect);
            Ok(true)
        }
        Err(e) => {
            println!("{}: {}", source, e);
            Ok(false)
        }
    }
}

pub fn cmd_dialects(translator: &Translator) {
    let ids = |dialects: Vec<Dialect>| dialects.iter().map(Dialect::id).collect::<Vec<_>>().join(", ");
    println!("sources: {}", ids(translator.source_dialects()));
    println!("targets: {}", ids(translator.target_dialects()));
}
