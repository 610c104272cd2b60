mod common;

use std::path::Path;

use clap::Parser;
use common::fixtures::{CYPRESS_LOGIN, SELENIUM_JAVA_LOGIN, SELENIUM_JAVA_UNSUPPORTED};
use testshift::cli::commands::{TranslateJob, build_translator, cmd_translate, collect_sources, source_stem};
use testshift::cli::config::{
    AppConfig, Cli, Commands, TranslateOverrides, build_translation_config, load_config, resolve_ollama,
};
use testshift::intent::Dialect;
use testshift::refine::{DEFAULT_OLLAMA_ENDPOINT, DEFAULT_OLLAMA_MODEL};
use testshift::{Mode, TranslationConfig, ValidationLevel};

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_translate_minimal() {
    let cli = Cli::parse_from(["testshift", "translate", "--source", "LoginTest.java", "--to", "playwright-ts"]);
    match cli.command {
        Commands::Translate {
            source,
            from,
            to,
            output_dir,
            validation,
            threshold,
            mode,
            header,
            refine,
            json,
            trace,
        } => {
            assert_eq!(source, "LoginTest.java");
            assert_eq!(from, "auto");
            assert_eq!(to, "playwright-ts");
            assert!(output_dir.is_none());
            assert!(validation.is_none());
            assert!(threshold.is_none());
            assert!(mode.is_none());
            assert!(!header);
            assert!(!refine);
            assert!(json.is_none());
            assert!(trace.is_none());
        }
        _ => panic!("Expected Translate command"),
    }
}

#[test]
fn cli_parse_translate_all_args() {
    let cli = Cli::parse_from([
        "testshift",
        "translate",
        "--source",
        "tests/",
        "--from",
        "cypress",
        "--to",
        "playwright-python",
        "-o",
        "out",
        "--validation",
        "strict",
        "--threshold",
        "0.9",
        "--mode",
        "batch",
        "--header",
        "--refine",
        "--json",
        "report.json",
        "--trace",
        "trace.jsonl",
    ]);
    match cli.command {
        Commands::Translate {
            from,
            output_dir,
            validation,
            threshold,
            mode,
            header,
            refine,
            json,
            trace,
            ..
        } => {
            assert_eq!(from, "cypress");
            assert_eq!(output_dir.as_deref(), Some("out"));
            assert_eq!(validation.as_deref(), Some("strict"));
            assert_eq!(threshold, Some(0.9));
            assert_eq!(mode.as_deref(), Some("batch"));
            assert!(header);
            assert!(refine);
            assert_eq!(json.as_deref(), Some("report.json"));
            assert_eq!(trace.as_deref(), Some("trace.jsonl"));
        }
        _ => panic!("Expected Translate command"),
    }
}

#[test]
fn cli_parse_detect_and_dialects() {
    let cli = Cli::parse_from(["testshift", "detect", "--source", "login.cy.js"]);
    match cli.command {
        Commands::Detect { source } => assert_eq!(source, "login.cy.js"),
        _ => panic!("Expected Detect command"),
    }
    let cli = Cli::parse_from(["testshift", "dialects"]);
    assert!(matches!(cli.command, Commands::Dialects));
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from([
        "testshift",
        "-vv",
        "dialects",
        "--ollama-endpoint",
        "http://gpu:11434/api/generate",
        "--config",
        "ci.yaml",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.ollama_endpoint.as_deref(), Some("http://gpu:11434/api/generate"));
    assert_eq!(cli.config.as_deref(), Some("ci.yaml"));
}

#[test]
fn cli_requires_a_target() {
    assert!(Cli::try_parse_from(["testshift", "translate", "--source", "a.java"]).is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.translation, TranslationConfig::default());
    assert!(config.output.dir.is_none());
    assert!(config.mappings.is_empty());
}

#[test]
fn config_partial_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("testshift.yaml");
    std::fs::write(
        &path,
        "translation:\n  validation_level: strict\n  confidence_threshold: 0.5\noutput:\n  dir: generated\nmappings:\n  - source_dialect: cypress\n    target_dialect: playwright-ts\n    source_call_shape: cy.tick\n    target_template: await page.clock.runFor({arg0});\n",
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.translation.validation_level, ValidationLevel::Strict);
    assert_eq!(config.translation.confidence_threshold, 0.5);
    assert!(config.translation.apply_idioms);
    assert_eq!(config.output.dir.as_deref(), Some("generated"));
    assert_eq!(config.ollama.timeout_secs, 60);
    assert_eq!(config.mappings.len(), 1);

    let translator = build_translator(&config, None);
    assert!(translator
        .mappings()
        .lookup(Dialect::Cypress, Dialect::PlaywrightTs, "cy.tick")
        .is_some());
}

#[test]
fn config_malformed_yaml_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.yaml");
    std::fs::write(&path, "translation: [not, a, map").unwrap();
    let config = load_config(path.to_str());
    assert_eq!(config.translation, TranslationConfig::default());
}

#[test]
fn overrides_apply_over_config() {
    let base = TranslationConfig::default();
    let overrides = TranslateOverrides {
        validation: Some("skip".to_string()),
        threshold: Some(0.4),
        mode: Some("automated".to_string()),
        header: true,
        refine: false,
    };
    let config = build_translation_config(&base, &overrides).unwrap();
    assert_eq!(config.validation_level, ValidationLevel::Skip);
    assert_eq!(config.confidence_threshold, 0.4);
    assert_eq!(config.mode, Mode::Automated);
    assert!(config.emit_header);
    assert!(!config.use_refiner);
}

#[test]
fn overrides_reject_bad_values() {
    let base = TranslationConfig::default();
    let threshold = TranslateOverrides {
        threshold: Some(1.5),
        ..TranslateOverrides::default()
    };
    assert!(build_translation_config(&base, &threshold).is_err());

    let level = TranslateOverrides {
        validation: Some("paranoid".to_string()),
        ..TranslateOverrides::default()
    };
    assert!(build_translation_config(&base, &level).is_err());
}

#[test]
fn ollama_settings_prefer_cli_flags() {
    let cli = Cli::parse_from(["testshift", "dialects", "--ollama-model", "codellama"]);
    let (endpoint, model, timeout) = resolve_ollama(&cli, &AppConfig::default());
    assert_eq!(endpoint, DEFAULT_OLLAMA_ENDPOINT);
    assert_eq!(model, "codellama");
    assert_eq!(timeout, 60);
    assert_ne!(model, DEFAULT_OLLAMA_MODEL);
}

// ============================================================================
// Source collection
// ============================================================================

#[test]
fn source_stem_strips_runner_suffixes() {
    assert_eq!(source_stem(Path::new("specs/login.cy.js")), "login");
    assert_eq!(source_stem(Path::new("LoginTest.java")), "LoginTest");
    assert_eq!(source_stem(Path::new("checkout.spec.ts")), "checkout");
}

#[test]
fn collect_sources_walks_directories_in_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("b.java"), "").unwrap();
    std::fs::write(dir.path().join("nested").join("a.feature"), "").unwrap();
    std::fs::write(dir.path().join("notes.md"), "").unwrap();

    let sources = collect_sources(dir.path().to_str().unwrap()).unwrap();
    let names: Vec<String> = sources
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["b.java", "a.feature"]);

    assert!(collect_sources(dir.path().join("missing").to_str().unwrap()).is_err());
}

// ============================================================================
// translate command
// ============================================================================

fn job(source: &Path, out: &Path, config: TranslationConfig) -> TranslateJob {
    TranslateJob {
        source: source.to_string_lossy().to_string(),
        from: "auto".to_string(),
        to: "playwright-ts".to_string(),
        output_dir: Some(out.to_string_lossy().to_string()),
        json_report: Some(out.join("report.json").to_string_lossy().to_string()),
        trace: Some(out.join("trace.jsonl").to_string_lossy().to_string()),
        config,
    }
}

#[test]
fn translate_writes_outputs_report_and_trace() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("LoginTest.java"), SELENIUM_JAVA_LOGIN).unwrap();
    std::fs::write(src.path().join("login.cy.js"), CYPRESS_LOGIN).unwrap();

    let translator = build_translator(&AppConfig::default(), None);
    let ok = cmd_translate(&translator, &job(src.path(), out.path(), TranslationConfig::default()), 0).unwrap();
    assert!(ok);

    let written = std::fs::read_to_string(out.path().join("LoginTest.spec.ts")).unwrap();
    assert!(written.contains("fill('alice')"));
    assert!(out.path().join("login.spec.ts").exists());

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["total"], 2);
    assert_eq!(report["written"], 2);

    let trace = std::fs::read_to_string(out.path().join("trace.jsonl")).unwrap();
    assert_eq!(trace.lines().count(), 2);
}

#[test]
fn automated_mode_skips_files_with_todos() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("WindowTest.java"), SELENIUM_JAVA_UNSUPPORTED).unwrap();

    let config = TranslationConfig {
        mode: Mode::Automated,
        ..TranslationConfig::default()
    };
    let translator = build_translator(&AppConfig::default(), None);
    let ok = cmd_translate(&translator, &job(src.path(), out.path(), config), 0).unwrap();

    // Translation succeeded; it just was not written
    assert!(ok);
    assert!(!out.path().join("WindowTest.spec.ts").exists());
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out.path().join("report.json")).unwrap()).unwrap();
    assert_eq!(report["written"], 0);
    assert!(report["files"][0]["skipped_reason"]
        .as_str()
        .is_some_and(|r| r.contains("TODO")));
}
