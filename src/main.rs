use clap::Parser;
use testshift::cli::commands::{TranslateJob, build_translator, cmd_detect, cmd_dialects, cmd_translate};
use testshift::cli::config::{Cli, Commands, TranslateOverrides, build_translation_config, load_config, resolve_ollama};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match &cli.command {
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
            let overrides = TranslateOverrides {
                validation: validation.clone(),
                threshold: *threshold,
                mode: mode.clone(),
                header: *header,
                refine: *refine,
            };
            let translation = build_translation_config(&config.translation, &overrides)?;

            // Resolve Ollama settings: CLI > config > defaults
            let ollama = translation.use_refiner.then(|| resolve_ollama(&cli, &config));
            let translator = build_translator(&config, ollama);

            let job = TranslateJob {
                source: source.clone(),
                from: from.clone(),
                to: to.clone(),
                output_dir: output_dir.clone().or_else(|| config.output.dir.clone()),
                json_report: json.clone().or_else(|| config.output.json_report.clone()),
                trace: trace.clone(),
                config: translation,
            };
            let all_succeeded = cmd_translate(&translator, &job, cli.verbose)?;
            if !all_succeeded {
                std::process::exit(1);
            }
        }
        Commands::Detect { source } => {
            let translator = build_translator(&config, None);
            if !cmd_detect(&translator, source)? {
                std::process::exit(1);
            }
        }
        Commands::Dialects => {
            cmd_dialects(&build_translator(&config, None));
        }
    }

    Ok(())
}

/// `-v` count picks the default level; `RUST_LOG` overrides it.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("testshift={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
