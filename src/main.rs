mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use df_convert::{BatchItem, BatchOrchestrator, ProgressSender};
use df_core::config::Config;
use df_core::events::{ConvertEvent, EventBus};
use df_core::{auto_select_format, classify, format_bytes, options_for, InputFile, Kind};
use df_engine::{EngineLoader, EngineProvider};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "dropforge=trace,df_core=trace,df_engine=trace,df_convert=trace,reqwest=debug"
                .to_string()
        } else {
            "dropforge=debug,df_core=info,df_engine=info,df_convert=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Convert {
            inputs,
            format,
            output_dir,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(convert_files(
                inputs,
                format.as_deref(),
                &output_dir,
                cli.config.as_deref(),
            ))
        }
        Commands::Formats { files } => show_formats(&files),
        Commands::CheckEngine => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(check_engine(cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("dropforge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn load_config(config_path: Option<&Path>) -> Config {
    let config = Config::load_or_default(config_path);
    for warning in config.validate() {
        tracing::warn!("config: {}", warning);
    }
    config
}

async fn convert_files(
    inputs: Vec<PathBuf>,
    format: Option<&str>,
    output_dir: &Path,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path);

    // Read all inputs up front so missing files fail before any engine work.
    let mut items = Vec::with_capacity(inputs.len());
    for path in &inputs {
        if !path.exists() {
            anyhow::bail!("Input file does not exist: {:?}", path);
        }
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "input".to_string());
        let file = InputFile::new(name, bytes.len() as u64, "");
        items.push(BatchItem::new(file, bytes));
    }

    let format = match format {
        Some(f) => f.to_ascii_lowercase(),
        None => {
            let kinds: Vec<Kind> = items.iter().map(|i| i.file.kind()).collect();
            let auto = auto_select_format(&kinds)
                .ok_or_else(|| anyhow::anyhow!("no convertible inputs; use --format"))?;
            tracing::info!("auto-selected output format '{}'", auto);
            auto.to_string()
        }
    };

    let events = Arc::new(EventBus::default());
    let loader = Arc::new(EngineLoader::new(config.engine.clone(), events.clone()));
    let orchestrator =
        BatchOrchestrator::new(loader as Arc<dyn EngineProvider>, events, config.convert)
            .with_progress(ProgressSender::new(|percent, label| {
                eprint!("\r[{percent:5.1}%] {label:<60}");
                if percent >= 100.0 {
                    eprintln!();
                }
            }));

    let reports = orchestrator.convert_all(items, &format).await;

    tokio::fs::create_dir_all(output_dir).await?;
    let mut failed = 0usize;
    for (report, input_path) in reports.iter().zip(&inputs) {
        match &report.outcome {
            Ok(converted) => {
                let mut out_path = output_dir.join(&converted.output_name);
                // Never clobber the input (txt passthrough can collide).
                if out_path == *input_path {
                    out_path = output_dir.join(format!("converted-{}", converted.output_name));
                }
                tokio::fs::write(&out_path, &converted.bytes).await?;

                print!(
                    "✓ {} -> {} ({})",
                    report.input_name,
                    out_path.display(),
                    format_bytes(converted.bytes.len() as u64)
                );
                if let Some(note) = &converted.note {
                    print!(" [{}]", note);
                }
                println!();
            }
            Err(e) => {
                failed += 1;
                println!("✗ {}: {}", report.input_name, e);
            }
        }
    }

    println!();
    if failed == 0 {
        println!("Converted {} file(s)", reports.len());
    } else {
        println!("Converted {} file(s), {} failed", reports.len() - failed, failed);
    }

    Ok(())
}

fn show_formats(files: &[String]) -> Result<()> {
    if files.is_empty() {
        for kind in [Kind::Image, Kind::Video, Kind::Audio, Kind::Document] {
            println!("{}:", kind);
            for option in options_for(kind) {
                println!("  {}", option.label);
            }
        }
        return Ok(());
    }

    for name in files {
        let kind = classify(name, "");
        let options = options_for(kind);
        if options.is_empty() {
            println!("{}: unrecognized, no legal conversion", name);
        } else {
            let codes: Vec<&str> = options.iter().map(|o| o.code).collect();
            println!("{}: {} -> {}", name, kind, codes.join(", "));
        }
    }

    let kinds: Vec<Kind> = files.iter().map(|n| classify(n, "")).collect();
    if let Some(default) = auto_select_format(&kinds) {
        println!("\nDefault output format: {}", default);
    }

    Ok(())
}

async fn check_engine(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    println!("Loading transcoding engine...\n");

    let events = Arc::new(EventBus::default());
    let loader = EngineLoader::new(config.engine, events.clone());

    match loader.ensure_ready().await {
        Ok(engine) => {
            println!("✓ engine ready");
            if let Some(version) = engine.version() {
                println!("  {}", version);
            }
            let source = events.recent_events(50).into_iter().find_map(|e| match e {
                ConvertEvent::EngineReady { source } => Some(source),
                _ => None,
            });
            if let Some(source) = source {
                println!("  assets: {:?}", source);
            }
            Ok(())
        }
        Err(e) => {
            println!("✗ engine load failed: {}", e);
            Ok(())
        }
    }
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let json = std::fs::read_to_string(p)?;
            let config = Config::from_json(&json)?;
            println!("✓ Configuration is valid");
            println!("  Local engine URL: {}", config.engine.local_base_url);
            println!(
                "  Cache dir: {}",
                config.engine.resolved_cache_dir().display()
            );
            println!("  Command timeout: {}s", config.engine.command_timeout_secs);
            println!(
                "  Max input size: {}",
                format_bytes(config.convert.max_input_bytes)
            );
            println!("  Quality: {}", config.convert.quality);
            for warning in config.validate() {
                println!("  warning: {}", warning);
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = Config::default();
            println!("Default config:");
            println!("  Local engine URL: {}", config.engine.local_base_url);
            println!(
                "  Max input size: {}",
                format_bytes(config.convert.max_input_bytes)
            );
        }
    }

    Ok(())
}
