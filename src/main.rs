use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use seedroid::config::{self, AppConfig, Strategy};
use seedroid::device::AdbSession;
use seedroid::errors::SeeDroidResult;
use seedroid::executor::InputDelivery;
use seedroid::llm::{ProviderRegistry, Role};
use seedroid::timing::TokioClock;
use seedroid::{ElementResolver, InstructionExecutor, ScriptCompiler};

#[derive(Parser)]
#[command(name = "seedroid", version, about = "Natural-language Android UI automation")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config.toml (default: searched next to the binary, cwd, user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Device serial, overrides [device].serial
    #[arg(long, short, global = true)]
    serial: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Plan and execute a free-form instruction
    Do {
        instruction: String,
        /// Resolve targets on the annotated screenshot
        #[arg(long)]
        visual: bool,
        /// Append the execution report to this JSONL file
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Tap the element matching a description
    Click {
        description: String,
        #[arg(long)]
        visual: bool,
    },
    /// Compile a YAML test definition into a Robot script
    Compile {
        yaml: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load(args: &Args) -> AppConfig {
    let loaded = match &args.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };
    let mut cfg = loaded.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "using default configuration");
        AppConfig::default()
    });
    if let Some(serial) = &args.serial {
        cfg.device.serial = serial.clone();
    }
    cfg
}

fn strategy(visual: bool, cfg: &AppConfig) -> Strategy {
    if visual {
        Strategy::Visual
    } else {
        cfg.locator.strategy
    }
}

async fn run(args: Args) -> SeeDroidResult<()> {
    let cfg = load(&args);

    match args.command {
        Command::Compile { yaml, output } => {
            let script = ScriptCompiler::from_config(&cfg.script).convert_file(&yaml, output.as_deref())?;
            if output.is_none() {
                println!("{script}");
            }
        }
        Command::Click { description, visual } => {
            let registry = ProviderRegistry::from_config(&cfg);
            let device = Arc::new(AdbSession::from_config(&cfg.device));
            let resolver = ElementResolver::new(
                device.clone(),
                registry.classifier(Role::Locator)?,
                Arc::new(TokioClock::new()),
                cfg.locator.clone(),
            );
            let (x, y) = resolver.locate(&description, strategy(visual, &cfg)).await?;
            device.tap(x, y).await?;
            println!("tapped '{description}' at ({x}, {y})");
        }
        Command::Do {
            instruction,
            visual,
            report,
        } => {
            let registry = ProviderRegistry::from_config(&cfg);
            let device = Arc::new(AdbSession::from_config(&cfg.device));
            let mut executor = InstructionExecutor::from_config(
                &cfg,
                device,
                registry.role_classifiers()?,
                Arc::new(TokioClock::new()),
            )
            .with_strategy(strategy(visual, &cfg));

            let result = executor.execute(&instruction).await?;
            if let Some(path) = report {
                result.append_jsonl(&path)?;
            }
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    seedroid::init_tracing();

    match run(Args::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
