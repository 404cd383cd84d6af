use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use beatcut::{
    assembly::{AssemblyInput, AssemblyOrchestrator, CancellationToken, ProgressReporter},
    config::Config,
    render::FfmpegRenderer,
};

#[derive(Parser)]
#[command(
    name = "beatcut",
    version,
    about = "Assemble generated clips into a music-synchronized video",
    long_about = "beatcut snaps planned shots to the beats of a music track, picks transitions from the music's energy, renders the timeline with ffmpeg and scores the result."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for transition selection, for reproducible runs
    #[arg(short, long, global = true)]
    seed: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Sync shots and derive transitions without rendering; prints the plan as JSON
    Plan {
        /// Input JSON with scenes, beats, exportOptions and audioRef
        input: PathBuf,
    },

    /// Run the full pipeline and print the quality report as JSON
    Assemble {
        /// Input JSON with scenes, beats, exportOptions and audioRef
        input: PathBuf,

        /// Output video file path
        #[arg(short, long)]
        output: PathBuf,

        /// Write the quality report here instead of stdout
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Write the default configuration to a TOML file
    InitConfig {
        /// Destination path
        #[arg(default_value = "beatcut.toml")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean JSON
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    info!("Starting beatcut v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    match cli.command {
        Command::Plan { input } => {
            let input = load_input(&input)?;
            let orchestrator = build_orchestrator(config, cli.seed);
            let plan = orchestrator.plan(&input, &ProgressReporter::disabled(), &CancellationToken::new())?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        Command::Assemble { input, output, report } => {
            let mut input = load_input(&input)?;
            input.output_ref = Some(output.display().to_string());

            let orchestrator = build_orchestrator(config, cli.seed);
            let (progress, mut updates) = ProgressReporter::channel();
            let cancel = CancellationToken::new();

            let printer = tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    info!("[{:>5.1}%] {}", update.fraction * 100.0, update.stage);
                }
            });

            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling...");
                    ctrl_c.cancel();
                }
            });

            let result = orchestrator.assemble(&input, &progress, &cancel).await;
            drop(progress);
            let _ = printer.await;

            let outcome = result.map_err(|e| anyhow::anyhow!(e.user_message()).context("Assembly failed"))?;
            let json = serde_json::to_string_pretty(&outcome.report)?;
            match report {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write report to {:?}", path))?;
                    info!("Report saved to: {:?}", path);
                }
                None => println!("{}", json),
            }

            info!("Assembly complete! Output saved to: {:?}", output);
        }
        Command::InitConfig { path } => {
            Config::default().save_to_file(&path)?;
            info!("Default configuration written to {:?}", path);
        }
    }

    Ok(())
}

fn build_orchestrator(config: Config, seed: Option<u64>) -> AssemblyOrchestrator {
    let renderer = FfmpegRenderer::new(config.render.clone());
    let orchestrator = AssemblyOrchestrator::new(config, Box::new(renderer));
    match seed {
        Some(seed) => orchestrator.with_seed(seed),
        None => orchestrator,
    }
}

fn load_input(path: &Path) -> Result<AssemblyInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse input file {:?}", path))
}
