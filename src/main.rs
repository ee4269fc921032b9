mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sector_impact::config::ImpactConfig;

#[derive(Parser)]
#[command(name = "sector-impact", version, about = "Predict market-sector impact from news headlines")]
struct Cli {
    /// Config file (default: ~/.sector-impact/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train sector models, the event impact model, and the embedding cache
    Train {
        /// Labeled corpus JSON (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Predict sector impact for a batch of headlines and write result.json
    Predict {
        /// CSV with a `Title` column (overrides config)
        #[arg(long, conflicts_with = "event")]
        csv: Option<PathBuf>,
        /// Score these headlines instead of reading a CSV
        #[arg(long)]
        event: Vec<String>,
        /// Result file (overrides config)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Print the result without writing it
        #[arg(long)]
        no_save: bool,
        /// Fail instead of training when artifacts are missing
        #[arg(long)]
        no_auto_train: bool,
    },
    /// Report on trained artifacts and the embedding cache
    Doctor,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the DistilBERT ONNX model to ~/.sector-impact/encoder/
    Download,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        println!("Error: {err:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => ImpactConfig::load_from(path)?,
        None => ImpactConfig::load()?,
    };

    // Log to stderr so stdout carries only status lines.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Train { corpus } => {
            let mut config = config;
            if let Some(path) = corpus {
                config.paths.corpus = path.to_string_lossy().into_owned();
            }
            tokio::task::spawn_blocking(move || cli::train::train(&config)).await??;
        }
        Command::Predict {
            csv,
            event,
            output,
            no_save,
            no_auto_train,
        } => {
            let options = cli::predict::PredictOptions {
                csv,
                events: event,
                output,
                save: !no_save,
                auto_train: !no_auto_train,
            };
            tokio::task::spawn_blocking(move || cli::predict::predict(&config, options)).await??;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
