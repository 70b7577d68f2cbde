mod config;
mod pipeline;
pub mod results;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::TrainOverrides;
use pipeline::{RankArgs, TrainArgs, TrainCandgenArgs};

/// percrank: perceptron reranker for t-tree sentence planning.
#[derive(Parser)]
#[command(name = "percrank", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// CLI subcommands for candidate generator training, ranker training and scoring.
#[derive(Subcommand)]
enum Command {
    /// Build the candidate generator's node inventory from a corpus.
    TrainCandgen {
        /// Path to the dialogue act file, one DA per line.
        #[arg(long)]
        das: PathBuf,
        /// Path to the t-tree JSON document.
        #[arg(long)]
        ttrees: PathBuf,
        /// Path for the candidate generator model JSON.
        #[arg(long)]
        output: PathBuf,
        /// Language of the t-tree zone to read.
        #[arg(long, default_value = "en")]
        language: String,
        /// Selector of the t-tree zone to read.
        #[arg(long, default_value = "")]
        selector: String,
    },
    /// Train a perceptron ranker.
    Train {
        /// Path to percrank config TOML file.
        #[arg(long, default_value = "configs/percrank.toml")]
        config: PathBuf,
        /// Path to the dialogue act file, one DA per line.
        #[arg(long)]
        das: PathBuf,
        /// Path to the t-tree JSON document.
        #[arg(long)]
        ttrees: PathBuf,
        /// Path for the trained ranker snapshot.
        #[arg(long)]
        output: PathBuf,
        /// Override the fraction of the corpus used for training.
        #[arg(long)]
        data_portion: Option<f64>,
        /// Override the candidate generator model path.
        #[arg(long)]
        candgen_model: Option<PathBuf>,
        /// Override the number of passes.
        #[arg(long)]
        passes: Option<usize>,
        /// Override the random seed.
        #[arg(long)]
        seed: Option<u64>,
        /// Write per-pass statistics as JSON to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Score every DA/t-tree pair of a corpus with a trained ranker.
    Rank {
        /// Path to the trained ranker snapshot.
        #[arg(long)]
        model: PathBuf,
        /// Path to the dialogue act file, one DA per line.
        #[arg(long)]
        das: PathBuf,
        /// Path to the t-tree JSON document.
        #[arg(long)]
        ttrees: PathBuf,
        /// JSONL output path. Defaults to stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::TrainCandgen {
            das,
            ttrees,
            output,
            language,
            selector,
        } => pipeline::run_train_candgen(TrainCandgenArgs {
            das,
            ttrees,
            output,
            language,
            selector,
        }),
        Command::Train {
            config,
            das,
            ttrees,
            output,
            data_portion,
            candgen_model,
            passes,
            seed,
            report,
        } => pipeline::run_train(TrainArgs {
            config,
            das,
            ttrees,
            output,
            overrides: TrainOverrides {
                passes,
                seed,
                candgen_model,
                data_portion,
            },
            report,
        }),
        Command::Rank {
            model,
            das,
            ttrees,
            output,
        } => pipeline::run_rank(RankArgs {
            model,
            das,
            ttrees,
            output,
        }),
    }
}
