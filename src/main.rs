mod config;
mod persona;
mod pipeline;
mod source;
mod types;
mod writer;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::BuildConfig;

/// Fine-tuning dataset builder for persona generation.
/// Samples persona records, renders each into a character profile, and
/// writes instruct-formatted JSONL for supervised fine-tuning.
#[derive(Parser)]
#[command(name = "persona-sft")]
#[command(version = "0.1.0")]
#[command(about = "Build SFT training data from persona records")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample personas and write the training JSONL
    Build {
        /// YAML file with build settings; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,

        /// Persona JSONL file or directory of shards
        #[arg(long)]
        source: Option<PathBuf>,

        /// Shard-name prefix inside a directory source
        #[arg(long)]
        split: Option<String>,

        /// Number of examples to sample
        #[arg(long)]
        sample_size: Option<usize>,

        /// Random seed for sampling and prompt choice
        #[arg(long)]
        seed: Option<u64>,

        /// Output JSONL path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print statistics for a built JSONL file
    Stats {
        /// Path to the JSONL dataset file
        #[arg(long)]
        input: PathBuf,
    },
    /// Render the profile of a single source record
    Preview {
        /// Persona JSONL file or directory of shards
        #[arg(long)]
        source: PathBuf,

        #[arg(long, default_value = "train")]
        split: String,

        /// Row index in the source
        #[arg(long, default_value_t = 0)]
        index: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            config,
            source,
            split,
            sample_size,
            seed,
            output,
        } => {
            let mut build = match config {
                Some(path) => BuildConfig::load(&path)?,
                None => BuildConfig::default(),
            };
            if let Some(source) = source {
                build.source = source;
            }
            if let Some(split) = split {
                build.split = split;
            }
            if let Some(sample_size) = sample_size {
                build.sample_size = sample_size;
            }
            if let Some(seed) = seed {
                build.seed = seed;
            }
            if let Some(output) = output {
                build.output = output;
            }
            let report = pipeline::run(&build)?;
            info!(
                source_rows = report.source_rows,
                examples = report.stats.total_samples,
                sha256 = %report.output.sha256,
                "build complete"
            );
            Ok(())
        }
        Commands::Stats { input } => writer::print_file_stats(&input),
        Commands::Preview {
            source,
            split,
            index,
        } => {
            println!("{}", pipeline::preview_record(&source, &split, index)?);
            Ok(())
        }
    }
}
