//! merkle-stream CLI
//!
//! Command-line interface for building merkle trees and working with proofs.

use anyhow::Result;
use clap::Parser;
use merkle_stream::cli::{self, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let options = cli::GlobalOptions::from_cli(&cli)?;

    // Execute the command
    match cli.command {
        Commands::Build {
            input,
            format,
            in_memory,
            cache,
            cache_levels,
            json,
        } => cli::commands::build::execute(
            &options,
            input,
            format,
            in_memory,
            cache,
            cache_levels,
            json,
        ),
        Commands::Prove {
            input,
            format,
            index,
            leaf_count,
            cache,
            output,
        } => cli::commands::prove::execute(
            &options, input, format, index, leaf_count, cache, output,
        ),
        Commands::Verify { proof, root, json } => {
            cli::commands::verify::execute(&options, proof, root, json)
        }
        Commands::InspectCache { cache, json } => {
            cli::commands::inspect_cache::execute(cache, json)
        }
    }
}
