//! Command-line interface for merkle_stream

use crate::config::GlobalConfig;
use crate::core::hash::{hash_function_by_name, HashFunction};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

pub mod commands;

/// merkle-stream - Binary merkle trees and inclusion proofs
#[derive(Parser)]
#[command(
    name = "merkle-stream",
    version,
    about = "Build binary merkle trees and verify inclusion proofs",
    long_about = "merkle-stream builds binary merkle trees in memory or by streaming levels through scratch files, and produces compact inclusion proofs for individual leaves."
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file (default: ~/.merkle-stream/config.toml)
    #[arg(long, global = true, env = "MERKLE_STREAM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Hash algorithm, overriding the config file
    #[arg(long, global = true)]
    pub algorithm: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a tree and print its root
    Build {
        /// Leaf input file
        #[arg(short, long)]
        input: PathBuf,

        /// How leaves are stored in the input file
        #[arg(long, value_enum, default_value = "lines")]
        format: InputFormat,

        /// Keep every level in memory instead of streaming
        #[arg(long, conflicts_with = "cache")]
        in_memory: bool,

        /// Write a level cache to this path
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Number of top levels to cache (default from config)
        #[arg(long, requires = "cache")]
        cache_levels: Option<u32>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate an inclusion proof for one leaf
    Prove {
        /// Leaf input file
        #[arg(short, long)]
        input: PathBuf,

        /// How leaves are stored in the input file
        #[arg(long, value_enum, default_value = "lines")]
        format: InputFormat,

        /// Zero-based leaf index
        #[arg(long)]
        index: u64,

        /// Declared leaf count (counted from the input when omitted)
        #[arg(long)]
        leaf_count: Option<u64>,

        /// Level cache produced by `build --cache`
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Where to write the encoded proof
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify an encoded proof against a root hash
    Verify {
        /// Encoded proof file
        #[arg(long)]
        proof: PathBuf,

        /// Expected root hash (hex)
        #[arg(long)]
        root: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the contents of a level cache file
    InspectCache {
        /// Level cache file
        #[arg(long)]
        cache: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Leaf encoding of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// One leaf per line
    Lines,
    /// Length-prefixed binary records
    Records,
}

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: GlobalConfig,
    pub hash_fn: Arc<dyn HashFunction>,
}

impl GlobalOptions {
    /// Load the config file and resolve the hash algorithm
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = match &cli.config {
            Some(path) => GlobalConfig::load_from(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => GlobalConfig::load().context("Failed to load config")?,
        };

        let hash_fn = match &cli.algorithm {
            Some(name) => hash_function_by_name(name)?,
            None => config.hash_function()?,
        };

        Ok(Self { config, hash_fn })
    }
}
