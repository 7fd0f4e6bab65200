//! Prove command implementation

use crate::cache::LevelCache;
use crate::cli::commands::{count_leaves, open_leaf_source};
use crate::cli::{GlobalOptions, InputFormat};
use crate::tree::StreamingTreeEngine;
use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

/// Execute the prove command
pub fn execute(
    options: &GlobalOptions,
    input: PathBuf,
    format: InputFormat,
    index: u64,
    leaf_count: Option<u64>,
    cache: Option<PathBuf>,
    output: PathBuf,
) -> Result<()> {
    let source = open_leaf_source(&input, format, options.config.streaming.io_buffer_size)?;
    let leaf_count = match leaf_count {
        Some(count) => count,
        None => count_leaves(source.as_ref())?,
    };

    let level_cache = cache
        .as_ref()
        .map(|path| {
            LevelCache::load(path)
                .with_context(|| format!("Failed to load level cache {}", path.display()))
        })
        .transpose()?;

    let engine =
        StreamingTreeEngine::with_config(options.hash_fn.clone(), options.config.streaming.clone());
    let proof = engine
        .generate_proof(source.as_ref(), index, leaf_count, level_cache.as_ref())
        .with_context(|| format!("Failed to generate proof for leaf {}", index))?;
    proof
        .save(&output)
        .with_context(|| format!("Failed to write proof to {}", output.display()))?;

    println!("{}", "✓ Proof generated successfully!".green());
    println!("  {}: {} of {}", "Leaf".bold(), index, leaf_count);
    println!("  {}: {}", "Height".bold(), proof.tree_height());
    println!(
        "  {}: {}",
        "Root".bold(),
        proof.computed_root(options.hash_fn.as_ref()).to_hex().cyan()
    );
    println!("  {}: {}", "Output".bold(), output.display());

    Ok(())
}
