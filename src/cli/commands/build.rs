//! Build command implementation

use crate::cli::commands::open_leaf_source;
use crate::cli::{GlobalOptions, InputFormat};
use crate::core::types::TreeMetadata;
use crate::tree::{InMemoryTreeEngine, StreamingTreeEngine};
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

/// Execute the build command
pub fn execute(
    options: &GlobalOptions,
    input: PathBuf,
    format: InputFormat,
    in_memory: bool,
    cache: Option<PathBuf>,
    cache_levels: Option<u32>,
    json: bool,
) -> Result<()> {
    let source = open_leaf_source(&input, format, options.config.streaming.io_buffer_size)?;

    let (metadata, cache_written) = if in_memory {
        let tree = InMemoryTreeEngine::new(options.hash_fn.clone())
            .build_from_source(source.as_ref())
            .with_context(|| format!("Failed to build tree from {}", input.display()))?;
        (tree.metadata(), false)
    } else {
        let engine = StreamingTreeEngine::with_config(
            options.hash_fn.clone(),
            options.config.streaming.clone(),
        );
        match &cache {
            Some(cache_path) => {
                let levels = cache_levels.unwrap_or(options.config.streaming.cache_top_levels);
                if levels == 0 {
                    anyhow::bail!(
                        "--cache needs --cache-levels or streaming.cache_top_levels in the config"
                    );
                }
                engine
                    .build_with_level_cache(source.as_ref(), levels, cache_path)
                    .with_context(|| format!("Failed to build tree from {}", input.display()))?
            }
            None => (
                engine
                    .build(source.as_ref())
                    .with_context(|| format!("Failed to build tree from {}", input.display()))?,
                false,
            ),
        }
    };

    let cache_path = cache.filter(|_| cache_written);
    if json {
        let output = json!({
            "root": metadata.root.to_hex(),
            "height": metadata.height,
            "leaf_count": metadata.leaf_count,
            "algorithm": metadata.algorithm,
            "cache": cache_path.as_ref().map(|p| p.display().to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        show_tree_human(&metadata, cache_path.as_deref());
    }

    Ok(())
}

fn show_tree_human(metadata: &TreeMetadata, cache_path: Option<&std::path::Path>) {
    println!("{}", "Merkle Tree".green().bold());
    println!("{}", "═".repeat(50).green());
    println!("{}: {}", "Root Hash".bold(), metadata.root.to_hex().cyan());
    println!("{}: {}", "Height".bold(), metadata.height);
    println!("{}: {}", "Leaves".bold(), metadata.leaf_count);
    println!("{}: {}", "Algorithm".bold(), metadata.algorithm);
    match cache_path {
        Some(path) => println!("{}: {}", "Level Cache".bold(), path.display()),
        None => println!("{}: {}", "Level Cache".bold(), "none".dimmed()),
    }
}
