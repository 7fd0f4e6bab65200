//! Inspect-cache command implementation

use crate::cache::LevelCache;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

/// Execute the inspect-cache command
pub fn execute(cache: PathBuf, json: bool) -> Result<()> {
    let level_cache = LevelCache::load(&cache)
        .with_context(|| format!("Failed to load level cache {}", cache.display()))?;
    let metadata = level_cache.metadata();

    if json {
        let levels: Vec<_> = level_cache
            .data()
            .iter()
            .map(|(level, hashes)| json!({ "level": level, "nodes": hashes.node_count() }))
            .collect();
        let output = json!({
            "algorithm": metadata.algorithm(),
            "hash_size": metadata.hash_size(),
            "tree_height": metadata.tree_height(),
            "start_level": metadata.start_level(),
            "end_level": metadata.end_level(),
            "levels": levels,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Level Cache".green().bold());
    println!("{}", "═".repeat(50).green());
    println!("{}: {}", "Algorithm".bold(), metadata.algorithm());
    println!("{}: {} bytes", "Hash Size".bold(), metadata.hash_size());
    println!("{}: {}", "Tree Height".bold(), metadata.tree_height());
    println!(
        "{}: [{}, {}]",
        "Level Range".bold(),
        metadata.start_level(),
        metadata.end_level()
    );
    if level_cache.data().is_empty() {
        println!("  {}", "no cached levels".dimmed());
    }
    for (level, hashes) in level_cache.data().iter() {
        println!(
            "  {} {:>4}: {} nodes",
            "→".cyan(),
            level,
            hashes.node_count()
        );
    }

    Ok(())
}
