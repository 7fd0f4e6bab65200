//! CLI command implementations

pub mod build;
pub mod inspect_cache;
pub mod prove;
pub mod verify;

// Common utilities for commands
use crate::cli::InputFormat;
use crate::tree::source::{LeafSource, LineFileSource, RecordFileSource};
use anyhow::{Context, Result};
use std::path::Path;

/// Open `input` as a leaf source in the given encoding
pub fn open_leaf_source(
    input: &Path,
    format: InputFormat,
    buffer_size: usize,
) -> Result<Box<dyn LeafSource>> {
    if !input.is_file() {
        anyhow::bail!("Input file not found: {}", input.display());
    }
    Ok(match format {
        InputFormat::Lines => Box::new(LineFileSource::new(input).with_buffer_size(buffer_size)),
        InputFormat::Records => {
            Box::new(RecordFileSource::new(input).with_buffer_size(buffer_size))
        }
    })
}

/// Count the leaves of `source` in one pass
pub fn count_leaves(source: &dyn LeafSource) -> Result<u64> {
    let mut count = 0u64;
    for leaf in source.open().context("Failed to open leaf source")? {
        leaf?;
        count += 1;
    }
    Ok(count)
}
