//! Verify command implementation

use crate::cli::GlobalOptions;
use crate::core::types::HashValue;
use crate::proofs::MerkleProof;
use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::path::PathBuf;

/// Execute the verify command
///
/// Fails when the proof does not lead to `root`, so scripts can rely on
/// the exit status.
pub fn execute(options: &GlobalOptions, proof: PathBuf, root: String, json: bool) -> Result<()> {
    let expected_root =
        HashValue::from_hex(&root).with_context(|| format!("Invalid root hash: {}", root))?;
    let merkle_proof = MerkleProof::load(&proof)
        .with_context(|| format!("Failed to read proof {}", proof.display()))?;

    let valid = merkle_proof.verify(&expected_root, options.hash_fn.as_ref())?;

    if json {
        let output = json!({
            "valid": valid,
            "leaf_index": merkle_proof.leaf_index(),
            "tree_height": merkle_proof.tree_height(),
            "leaf_value": hex::encode(merkle_proof.leaf_value()),
            "root": expected_root.to_hex(),
            "algorithm": options.hash_fn.name(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if valid {
        println!("{}", "✓ Proof verified successfully!".green());
        println!("  {}: {}", "Leaf".bold(), merkle_proof.leaf_index());
        println!("  {}: {}", "Height".bold(), merkle_proof.tree_height());
        println!("  {}: {}", "Root".bold(), expected_root.to_hex().cyan());
    } else {
        println!("{}", "✗ Proof verification failed".red());
    }

    if !valid {
        anyhow::bail!("Proof does not lead to root {}", expected_root);
    }
    Ok(())
}
