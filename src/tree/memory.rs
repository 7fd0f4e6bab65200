//! Fully materialized merkle tree
//!
//! Every level is kept in memory as a flat vector, so the parent of node
//! `(level, i)` is `(level + 1, i / 2)` and any sibling lookup is O(1).

use crate::core::error::{MerkleError, Result};
use crate::core::hash::HashFunction;
use crate::core::types::{HashValue, LeafRecord, TreeMetadata};
use crate::proofs::MerkleProof;
use crate::tree::padding::{sibling_index, sibling_is_right, PaddingCore};
use crate::tree::source::LeafSource;
use std::sync::Arc;
use tracing::debug;

/// Builds [`MerkleTree`]s from leaves held in memory
#[derive(Debug, Clone)]
pub struct InMemoryTreeEngine {
    hash_fn: Arc<dyn HashFunction>,
}

impl InMemoryTreeEngine {
    pub fn new(hash_fn: Arc<dyn HashFunction>) -> Self {
        Self { hash_fn }
    }

    pub fn hash_function(&self) -> &Arc<dyn HashFunction> {
        &self.hash_fn
    }

    /// Build a tree over `leaves`, which must not be empty
    pub fn build<T: AsRef<[u8]>>(&self, leaves: &[T]) -> Result<MerkleTree> {
        if leaves.is_empty() {
            return Err(MerkleError::invalid_argument(
                "cannot build a merkle tree from an empty leaf list",
            ));
        }

        let records = leaves
            .iter()
            .enumerate()
            .map(|(i, leaf)| LeafRecord::new(i as u64, leaf.as_ref()))
            .collect();
        Ok(self.build_records(records))
    }

    /// Collect every leaf of `source` and build a tree over them
    pub fn build_from_source<S: LeafSource + ?Sized>(&self, source: &S) -> Result<MerkleTree> {
        let mut records = Vec::new();
        for (i, leaf) in source.open()?.enumerate() {
            records.push(LeafRecord::new(i as u64, leaf?));
        }
        if records.is_empty() {
            return Err(MerkleError::EmptyLeafSource);
        }
        Ok(self.build_records(records))
    }

    fn build_records(&self, leaves: Vec<LeafRecord>) -> MerkleTree {
        let core = PaddingCore::new(self.hash_fn.as_ref());

        let mut levels = vec![leaves
            .iter()
            .map(|leaf| core.leaf_hash(&leaf.data))
            .collect::<Vec<_>>()];

        loop {
            let current = &levels[levels.len() - 1];
            if current.len() <= 1 {
                break;
            }
            let next: Vec<HashValue> = current
                .chunks(2)
                .map(|pair| core.pair(&pair[0], pair.get(1)))
                .collect();
            levels.push(next);
        }

        debug!(
            leaves = leaves.len(),
            height = levels.len() - 1,
            "built in-memory merkle tree"
        );

        MerkleTree {
            hash_fn: Arc::clone(&self.hash_fn),
            leaves,
            levels,
        }
    }
}

/// Immutable merkle tree with every level materialized
#[derive(Debug, Clone)]
pub struct MerkleTree {
    hash_fn: Arc<dyn HashFunction>,
    leaves: Vec<LeafRecord>,
    /// Level 0 holds the leaf hashes, the last level holds only the root
    levels: Vec<Vec<HashValue>>,
}

impl MerkleTree {
    pub fn root(&self) -> &HashValue {
        // build_records never produces an empty level
        &self.levels[self.levels.len() - 1][0]
    }

    pub fn height(&self) -> u32 {
        (self.levels.len() - 1) as u32
    }

    pub fn leaf_count(&self) -> u64 {
        self.leaves.len() as u64
    }

    pub fn leaves(&self) -> &[LeafRecord] {
        &self.leaves
    }

    pub fn hash_function(&self) -> &Arc<dyn HashFunction> {
        &self.hash_fn
    }

    /// All node hashes of `level`, leaves first
    pub fn level(&self, level: u32) -> Option<&[HashValue]> {
        self.levels.get(level as usize).map(Vec::as_slice)
    }

    pub fn node(&self, level: u32, index: u64) -> Option<&HashValue> {
        self.level(level)?.get(usize::try_from(index).ok()?)
    }

    pub fn metadata(&self) -> TreeMetadata {
        TreeMetadata {
            root: self.root().clone(),
            height: self.height(),
            leaf_count: self.leaf_count(),
            algorithm: self.hash_fn.name().to_string(),
        }
    }

    /// Inclusion proof for the leaf at `index`
    pub fn generate_proof(&self, index: u64) -> Result<MerkleProof> {
        let leaf = usize::try_from(index)
            .ok()
            .and_then(|i| self.leaves.get(i))
            .ok_or_else(|| MerkleError::index_out_of_range(index, self.leaf_count()))?;

        let core = PaddingCore::new(self.hash_fn.as_ref());
        let height = self.height();
        let mut siblings = Vec::with_capacity(height as usize);
        let mut orientation = Vec::with_capacity(height as usize);

        let mut position = index as usize;
        for level in &self.levels[..height as usize] {
            let current = &level[position];
            let sibling = match level.get(sibling_index(position as u64) as usize) {
                Some(sibling) => sibling.clone(),
                None => core.padding_hash(current),
            };
            siblings.push(sibling);
            orientation.push(sibling_is_right(position as u64));
            position /= 2;
        }

        MerkleProof::new(leaf.data.clone(), index, height, siblings, orientation)
    }

    /// Generate and check a proof for `index` against this tree's root
    pub fn verify_leaf(&self, index: u64) -> Result<bool> {
        self.generate_proof(index)?
            .verify(self.root(), self.hash_fn.as_ref())
    }
}
