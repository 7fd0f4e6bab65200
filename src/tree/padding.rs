//! Hashing and padding rules shared by every tree builder
//!
//! Both engines must produce identical roots for the same leaves, so all of
//! the node hashing and level arithmetic lives here.

use crate::core::hash::HashFunction;
use crate::core::types::HashValue;

/// Domain tag prefixed to a node hash to synthesize its padding sibling
pub const PADDING_DOMAIN_TAG: &[u8] = b"MERKLE_PADDING";

/// Node hashing bound to one hash function
#[derive(Clone, Copy)]
pub struct PaddingCore<'a> {
    hash_fn: &'a dyn HashFunction,
}

impl<'a> PaddingCore<'a> {
    pub fn new(hash_fn: &'a dyn HashFunction) -> Self {
        Self { hash_fn }
    }

    pub fn hash_fn(&self) -> &'a dyn HashFunction {
        self.hash_fn
    }

    /// Digest of one leaf's bytes: `Hash(data)`
    pub fn leaf_hash(&self, data: &[u8]) -> HashValue {
        self.hash_fn.compute(data)
    }

    /// `Hash(left ‖ right)`
    pub fn parent_hash(&self, left: &HashValue, right: &HashValue) -> HashValue {
        self.hash_fn
            .compute_concat(&[left.as_bytes(), right.as_bytes()])
    }

    /// `Hash("MERKLE_PADDING" ‖ node)`
    pub fn padding_hash(&self, node: &HashValue) -> HashValue {
        self.hash_fn
            .compute_concat(&[PADDING_DOMAIN_TAG, node.as_bytes()])
    }

    /// Parent of `left` and its right sibling
    ///
    /// A missing right sibling means `left` is the trailing node of an odd
    /// level; its padding hash stands in as the right child.
    pub fn pair(&self, left: &HashValue, right: Option<&HashValue>) -> HashValue {
        match right {
            Some(right) => self.parent_hash(left, right),
            None => self.parent_hash(left, &self.padding_hash(left)),
        }
    }
}

/// Node count of the level above a level of `size` nodes
pub fn next_level_size(size: u64) -> u64 {
    size / 2 + size % 2
}

/// Number of pairing rounds needed to reduce `leaf_count` leaves to one root
pub fn tree_height(leaf_count: u64) -> u32 {
    let mut size = leaf_count;
    let mut height = 0;
    while size > 1 {
        size = next_level_size(size);
        height += 1;
    }
    height
}

/// Node count at `level` of a tree over `leaf_count` leaves
pub fn level_size(leaf_count: u64, level: u32) -> u64 {
    (0..level).fold(leaf_count, |size, _| next_level_size(size))
}

/// Position of the node paired with `index` on the same level
pub fn sibling_index(index: u64) -> u64 {
    index ^ 1
}

/// Whether the sibling of the node at `index` is the right operand
pub fn sibling_is_right(index: u64) -> bool {
    index % 2 == 0
}
