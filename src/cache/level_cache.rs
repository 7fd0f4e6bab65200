//! Persisted window of tree levels used to short-circuit proof generation

use crate::core::error::{MerkleError, Result};
use crate::core::hash::HashFunction;
use crate::core::types::HashValue;
use crate::tree::padding::{level_size, tree_height};
use std::collections::BTreeMap;

/// Identity and level range of a [`LevelCache`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMetadata {
    algorithm: String,
    hash_size: usize,
    tree_height: u32,
    start_level: u32,
    end_level: u32,
}

impl CacheMetadata {
    /// Validates `hash_size > 0` and `start <= end < height`
    /// (`start == end == 0` for a height-0 tree)
    pub fn new(
        algorithm: impl Into<String>,
        hash_size: usize,
        tree_height: u32,
        start_level: u32,
        end_level: u32,
    ) -> Result<Self> {
        let algorithm = algorithm.into();
        if algorithm.is_empty() {
            return Err(MerkleError::invalid_argument("cache algorithm name is empty"));
        }
        if hash_size == 0 {
            return Err(MerkleError::invalid_argument("cache hash size must be positive"));
        }
        if start_level > end_level {
            return Err(MerkleError::invalid_argument(format!(
                "cache start level {} exceeds end level {}",
                start_level, end_level
            )));
        }
        if tree_height == 0 {
            if end_level != 0 {
                return Err(MerkleError::invalid_argument(
                    "cache for a height-0 tree must use level range [0, 0]",
                ));
            }
        } else if end_level >= tree_height {
            return Err(MerkleError::invalid_argument(format!(
                "cache end level {} must be below tree height {}",
                end_level, tree_height
            )));
        }

        Ok(Self {
            algorithm,
            hash_size,
            tree_height,
            start_level,
            end_level,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn hash_size(&self) -> usize {
        self.hash_size
    }

    pub fn tree_height(&self) -> u32 {
        self.tree_height
    }

    pub fn start_level(&self) -> u32 {
        self.start_level
    }

    pub fn end_level(&self) -> u32 {
        self.end_level
    }

    /// Whether `level` lies within the inclusive level range
    pub fn covers(&self, level: u32) -> bool {
        self.tree_height > 0 && (self.start_level..=self.end_level).contains(&level)
    }
}

/// Node hashes of one level stored back to back with a fixed stride
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelHashes {
    hash_size: usize,
    bytes: Vec<u8>,
}

impl LevelHashes {
    pub fn new(hash_size: usize) -> Self {
        Self {
            hash_size,
            bytes: Vec::new(),
        }
    }

    /// Wrap raw node bytes; the length must be a multiple of `hash_size`
    pub fn from_bytes(hash_size: usize, bytes: Vec<u8>) -> Result<Self> {
        if hash_size == 0 || bytes.len() % hash_size != 0 {
            return Err(MerkleError::invalid_argument(format!(
                "{} bytes is not a whole number of {}-byte hashes",
                bytes.len(),
                hash_size
            )));
        }
        Ok(Self { hash_size, bytes })
    }

    pub fn push(&mut self, hash: &HashValue) -> Result<()> {
        if hash.len() != self.hash_size {
            return Err(MerkleError::invalid_argument(format!(
                "hash of {} bytes pushed into {}-byte level",
                hash.len(),
                self.hash_size
            )));
        }
        self.bytes.extend_from_slice(hash.as_bytes());
        Ok(())
    }

    pub fn node_count(&self) -> u64 {
        (self.bytes.len() / self.hash_size) as u64
    }

    /// O(1) lookup of the node at `index`
    pub fn get(&self, index: u64) -> Option<&[u8]> {
        let start = usize::try_from(index).ok()?.checked_mul(self.hash_size)?;
        let end = start.checked_add(self.hash_size)?;
        self.bytes.get(start..end)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Level number to node hashes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CacheData {
    levels: BTreeMap<u32, LevelHashes>,
}

impl CacheData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, level: u32, hashes: LevelHashes) {
        self.levels.insert(level, hashes);
    }

    pub fn level(&self, level: u32) -> Option<&LevelHashes> {
        self.levels.get(&level)
    }

    /// Levels in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &LevelHashes)> {
        self.levels.iter().map(|(level, hashes)| (*level, hashes))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn lowest_level(&self) -> Option<u32> {
        self.levels.keys().next().copied()
    }
}

/// Read-only window of tree levels for one tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCache {
    metadata: CacheMetadata,
    data: CacheData,
}

impl LevelCache {
    /// Every level in `data` must lie within the metadata range and use
    /// the metadata hash size
    pub fn new(metadata: CacheMetadata, data: CacheData) -> Result<Self> {
        for (level, hashes) in data.iter() {
            if !metadata.covers(level) {
                return Err(MerkleError::invalid_argument(format!(
                    "cached level {} outside range [{}, {}]",
                    level, metadata.start_level, metadata.end_level
                )));
            }
            if hashes.hash_size != metadata.hash_size {
                return Err(MerkleError::invalid_argument(format!(
                    "cached level {} uses {}-byte hashes, expected {}",
                    level, hashes.hash_size, metadata.hash_size
                )));
            }
        }
        Ok(Self { metadata, data })
    }

    pub fn metadata(&self) -> &CacheMetadata {
        &self.metadata
    }

    pub fn data(&self) -> &CacheData {
        &self.data
    }

    /// Cached node hash at `(level, index)`
    pub fn node(&self, level: u32, index: u64) -> Option<HashValue> {
        self.data
            .level(level)?
            .get(index)
            .map(HashValue::from_bytes)
    }

    /// Lowest level with cached nodes
    pub fn lowest_level(&self) -> Option<u32> {
        self.data.lowest_level()
    }

    /// Whether this cache was produced with `hash_fn`
    pub fn is_compatible_with(&self, hash_fn: &dyn HashFunction) -> bool {
        self.metadata.algorithm == hash_fn.name() && self.metadata.hash_size == hash_fn.hash_size()
    }

    /// Check that this cache describes the tree over `leaf_count` leaves
    /// built with `hash_fn`
    pub fn ensure_compatible(&self, hash_fn: &dyn HashFunction, leaf_count: u64) -> Result<()> {
        if !self.is_compatible_with(hash_fn) {
            return Err(MerkleError::incompatible_cache(format!(
                "cache built with {} ({} bytes), engine uses {} ({} bytes)",
                self.metadata.algorithm,
                self.metadata.hash_size,
                hash_fn.name(),
                hash_fn.hash_size()
            )));
        }

        let height = tree_height(leaf_count);
        if self.metadata.tree_height != height {
            return Err(MerkleError::incompatible_cache(format!(
                "cache describes a tree of height {}, {} leaves give height {}",
                self.metadata.tree_height, leaf_count, height
            )));
        }

        for (level, hashes) in self.data.iter() {
            let expected = level_size(leaf_count, level);
            if hashes.node_count() != expected {
                return Err(MerkleError::incompatible_cache(format!(
                    "cached level {} holds {} nodes, expected {}",
                    level,
                    hashes.node_count(),
                    expected
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::{sha256, sha512};

    fn level_of(hash_size: usize, count: u8) -> LevelHashes {
        let mut level = LevelHashes::new(hash_size);
        for i in 0..count {
            level.push(&HashValue::from_bytes(vec![i; hash_size])).unwrap();
        }
        level
    }

    #[test]
    fn test_metadata_validation() {
        assert!(CacheMetadata::new("SHA-256", 32, 4, 2, 3).is_ok());
        assert!(CacheMetadata::new("SHA-256", 32, 0, 0, 0).is_ok());
        assert!(CacheMetadata::new("SHA-256", 0, 4, 2, 3).is_err());
        assert!(CacheMetadata::new("SHA-256", 32, 4, 3, 2).is_err());
        assert!(CacheMetadata::new("SHA-256", 32, 4, 2, 4).is_err());
        assert!(CacheMetadata::new("SHA-256", 32, 0, 0, 1).is_err());
        assert!(CacheMetadata::new("", 32, 4, 2, 3).is_err());
    }

    #[test]
    fn test_level_lookup() {
        let level = level_of(32, 3);
        assert_eq!(level.node_count(), 3);
        assert_eq!(level.get(2), Some(&[2u8; 32][..]));
        assert_eq!(level.get(3), None);
        assert_eq!(level.get(u64::MAX), None);
    }

    #[test]
    fn test_level_rejects_wrong_size() {
        let mut level = LevelHashes::new(32);
        assert!(level.push(&HashValue::from_bytes(vec![0u8; 16])).is_err());
        assert!(LevelHashes::from_bytes(32, vec![0u8; 33]).is_err());
    }

    #[test]
    fn test_cache_rejects_out_of_range_level() {
        let metadata = CacheMetadata::new("SHA-256", 32, 3, 1, 2).unwrap();
        let mut data = CacheData::new();
        data.insert(0, level_of(32, 5));
        assert!(LevelCache::new(metadata, data).is_err());
    }

    #[test]
    fn test_compatibility_checks() {
        // 5 leaves: level sizes 5, 3, 2, 1
        let metadata = CacheMetadata::new("SHA-256", 32, 3, 1, 2).unwrap();
        let mut data = CacheData::new();
        data.insert(1, level_of(32, 3));
        data.insert(2, level_of(32, 2));
        let cache = LevelCache::new(metadata, data).unwrap();

        assert!(cache.is_compatible_with(sha256().as_ref()));
        assert!(!cache.is_compatible_with(sha512().as_ref()));
        assert!(cache.ensure_compatible(sha256().as_ref(), 5).is_ok());
        assert_eq!(cache.lowest_level(), Some(1));
        assert_eq!(cache.node(2, 1), Some(HashValue::from_bytes(vec![1u8; 32])));

        // Same height, different level sizes
        let err = cache.ensure_compatible(sha256().as_ref(), 7).unwrap_err();
        assert!(matches!(err, MerkleError::IncompatibleCache { .. }));

        // Different height
        assert!(cache.ensure_compatible(sha256().as_ref(), 16).is_err());
        assert!(cache.ensure_compatible(sha512().as_ref(), 5).is_err());
    }
}
