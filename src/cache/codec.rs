//! Binary encoding of [`LevelCache`]
//!
//! ```text
//! "MKTC" | version(1) | tree_height(4) | name_len(4) | name (UTF-8)
//! | hash_size(4) | start_level(4) | end_level(4) | level_count(4)
//! | { level(4) | node_count(8) | node_count * hash_size bytes }*
//! ```
//!
//! Levels are written in ascending order, which makes the encoding canonical.

use crate::cache::level_cache::{CacheData, CacheMetadata, LevelCache, LevelHashes};
use crate::core::error::{MerkleError, Result};
use crate::core::wire::{write_len, write_u63, WireReader};
use std::path::Path;
use tracing::debug;

/// Magic bytes for the level cache format
pub const CACHE_MAGIC: &[u8; 4] = b"MKTC";
pub const CACHE_FORMAT_VERSION: u8 = 1;

const FORMAT: &str = "level cache";

impl LevelCache {
    /// Serialize to the canonical binary format
    pub fn encode(&self) -> Result<Vec<u8>> {
        let metadata = self.metadata();
        let mut buffer = Vec::new();

        buffer.extend_from_slice(CACHE_MAGIC);
        buffer.push(CACHE_FORMAT_VERSION);
        write_len(&mut buffer, metadata.tree_height() as usize, "tree height")?;
        write_len(&mut buffer, metadata.algorithm().len(), "name length")?;
        buffer.extend_from_slice(metadata.algorithm().as_bytes());
        write_len(&mut buffer, metadata.hash_size(), "hash size")?;
        write_len(&mut buffer, metadata.start_level() as usize, "start level")?;
        write_len(&mut buffer, metadata.end_level() as usize, "end level")?;
        write_len(&mut buffer, self.data().len(), "level count")?;

        for (level, hashes) in self.data().iter() {
            write_len(&mut buffer, level as usize, "level number")?;
            write_u63(&mut buffer, hashes.node_count(), "node count")?;
            buffer.extend_from_slice(hashes.as_bytes());
        }
        Ok(buffer)
    }

    /// Parse the binary format, validating every declared length
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, FORMAT);

        let magic = reader.read_bytes(CACHE_MAGIC.len(), "magic")?;
        if magic != CACHE_MAGIC {
            return Err(reader.malformed("invalid magic bytes"));
        }

        let version = reader.read_u8("version")?;
        if version != CACHE_FORMAT_VERSION {
            return Err(MerkleError::UnsupportedVersion {
                format: FORMAT.to_string(),
                version: version as u32,
                supported: CACHE_FORMAT_VERSION as u32,
            });
        }

        let tree_height = reader.read_len("tree height")? as u32;
        let name_len = reader.read_len("name length")?;
        let name = std::str::from_utf8(reader.read_bytes(name_len, "hash function name")?)
            .map_err(|_| reader.malformed("hash function name is not UTF-8"))?
            .to_string();
        let hash_size = reader.read_len("hash size")?;
        let start_level = reader.read_len("start level")? as u32;
        let end_level = reader.read_len("end level")? as u32;

        let metadata = CacheMetadata::new(name, hash_size, tree_height, start_level, end_level)
            .map_err(|e| reader.malformed(e.to_string()))?;

        let level_count = reader.read_len("level count")?;
        let range_len = (end_level - start_level) as usize + 1;
        if level_count > range_len {
            return Err(reader.malformed(format!(
                "{} levels declared for a range of {}",
                level_count, range_len
            )));
        }

        let mut data = CacheData::new();
        let mut previous: Option<u32> = None;
        for _ in 0..level_count {
            let level = reader.read_len("level number")? as u32;
            if !metadata.covers(level) {
                return Err(reader.malformed(format!(
                    "level {} outside range [{}, {}]",
                    level, start_level, end_level
                )));
            }
            if previous.map_or(false, |prev| level <= prev) {
                return Err(reader.malformed("levels are not in strictly ascending order"));
            }
            previous = Some(level);

            let node_count = reader.read_u63("node count")?;
            let byte_len = usize::try_from(node_count)
                .ok()
                .and_then(|count| count.checked_mul(hash_size))
                .ok_or_else(|| reader.malformed(format!("node count {} overflows", node_count)))?;
            let nodes = reader.read_bytes(byte_len, "level nodes")?.to_vec();
            data.insert(level, LevelHashes::from_bytes(hash_size, nodes)?);
        }
        reader.finish()?;

        LevelCache::new(metadata, data).map_err(|e| MerkleError::invalid_format(FORMAT, e.to_string()))
    }

    /// Persist the encoded cache to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        std::fs::write(path, &bytes).map_err(|e| MerkleError::file_io(path, e))?;
        debug!(
            path = %path.display(),
            bytes = bytes.len(),
            levels = self.data().len(),
            "saved level cache"
        );
        Ok(())
    }

    /// Read and decode a cache from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| MerkleError::file_io(path, e))?;
        Self::decode(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::HashValue;
    use tempfile::TempDir;

    fn sample_cache() -> LevelCache {
        // 5 leaves: level sizes 5, 3, 2, 1
        let metadata = CacheMetadata::new("SHA-256", 32, 3, 1, 2).unwrap();
        let mut data = CacheData::new();
        for (level, count) in [(1u32, 3u8), (2, 2)] {
            let mut hashes = LevelHashes::new(32);
            for i in 0..count {
                hashes
                    .push(&HashValue::from_bytes(vec![level as u8 * 16 + i; 32]))
                    .unwrap();
            }
            data.insert(level, hashes);
        }
        LevelCache::new(metadata, data).unwrap()
    }

    #[test]
    fn test_layout() {
        let bytes = sample_cache().encode().unwrap();
        assert_eq!(&bytes[..4], b"MKTC");
        assert_eq!(bytes[4], CACHE_FORMAT_VERSION);
        assert_eq!(&bytes[5..9], &3i32.to_le_bytes());
        assert_eq!(&bytes[9..13], &7i32.to_le_bytes());
        assert_eq!(&bytes[13..20], b"SHA-256");
        // header + two level entries
        assert_eq!(bytes.len(), 20 + 16 + (12 + 3 * 32) + (12 + 2 * 32));
    }

    #[test]
    fn test_reencode_is_byte_identical() {
        let cache = sample_cache();
        let bytes = cache.encode().unwrap();
        let decoded = LevelCache::decode(&bytes).unwrap();
        assert_eq!(decoded, cache);
        assert_eq!(decoded.encode().unwrap(), bytes);
    }

    #[test]
    fn test_rejects_bad_magic_and_version() {
        let mut bytes = sample_cache().encode().unwrap();
        bytes[0] = b'X';
        assert!(LevelCache::decode(&bytes).unwrap_err().is_malformed_data());

        let mut bytes = sample_cache().encode().unwrap();
        bytes[4] = 9;
        assert!(matches!(
            LevelCache::decode(&bytes),
            Err(MerkleError::UnsupportedVersion { version: 9, .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_and_trailing() {
        let bytes = sample_cache().encode().unwrap();
        for cut in [3, 20, 40, bytes.len() - 1] {
            assert!(LevelCache::decode(&bytes[..cut]).unwrap_err().is_malformed_data());
        }

        let mut extended = bytes;
        extended.extend_from_slice(&[0, 0]);
        assert!(LevelCache::decode(&extended).unwrap_err().is_malformed_data());
    }

    #[test]
    fn test_rejects_bad_level_range() {
        let mut bytes = sample_cache().encode().unwrap();
        // end level (offset 28) raised to the tree height
        bytes[28..32].copy_from_slice(&3i32.to_le_bytes());
        assert!(LevelCache::decode(&bytes).unwrap_err().is_malformed_data());
    }

    #[test]
    fn test_rejects_inflated_node_count() {
        let mut bytes = sample_cache().encode().unwrap();
        // first level entry starts at 36; node count follows the level number
        bytes[40..48].copy_from_slice(&(i64::MAX).to_le_bytes());
        assert!(LevelCache::decode(&bytes).unwrap_err().is_malformed_data());
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("levels.mktc");
        let cache = sample_cache();
        cache.save(&path)?;
        assert_eq!(LevelCache::load(&path)?, cache);
        Ok(())
    }
}
