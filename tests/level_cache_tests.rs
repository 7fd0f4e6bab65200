//! Level cache production and its effect on proof generation

use anyhow::Result;
use merkle_stream::cache::{CacheData, CacheMetadata, LevelHashes};
use merkle_stream::tree::source::LeafIter;
use merkle_stream::{
    sha256, sha384, ErrorCategory, InMemoryTreeEngine, LeafSource, LevelCache, MerkleError,
    StreamingTreeEngine,
};
use pretty_assertions::assert_eq;
use std::cell::Cell;
use tempfile::TempDir;

/// In-memory leaf source that counts every leaf it hands out
struct CountingSource {
    leaves: Vec<Vec<u8>>,
    reads: Cell<u64>,
}

impl CountingSource {
    fn new(count: usize) -> Self {
        Self {
            leaves: (0..count)
                .map(|i| format!("block {}", i).into_bytes())
                .collect(),
            reads: Cell::new(0),
        }
    }

    fn take_reads(&self) -> u64 {
        self.reads.replace(0)
    }
}

impl LeafSource for CountingSource {
    fn open(&self) -> merkle_stream::Result<LeafIter<'_>> {
        Ok(Box::new(self.leaves.iter().map(move |leaf| {
            self.reads.set(self.reads.get() + 1);
            Ok(leaf.clone())
        })))
    }
}

#[test]
fn test_build_reads_source_once() -> Result<()> {
    let source = CountingSource::new(1000);
    StreamingTreeEngine::new(sha256()).build_cached(&source, 4)?;
    assert_eq!(source.take_reads(), 1000);
    Ok(())
}

#[test]
fn test_cache_reduces_reads_with_identical_proofs() -> Result<()> {
    let count = 4096u64;
    let source = CountingSource::new(count as usize);
    let engine = StreamingTreeEngine::new(sha256());

    let (metadata, cache) = engine.build_cached(&source, 6)?;
    let cache = cache.expect("a 4096-leaf tree produces a cache");
    assert_eq!(metadata.height, 12);
    assert_eq!(cache.metadata().start_level(), 6);
    assert_eq!(cache.metadata().end_level(), 11);
    source.take_reads();

    for index in [0u64, 1234, 2049, 4095] {
        let uncached = engine.generate_proof(&source, index, count, None)?;
        let uncached_reads = source.take_reads();

        let cached = engine.generate_proof(&source, index, count, Some(&cache))?;
        let cached_reads = source.take_reads();

        assert_eq!(cached, uncached, "index {}", index);
        assert!(
            cached_reads < uncached_reads,
            "index {}: {} reads with cache, {} without",
            index,
            cached_reads,
            uncached_reads
        );
        assert!(cached.verify(&metadata.root, sha256().as_ref())?);
    }
    Ok(())
}

#[test]
fn test_cached_proofs_for_odd_tree() -> Result<()> {
    let count = 1000u64;
    let source = CountingSource::new(count as usize);
    let engine = StreamingTreeEngine::new(sha256());
    let (metadata, cache) = engine.build_cached(&source, 5)?;
    let cache = cache.expect("cache");

    let tree = InMemoryTreeEngine::new(sha256()).build(&source.leaves)?;
    assert_eq!(tree.root(), &metadata.root);

    for index in [0u64, 511, 512, 998, 999] {
        let proof = engine.generate_proof(&source, index, count, Some(&cache))?;
        assert_eq!(proof, tree.generate_proof(index)?);
    }
    Ok(())
}

#[test]
fn test_persisted_cache_round_trip() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache_path = temp_dir.path().join("tree.mktc");
    let source = CountingSource::new(300);
    let engine = StreamingTreeEngine::new(sha256());

    let (metadata, written) = engine.build_with_level_cache(&source, 3, &cache_path)?;
    assert!(written);

    let cache = LevelCache::load(&cache_path)?;
    assert_eq!(cache.metadata().algorithm(), "SHA-256");
    assert_eq!(cache.metadata().tree_height(), metadata.height);
    assert_eq!(cache.data().len(), 3);

    let proof = engine.generate_proof(&source, 150, 300, Some(&cache))?;
    assert!(proof.verify(&metadata.root, sha256().as_ref())?);
    Ok(())
}

#[test]
fn test_no_cache_when_disabled_or_trivial() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache_path = temp_dir.path().join("tree.mktc");
    let engine = StreamingTreeEngine::new(sha256());

    let (_, written) = engine.build_with_level_cache(&CountingSource::new(10), 0, &cache_path)?;
    assert!(!written);
    let (_, written) = engine.build_with_level_cache(&CountingSource::new(1), 4, &cache_path)?;
    assert!(!written);
    assert!(!cache_path.exists());
    Ok(())
}

#[test]
fn test_incompatible_cache_is_rejected() -> Result<()> {
    let source = CountingSource::new(64);
    let engine = StreamingTreeEngine::new(sha256());
    let (_, cache) = engine.build_cached(&source, 2)?;
    let cache = cache.expect("cache");

    // Different algorithm
    let err = StreamingTreeEngine::new(sha384())
        .generate_proof(&source, 3, 64, Some(&cache))
        .unwrap_err();
    assert!(matches!(err, MerkleError::IncompatibleCache { .. }));

    // Different tree shape
    let err = engine
        .generate_proof(&source, 3, 40, Some(&cache))
        .unwrap_err();
    assert_eq!(err.category(), ErrorCategory::InvalidArgument);
    Ok(())
}

#[test]
fn test_hand_built_partial_cache() -> Result<()> {
    // Only the topmost level cached; lower levels come from the source
    let source = CountingSource::new(20);
    let tree = InMemoryTreeEngine::new(sha256()).build(&source.leaves)?;
    let top = tree.height() - 1;

    let mut hashes = LevelHashes::new(32);
    for hash in tree.level(top).expect("level exists") {
        hashes.push(hash)?;
    }
    let mut data = CacheData::new();
    data.insert(top, hashes);
    let metadata = CacheMetadata::new("SHA-256", 32, tree.height(), top, top)?;
    let cache = LevelCache::new(metadata, data)?;

    let engine = StreamingTreeEngine::new(sha256());
    for index in 0..20 {
        let proof = engine.generate_proof(&source, index, 20, Some(&cache))?;
        assert_eq!(proof, tree.generate_proof(index)?);
    }
    Ok(())
}

#[test]
fn test_corrupt_cache_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let cache_path = temp_dir.path().join("tree.mktc");
    let engine = StreamingTreeEngine::new(sha256());
    engine.build_with_level_cache(&CountingSource::new(100), 2, &cache_path)?;

    let mut bytes = std::fs::read(&cache_path)?;
    bytes.truncate(bytes.len() - 5);
    std::fs::write(&cache_path, &bytes)?;

    let err = LevelCache::load(&cache_path).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::MalformedData);
    Ok(())
}
