//! Disk-backed merkle tree construction that never holds a whole level in
//! memory
//!
//! Each level is written to a scratch file of length-prefixed hash records.
//! A reduction round reads the current level sequentially in pairs and
//! appends parents to the next level file, so only two level files and a
//! handful of hashes are live at any time. Proofs are answered later by
//! re-reading the leaf source and folding just the subtrees that hold the
//! required sibling hashes.

use crate::cache::{CacheData, CacheMetadata, LevelCache, LevelHashes};
use crate::config::StreamingConfig;
use crate::core::cancel::CancellationToken;
use crate::core::error::{MerkleError, Result};
use crate::core::hash::HashFunction;
use crate::core::types::{HashValue, TreeMetadata};
use crate::proofs::MerkleProof;
use crate::tree::padding::{
    level_size, sibling_index, sibling_is_right, tree_height, PaddingCore,
};
use crate::tree::source::{read_record, write_record, LeafSource};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Builds trees from leaf sources of any size using bounded memory
#[derive(Debug, Clone)]
pub struct StreamingTreeEngine {
    hash_fn: Arc<dyn HashFunction>,
    config: StreamingConfig,
    cancel: CancellationToken,
}

impl StreamingTreeEngine {
    pub fn new(hash_fn: Arc<dyn HashFunction>) -> Self {
        Self::with_config(hash_fn, StreamingConfig::default())
    }

    pub fn with_config(hash_fn: Arc<dyn HashFunction>, config: StreamingConfig) -> Self {
        Self {
            hash_fn,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Poll `token` at every leaf consumed and every pair reduced
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn hash_function(&self) -> &Arc<dyn HashFunction> {
        &self.hash_fn
    }

    pub fn config(&self) -> &StreamingConfig {
        &self.config
    }

    /// Stream `source` once and compute the tree's root, height and leaf count
    pub fn build<S: LeafSource + ?Sized>(&self, source: &S) -> Result<TreeMetadata> {
        let (metadata, _) = self.build_cached(source, 0)?;
        Ok(metadata)
    }

    /// Build and keep the top `top_levels` non-root levels as a [`LevelCache`]
    ///
    /// No cache is produced for a single-leaf tree or when `top_levels` is 0.
    pub fn build_cached<S: LeafSource + ?Sized>(
        &self,
        source: &S,
        top_levels: u32,
    ) -> Result<(TreeMetadata, Option<LevelCache>)> {
        self.config.validate()?;
        self.cancel.check()?;

        let scratch = ScratchSpace::create(self.config.scratch_dir.as_deref())?;
        let result = self.build_in(&scratch, source, top_levels);
        scratch.cleanup();
        result
    }

    /// Build and persist the top `top_levels` levels to `cache_path`
    ///
    /// Returns the tree metadata and whether a cache file was written.
    pub fn build_with_level_cache<S: LeafSource + ?Sized>(
        &self,
        source: &S,
        top_levels: u32,
        cache_path: &Path,
    ) -> Result<(TreeMetadata, bool)> {
        let (metadata, cache) = self.build_cached(source, top_levels)?;
        match cache {
            Some(cache) => {
                cache.save(cache_path)?;
                Ok((metadata, true))
            }
            None => {
                debug!(height = metadata.height, "no levels to cache");
                Ok((metadata, false))
            }
        }
    }

    fn build_in<S: LeafSource + ?Sized>(
        &self,
        scratch: &ScratchSpace,
        source: &S,
        top_levels: u32,
    ) -> Result<(TreeMetadata, Option<LevelCache>)> {
        let core = PaddingCore::new(self.hash_fn.as_ref());

        let mut current = self.write_leaf_level(scratch, source, &core)?;
        let leaf_count = current.node_count;
        info!(
            leaves = leaf_count,
            algorithm = self.hash_fn.name(),
            "hashed leaf level"
        );

        // Consumed levels kept for the cache, oldest first; one level below
        // the cached range is retained and discarded when packaging
        let window_size = if top_levels > 0 {
            (top_levels as usize).saturating_add(1)
        } else {
            0
        };
        let mut retained: VecDeque<LevelFile> = VecDeque::new();

        while current.node_count > 1 {
            let next = self.reduce_level(scratch, &current, &core)?;
            debug!(
                level = next.level,
                nodes = next.node_count,
                "reduced level"
            );

            if window_size > 0 {
                retained.push_back(current);
                if retained.len() > window_size {
                    if let Some(evicted) = retained.pop_front() {
                        remove_scratch_file(&evicted.path);
                    }
                }
            } else {
                remove_scratch_file(&current.path);
            }
            current = next;
        }

        let root = LevelReader::open(&current, self.hash_fn.hash_size(), &self.config)?
            .next_hash()?;
        let metadata = TreeMetadata {
            root,
            height: current.level,
            leaf_count,
            algorithm: self.hash_fn.name().to_string(),
        };

        let cache = if window_size > 0 && metadata.height > 0 {
            Some(self.package_cache(&retained, metadata.height, top_levels)?)
        } else {
            None
        };

        info!(
            root = %metadata.root,
            height = metadata.height,
            leaves = metadata.leaf_count,
            "built streaming merkle tree"
        );
        Ok((metadata, cache))
    }

    fn write_leaf_level<S: LeafSource + ?Sized>(
        &self,
        scratch: &ScratchSpace,
        source: &S,
        core: &PaddingCore<'_>,
    ) -> Result<LevelFile> {
        let path = scratch.level_path(0);
        let mut writer = LevelWriter::create(&path, &self.config)?;
        for leaf in source.open()? {
            self.cancel.check()?;
            writer.push(&core.leaf_hash(&leaf?))?;
        }
        let node_count = writer.finish()?;
        if node_count == 0 {
            return Err(MerkleError::EmptyLeafSource);
        }
        Ok(LevelFile {
            level: 0,
            path,
            node_count,
        })
    }

    /// Pair up the nodes of `input` into the next level's file
    fn reduce_level(
        &self,
        scratch: &ScratchSpace,
        input: &LevelFile,
        core: &PaddingCore<'_>,
    ) -> Result<LevelFile> {
        let level = input.level + 1;
        let path = scratch.level_path(level);
        let mut reader = LevelReader::open(input, self.hash_fn.hash_size(), &self.config)?;
        let mut writer = LevelWriter::create(&path, &self.config)?;

        let mut remaining = input.node_count;
        while remaining > 0 {
            self.cancel.check()?;
            let left = reader.next_hash()?;
            let parent = if remaining >= 2 {
                let right = reader.next_hash()?;
                remaining -= 2;
                core.parent_hash(&left, &right)
            } else {
                remaining -= 1;
                core.pair(&left, None)
            };
            writer.push(&parent)?;
        }

        let node_count = writer.finish()?;
        Ok(LevelFile {
            level,
            path,
            node_count,
        })
    }

    /// Load retained levels in `[height - top_levels, height - 1]`
    fn package_cache(
        &self,
        retained: &VecDeque<LevelFile>,
        height: u32,
        top_levels: u32,
    ) -> Result<LevelCache> {
        let start_level = height.saturating_sub(top_levels);
        let end_level = height - 1;
        let hash_size = self.hash_fn.hash_size();

        let mut data = CacheData::new();
        for level_file in retained
            .iter()
            .filter(|file| (start_level..=end_level).contains(&file.level))
        {
            let mut reader = LevelReader::open(level_file, hash_size, &self.config)?;
            let mut hashes = LevelHashes::new(hash_size);
            for _ in 0..level_file.node_count {
                hashes.push(&reader.next_hash()?)?;
            }
            data.insert(level_file.level, hashes);
        }

        let metadata = CacheMetadata::new(
            self.hash_fn.name(),
            hash_size,
            height,
            start_level,
            end_level,
        )?;
        debug!(start_level, end_level, "packaged level cache");
        LevelCache::new(metadata, data)
    }

    /// Inclusion proof for leaf `index` of the tree over `source`
    ///
    /// `source` must yield the same leaves it did at build time. Sibling
    /// hashes are resolved from `cache` where possible; everything else is
    /// recomputed by re-reading the source. The cache is never modified.
    pub fn generate_proof<S: LeafSource + ?Sized>(
        &self,
        source: &S,
        index: u64,
        leaf_count: u64,
        cache: Option<&LevelCache>,
    ) -> Result<MerkleProof> {
        if leaf_count == 0 {
            return Err(MerkleError::invalid_argument("leaf count must be positive"));
        }
        if index >= leaf_count {
            return Err(MerkleError::index_out_of_range(index, leaf_count));
        }
        if let Some(cache) = cache {
            cache.ensure_compatible(self.hash_fn.as_ref(), leaf_count)?;
        }
        self.cancel.check()?;

        let resolver = SubtreeResolver {
            engine: self,
            source,
            leaf_count,
            cache,
            core: PaddingCore::new(self.hash_fn.as_ref()),
            stats: Default::default(),
        };
        resolver.prove(index)
    }
}

/// Resolves the sibling hashes for one proof request
struct SubtreeResolver<'a, S: ?Sized> {
    engine: &'a StreamingTreeEngine,
    source: &'a S,
    leaf_count: u64,
    cache: Option<&'a LevelCache>,
    core: PaddingCore<'a>,
    stats: std::cell::Cell<ResolverStats>,
}

#[derive(Debug, Clone, Copy, Default)]
struct ResolverStats {
    source_scans: u64,
    leaves_read: u64,
    cache_hits: u64,
}

impl<'a, S: LeafSource + ?Sized> SubtreeResolver<'a, S> {
    fn prove(&self, index: u64) -> Result<MerkleProof> {
        let height = tree_height(self.leaf_count);
        let mut siblings = Vec::with_capacity(height as usize);
        let mut orientation = Vec::with_capacity(height as usize);

        let sibling = sibling_index(index);
        let (leaf_value, sibling_leaf) = self.scan_leaf_pair(index, sibling, height > 0)?;
        let mut running = self.core.leaf_hash(&leaf_value);

        for level in 0..height {
            let position = index >> level;
            let sibling_position = sibling_index(position);

            let sibling_hash = if sibling_position >= level_size(self.leaf_count, level) {
                self.core.padding_hash(&running)
            } else if level == 0 {
                match &sibling_leaf {
                    Some(data) => self.core.leaf_hash(data),
                    None => {
                        return Err(MerkleError::inconsistent_state(format!(
                            "sibling leaf {} was not read",
                            sibling_position
                        )))
                    }
                }
            } else {
                self.node_hash(level, sibling_position)?
            };

            let sibling_right = sibling_is_right(position);
            running = if sibling_right {
                self.core.parent_hash(&running, &sibling_hash)
            } else {
                self.core.parent_hash(&sibling_hash, &running)
            };
            siblings.push(sibling_hash);
            orientation.push(sibling_right);
        }

        let stats = self.stats.get();
        debug!(
            index,
            leaf_count = self.leaf_count,
            source_scans = stats.source_scans,
            leaves_read = stats.leaves_read,
            cache_hits = stats.cache_hits,
            "generated streaming proof"
        );
        MerkleProof::new(leaf_value, index, height, siblings, orientation)
    }

    /// One pass over the source capturing the target leaf and, when it
    /// exists, its level-0 sibling
    fn scan_leaf_pair(
        &self,
        index: u64,
        sibling: u64,
        want_sibling: bool,
    ) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let want_sibling = want_sibling && sibling < self.leaf_count;
        let last = if want_sibling { index.max(sibling) } else { index };

        let mut target = None;
        let mut sibling_leaf = None;
        self.scan(0, last + 1, |position, leaf| {
            if position == index {
                target = Some(leaf);
            } else if want_sibling && position == sibling {
                sibling_leaf = Some(leaf);
            }
        })?;

        let target = target.ok_or_else(|| self.missing_leaf(index))?;
        Ok((target, sibling_leaf))
    }

    /// Hash of the node at `(level, position)`, which must exist
    fn node_hash(&self, level: u32, position: u64) -> Result<HashValue> {
        if let Some(hash) = self.cache.and_then(|cache| cache.node(level, position)) {
            self.record(|stats| stats.cache_hits += 1);
            return Ok(hash);
        }

        let cached_below = self
            .cache
            .and_then(LevelCache::lowest_level)
            .map_or(false, |lowest| lowest < level);
        if level == 0 || !cached_below {
            return self.fold_subtree(level, position);
        }

        let child_level = level - 1;
        let left = self.node_hash(child_level, 2 * position)?;
        let right_position = 2 * position + 1;
        let right = if right_position < level_size(self.leaf_count, child_level) {
            Some(self.node_hash(child_level, right_position)?)
        } else {
            None
        };
        Ok(self.core.pair(&left, right.as_ref()))
    }

    /// Recompute `(level, position)` from its leaf range in one pass
    fn fold_subtree(&self, level: u32, position: u64) -> Result<HashValue> {
        let span = 1u64 << level;
        let start = position * span;
        let end = start.saturating_add(span).min(self.leaf_count);

        let mut folder = SubtreeFolder::new(self.core, level);
        self.scan(start, end, |_, leaf| folder.push(self.core.leaf_hash(&leaf)))?;
        folder.finish()
    }

    /// Stream leaves `[start, end)` into `visit`, reading from the
    /// beginning of the source
    fn scan(&self, start: u64, end: u64, mut visit: impl FnMut(u64, Vec<u8>)) -> Result<()> {
        self.record(|stats| stats.source_scans += 1);
        let mut leaves = self.source.open()?;
        for position in 0..end {
            self.engine.cancel.check()?;
            let leaf = leaves
                .next()
                .ok_or_else(|| self.missing_leaf(position))??;
            self.record(|stats| stats.leaves_read += 1);
            if position >= start {
                visit(position, leaf);
            }
        }
        Ok(())
    }

    fn missing_leaf(&self, position: u64) -> MerkleError {
        MerkleError::inconsistent_state(format!(
            "leaf source ended before leaf {} of declared {}",
            position, self.leaf_count
        ))
    }

    fn record(&self, update: impl FnOnce(&mut ResolverStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }
}

/// Folds a contiguous run of leaf hashes into the hash of the subtree
/// `levels` rounds above them, applying the odd-level rule at every round
///
/// Holds at most one pending node per level.
struct SubtreeFolder<'a> {
    core: PaddingCore<'a>,
    levels: u32,
    pending: Vec<Option<HashValue>>,
}

impl<'a> SubtreeFolder<'a> {
    fn new(core: PaddingCore<'a>, levels: u32) -> Self {
        Self {
            core,
            levels,
            pending: vec![None; levels as usize + 1],
        }
    }

    fn push(&mut self, leaf: HashValue) {
        let mut node = leaf;
        let mut level = 0;
        while let Some(left) = self.pending[level].take() {
            node = self.core.parent_hash(&left, &node);
            level += 1;
        }
        self.pending[level] = Some(node);
    }

    fn finish(mut self) -> Result<HashValue> {
        // `carry` is the trailing node produced from the levels below
        let mut carry: Option<HashValue> = None;
        for level in 0..self.levels as usize {
            carry = match (self.pending[level].take(), carry) {
                (Some(left), Some(right)) => Some(self.core.parent_hash(&left, &right)),
                (Some(node), None) | (None, Some(node)) => Some(self.core.pair(&node, None)),
                (None, None) => None,
            };
        }

        match (self.pending[self.levels as usize].take(), carry) {
            (Some(root), None) | (None, Some(root)) => Ok(root),
            _ => Err(MerkleError::inconsistent_state(
                "subtree fold did not converge to a single node",
            )),
        }
    }
}

/// One level's scratch file
#[derive(Debug)]
struct LevelFile {
    level: u32,
    path: PathBuf,
    node_count: u64,
}

struct LevelWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    count: u64,
}

impl LevelWriter {
    fn create(path: &Path, config: &StreamingConfig) -> Result<Self> {
        let file = File::create(path).map_err(|e| MerkleError::file_io(path, e))?;
        Ok(Self {
            writer: BufWriter::with_capacity(config.io_buffer_size, file),
            path: path.to_path_buf(),
            count: 0,
        })
    }

    fn push(&mut self, hash: &HashValue) -> Result<()> {
        write_record(&mut self.writer, hash.as_bytes())?;
        self.count += 1;
        Ok(())
    }

    fn finish(mut self) -> Result<u64> {
        self.writer
            .flush()
            .map_err(|e| MerkleError::file_io(&self.path, e))?;
        Ok(self.count)
    }
}

struct LevelReader {
    reader: BufReader<File>,
    level: u32,
    hash_size: usize,
}

impl LevelReader {
    fn open(level_file: &LevelFile, hash_size: usize, config: &StreamingConfig) -> Result<Self> {
        let file =
            File::open(&level_file.path).map_err(|e| MerkleError::file_io(&level_file.path, e))?;
        Ok(Self {
            reader: BufReader::with_capacity(config.io_buffer_size, file),
            level: level_file.level,
            hash_size,
        })
    }

    fn next_hash(&mut self) -> Result<HashValue> {
        let record = read_record(&mut self.reader, self.hash_size)?.ok_or_else(|| {
            MerkleError::inconsistent_state(format!(
                "scratch file for level {} ended early",
                self.level
            ))
        })?;
        if record.len() != self.hash_size {
            return Err(MerkleError::inconsistent_state(format!(
                "scratch record of {} bytes on level {}, expected {}",
                record.len(),
                self.level,
                self.hash_size
            )));
        }
        Ok(HashValue::from_bytes(record))
    }
}

/// Private per-build scratch directory
///
/// Removed by [`ScratchSpace::cleanup`] or, on unwinding, by dropping the
/// inner [`TempDir`].
struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    fn create(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("merkle-scratch-");
        let dir = match parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(|e| MerkleError::file_io(parent, e))?;
                builder
                    .tempdir_in(parent)
                    .map_err(|e| MerkleError::file_io(parent, e))?
            }
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self { dir })
    }

    fn level_path(&self, level: u32) -> PathBuf {
        self.dir.path().join(format!("level-{:04}.bin", level))
    }

    /// Remove the directory; failures are logged and swallowed
    fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

fn remove_scratch_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove scratch level file");
    }
}
