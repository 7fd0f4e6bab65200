//! Level caches for the streaming engine
//!
//! A level cache persists the top levels of a streamed tree so later proof
//! requests can stop recursing once they reach a cached level instead of
//! re-reading the leaf source.

pub mod codec;
pub mod level_cache;

// Re-export commonly used items
pub use codec::{CACHE_FORMAT_VERSION, CACHE_MAGIC};
pub use level_cache::{CacheData, CacheMetadata, LevelCache, LevelHashes};
