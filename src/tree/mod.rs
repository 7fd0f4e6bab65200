//! Merkle tree construction
//!
//! Two engines share the hashing rules in [`padding`]: an in-memory engine
//! that keeps every level, and a streaming engine that spills levels to
//! scratch files and answers proofs by re-reading its leaf source.

pub mod memory;
pub mod padding;
pub mod source;
pub mod streaming;

// Re-export commonly used items
pub use memory::{InMemoryTreeEngine, MerkleTree};
pub use padding::{tree_height, PaddingCore, PADDING_DOMAIN_TAG};
pub use source::{LeafSource, LineFileSource, RecordFileSource, RecordFileWriter};
pub use streaming::StreamingTreeEngine;
