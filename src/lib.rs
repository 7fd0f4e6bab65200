//! merkle_stream - Binary merkle trees over leaf sources of any size
//!
//! merkle_stream builds binary merkle trees with a padding-hash rule for odd
//! levels and produces compact inclusion proofs for individual leaves.
//!
//! # Core Features
//!
//! - **In-Memory Engine**: Keeps every level for instant proofs on small inputs
//! - **Streaming Engine**: Spills levels to scratch files, holding O(log n) hashes
//! - **Level Caches**: Persist the top levels of a tree to speed up later proofs
//! - **Portable Proofs**: A canonical little-endian binary proof format
//! - **Pluggable Hashing**: SHA-256, SHA-384 and SHA-512 out of the box
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use merkle_stream::{sha256, InMemoryTreeEngine, StreamingTreeEngine};
//!
//! let leaves = vec!["data1", "data2", "data3"];
//!
//! let tree = InMemoryTreeEngine::new(sha256()).build(&leaves)?;
//! let proof = tree.generate_proof(2)?;
//! assert!(proof.verify(tree.root(), sha256().as_ref())?);
//!
//! // The streaming engine agrees on the root
//! let metadata = StreamingTreeEngine::new(sha256()).build(&leaves)?;
//! assert_eq!(&metadata.root, tree.root());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod proofs;
pub mod tree;

// Re-export commonly used types
pub use crate::core::{
    cancel::CancellationToken,
    error::{ErrorCategory, MerkleError, Result},
    hash::{hash_function_by_name, sha256, sha384, sha512, HashFunction},
    types::{HashValue, LeafRecord, TreeMetadata},
};

pub use crate::cache::{LevelCache, CACHE_FORMAT_VERSION};

pub use crate::config::{GlobalConfig, StreamingConfig};

pub use crate::proofs::{MerkleProof, PROOF_FORMAT_VERSION};

pub use crate::tree::{
    InMemoryTreeEngine, LeafSource, LineFileSource, MerkleTree, PaddingCore, RecordFileSource,
    StreamingTreeEngine,
};

/// Current version of merkle_stream
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
