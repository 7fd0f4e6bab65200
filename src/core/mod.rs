//! Core types and utilities for merkle_stream
//!
//! This module contains the fundamental data types, error handling,
//! the hash function capability and cancellation support.

pub mod cancel;
pub mod error;
pub mod hash;
pub mod types;
pub mod wire;

// Re-export commonly used items
pub use cancel::CancellationToken;
pub use error::{ErrorCategory, MerkleError, Result};
pub use hash::{hash_function_by_name, sha256, sha384, sha512, HashFunction};
pub use types::{HashValue, LeafRecord, TreeMetadata};
