//! Merkle proof system
//!
//! Inclusion proofs produced by both tree engines, their verification and
//! their canonical binary encoding.

pub mod codec;
pub mod proof;

// Re-export commonly used items
pub use codec::PROOF_FORMAT_VERSION;
pub use proof::MerkleProof;
