//! Inclusion proof for one leaf and its verification

use crate::core::error::{MerkleError, Result};
use crate::core::hash::HashFunction;
use crate::core::types::HashValue;
use crate::tree::padding::PaddingCore;
use tracing::debug;

/// Inclusion proof for a single leaf
///
/// `sibling_hashes[i]` is the node paired with the path node at level `i`,
/// ordered from the leaf towards the root. `orientation_bits[i]` is `true`
/// when that sibling is the right operand of the parent hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleProof {
    leaf_value: Vec<u8>,
    leaf_index: u64,
    tree_height: u32,
    sibling_hashes: Vec<HashValue>,
    orientation_bits: Vec<bool>,
}

impl MerkleProof {
    /// Create a proof, validating its structure
    pub fn new(
        leaf_value: Vec<u8>,
        leaf_index: u64,
        tree_height: u32,
        sibling_hashes: Vec<HashValue>,
        orientation_bits: Vec<bool>,
    ) -> Result<Self> {
        let proof = Self {
            leaf_value,
            leaf_index,
            tree_height,
            sibling_hashes,
            orientation_bits,
        };
        proof.validate()?;
        Ok(proof)
    }

    /// Structural checks shared by construction and verification
    fn validate(&self) -> Result<()> {
        let height = self.tree_height as usize;
        if self.sibling_hashes.len() != height {
            return Err(MerkleError::invalid_argument(format!(
                "proof has {} sibling hashes for tree height {}",
                self.sibling_hashes.len(),
                height
            )));
        }
        if self.orientation_bits.len() != height {
            return Err(MerkleError::invalid_argument(format!(
                "proof has {} orientation bits for tree height {}",
                self.orientation_bits.len(),
                height
            )));
        }
        if self.tree_height < 64 && self.leaf_index >> self.tree_height != 0 {
            return Err(MerkleError::invalid_argument(format!(
                "leaf index {} cannot occur in a tree of height {}",
                self.leaf_index, self.tree_height
            )));
        }
        if let Some(first) = self.sibling_hashes.first() {
            if first.is_empty() {
                return Err(MerkleError::invalid_argument("empty sibling hash"));
            }
            if let Some(odd) = self
                .sibling_hashes
                .iter()
                .position(|hash| hash.len() != first.len())
            {
                return Err(MerkleError::invalid_argument(format!(
                    "sibling hash {} is {} bytes, expected {}",
                    odd,
                    self.sibling_hashes[odd].len(),
                    first.len()
                )));
            }
        }
        Ok(())
    }

    pub fn leaf_value(&self) -> &[u8] {
        &self.leaf_value
    }

    pub fn leaf_index(&self) -> u64 {
        self.leaf_index
    }

    pub fn tree_height(&self) -> u32 {
        self.tree_height
    }

    pub fn sibling_hashes(&self) -> &[HashValue] {
        &self.sibling_hashes
    }

    pub fn orientation_bits(&self) -> &[bool] {
        &self.orientation_bits
    }

    /// Byte length of the sibling hashes, `None` for a single-leaf proof
    pub fn hash_size(&self) -> Option<usize> {
        self.sibling_hashes.first().map(HashValue::len)
    }

    /// Root implied by this proof under `hash_fn`
    pub fn computed_root(&self, hash_fn: &dyn HashFunction) -> HashValue {
        let core = PaddingCore::new(hash_fn);
        let mut running = core.leaf_hash(&self.leaf_value);
        for (sibling, sibling_is_right) in self.sibling_hashes.iter().zip(&self.orientation_bits) {
            running = if *sibling_is_right {
                core.parent_hash(&running, sibling)
            } else {
                core.parent_hash(sibling, &running)
            };
        }
        running
    }

    /// Check this proof against `expected_root`
    ///
    /// Returns `Ok(false)` when the proof is well formed but does not lead to
    /// `expected_root`. Errors are reserved for structurally broken proofs.
    pub fn verify(&self, expected_root: &HashValue, hash_fn: &dyn HashFunction) -> Result<bool> {
        self.validate()?;

        if let Some(size) = self.hash_size() {
            if size != hash_fn.hash_size() {
                debug!(
                    proof_hash_size = size,
                    algorithm = hash_fn.name(),
                    "proof hash size does not match hash function"
                );
                return Ok(false);
            }
        }

        Ok(self.computed_root(hash_fn) == *expected_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::{sha256, sha512};

    fn two_leaf_proof() -> (MerkleProof, HashValue) {
        let hash_fn = sha256();
        let core = PaddingCore::new(hash_fn.as_ref());
        let left = core.leaf_hash(b"left");
        let right = core.leaf_hash(b"right");
        let root = core.parent_hash(&left, &right);
        let proof = MerkleProof::new(b"left".to_vec(), 0, 1, vec![right], vec![true]).unwrap();
        (proof, root)
    }

    #[test]
    fn test_verify_two_leaves() {
        let (proof, root) = two_leaf_proof();
        assert!(proof.verify(&root, sha256().as_ref()).unwrap());
        assert_eq!(proof.hash_size(), Some(32));
    }

    #[test]
    fn test_wrong_root_is_false_not_error() {
        let (proof, _) = two_leaf_proof();
        let wrong = HashValue::from_bytes(vec![0u8; 32]);
        assert!(!proof.verify(&wrong, sha256().as_ref()).unwrap());
    }

    #[test]
    fn test_hash_size_mismatch_is_false() {
        let (proof, root) = two_leaf_proof();
        assert!(!proof.verify(&root, sha512().as_ref()).unwrap());
    }

    #[test]
    fn test_single_leaf_proof() {
        let hash_fn = sha256();
        let proof = MerkleProof::new(b"only".to_vec(), 0, 0, vec![], vec![]).unwrap();
        assert!(proof
            .verify(&hash_fn.compute(b"only"), hash_fn.as_ref())
            .unwrap());
        assert_eq!(proof.hash_size(), None);
    }

    #[test]
    fn test_construction_rejects_malformed() {
        let sibling = HashValue::from_bytes(vec![1u8; 32]);

        // Length mismatch with height
        let err = MerkleProof::new(vec![], 0, 2, vec![sibling.clone()], vec![true]).unwrap_err();
        assert!(err.is_invalid_argument());

        // Orientation length mismatch
        assert!(MerkleProof::new(vec![], 0, 1, vec![sibling.clone()], vec![]).is_err());

        // Non-uniform sibling sizes
        let short = HashValue::from_bytes(vec![1u8; 16]);
        assert!(MerkleProof::new(
            vec![],
            0,
            2,
            vec![sibling.clone(), short],
            vec![true, true]
        )
        .is_err());

        // Index beyond what the height allows
        assert!(MerkleProof::new(vec![], 2, 1, vec![sibling], vec![true]).is_err());
    }
}
