//! Binary encoding of [`MerkleProof`]
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! version(1) | tree_height(4) | leaf_index(8) | leaf_value_len(4) | leaf_value
//! | hash_size(4) | orientation_len(4) | orientation bits (LSB first)
//! | sibling hashes (tree_height * hash_size, leaf to root)
//! ```

use crate::core::error::{MerkleError, Result};
use crate::core::types::HashValue;
use crate::core::wire::{write_len, write_u63, WireReader};
use crate::proofs::proof::MerkleProof;
use std::path::Path;

/// Current proof format version
pub const PROOF_FORMAT_VERSION: u8 = 1;

const FORMAT: &str = "merkle proof";

/// Number of bytes needed to pack `bits` orientation bits
pub fn packed_len(bits: usize) -> usize {
    bits / 8 + usize::from(bits % 8 != 0)
}

fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut packed = vec![0u8; packed_len(bits.len())];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            packed[i / 8] |= 1 << (i % 8);
        }
    }
    packed
}

fn unpack_bits(packed: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| packed[i / 8] & (1 << (i % 8)) != 0)
        .collect()
}

impl MerkleProof {
    /// Serialize to the canonical binary format
    pub fn encode(&self) -> Result<Vec<u8>> {
        let hash_size = self.hash_size().unwrap_or(0);
        let height = self.tree_height() as usize;
        let mut buffer = Vec::with_capacity(
            1 + 4 + 8 + 4 + self.leaf_value().len() + 4 + 4 + packed_len(height) + height * hash_size,
        );

        buffer.push(PROOF_FORMAT_VERSION);
        write_len(&mut buffer, height, "tree height")?;
        write_u63(&mut buffer, self.leaf_index(), "leaf index")?;
        write_len(&mut buffer, self.leaf_value().len(), "leaf value length")?;
        buffer.extend_from_slice(self.leaf_value());
        write_len(&mut buffer, hash_size, "hash size")?;

        let packed = pack_bits(self.orientation_bits());
        write_len(&mut buffer, packed.len(), "orientation bits length")?;
        buffer.extend_from_slice(&packed);

        for sibling in self.sibling_hashes() {
            buffer.extend_from_slice(sibling.as_bytes());
        }
        Ok(buffer)
    }

    /// Parse the binary format, rejecting anything that is not canonical
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = WireReader::new(bytes, FORMAT);

        let version = reader.read_u8("version")?;
        if version != PROOF_FORMAT_VERSION {
            return Err(MerkleError::UnsupportedVersion {
                format: FORMAT.to_string(),
                version: version as u32,
                supported: PROOF_FORMAT_VERSION as u32,
            });
        }

        let height = reader.read_len("tree height")?;
        let leaf_index = reader.read_u63("leaf index")?;
        let leaf_len = reader.read_len("leaf value length")?;
        let leaf_value = reader.read_bytes(leaf_len, "leaf value")?.to_vec();
        let hash_size = reader.read_len("hash size")?;

        let orientation_len = reader.read_len("orientation bits length")?;
        if orientation_len != packed_len(height) {
            return Err(reader.malformed(format!(
                "orientation bits length {} does not match tree height {}",
                orientation_len, height
            )));
        }
        let packed = reader.read_bytes(orientation_len, "orientation bits")?;
        if height % 8 != 0 {
            let unused = packed[packed.len() - 1] >> (height % 8);
            if unused != 0 {
                return Err(reader.malformed("unused orientation bits are set"));
            }
        }
        let orientation_bits = unpack_bits(packed, height);

        match (height, hash_size) {
            (0, 0) => {}
            (0, _) => {
                return Err(reader.malformed("single-leaf proof must declare hash size 0"));
            }
            (_, 0) => return Err(reader.malformed("hash size must be positive")),
            _ => {}
        }

        let siblings_len = height
            .checked_mul(hash_size)
            .ok_or_else(|| reader.malformed("sibling hash section overflows"))?;
        let sibling_bytes = reader.read_bytes(siblings_len, "sibling hashes")?;
        let sibling_hashes = if hash_size == 0 {
            Vec::new()
        } else {
            sibling_bytes
                .chunks_exact(hash_size)
                .map(HashValue::from_bytes)
                .collect()
        };
        reader.finish()?;

        // read_len caps the height at i32::MAX
        let height = height as u32;
        MerkleProof::new(leaf_value, leaf_index, height, sibling_hashes, orientation_bits)
            .map_err(|e| MerkleError::invalid_format(FORMAT, e.to_string()))
    }

    /// Write the encoded proof to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = self.encode()?;
        std::fs::write(path, bytes).map_err(|e| MerkleError::file_io(path, e))
    }

    /// Read and decode a proof from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| MerkleError::file_io(path, e))?;
        Self::decode(&bytes)
    }
}
