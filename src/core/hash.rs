//! Hash function capability and the SHA-2 adapters shipped with the crate

use crate::core::error::{MerkleError, Result};
use crate::core::types::HashValue;
use digest::Digest;
use sha2::{Sha256, Sha384, Sha512};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Fixed-size cryptographic digest primitive consumed by every tree engine
pub trait HashFunction: Send + Sync {
    /// Stable identifier stored in serialized artifacts
    fn name(&self) -> &str;

    /// Output size in bytes
    fn hash_size(&self) -> usize;

    /// Digest of `data`; always `hash_size()` bytes long
    fn compute(&self, data: &[u8]) -> HashValue;

    /// Digest of the concatenation of `parts`
    fn compute_concat(&self, parts: &[&[u8]]) -> HashValue {
        self.compute(&parts.concat())
    }
}

impl fmt::Debug for dyn HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashFunction({}, {} bytes)", self.name(), self.hash_size())
    }
}

/// Adapter exposing any RustCrypto [`Digest`] as a [`HashFunction`]
pub struct DigestHashFunction<D> {
    name: &'static str,
    _digest: PhantomData<fn() -> D>,
}

impl<D: Digest> DigestHashFunction<D> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _digest: PhantomData,
        }
    }
}

impl<D: Digest> HashFunction for DigestHashFunction<D> {
    fn name(&self) -> &str {
        self.name
    }

    fn hash_size(&self) -> usize {
        <D as Digest>::output_size()
    }

    fn compute(&self, data: &[u8]) -> HashValue {
        HashValue::from_bytes(D::digest(data).to_vec())
    }

    fn compute_concat(&self, parts: &[&[u8]]) -> HashValue {
        let mut hasher = D::new();
        for part in parts {
            Digest::update(&mut hasher, part);
        }
        HashValue::from_bytes(hasher.finalize().to_vec())
    }
}

pub const SHA256_NAME: &str = "SHA-256";
pub const SHA384_NAME: &str = "SHA-384";
pub const SHA512_NAME: &str = "SHA-512";

/// SHA-256 (32-byte output)
pub fn sha256() -> Arc<dyn HashFunction> {
    Arc::new(DigestHashFunction::<Sha256>::new(SHA256_NAME))
}

/// SHA-384 (48-byte output)
pub fn sha384() -> Arc<dyn HashFunction> {
    Arc::new(DigestHashFunction::<Sha384>::new(SHA384_NAME))
}

/// SHA-512 (64-byte output)
pub fn sha512() -> Arc<dyn HashFunction> {
    Arc::new(DigestHashFunction::<Sha512>::new(SHA512_NAME))
}

/// Names accepted by [`hash_function_by_name`]
pub fn supported_algorithms() -> &'static [&'static str] {
    &[SHA256_NAME, SHA384_NAME, SHA512_NAME]
}

/// Resolve a hash function from its identifier
///
/// Matching ignores case and dashes, so `sha256` resolves to `SHA-256`.
pub fn hash_function_by_name(name: &str) -> Result<Arc<dyn HashFunction>> {
    let normalized: String = name
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();

    match normalized.as_str() {
        "sha256" => Ok(sha256()),
        "sha384" => Ok(sha384()),
        "sha512" => Ok(sha512()),
        _ => Err(MerkleError::invalid_argument(format!(
            "unknown hash algorithm '{}', supported: {}",
            name,
            supported_algorithms().join(", ")
        ))),
    }
}
