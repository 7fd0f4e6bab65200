//! Core data types for merkle_stream

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest produced by the active hash function
///
/// The length is always the output size of the hash function that produced
/// it. Equality is exact byte comparison.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashValue(Vec<u8>);

impl HashValue {
    /// Wrap raw digest bytes
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        HashValue(bytes.into())
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the underlying bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Create a HashValue from a hex string
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(hex.trim())?;
        if bytes.is_empty() {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        Ok(HashValue(bytes))
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl fmt::Debug for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = hex::encode(&self.0);
        write!(f, "HashValue({})", &hex[..hex.len().min(8)])
    }
}

impl AsRef<[u8]> for HashValue {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for HashValue {
    fn from(bytes: Vec<u8>) -> Self {
        HashValue(bytes)
    }
}

// Hex strings instead of byte arrays
impl Serialize for HashValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        HashValue::from_hex(&hex_string).map_err(serde::de::Error::custom)
    }
}

/// An input blob paired with its zero-based left-to-right position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRecord {
    pub index: u64,
    pub data: Vec<u8>,
}

impl LeafRecord {
    pub fn new(index: u64, data: impl Into<Vec<u8>>) -> Self {
        Self {
            index,
            data: data.into(),
        }
    }
}

/// Summary of a built tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeMetadata {
    /// Root hash of the tree
    pub root: HashValue,
    /// Number of pairing rounds; 0 for a single leaf
    pub height: u32,
    /// Number of genuine leaves
    pub leaf_count: u64,
    /// Identifier of the hash function used
    pub algorithm: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let value = HashValue::from_bytes(vec![0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(value.to_hex(), "deadbeef");
        assert_eq!(HashValue::from_hex("deadbeef").unwrap(), value);
        assert!(HashValue::from_hex("").is_err());
        assert!(HashValue::from_hex("zz").is_err());
    }

    #[test]
    fn test_debug_is_abbreviated() {
        let value = HashValue::from_bytes(vec![0xab; 32]);
        assert_eq!(format!("{:?}", value), "HashValue(abababab)");
    }

    #[test]
    fn test_metadata_json() {
        let metadata = TreeMetadata {
            root: HashValue::from_bytes(vec![1, 2, 3]),
            height: 2,
            leaf_count: 3,
            algorithm: "SHA-256".to_string(),
        };
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"root\":\"010203\""));
        let parsed: TreeMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }
}
