use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Width of every commit identifier in bytes (SHA-1 class digest)
pub const HASH_LEN: usize = 20;

/// Width of a full commit identifier in hex characters
pub const HASH_HEX_LEN: usize = HASH_LEN * 2;

/// 160-bit commit identifier, used for both native and identity hashes
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; HASH_LEN]);

#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid hex string: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl Hash {
    pub const ZERO: Hash = Hash([0u8; HASH_LEN]);

    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Build a hash from a byte slice of exactly `HASH_LEN` bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, IdParseError> {
        let arr: [u8; HASH_LEN] = bytes.try_into().map_err(|_| IdParseError::InvalidLength {
            expected: HASH_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, IdParseError> {
        hex_to_id::<HASH_LEN>(hex_str).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        id_to_hex(&self.0)
    }

    /// Seven-character abbreviation for human output
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(7);
        hex
    }

    /// Whether the lowercase hex form starts with `prefix` (case-insensitive)
    pub fn has_hex_prefix(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.to_hex())
    }
}

impl FromStr for Hash {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Hash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Convert a fixed-size byte array to lowercase hex string
pub fn id_to_hex<const N: usize>(id: &[u8; N]) -> String {
    hex::encode(id)
}

/// Parse a hex string into a fixed-size byte array
pub fn hex_to_id<const N: usize>(hex_str: &str) -> Result<[u8; N], IdParseError> {
    let bytes = hex::decode(hex_str)?;
    if bytes.len() != N {
        return Err(IdParseError::InvalidLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

/// True for a non-empty string made only of hex digits
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let hex = "000102030405060708090a0b0c0d0e0f10111213";
        let hash = Hash::from_hex(hex).unwrap();
        assert_eq!(hash.as_bytes()[19], 0x13);
        assert_eq!(hash.to_string(), hex);
        assert_eq!(hash.short(), "0001020");
    }

    #[test]
    fn test_hash_invalid_length() {
        let result = Hash::from_hex("0001020304");
        assert!(matches!(result, Err(IdParseError::InvalidLength { expected: 20, actual: 5 })));
    }

    #[test]
    fn test_hash_invalid_hex() {
        let result = Hash::from_hex("not_valid_hex!");
        assert!(matches!(result, Err(IdParseError::InvalidHex(_))));
    }

    #[test]
    fn test_hash_prefix_is_case_insensitive() {
        let hash = Hash::from_hex("abcdef0000000000000000000000000000000000").unwrap();
        assert!(hash.has_hex_prefix("ABCD"));
        assert!(hash.has_hex_prefix("abcdef00"));
        assert!(!hash.has_hex_prefix("abce"));
    }

    #[test]
    fn test_hash_serde_as_hex_string() {
        let hash = Hash::from_bytes([0xab; HASH_LEN]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(20)));
        let back: Hash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
        assert!(serde_json::from_str::<Hash>("\"zz\"").is_err());
    }

    #[test]
    fn test_is_hex() {
        assert!(is_hex("deadBEEF"));
        assert!(!is_hex(""));
        assert!(!is_hex("main"));
    }
}
