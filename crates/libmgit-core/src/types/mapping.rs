use serde::{Deserialize, Serialize};

use super::ids::Hash;
use super::signature::IdentityKey;

/// One (native, identity, key) triple linking the two hash domains
///
/// Field names follow the metadata wire format served to cloning clients:
/// `{"gitHash": ..., "mgitHash": ..., "pubkey": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntry {
    #[serde(rename = "gitHash")]
    pub native_hash: Hash,
    #[serde(rename = "mgitHash")]
    pub identity_hash: Hash,
    #[serde(rename = "pubkey")]
    pub identity_key: IdentityKey,
}

impl MappingEntry {
    pub fn new(native_hash: Hash, identity_hash: Hash, identity_key: IdentityKey) -> Self {
        Self {
            native_hash,
            identity_hash,
            identity_key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_field_names() {
        let entry = MappingEntry::new(
            Hash::from_bytes([1; 20]),
            Hash::from_bytes([2; 20]),
            IdentityKey::new("npub1alice").unwrap(),
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["gitHash"], "01".repeat(20));
        assert_eq!(json["mgitHash"], "02".repeat(20));
        assert_eq!(json["pubkey"], "npub1alice");
    }

    #[test]
    fn test_malformed_entries_rejected() {
        // short hash
        let bad = r#"{"gitHash":"abcd","mgitHash":"0202020202020202020202020202020202020202","pubkey":"npub1"}"#;
        assert!(serde_json::from_str::<MappingEntry>(bad).is_err());
        // missing key
        let bad = r#"{"gitHash":"0101010101010101010101010101010101010101","mgitHash":"0202020202020202020202020202020202020202"}"#;
        assert!(serde_json::from_str::<MappingEntry>(bad).is_err());
        // empty key
        let bad = r#"{"gitHash":"0101010101010101010101010101010101010101","mgitHash":"0202020202020202020202020202020202020202","pubkey":""}"#;
        assert!(serde_json::from_str::<MappingEntry>(bad).is_err());
    }
}
