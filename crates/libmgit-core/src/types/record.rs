use serde::{Deserialize, Serialize};

use super::ids::Hash;
use super::mapping::MappingEntry;
use super::signature::{IdentityKey, Signature};
use crate::engine::NativeCommit;
use crate::hash::compute_identity_hash;

/// Kind of object held in the commit store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Commit,
}

/// An identity-bound commit as persisted under `objects/`
///
/// `identity_hash` is the hash function applied to
/// `(tree_hash, native_parent_hashes, author, committer, message)`.
/// `parent_hashes` holds the identity-domain parents used for traversal; a
/// native parent without a mapping has no entry there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub record_type: RecordType,
    pub identity_hash: Hash,
    pub native_hash: Hash,
    pub tree_hash: Hash,
    pub parent_hashes: Vec<Hash>,
    pub native_parent_hashes: Vec<Hash>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl ObjectRecord {
    /// Bind a native commit to `key`, computing its identity hash
    pub fn bind(commit: &NativeCommit, key: IdentityKey, identity_parents: Vec<Hash>) -> Self {
        let mut record = Self::unhashed(commit, key, identity_parents);
        record.identity_hash = record.compute_hash();
        record
    }

    /// Rebuild the record a mapping entry claims for `commit`
    ///
    /// The identity hash is taken from the entry as-is; `CommitStore::put`
    /// rejects the record if the claim does not match the content.
    pub fn from_mapping(commit: &NativeCommit, entry: &MappingEntry, identity_parents: Vec<Hash>) -> Self {
        let mut record = Self::unhashed(commit, entry.identity_key.clone(), identity_parents);
        record.identity_hash = entry.identity_hash;
        record
    }

    fn unhashed(commit: &NativeCommit, key: IdentityKey, identity_parents: Vec<Hash>) -> Self {
        Self {
            record_type: RecordType::Commit,
            identity_hash: Hash::ZERO,
            native_hash: commit.hash,
            tree_hash: commit.tree_hash,
            parent_hashes: identity_parents,
            native_parent_hashes: commit.parent_hashes.clone(),
            author: commit.author.clone().with_identity_key(key.clone()),
            committer: commit.committer.clone().with_identity_key(key),
            message: commit.message.clone(),
        }
    }

    /// Recompute the identity hash from the stored fields
    pub fn compute_hash(&self) -> Hash {
        compute_identity_hash(
            &self.tree_hash,
            &self.native_parent_hashes,
            &self.author,
            &self.committer,
            &self.message,
        )
    }

    pub fn is_consistent(&self) -> bool {
        self.compute_hash() == self.identity_hash
    }

    pub fn identity_key(&self) -> Option<&IdentityKey> {
        self.author.identity_key.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests_support::native_commit;

    #[test]
    fn test_bind_is_consistent() {
        let commit = native_commit(0x11, &[0x10], "second\n");
        let record = ObjectRecord::bind(&commit, IdentityKey::new("npub1alice").unwrap(), vec![]);
        assert!(record.is_consistent());
        assert_eq!(record.native_hash, commit.hash);
        assert_eq!(record.native_parent_hashes, commit.parent_hashes);
        assert_eq!(record.author.identity_key, record.committer.identity_key);
    }

    #[test]
    fn test_from_mapping_keeps_claimed_hash() {
        let commit = native_commit(0x11, &[], "first\n");
        let entry = MappingEntry::new(
            commit.hash,
            Hash::from_bytes([0xee; 20]),
            IdentityKey::new("npub1alice").unwrap(),
        );
        let record = ObjectRecord::from_mapping(&commit, &entry, vec![]);
        assert_eq!(record.identity_hash, entry.identity_hash);
        assert!(!record.is_consistent());
    }

    #[test]
    fn test_key_changes_identity_hash() {
        let commit = native_commit(0x11, &[], "first\n");
        let a = ObjectRecord::bind(&commit, IdentityKey::new("npub1alice").unwrap(), vec![]);
        let b = ObjectRecord::bind(&commit, IdentityKey::new("npub1bob").unwrap(), vec![]);
        assert_ne!(a.identity_hash, b.identity_hash);
    }
}
