use sha1::{Digest, Sha1};

use crate::engine::NativeCommit;
use crate::types::ids::Hash;
use crate::types::signature::{IdentityKey, Signature};

/// Compute the identity hash of a commit
///
/// SHA-1 over, in order: raw tree hash bytes, raw bytes of each parent hash,
/// `"<name> <<email>> <unix> <key>"` for the author (empty key when the author
/// has none), `"<name> <<email>> <unix>"` for the committer, and the raw
/// message bytes. Parents are native-domain hashes.
pub fn compute_identity_hash(
    tree_hash: &Hash,
    parent_hashes: &[Hash],
    author: &Signature,
    committer: &Signature,
    message: &str,
) -> Hash {
    let preimage = build_preimage(tree_hash, parent_hashes, author, committer, message);
    let mut hasher = Sha1::new();
    hasher.update(&preimage);
    Hash::from_bytes(hasher.finalize().into())
}

/// Build the byte string fed to the digest
pub fn build_preimage(
    tree_hash: &Hash,
    parent_hashes: &[Hash],
    author: &Signature,
    committer: &Signature,
    message: &str,
) -> Vec<u8> {
    let key = author.identity_key.as_ref().map(IdentityKey::as_str).unwrap_or("");
    let author_line = format!(
        "{} <{}> {} {}",
        author.name,
        author.email,
        author.unix_time(),
        key
    );
    let committer_line = format!(
        "{} <{}> {}",
        committer.name,
        committer.email,
        committer.unix_time()
    );

    let mut buf = Vec::with_capacity(
        tree_hash.as_bytes().len() * (1 + parent_hashes.len())
            + author_line.len()
            + committer_line.len()
            + message.len(),
    );
    buf.extend_from_slice(tree_hash.as_bytes());
    for parent in parent_hashes {
        buf.extend_from_slice(parent.as_bytes());
    }
    buf.extend_from_slice(author_line.as_bytes());
    buf.extend_from_slice(committer_line.as_bytes());
    buf.extend_from_slice(message.as_bytes());
    buf
}

/// Canonical identifier of a freshly created commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitIdentity {
    /// No identity key: the native hash is the identifier, nothing is bound
    Native(Hash),
    /// Identity-bound commit
    Bound {
        native: Hash,
        identity: Hash,
        key: IdentityKey,
    },
}

impl CommitIdentity {
    pub fn canonical(&self) -> Hash {
        match self {
            CommitIdentity::Native(hash) => *hash,
            CommitIdentity::Bound { identity, .. } => *identity,
        }
    }

    pub fn native(&self) -> Hash {
        match self {
            CommitIdentity::Native(hash) => *hash,
            CommitIdentity::Bound { native, .. } => *native,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, CommitIdentity::Bound { .. })
    }
}

/// Decide the canonical identifier for `commit`
///
/// Without a key no identity hash is computed at all.
pub fn canonical_identity(commit: &NativeCommit, key: Option<&IdentityKey>) -> CommitIdentity {
    match key {
        None => CommitIdentity::Native(commit.hash),
        Some(key) => {
            let author = commit.author.clone().with_identity_key(key.clone());
            let identity = compute_identity_hash(
                &commit.tree_hash,
                &commit.parent_hashes,
                &author,
                &commit.committer,
                &commit.message,
            );
            CommitIdentity::Bound {
                native: commit.hash,
                identity,
                key: key.clone(),
            }
        }
    }
}
