//! Turn a user-supplied revision string into a native commit
//!
//! Strategies are tried in order and the first match wins:
//! 1. exact reference name (`HEAD`, `refs/...`)
//! 2. `refs/heads/<rev>`
//! 3. `refs/tags/<rev>`
//! 4. full native hash of an existing commit
//! 5. unique native hash prefix (at least [`MIN_PREFIX_LEN`] hex chars)
//! 6. identity hash or prefix via the mapping log, only with an identity key

use std::fmt;

use tracing::debug;

use crate::engine::{NativeRepository, BRANCH_REF_PREFIX, TAG_REF_PREFIX};
use crate::error::MgitError;
use crate::mapping::MappingStore;
use crate::types::ids::{is_hex, Hash, HASH_HEX_LEN};
use crate::types::signature::IdentityKey;

pub const MIN_PREFIX_LEN: usize = 4;

/// Which strategy produced a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBy {
    Reference(String),
    Branch(String),
    Tag(String),
    FullHash,
    HashPrefix,
    IdentityHash,
}

impl fmt::Display for ResolvedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedBy::Reference(name) => write!(f, "reference {}", name),
            ResolvedBy::Branch(name) => write!(f, "branch {}", name),
            ResolvedBy::Tag(name) => write!(f, "tag {}", name),
            ResolvedBy::FullHash => f.write_str("full hash"),
            ResolvedBy::HashPrefix => f.write_str("hash prefix"),
            ResolvedBy::IdentityHash => f.write_str("identity hash"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub native_hash: Hash,
    /// Identity hash bound to `native_hash`, when one is mapped
    pub identity_hash: Option<Hash>,
    pub resolved_by: ResolvedBy,
}

pub struct RevisionResolver<'a, R: NativeRepository + ?Sized> {
    repo: &'a R,
    mappings: &'a MappingStore,
    identity_key: Option<&'a IdentityKey>,
}

impl<'a, R: NativeRepository + ?Sized> RevisionResolver<'a, R> {
    /// `identity_key` enables identity-hash lookup; without it that strategy
    /// is skipped
    pub fn new(repo: &'a R, mappings: &'a MappingStore, identity_key: Option<&'a IdentityKey>) -> Self {
        Self {
            repo,
            mappings,
            identity_key,
        }
    }

    pub fn resolve(&self, rev: &str) -> Result<Resolution, MgitError> {
        let rev = rev.trim();
        if rev.is_empty() {
            return Err(MgitError::InvalidArgs("empty revision".to_string()));
        }

        let (native_hash, resolved_by) = self
            .by_reference(rev)?
            .map(Ok)
            .or_else(|| self.by_native_hash(rev).transpose())
            .or_else(|| self.by_identity_hash(rev).transpose())
            .unwrap_or_else(|| Err(MgitError::RevisionNotFound(rev.to_string())))?;

        debug!(rev, native = %native_hash, by = %resolved_by, "resolved revision");
        Ok(Resolution {
            native_hash,
            identity_hash: self.mappings.lookup_by_native(&native_hash).map(|e| e.identity_hash),
            resolved_by,
        })
    }

    fn by_reference(&self, rev: &str) -> Result<Option<(Hash, ResolvedBy)>, MgitError> {
        if let Some(hash) = self.repo.find_reference(rev)? {
            return Ok(Some((hash, ResolvedBy::Reference(rev.to_string()))));
        }
        if let Some(hash) = self.repo.find_reference(&format!("{}{}", BRANCH_REF_PREFIX, rev))? {
            return Ok(Some((hash, ResolvedBy::Branch(rev.to_string()))));
        }
        if let Some(hash) = self.repo.find_reference(&format!("{}{}", TAG_REF_PREFIX, rev))? {
            return Ok(Some((hash, ResolvedBy::Tag(rev.to_string()))));
        }
        Ok(None)
    }

    fn by_native_hash(&self, rev: &str) -> Result<Option<(Hash, ResolvedBy)>, MgitError> {
        if !is_hex(rev) || rev.len() < MIN_PREFIX_LEN || rev.len() > HASH_HEX_LEN {
            return Ok(None);
        }
        if rev.len() == HASH_HEX_LEN {
            let hash = Hash::from_hex(rev)?;
            if self.repo.find_commit(&hash)?.is_some() {
                return Ok(Some((hash, ResolvedBy::FullHash)));
            }
            return Ok(None);
        }

        let matches: Vec<Hash> = self
            .repo
            .commit_hashes()?
            .into_iter()
            .filter(|h| h.has_hex_prefix(rev))
            .collect();
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some((*only, ResolvedBy::HashPrefix))),
            _ => Err(MgitError::AmbiguousRevision {
                input: rev.to_string(),
                candidates: matches,
            }),
        }
    }

    fn by_identity_hash(&self, rev: &str) -> Result<Option<(Hash, ResolvedBy)>, MgitError> {
        if self.identity_key.is_none() {
            debug!(rev, "no identity key configured; skipping identity hash lookup");
            return Ok(None);
        }
        if !is_hex(rev) || rev.len() < MIN_PREFIX_LEN || rev.len() > HASH_HEX_LEN {
            return Ok(None);
        }
        let matches = self.mappings.find_identity_prefix(rev);
        match matches.as_slice() {
            [] => Ok(None),
            [only] => Ok(Some((only.native_hash, ResolvedBy::IdentityHash))),
            _ => Err(MgitError::AmbiguousRevision {
                input: rev.to_string(),
                candidates: matches.iter().map(|e| e.identity_hash).collect(),
            }),
        }
    }
}
