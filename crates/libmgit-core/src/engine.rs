//! Contract with the underlying version-control engine
//!
//! The core only ever reads native objects. `libmgit-git` implements
//! [`NativeRepository`] over libgit2; [`MemoryRepository`] is an in-memory
//! engine whose hashes are chosen by the caller.

use std::collections::BTreeMap;

use crate::error::MgitError;
use crate::types::ids::Hash;
use crate::types::signature::Signature;

/// Prefix of local branch references
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Prefix of tag references
pub const TAG_REF_PREFIX: &str = "refs/tags/";

/// A commit as the native engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCommit {
    pub hash: Hash,
    pub tree_hash: Hash,
    pub parent_hashes: Vec<Hash>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

/// State of the native HEAD
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeHead {
    /// Points at a local branch (short name), which may not exist yet
    Symbolic(String),
    /// Detached at a commit
    Detached(Hash),
}

/// Read access to native commits and references
pub trait NativeRepository {
    /// Fetch a native commit; `Ok(None)` when no such commit exists
    fn find_commit(&self, hash: &Hash) -> Result<Option<NativeCommit>, MgitError>;

    /// Local branches as (short name, target commit)
    fn branches(&self) -> Result<Vec<(String, Hash)>, MgitError>;

    fn head(&self) -> Result<NativeHead, MgitError>;

    /// Resolve a full reference name (or `HEAD`) to the commit it points at
    fn find_reference(&self, name: &str) -> Result<Option<Hash>, MgitError>;

    /// Every commit object in the repository, reachable or not
    fn commit_hashes(&self) -> Result<Vec<Hash>, MgitError>;
}

/// In-memory native engine
#[derive(Debug, Clone)]
pub struct MemoryRepository {
    commits: BTreeMap<Hash, NativeCommit>,
    refs: BTreeMap<String, Hash>,
    head: NativeHead,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            commits: BTreeMap::new(),
            refs: BTreeMap::new(),
            head: NativeHead::Symbolic("main".to_string()),
        }
    }

    pub fn add_commit(&mut self, commit: NativeCommit) {
        self.commits.insert(commit.hash, commit);
    }

    pub fn set_branch(&mut self, name: &str, target: Hash) {
        self.refs.insert(format!("{}{}", BRANCH_REF_PREFIX, name), target);
    }

    pub fn set_tag(&mut self, name: &str, target: Hash) {
        self.refs.insert(format!("{}{}", TAG_REF_PREFIX, name), target);
    }

    pub fn set_head(&mut self, head: NativeHead) {
        self.head = head;
    }
}

impl NativeRepository for MemoryRepository {
    fn find_commit(&self, hash: &Hash) -> Result<Option<NativeCommit>, MgitError> {
        Ok(self.commits.get(hash).cloned())
    }

    fn branches(&self) -> Result<Vec<(String, Hash)>, MgitError> {
        Ok(self
            .refs
            .iter()
            .filter_map(|(name, target)| {
                name.strip_prefix(BRANCH_REF_PREFIX)
                    .map(|short| (short.to_string(), *target))
            })
            .collect())
    }

    fn head(&self) -> Result<NativeHead, MgitError> {
        Ok(self.head.clone())
    }

    fn find_reference(&self, name: &str) -> Result<Option<Hash>, MgitError> {
        if name == "HEAD" {
            return match &self.head {
                NativeHead::Detached(hash) => Ok(Some(*hash)),
                NativeHead::Symbolic(branch) => {
                    Ok(self.refs.get(&format!("{}{}", BRANCH_REF_PREFIX, branch)).copied())
                }
            };
        }
        Ok(self.refs.get(name).copied())
    }

    fn commit_hashes(&self) -> Result<Vec<Hash>, MgitError> {
        Ok(self.commits.keys().copied().collect())
    }
}
