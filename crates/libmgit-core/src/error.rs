use thiserror::Error;

use crate::types::ids::{Hash, IdParseError};

/// Main error type for mgit operations
#[derive(Debug, Error)]
pub enum MgitError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Stored hash disagrees with the hash recomputed from the record
    #[error("corrupt object {hash}: content hashes to {computed}")]
    Corruption { hash: Hash, computed: Hash },

    /// Two different identity hashes claimed for one native hash
    #[error("mapping conflict for native commit {native}: already mapped to {existing}, refusing {claimed}")]
    MappingConflict {
        native: Hash,
        existing: Hash,
        claimed: Hash,
    },

    #[error("ambiguous revision '{input}' matches {} commits", candidates.len())]
    AmbiguousRevision { input: String, candidates: Vec<Hash> },

    #[error("revision not found: {0}")]
    RevisionNotFound(String),

    #[error("cannot place HEAD: detached native HEAD {0} has no identity mapping")]
    UnresolvedHead(Hash),

    /// `verify` found at least one problem
    #[error("verification failed: {0} issue(s) found")]
    VerificationFailed(usize),

    #[error("cannot initialize store: {0}")]
    StorageInit(String),

    #[error("invalid mapping payload: {0}")]
    InvalidMapping(String),

    #[error("store busy: {0}")]
    StoreBusy(String),

    #[error("version control engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ID parse error: {0}")]
    IdParse(#[from] IdParseError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl MgitError {
    /// Get the error code for JSON output
    pub fn error_code(&self) -> &'static str {
        match self {
            MgitError::InvalidArgs(_) => "invalid_args",
            MgitError::NotFound(_) => "not_found",
            MgitError::Corruption { .. } => "corruption",
            MgitError::MappingConflict { .. } => "mapping_conflict",
            MgitError::AmbiguousRevision { .. } => "ambiguous_revision",
            MgitError::RevisionNotFound(_) => "revision_not_found",
            MgitError::UnresolvedHead(_) => "unresolved_head",
            MgitError::VerificationFailed(_) => "verification_failed",
            MgitError::StorageInit(_) => "storage_init",
            MgitError::InvalidMapping(_) => "invalid_mapping",
            MgitError::StoreBusy(_) => "store_busy",
            MgitError::Engine(_) => "engine_error",
            MgitError::Io(_) => "io_error",
            MgitError::Json(_) => "internal_error",
            MgitError::IdParse(_) => "invalid_args",
            MgitError::Internal(_) => "internal_error",
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        match self {
            MgitError::InvalidArgs(_) => 2,
            MgitError::IdParse(_) => 2,
            MgitError::InvalidMapping(_) => 2,
            MgitError::NotFound(_) => 3,
            MgitError::RevisionNotFound(_) => 3,
            MgitError::AmbiguousRevision { .. } => 3,
            MgitError::MappingConflict { .. } => 4,
            MgitError::StoreBusy(_) => 5,
            MgitError::Io(_) => 5,
            MgitError::Corruption { .. } => 6,
            MgitError::UnresolvedHead(_) => 6,
            MgitError::VerificationFailed(_) => 6,
            _ => 1,
        }
    }

    /// Get actionable suggestions for fixing the error
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            MgitError::NotFound(msg) if msg.contains("store") => {
                vec!["Run 'mgit init' to create the identity store"]
            }
            MgitError::NotFound(msg) if msg.contains("HEAD") => {
                vec!["Commit with an identity key, or run 'mgit reconstruct'"]
            }
            MgitError::AmbiguousRevision { .. } => {
                vec!["Use a longer hash prefix"]
            }
            MgitError::RevisionNotFound(_) => vec![
                "Check the branch or tag name",
                "Set 'user.pubkey' to also search identity hashes",
            ],
            MgitError::StoreBusy(_) => vec![
                "Wait for the other mgit process to finish",
            ],
            MgitError::Corruption { .. } => vec![
                "Run 'mgit verify' to list every mismatch",
                "Do not overwrite the object; restore it from a trusted copy",
            ],
            MgitError::VerificationFailed(_) => vec![
                "Run 'mgit reconstruct' if objects are missing but the mapping table is intact",
            ],
            MgitError::MappingConflict { .. } => vec![
                "The mapping table may have been tampered with; compare it with the source",
            ],
            MgitError::UnresolvedHead(_) => vec![
                "Check out a branch, or import a mapping table that covers HEAD",
            ],
            MgitError::InvalidArgs(msg) if msg.contains("user.") => vec![
                "mgit config --global user.name \"Your Name\"",
                "mgit config --global user.email \"you@example.com\"",
            ],
            _ => vec![],
        }
    }

    /// Create a NotFound error for an object with a shortened hash
    pub fn object_not_found(hash: &Hash) -> Self {
        MgitError::NotFound(format!("object {}", hash.short()))
    }
}
