//! Read-only consistency check of the identity graph

use std::fmt;

use tracing::{debug, warn};

use crate::engine::{NativeCommit, NativeRepository};
use crate::error::MgitError;
use crate::mapping::MappingStore;
use crate::store::CommitStore;
use crate::types::ids::Hash;
use crate::types::record::ObjectRecord;
use crate::walk::walk_history;

/// Kind of problem found for one identity commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyIssue {
    /// Stored fields do not hash to the stored identity hash
    HashMismatch { hash: Hash, computed: Hash },
    /// Referenced identity object could not be loaded
    MissingObject { hash: Hash, reason: String },
    /// Native commit named by the record is not in the repository
    MissingNative { hash: Hash, native: Hash },
    /// Record disagrees with its native commit
    NativeDivergence { hash: Hash, native: Hash, field: &'static str },
    /// No mapping entry for the record's native hash
    Unmapped { hash: Hash, native: Hash },
    /// Mapping entry binds the native hash to another identity hash
    MappingMismatch { hash: Hash, native: Hash, mapped: Hash },
}

impl VerifyIssue {
    pub fn hash(&self) -> &Hash {
        match self {
            VerifyIssue::HashMismatch { hash, .. }
            | VerifyIssue::MissingObject { hash, .. }
            | VerifyIssue::MissingNative { hash, .. }
            | VerifyIssue::NativeDivergence { hash, .. }
            | VerifyIssue::Unmapped { hash, .. }
            | VerifyIssue::MappingMismatch { hash, .. } => hash,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VerifyIssue::HashMismatch { .. } => "hash_mismatch",
            VerifyIssue::MissingObject { .. } => "missing_object",
            VerifyIssue::MissingNative { .. } => "missing_native",
            VerifyIssue::NativeDivergence { .. } => "native_divergence",
            VerifyIssue::Unmapped { .. } => "unmapped",
            VerifyIssue::MappingMismatch { .. } => "mapping_mismatch",
        }
    }
}

impl fmt::Display for VerifyIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyIssue::HashMismatch { hash, computed } => {
                write!(f, "{}: stored hash, content hashes to {}", hash, computed)
            }
            VerifyIssue::MissingObject { hash, reason } => write!(f, "{}: unreadable ({})", hash, reason),
            VerifyIssue::MissingNative { hash, native } => {
                write!(f, "{}: native commit {} not found", hash, native)
            }
            VerifyIssue::NativeDivergence { hash, native, field } => {
                write!(f, "{}: {} differs from native commit {}", hash, field, native)
            }
            VerifyIssue::Unmapped { hash, native } => {
                write!(f, "{}: no mapping for native commit {}", hash, native)
            }
            VerifyIssue::MappingMismatch { hash, native, mapped } => write!(
                f,
                "{}: native commit {} is mapped to {}",
                hash, native, mapped
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Identity HEAD the walk started from
    pub head: Option<Hash>,
    pub checked: usize,
    pub valid: usize,
    pub issues: Vec<VerifyIssue>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check every identity commit reachable from identity HEAD
///
/// For each record: the identity hash is recomputed from stored fields, the
/// record is compared with its native commit, and the mapping log is
/// consulted. Nothing is written; every issue is collected.
pub fn verify_chain<R: NativeRepository + ?Sized>(
    store: &CommitStore,
    mappings: &MappingStore,
    repo: &R,
) -> Result<VerifyReport, MgitError> {
    let mut report = VerifyReport::default();
    let Some(head) = store.resolve_head()? else {
        debug!("identity HEAD is unborn; nothing to verify");
        return Ok(report);
    };
    report.head = Some(head);

    let history = walk_history(store, head, None);
    for (hash, reason) in history.unreadable {
        report.issues.push(VerifyIssue::MissingObject { hash, reason });
    }

    for record in &history.commits {
        report.checked += 1;
        let before = report.issues.len();
        check_record(record, mappings, repo, &mut report.issues)?;
        if report.issues.len() == before {
            report.valid += 1;
        }
    }

    for issue in &report.issues {
        warn!(kind = issue.kind(), "{}", issue);
    }
    Ok(report)
}

fn check_record<R: NativeRepository + ?Sized>(
    record: &ObjectRecord,
    mappings: &MappingStore,
    repo: &R,
    issues: &mut Vec<VerifyIssue>,
) -> Result<(), MgitError> {
    let hash = record.identity_hash;
    let native = record.native_hash;

    let computed = record.compute_hash();
    if computed != hash {
        issues.push(VerifyIssue::HashMismatch { hash, computed });
    }

    match repo.find_commit(&native)? {
        None => issues.push(VerifyIssue::MissingNative { hash, native }),
        Some(commit) => {
            if let Some(field) = divergent_field(record, &commit, mappings) {
                issues.push(VerifyIssue::NativeDivergence { hash, native, field });
            }
        }
    }

    match mappings.lookup_by_native(&native) {
        None => issues.push(VerifyIssue::Unmapped { hash, native }),
        Some(entry) if entry.identity_hash != hash => issues.push(VerifyIssue::MappingMismatch {
            hash,
            native,
            mapped: entry.identity_hash,
        }),
        Some(_) => {}
    }
    Ok(())
}

/// First field in which the record departs from the native commit
fn divergent_field(record: &ObjectRecord, commit: &NativeCommit, mappings: &MappingStore) -> Option<&'static str> {
    if record.tree_hash != commit.tree_hash {
        return Some("tree");
    }
    if record.native_parent_hashes != commit.parent_hashes {
        return Some("parents");
    }
    let expected_parents: Vec<Hash> = commit
        .parent_hashes
        .iter()
        .filter_map(|p| mappings.lookup_by_native(p).map(|e| e.identity_hash))
        .collect();
    if record.parent_hashes != expected_parents {
        return Some("identity parents");
    }
    if record.message != commit.message {
        return Some("message");
    }
    let same_person = |a: &crate::types::signature::Signature, b: &crate::types::signature::Signature| {
        a.name == b.name && a.email == b.email && a.unix_time() == b.unix_time()
    };
    if !same_person(&record.author, &commit.author) {
        return Some("author");
    }
    if !same_person(&record.committer, &commit.committer) {
        return Some("committer");
    }
    None
}
