//! Rebuild the identity graph from native history plus a mapping log
//!
//! Per-commit problems (a mapped commit missing from the native repository,
//! a parent without a mapping, a branch whose tip is unmapped) are reported
//! as warnings and skipped, so the result is the largest consistent partial
//! graph. Store invariant violations abort the run.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use tracing::{info, warn};

use crate::engine::{NativeHead, NativeRepository};
use crate::error::MgitError;
use crate::mapping::MappingStore;
use crate::store::{CommitStore, PutOutcome, Reference};
use crate::types::ids::Hash;
use crate::types::record::ObjectRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructWarning {
    /// A mapping names a native commit the repository does not have
    MissingNativeCommit { native: Hash, identity: Hash },
    /// A native parent has no mapping; it is left out of its children's
    /// identity parents
    UnmappedParent { parent: Hash, children: Vec<Hash> },
    /// Native branch tip has no mapping; the identity branch is left unset
    UnmappedBranch { branch: String, native: Hash },
    /// Branch tip is mapped but its record could not be materialized
    BranchTargetMissing { branch: String, identity: Hash },
}

impl fmt::Display for ReconstructWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconstructWarning::MissingNativeCommit { native, identity } => write!(
                f,
                "native commit {} (identity {}) not found in repository; skipped",
                native.short(),
                identity.short()
            ),
            ReconstructWarning::UnmappedParent { parent, children } => write!(
                f,
                "parent {} has no identity mapping; dropped from {} child commit(s)",
                parent.short(),
                children.len()
            ),
            ReconstructWarning::UnmappedBranch { branch, native } => write!(
                f,
                "branch '{}' points at unmapped commit {}; left unset",
                branch,
                native.short()
            ),
            ReconstructWarning::BranchTargetMissing { branch, identity } => write!(
                f,
                "branch '{}' points at identity commit {} which was not materialized; left unset",
                branch,
                identity.short()
            ),
        }
    }
}

#[derive(Debug, Default)]
pub struct ReconstructReport {
    pub commits_written: usize,
    pub commits_unchanged: usize,
    /// Identity branches written, by name
    pub branches: Vec<(String, Hash)>,
    /// Stale identity branches removed
    pub branches_removed: Vec<String>,
    pub head: Option<Reference>,
    pub warnings: Vec<ReconstructWarning>,
}

impl ReconstructReport {
    pub fn is_complete(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn(&mut self, warning: ReconstructWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Derives identity records and refs for `store` from `repo` and `mappings`
pub struct Reconstructor<'a, R: NativeRepository + ?Sized> {
    repo: &'a R,
    store: &'a CommitStore,
    mappings: &'a MappingStore,
}

impl<'a, R: NativeRepository + ?Sized> Reconstructor<'a, R> {
    pub fn new(repo: &'a R, store: &'a CommitStore, mappings: &'a MappingStore) -> Self {
        Self { repo, store, mappings }
    }

    /// Materialize every mapped commit, then branches, then HEAD
    ///
    /// Safe to re-run: records already present are left untouched and a
    /// conflicting record aborts with `Corruption`.
    pub fn run(&self) -> Result<ReconstructReport, MgitError> {
        let mut report = ReconstructReport::default();
        let materialized = self.materialize_commits(&mut report)?;
        self.rewrite_branches(&materialized, &mut report)?;
        report.head = Some(self.place_head(&materialized)?);

        info!(
            written = report.commits_written,
            unchanged = report.commits_unchanged,
            branches = report.branches.len(),
            warnings = report.warnings.len(),
            "reconstruction finished"
        );
        Ok(report)
    }

    fn materialize_commits(&self, report: &mut ReconstructReport) -> Result<HashSet<Hash>, MgitError> {
        let mut materialized = HashSet::new();
        let mut unmapped: BTreeMap<Hash, Vec<Hash>> = BTreeMap::new();

        for entry in self.mappings.all() {
            let Some(commit) = self.repo.find_commit(&entry.native_hash)? else {
                report.warn(ReconstructWarning::MissingNativeCommit {
                    native: entry.native_hash,
                    identity: entry.identity_hash,
                });
                continue;
            };

            let mut parents = Vec::with_capacity(commit.parent_hashes.len());
            for parent in &commit.parent_hashes {
                match self.mappings.lookup_by_native(parent) {
                    Some(p) => parents.push(p.identity_hash),
                    None => unmapped.entry(*parent).or_default().push(commit.hash),
                }
            }

            let record = ObjectRecord::from_mapping(&commit, entry, parents);
            match self.store.put(&record)? {
                PutOutcome::Unchanged => report.commits_unchanged += 1,
                PutOutcome::Written | PutOutcome::Updated => report.commits_written += 1,
            }
            materialized.insert(entry.identity_hash);
        }

        for (parent, children) in unmapped {
            report.warn(ReconstructWarning::UnmappedParent { parent, children });
        }
        info!(commits = materialized.len(), "materialized identity commits");
        Ok(materialized)
    }

    fn rewrite_branches(&self, materialized: &HashSet<Hash>, report: &mut ReconstructReport) -> Result<(), MgitError> {
        let mut kept = HashSet::new();

        for (branch, native) in self.repo.branches()? {
            let Some(entry) = self.mappings.lookup_by_native(&native) else {
                report.warn(ReconstructWarning::UnmappedBranch { branch, native });
                continue;
            };
            if !materialized.contains(&entry.identity_hash) {
                report.warn(ReconstructWarning::BranchTargetMissing {
                    branch,
                    identity: entry.identity_hash,
                });
                continue;
            }
            self.store.update_ref(&branch, &entry.identity_hash)?;
            kept.insert(branch.clone());
            report.branches.push((branch, entry.identity_hash));
        }

        for (branch, _) in self.store.list_branches()? {
            if !kept.contains(&branch) {
                self.store.delete_ref(&branch)?;
                report.branches_removed.push(branch);
            }
        }
        Ok(())
    }

    fn place_head(&self, materialized: &HashSet<Hash>) -> Result<Reference, MgitError> {
        match self.repo.head()? {
            NativeHead::Symbolic(branch) => {
                self.store.set_head_symbolic(&branch)?;
                Ok(Reference::Symbolic(branch))
            }
            NativeHead::Detached(native) => {
                let identity = self
                    .mappings
                    .lookup_by_native(&native)
                    .map(|e| e.identity_hash)
                    .filter(|h| materialized.contains(h))
                    .ok_or(MgitError::UnresolvedHead(native))?;
                self.store.set_head_detached(&identity)?;
                Ok(Reference::Direct(identity))
            }
        }
    }
}
