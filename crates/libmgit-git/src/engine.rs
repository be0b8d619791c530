//! Native commits and references read through libgit2

use std::path::Path;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::{BranchType, ErrorCode, ObjectType, Oid, Repository};
use libmgit_core::engine::BRANCH_REF_PREFIX;
use libmgit_core::{Hash, MgitError, NativeCommit, NativeHead, NativeRepository, Signature};
use tracing::debug;

use crate::GitError;

/// Convert a libgit2 object id into a core hash
pub fn oid_to_hash(oid: Oid) -> Result<Hash, GitError> {
    Hash::from_slice(oid.as_bytes()).map_err(|e| GitError::Core(e.into()))
}

pub fn hash_to_oid(hash: &Hash) -> Result<Oid, GitError> {
    Ok(Oid::from_bytes(hash.as_bytes())?)
}

/// Lookup failures that mean "no such thing" rather than a broken repository
fn is_absent(e: &git2::Error) -> bool {
    matches!(
        e.code(),
        ErrorCode::NotFound | ErrorCode::InvalidSpec | ErrorCode::UnbornBranch | ErrorCode::Peel
    )
}

pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    pub fn open(path: &Path) -> Result<Self, GitError> {
        Ok(Self {
            repo: Repository::open(path)?,
        })
    }

    /// Find the repository containing `path`, walking up parents
    pub fn discover(path: &Path) -> Result<Self, GitError> {
        let repo = Repository::discover(path).map_err(|_| GitError::NotARepo)?;
        Ok(Self { repo })
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.repo.workdir()
    }

    /// Shared `.git` directory (the main one for worktrees)
    pub fn git_dir(&self) -> &Path {
        self.repo.commondir()
    }

    pub(crate) fn load_commit(&self, oid: Oid) -> Result<Option<NativeCommit>, GitError> {
        let object = match self.repo.find_object(oid, None) {
            Ok(object) => object,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let Ok(commit) = object.into_commit() else {
            return Ok(None);
        };

        let parent_hashes = commit
            .parent_ids()
            .map(oid_to_hash)
            .collect::<Result<Vec<_>, _>>()?;
        let native = NativeCommit {
            hash: oid_to_hash(commit.id())?,
            tree_hash: oid_to_hash(commit.tree_id())?,
            parent_hashes,
            author: convert_signature(&commit.author())?,
            committer: convert_signature(&commit.committer())?,
            message: utf8_field(commit.message_raw_bytes(), "message")
                .map_err(|e| GitError::Core(MgitError::Engine(format!("commit {}: {}", oid, e))))?,
        };
        Ok(Some(native))
    }

    fn local_branches(&self) -> Result<Vec<(String, Hash)>, GitError> {
        let mut out = Vec::new();
        for branch in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = branch?;
            let Some(name) = branch.name()?.map(str::to_string) else {
                debug!("skipping branch with non UTF-8 name");
                continue;
            };
            match branch.get().peel_to_commit() {
                Ok(commit) => out.push((name, oid_to_hash(commit.id())?)),
                Err(e) if is_absent(&e) => debug!(branch = %name, "branch does not point at a commit"),
                Err(e) => return Err(e.into()),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn native_head(&self) -> Result<NativeHead, GitError> {
        let head = self.repo.find_reference("HEAD")?;
        if let Some(target) = head.symbolic_target() {
            let branch = target.strip_prefix(BRANCH_REF_PREFIX).ok_or_else(|| {
                GitError::Core(MgitError::Engine(format!("HEAD points outside refs/heads: {}", target)))
            })?;
            return Ok(NativeHead::Symbolic(branch.to_string()));
        }
        let oid = head
            .target()
            .ok_or_else(|| GitError::Core(MgitError::Engine("HEAD has no target".to_string())))?;
        Ok(NativeHead::Detached(oid_to_hash(oid)?))
    }

    fn reference_target(&self, name: &str) -> Result<Option<Hash>, GitError> {
        let reference = match self.repo.find_reference(name) {
            Ok(r) => r,
            Err(e) if is_absent(&e) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match reference.peel_to_commit() {
            Ok(commit) => Ok(Some(oid_to_hash(commit.id())?)),
            Err(e) if is_absent(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn all_commit_hashes(&self) -> Result<Vec<Hash>, GitError> {
        let odb = self.repo.odb()?;
        let mut oids = Vec::new();
        odb.foreach(|oid| {
            oids.push(*oid);
            true
        })?;
        oids.sort();
        oids.dedup();

        let mut out = Vec::new();
        for oid in oids {
            let (_, kind) = odb.read_header(oid)?;
            if kind == ObjectType::Commit {
                out.push(oid_to_hash(oid)?);
            }
        }
        Ok(out)
    }
}

impl NativeRepository for GitRepository {
    fn find_commit(&self, hash: &Hash) -> Result<Option<NativeCommit>, MgitError> {
        Ok(self.load_commit(hash_to_oid(hash)?)?)
    }

    fn branches(&self) -> Result<Vec<(String, Hash)>, MgitError> {
        Ok(self.local_branches()?)
    }

    fn head(&self) -> Result<NativeHead, MgitError> {
        Ok(self.native_head()?)
    }

    fn find_reference(&self, name: &str) -> Result<Option<Hash>, MgitError> {
        Ok(self.reference_target(name)?)
    }

    fn commit_hashes(&self) -> Result<Vec<Hash>, MgitError> {
        Ok(self.all_commit_hashes()?)
    }
}

/// Convert a libgit2 signature; non UTF-8 names are decoded lossily
pub(crate) fn convert_signature(sig: &git2::Signature<'_>) -> Result<Signature, GitError> {
    let time = sig.when();
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60).unwrap_or(Utc.fix());
    let when: DateTime<FixedOffset> = DateTime::<Utc>::from_timestamp(time.seconds(), 0)
        .ok_or_else(|| GitError::Core(MgitError::Engine(format!("timestamp out of range: {}", time.seconds()))))?
        .with_timezone(&offset);
    let name = utf8_field(sig.name_bytes(), "signature name").map_err(|e| GitError::Core(MgitError::Engine(e)))?;
    let email = utf8_field(sig.email_bytes(), "signature email").map_err(|e| GitError::Core(MgitError::Engine(e)))?;
    Ok(Signature::new(name, email, when))
}

/// Identity hashes are computed over these bytes, so they are never decoded lossily
fn utf8_field(bytes: &[u8], field: &str) -> Result<String, String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| format!("{} is not valid UTF-8", field))
}

/// Build a libgit2 signature carrying the same name, email and time
pub(crate) fn to_git_signature(sig: &Signature) -> Result<git2::Signature<'static>, GitError> {
    let offset_minutes = sig.when.offset().local_minus_utc() / 60;
    let time = git2::Time::new(sig.unix_time(), offset_minutes);
    Ok(git2::Signature::new(&sig.name, &sig.email, &time)?)
}
