use git2::ErrorCode;
use libmgit_core::{MgitError, NativeCommit, Signature};
use tracing::debug;

use crate::engine::{to_git_signature, GitRepository};
use crate::GitError;

/// Commit the staged index on top of HEAD
///
/// `author` is used as both author and committer. An unborn HEAD produces a
/// root commit. Unless `allow_empty` is set, a tree identical to the parent's
/// is refused.
pub fn commit_staged(
    git: &GitRepository,
    message: &str,
    author: &Signature,
    allow_empty: bool,
) -> Result<NativeCommit, GitError> {
    let repo = git.repository();
    let mut index = repo.index()?;
    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit()?),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => None,
        Err(e) => return Err(e.into()),
    };
    if !allow_empty {
        let parent_tree = parent.as_ref().map(|p| p.tree_id());
        let empty_root = parent.is_none() && index.is_empty();
        if parent_tree == Some(tree_id) || empty_root {
            return Err(GitError::NothingToCommit);
        }
    }

    let sig = to_git_signature(author)?;
    let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    debug!(native = %oid, "created native commit");

    git.load_commit(oid)?.ok_or_else(|| {
        GitError::Core(MgitError::Internal(format!("commit {} vanished after creation", oid)))
    })
}
