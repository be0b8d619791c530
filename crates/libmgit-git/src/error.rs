use libmgit_core::MgitError;
use thiserror::Error;

/// Errors that can occur during Git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Nothing to commit: staged tree matches HEAD")]
    NothingToCommit,

    #[error("Not a git repository (or any parent)")]
    NotARepo,

    #[error(transparent)]
    Core(#[from] MgitError),
}

impl From<GitError> for MgitError {
    fn from(err: GitError) -> Self {
        match err {
            GitError::Core(e) => e,
            GitError::Io(e) => MgitError::Io(e),
            GitError::Config(msg) => MgitError::InvalidArgs(msg),
            GitError::NothingToCommit => MgitError::InvalidArgs(err.to_string()),
            GitError::NotARepo => MgitError::NotFound(err.to_string()),
            GitError::Git(e) => MgitError::Engine(e.message().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_keeps_core_errors() {
        let core = MgitError::RevisionNotFound("x".to_string());
        let back: MgitError = GitError::Core(core).into();
        assert_eq!(back.error_code(), "revision_not_found");

        let back: MgitError = GitError::NotARepo.into();
        assert_eq!(back.exit_code(), 3);

        let back: MgitError = GitError::Git(git2::Error::from_str("boom")).into();
        assert_eq!(back.error_code(), "engine_error");
    }
}
