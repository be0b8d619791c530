use std::fmt;

use crate::error::MgitError;
use crate::types::ids::Hash;

const SYMBOLIC_PREFIX: &str = "ref: ";
const HEADS_PREFIX: &str = "refs/heads/";

/// Contents of `HEAD` in the identity store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    /// `ref: refs/heads/<branch>`; the branch may not exist yet
    Symbolic(String),
    /// Detached at an identity hash
    Direct(Hash),
}

impl Reference {
    /// Parse the text of a `HEAD` file
    pub fn parse(text: &str) -> Result<Self, MgitError> {
        let text = text.trim();
        if let Some(target) = text.strip_prefix(SYMBOLIC_PREFIX) {
            let branch = target.trim().strip_prefix(HEADS_PREFIX).ok_or_else(|| {
                MgitError::InvalidArgs(format!("HEAD points outside refs/heads: {}", target))
            })?;
            validate_branch_name(branch)?;
            return Ok(Reference::Symbolic(branch.to_string()));
        }
        Ok(Reference::Direct(Hash::from_hex(text)?))
    }

    /// File contents, newline terminated
    pub fn to_file_contents(&self) -> String {
        format!("{}\n", self)
    }

    pub fn branch(&self) -> Option<&str> {
        match self {
            Reference::Symbolic(branch) => Some(branch),
            Reference::Direct(_) => None,
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Symbolic(branch) => write!(f, "{}{}{}", SYMBOLIC_PREFIX, HEADS_PREFIX, branch),
            Reference::Direct(hash) => write!(f, "{}", hash),
        }
    }
}

/// Reject branch names that could escape `refs/heads/` or confuse git tooling
pub fn validate_branch_name(name: &str) -> Result<(), MgitError> {
    let invalid = |why: &str| Err(MgitError::InvalidArgs(format!("invalid branch name '{}': {}", name, why)));

    if name.is_empty() {
        return invalid("empty");
    }
    if name.starts_with('/') || name.ends_with('/') || name.contains("//") {
        return invalid("bad slash");
    }
    if name.contains("..") {
        return invalid("contains '..'");
    }
    if name.ends_with(".lock") {
        return invalid("ends with .lock");
    }
    if name
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '\\' | ':' | '?' | '*' | '[' | '~' | '^'))
    {
        return invalid("forbidden character");
    }
    if name.split('/').any(|component| component.starts_with('.')) {
        return invalid("component starts with '.'");
    }
    Ok(())
}
