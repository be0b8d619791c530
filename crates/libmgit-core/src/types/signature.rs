use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::MgitError;

/// External public key bound into identity hashes (e.g. a nostr `npub`)
///
/// The key is embedded verbatim in the hash preimage text, so it must be
/// non-empty and free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Result<Self, MgitError> {
        let key = key.into();
        if key.is_empty() {
            return Err(MgitError::InvalidArgs("identity key is empty".to_string()));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(MgitError::InvalidArgs(format!(
                "identity key contains whitespace: {:?}",
                key
            )));
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IdentityKey {
    type Error = MgitError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IdentityKey> for String {
    fn from(key: IdentityKey) -> Self {
        key.0
    }
}

impl FromStr for IdentityKey {
    type Err = MgitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Author or committer of a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    /// Present only on identity-bound commits
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_key: Option<IdentityKey>,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>, when: DateTime<FixedOffset>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            identity_key: None,
            when,
        }
    }

    pub fn with_identity_key(mut self, key: IdentityKey) -> Self {
        self.identity_key = Some(key);
        self
    }

    /// Seconds since the Unix epoch, the only time component that is hashed
    pub fn unix_time(&self) -> i64 {
        self.when.timestamp()
    }

    /// `Name <email>` as shown in logs
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}
