//! Caller identity threaded into commit binding and revision resolution

use chrono::{DateTime, FixedOffset};

use crate::error::MgitError;
use crate::types::signature::{IdentityKey, Signature};

pub const KEY_USER_NAME: &str = "user.name";
pub const KEY_USER_EMAIL: &str = "user.email";
pub const KEY_USER_PUBKEY: &str = "user.pubkey";

/// Config keys the identity is built from
pub const IDENTITY_KEYS: &[&str] = &[KEY_USER_NAME, KEY_USER_EMAIL, KEY_USER_PUBKEY];

/// Raw values from one configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValues {
    pub name: Option<String>,
    pub email: Option<String>,
    pub pubkey: Option<String>,
}

impl ConfigValues {
    /// Store a value by its dotted key; unknown keys are rejected
    pub fn set(&mut self, key: &str, value: String) -> Result<(), MgitError> {
        match key {
            KEY_USER_NAME => self.name = Some(value),
            KEY_USER_EMAIL => self.email = Some(value),
            KEY_USER_PUBKEY => self.pubkey = Some(value),
            other => return Err(MgitError::InvalidArgs(format!("unknown config key '{}'", other))),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            KEY_USER_NAME => self.name.as_deref(),
            KEY_USER_EMAIL => self.email.as_deref(),
            KEY_USER_PUBKEY => self.pubkey.as_deref(),
            _ => None,
        }
    }
}

/// Who is committing, and with which identity key (if any)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityConfig {
    pub name: Option<String>,
    pub email: Option<String>,
    pub identity_key: Option<IdentityKey>,
}

impl IdentityConfig {
    /// Merge sources, highest priority first; empty values count as unset
    pub fn from_layers<'a>(layers: impl IntoIterator<Item = &'a ConfigValues>) -> Result<Self, MgitError> {
        let mut name = None;
        let mut email = None;
        let mut pubkey = None;
        for layer in layers {
            name = name.or_else(|| non_empty(&layer.name));
            email = email.or_else(|| non_empty(&layer.email));
            pubkey = pubkey.or_else(|| non_empty(&layer.pubkey));
        }
        Ok(Self {
            name,
            email,
            identity_key: pubkey.map(IdentityKey::new).transpose()?,
        })
    }

    /// Author signature for a new commit; name and email are required
    pub fn author_signature(&self, when: DateTime<FixedOffset>) -> Result<Signature, MgitError> {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => Ok(Signature::new(name.clone(), email.clone(), when)),
            _ => Err(MgitError::InvalidArgs(
                "user.name and user.email must be set to commit".to_string(),
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(name: Option<&str>, email: Option<&str>, pubkey: Option<&str>) -> ConfigValues {
        ConfigValues {
            name: name.map(String::from),
            email: email.map(String::from),
            pubkey: pubkey.map(String::from),
        }
    }

    #[test]
    fn test_layers_take_first_set_value() {
        let env = values(None, Some("env@example.com"), None);
        let local = values(Some("Local"), Some("local@example.com"), Some(""));
        let global = values(Some("Global"), None, Some("npub1global"));

        let cfg = IdentityConfig::from_layers([&env, &local, &global]).unwrap();
        assert_eq!(cfg.name.as_deref(), Some("Local"));
        assert_eq!(cfg.email.as_deref(), Some("env@example.com"));
        assert_eq!(cfg.identity_key.unwrap().as_str(), "npub1global");
    }

    #[test]
    fn test_invalid_pubkey_is_rejected() {
        let layer = values(None, None, Some("npub1 with space"));
        assert!(IdentityConfig::from_layers([&layer]).is_err());
    }

    #[test]
    fn test_author_signature_requires_name_and_email() {
        let when = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap();
        let cfg = IdentityConfig {
            name: Some("Alice".to_string()),
            ..Default::default()
        };
        let err = cfg.author_signature(when).unwrap_err();
        assert!(!err.suggestions().is_empty());

        let cfg = IdentityConfig {
            email: Some("alice@example.com".to_string()),
            ..cfg
        };
        let sig = cfg.author_signature(when).unwrap();
        assert_eq!(sig.display_name(), "Alice <alice@example.com>");
        assert!(sig.identity_key.is_none());
    }

    #[test]
    fn test_config_values_keys() {
        let mut v = ConfigValues::default();
        v.set("user.pubkey", "npub1x".to_string()).unwrap();
        assert_eq!(v.get("user.pubkey"), Some("npub1x"));
        assert!(v.set("core.editor", "vi".to_string()).is_err());
    }
}
