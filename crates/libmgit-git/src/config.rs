//! Git-style INI config files (`[user]` / `pubkey = ...`)
//!
//! Two files are consulted: the store-local `config` and the global
//! `~/.mgitconfig`. Values set in the local file win.

use std::fmt;
use std::path::{Path, PathBuf};

use git2::{Config, ErrorCode};
use libmgit_core::config::IDENTITY_KEYS;
use libmgit_core::{ConfigValues, IdentityConfig, IdentityKey};
use tracing::debug;

use crate::GitError;

pub const GLOBAL_CONFIG_FILE: &str = ".mgitconfig";
pub const LOCAL_CONFIG_FILE: &str = "config";

/// Location of the global config file under `home`
pub fn global_config_path(home: &Path) -> PathBuf {
    home.join(GLOBAL_CONFIG_FILE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigScope {
    Local,
    Global,
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigScope::Local => f.write_str("local"),
            ConfigScope::Global => f.write_str("global"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigFiles {
    pub local: PathBuf,
    pub global: Option<PathBuf>,
}

impl ConfigFiles {
    /// Config files for the store at `store_root`
    pub fn new(store_root: &Path, home: Option<&Path>) -> Self {
        Self {
            local: store_root.join(LOCAL_CONFIG_FILE),
            global: home.map(global_config_path),
        }
    }

    fn path(&self, scope: ConfigScope) -> Result<&Path, GitError> {
        match scope {
            ConfigScope::Local => Ok(&self.local),
            ConfigScope::Global => self
                .global
                .as_deref()
                .ok_or_else(|| GitError::Config("no home directory for the global config".to_string())),
        }
    }

    /// Identity values held in one file
    pub fn read_scope(&self, scope: ConfigScope) -> Result<ConfigValues, GitError> {
        let mut values = ConfigValues::default();
        let path = match self.path(scope) {
            Ok(path) => path,
            Err(_) => return Ok(values),
        };
        if !path.exists() {
            return Ok(values);
        }
        let config = Config::open(path)?;
        for key in IDENTITY_KEYS {
            match config.get_string(key) {
                Ok(value) => values.set(key, value)?,
                Err(e) if e.code() == ErrorCode::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(path = %path.display(), "read config");
        Ok(values)
    }

    /// Merge `overrides`, the local file and the global file, in that order
    pub fn load_identity(&self, overrides: &ConfigValues) -> Result<IdentityConfig, GitError> {
        let local = self.read_scope(ConfigScope::Local)?;
        let global = self.read_scope(ConfigScope::Global)?;
        Ok(IdentityConfig::from_layers([overrides, &local, &global])?)
    }

    /// Effective value of `key` with the scope it came from
    pub fn get(&self, key: &str) -> Result<Option<(String, ConfigScope)>, GitError> {
        check_key(key)?;
        for scope in [ConfigScope::Local, ConfigScope::Global] {
            if let Some(value) = self.read_scope(scope)?.get(key) {
                return Ok(Some((value.to_string(), scope)));
            }
        }
        Ok(None)
    }

    pub fn set(&self, scope: ConfigScope, key: &str, value: &str) -> Result<(), GitError> {
        check_key(key)?;
        if key == libmgit_core::config::KEY_USER_PUBKEY {
            IdentityKey::new(value)?;
        }
        let path = self.path(scope)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut config = Config::open(path)?;
        config.set_str(key, value)?;
        debug!(key, %scope, "wrote config value");
        Ok(())
    }

    /// Every identity key with its effective value
    pub fn list(&self) -> Result<Vec<(String, String, ConfigScope)>, GitError> {
        let mut out = Vec::new();
        for key in IDENTITY_KEYS {
            if let Some((value, scope)) = self.get(key)? {
                out.push((key.to_string(), value, scope));
            }
        }
        Ok(out)
    }
}

fn check_key(key: &str) -> Result<(), GitError> {
    if IDENTITY_KEYS.contains(&key) {
        Ok(())
    } else {
        Err(GitError::Config(format!(
            "unknown config key '{}' (expected one of {})",
            key,
            IDENTITY_KEYS.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files(dir: &TempDir) -> ConfigFiles {
        ConfigFiles::new(&dir.path().join(".mgit"), Some(&dir.path().join("home")))
    }

    #[test]
    fn test_local_overrides_global() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir);
        files.set(ConfigScope::Global, "user.name", "Global Name").unwrap();
        files.set(ConfigScope::Global, "user.pubkey", "npub1global").unwrap();
        files.set(ConfigScope::Local, "user.name", "Local Name").unwrap();

        assert_eq!(
            files.get("user.name").unwrap(),
            Some(("Local Name".to_string(), ConfigScope::Local))
        );
        assert_eq!(
            files.get("user.pubkey").unwrap(),
            Some(("npub1global".to_string(), ConfigScope::Global))
        );
        assert_eq!(files.get("user.email").unwrap(), None);
        assert_eq!(files.list().unwrap().len(), 2);
    }

    #[test]
    fn test_overrides_win() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir);
        files.set(ConfigScope::Local, "user.email", "local@example.com").unwrap();

        let overrides = ConfigValues {
            email: Some("env@example.com".to_string()),
            ..Default::default()
        };
        let identity = files.load_identity(&overrides).unwrap();
        assert_eq!(identity.email.as_deref(), Some("env@example.com"));
        assert!(identity.identity_key.is_none());
    }

    #[test]
    fn test_file_is_git_style_ini() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir);
        files.set(ConfigScope::Local, "user.pubkey", "npub1abc").unwrap();
        let text = std::fs::read_to_string(&files.local).unwrap();
        assert!(text.contains("[user]"), "{}", text);
        assert!(text.contains("pubkey = npub1abc"), "{}", text);
    }

    #[test]
    fn test_rejects_unknown_key_and_bad_pubkey() {
        let dir = TempDir::new().unwrap();
        let files = files(&dir);
        assert!(matches!(files.set(ConfigScope::Local, "core.editor", "vi"), Err(GitError::Config(_))));
        assert!(files.set(ConfigScope::Local, "user.pubkey", "has space").is_err());
        assert!(!files.local.exists());
    }

    #[test]
    fn test_missing_home_has_no_global_values() {
        let dir = TempDir::new().unwrap();
        let files = ConfigFiles::new(dir.path(), None);
        assert_eq!(files.read_scope(ConfigScope::Global).unwrap(), ConfigValues::default());
        assert!(files.set(ConfigScope::Global, "user.name", "x").is_err());
    }
}
