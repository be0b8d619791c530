use std::path::PathBuf;

use libmgit_core::config::{KEY_USER_EMAIL, KEY_USER_NAME, KEY_USER_PUBKEY};
use libmgit_core::{CommitStore, ConfigValues, IdentityConfig, MappingStore, MgitError};
use libmgit_git::{ConfigFiles, GitRepository};
use tracing::debug;

use crate::cli::Cli;

/// Directory holding the identity store, next to `.git`
pub const STORE_DIR: &str = ".mgit";

/// Environment variables that override config file values
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("MGIT_USER_NAME", KEY_USER_NAME),
    ("MGIT_USER_EMAIL", KEY_USER_EMAIL),
    ("MGIT_USER_PUBKEY", KEY_USER_PUBKEY),
];

/// Resolved context for an mgit command
pub struct MgitContext {
    pub git: GitRepository,
    pub store_root: PathBuf,
    pub config: ConfigFiles,
}

impl MgitContext {
    /// Find the repository around the working directory
    pub fn discover(cli: &Cli) -> Result<Self, MgitError> {
        let cwd = working_dir(cli)?;
        let git = GitRepository::discover(&cwd)?;
        let store_root = git.workdir().unwrap_or_else(|| git.git_dir()).join(STORE_DIR);
        let config = ConfigFiles::new(&store_root, home_dir().as_deref());
        debug!(store = %store_root.display(), "resolved repository");
        Ok(Self {
            git,
            store_root,
            config,
        })
    }

    pub fn open_store(&self) -> Result<CommitStore, MgitError> {
        CommitStore::open(&self.store_root)
    }

    pub fn open_mappings(&self) -> Result<MappingStore, MgitError> {
        MappingStore::open(&self.store_root)
    }

    /// Effective identity: environment, then local config, then global config
    pub fn identity(&self) -> Result<IdentityConfig, MgitError> {
        Ok(self.config.load_identity(&env_overrides()?)?)
    }
}

/// Config files usable for `mgit config --global` outside any repository
pub fn global_only_config(cli: &Cli) -> Result<ConfigFiles, MgitError> {
    let cwd = working_dir(cli)?;
    let home = home_dir()
        .ok_or_else(|| MgitError::NotFound("home directory for the global config".to_string()))?;
    Ok(ConfigFiles::new(&cwd.join(STORE_DIR), Some(home.as_path())))
}

fn working_dir(cli: &Cli) -> Result<PathBuf, MgitError> {
    match &cli.directory {
        Some(dir) => Ok(dir.clone()),
        None => Ok(std::env::current_dir()?),
    }
}

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
}

fn env_overrides() -> Result<ConfigValues, MgitError> {
    let mut values = ConfigValues::default();
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = std::env::var(var) {
            debug!(var, "config value from environment");
            values.set(key, value)?;
        }
    }
    Ok(values)
}
