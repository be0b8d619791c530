//! libgit2-backed native engine for mgit
//!
//! - [`GitRepository`] implements the core's `NativeRepository` contract
//! - [`commit_staged`] turns the staged index into a native commit
//! - [`ConfigFiles`] reads and writes the git-style INI config files

mod error;
mod engine;
mod commit;
mod config;

pub use error::GitError;
pub use engine::{hash_to_oid, oid_to_hash, GitRepository};
pub use commit::commit_staged;
pub use config::{global_config_path, ConfigFiles, ConfigScope};
