//! Identity-bound commit graph for mgit
//!
//! Every commit made with an identity key gets a second identifier whose hash
//! input includes that key. This crate holds everything that works on that
//! parallel graph without touching libgit2:
//! - the identity hash function
//! - the content-addressed commit store and its references
//! - the native <-> identity mapping log
//! - reconstruction, revision resolution and verification

pub mod types;
pub mod hash;
pub mod store;
pub mod mapping;
pub mod engine;
pub mod walk;
pub mod commit;
pub mod reconstruct;
pub mod resolve;
pub mod integrity;
pub mod config;
pub mod error;
mod fsio;

pub use error::MgitError;
pub use types::ids::Hash;
pub use types::signature::{IdentityKey, Signature};
pub use types::record::{ObjectRecord, RecordType};
pub use types::mapping::MappingEntry;
pub use hash::{compute_identity_hash, canonical_identity, CommitIdentity};
pub use store::{CommitStore, PutOutcome, Reference, StoreLock};
pub use mapping::{AppendOutcome, IngestReport, MappingStore};
pub use engine::{MemoryRepository, NativeCommit, NativeHead, NativeRepository};
pub use walk::{walk_history, CommitLoader, History};
pub use commit::bind_commit;
pub use reconstruct::{ReconstructReport, ReconstructWarning, Reconstructor};
pub use resolve::{Resolution, ResolvedBy, RevisionResolver};
pub use integrity::{verify_chain, VerifyIssue, VerifyReport};
pub use config::{ConfigValues, IdentityConfig};
