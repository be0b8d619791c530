//! Binding a freshly created native commit into the identity graph

use tracing::{debug, warn};

use crate::engine::{NativeCommit, NativeHead};
use crate::error::MgitError;
use crate::hash::{canonical_identity, CommitIdentity};
use crate::mapping::MappingStore;
use crate::store::CommitStore;
use crate::types::ids::Hash;
use crate::types::mapping::MappingEntry;
use crate::types::record::ObjectRecord;
use crate::types::signature::IdentityKey;

/// Record `commit` in the identity graph when an identity key is configured
///
/// Without a key the native hash is the canonical identifier and nothing is
/// written. With a key the writes are ordered record, mapping, then refs, so
/// an interrupted run never leaves a mapping or ref naming a missing object.
pub fn bind_commit(
    store: &CommitStore,
    mappings: &mut MappingStore,
    commit: &NativeCommit,
    key: Option<&IdentityKey>,
    head: &NativeHead,
) -> Result<CommitIdentity, MgitError> {
    let identity = canonical_identity(commit, key);
    let (identity_hash, key) = match &identity {
        CommitIdentity::Bound { identity, key, .. } => (*identity, key.clone()),
        CommitIdentity::Native(native) => {
            debug!(native = %native, "no identity key; keeping native hash");
            return Ok(CommitIdentity::Native(*native));
        }
    };

    let parents = identity_parents(mappings, commit);
    let record = ObjectRecord::bind(commit, key.clone(), parents);
    debug_assert_eq!(record.identity_hash, identity_hash);

    store.put(&record)?;
    mappings.append(MappingEntry::new(commit.hash, identity_hash, key))?;

    match head {
        NativeHead::Symbolic(branch) => {
            store.update_ref(branch, &identity_hash)?;
            store.set_head_symbolic(branch)?;
        }
        NativeHead::Detached(_) => store.set_head_detached(&identity_hash)?,
    }
    debug!(native = %commit.hash, identity = %identity_hash, "bound commit");
    Ok(identity)
}

/// Identity-domain parents of `commit`; unmapped parents are skipped
fn identity_parents(mappings: &MappingStore, commit: &NativeCommit) -> Vec<Hash> {
    commit
        .parent_hashes
        .iter()
        .filter_map(|parent| match mappings.lookup_by_native(parent) {
            Some(entry) => Some(entry.identity_hash),
            None => {
                warn!(native = %commit.hash, parent = %parent, "parent has no identity mapping");
                None
            }
        })
        .collect()
}
