//! Append-only log of native <-> identity hash pairs
//!
//! `mappings/hash_mappings.json` is the authoritative copy: an ordered JSON
//! array in the same `{gitHash, mgitHash, pubkey}` wire format that is served
//! to cloning clients. Every write also refreshes `nostr_mappings.json` at the
//! store root for older readers; that copy is never read back.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::NativeRepository;
use crate::error::MgitError;
use crate::fsio::{read_optional, write_durable};
use crate::hash::canonical_identity;
use crate::types::ids::Hash;
use crate::types::mapping::MappingEntry;
use crate::types::signature::IdentityKey;

pub const MAPPINGS_FILE: &str = "mappings/hash_mappings.json";
pub const COMPAT_MAPPINGS_FILE: &str = "nostr_mappings.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    AlreadyPresent,
}

/// Counts from ingesting a transport payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub appended: usize,
    pub already_present: usize,
}

#[derive(Debug, Clone)]
pub struct MappingStore {
    root: PathBuf,
    entries: Vec<MappingEntry>,
    by_native: HashMap<Hash, usize>,
    by_identity: HashMap<Hash, usize>,
}

impl MappingStore {
    /// Load the mapping log of the store at `root` (empty if none yet)
    pub fn open(root: &Path) -> Result<Self, MgitError> {
        let mut store = Self {
            root: root.to_path_buf(),
            entries: Vec::new(),
            by_native: HashMap::new(),
            by_identity: HashMap::new(),
        };
        let path = store.primary_path();
        if let Some(bytes) = read_optional(&path)? {
            let entries = parse_entries(&bytes)
                .map_err(|e| MgitError::InvalidMapping(format!("{}: {}", path.display(), e)))?;
            for entry in entries {
                store.insert(entry)?;
            }
        }
        debug!(entries = store.entries.len(), "loaded mapping log");
        Ok(store)
    }

    fn primary_path(&self) -> PathBuf {
        self.root.join(MAPPINGS_FILE)
    }

    /// Add one entry and persist the log
    ///
    /// Identical entries are accepted without a write. An entry whose native
    /// hash is already mapped to a different identity hash is refused with
    /// `MappingConflict`.
    pub fn append(&mut self, entry: MappingEntry) -> Result<AppendOutcome, MgitError> {
        let outcome = self.insert(entry)?;
        if outcome == AppendOutcome::AlreadyPresent {
            return Ok(outcome);
        }
        if let Err(e) = self.persist() {
            self.pop_last();
            return Err(e);
        }
        Ok(outcome)
    }

    /// Ingest a raw transport payload (`[{gitHash, mgitHash, pubkey}, ...]`)
    ///
    /// All entries are parsed and checked before anything is written; one
    /// malformed or conflicting entry rejects the whole payload. An entry
    /// whose native commit is in `repo` must claim the identity hash that
    /// commit actually has under the entry's key.
    pub fn ingest<R: NativeRepository + ?Sized>(
        &mut self,
        payload: &[u8],
        repo: &R,
    ) -> Result<IngestReport, MgitError> {
        let entries = parse_entries(payload).map_err(MgitError::InvalidMapping)?;
        for (i, entry) in entries.iter().enumerate() {
            check_claim(i, entry, repo)?;
        }

        let mut staged = self.clone();
        let mut report = IngestReport::default();
        for entry in entries {
            match staged.insert(entry)? {
                AppendOutcome::Appended => report.appended += 1,
                AppendOutcome::AlreadyPresent => report.already_present += 1,
            }
        }
        if report.appended > 0 {
            staged.persist()?;
        }
        *self = staged;
        debug!(appended = report.appended, already_present = report.already_present, "ingested mappings");
        Ok(report)
    }

    fn insert(&mut self, entry: MappingEntry) -> Result<AppendOutcome, MgitError> {
        if let Some(&idx) = self.by_native.get(&entry.native_hash) {
            let existing = &self.entries[idx];
            if *existing == entry {
                return Ok(AppendOutcome::AlreadyPresent);
            }
            if existing.identity_hash != entry.identity_hash {
                return Err(MgitError::MappingConflict {
                    native: entry.native_hash,
                    existing: existing.identity_hash,
                    claimed: entry.identity_hash,
                });
            }
            return Err(MgitError::InvalidMapping(format!(
                "identity hash {} claimed by keys '{}' and '{}'",
                entry.identity_hash, existing.identity_key, entry.identity_key
            )));
        }
        if let Some(&idx) = self.by_identity.get(&entry.identity_hash) {
            return Err(MgitError::InvalidMapping(format!(
                "identity hash {} already belongs to native commit {}, refusing {}",
                entry.identity_hash, self.entries[idx].native_hash, entry.native_hash
            )));
        }

        let idx = self.entries.len();
        self.by_native.insert(entry.native_hash, idx);
        self.by_identity.insert(entry.identity_hash, idx);
        self.entries.push(entry);
        Ok(AppendOutcome::Appended)
    }

    fn pop_last(&mut self) {
        if let Some(entry) = self.entries.pop() {
            self.by_native.remove(&entry.native_hash);
            self.by_identity.remove(&entry.identity_hash);
        }
    }

    fn persist(&self) -> Result<(), MgitError> {
        let data = self.export_json()?;
        write_durable(&self.primary_path(), data.as_bytes())?;
        let compat = self.root.join(COMPAT_MAPPINGS_FILE);
        if let Err(e) = write_durable(&compat, data.as_bytes()) {
            warn!(path = %compat.display(), error = %e, "failed to refresh compatibility mapping copy");
        }
        Ok(())
    }

    /// The log in wire format
    pub fn export_json(&self) -> Result<String, MgitError> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn lookup_by_native(&self, hash: &Hash) -> Option<&MappingEntry> {
        self.by_native.get(hash).map(|&idx| &self.entries[idx])
    }

    pub fn lookup_by_identity(&self, hash: &Hash) -> Option<&MappingEntry> {
        self.by_identity.get(hash).map(|&idx| &self.entries[idx])
    }

    pub fn lookup_by_identity_key(&self, key: &IdentityKey) -> Vec<&MappingEntry> {
        self.entries.iter().filter(|e| &e.identity_key == key).collect()
    }

    /// Entries whose identity hash starts with the hex `prefix`
    pub fn find_identity_prefix(&self, prefix: &str) -> Vec<&MappingEntry> {
        self.entries
            .iter()
            .filter(|e| e.identity_hash.has_hex_prefix(prefix))
            .collect()
    }

    /// Entries in log order
    pub fn all(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Refuse an entry whose identity hash its native commit does not produce
fn check_claim<R: NativeRepository + ?Sized>(
    index: usize,
    entry: &MappingEntry,
    repo: &R,
) -> Result<(), MgitError> {
    let Some(commit) = repo.find_commit(&entry.native_hash)? else {
        return Ok(());
    };
    let computed = canonical_identity(&commit, Some(&entry.identity_key)).canonical();
    if computed != entry.identity_hash {
        return Err(MgitError::InvalidMapping(format!(
            "entry {}: native commit {} hashes to {} under key '{}', not {}",
            index, entry.native_hash, computed, entry.identity_key, entry.identity_hash
        )));
    }
    Ok(())
}

/// Parse a JSON array into typed entries, naming the first bad element
fn parse_entries(bytes: &[u8]) -> Result<Vec<MappingEntry>, String> {
    let raw: Vec<serde_json::Value> =
        serde_json::from_slice(bytes).map_err(|e| format!("expected a JSON array: {}", e))?;
    raw.into_iter()
        .enumerate()
        .map(|(i, value)| {
            serde_json::from_value(value).map_err(|e| format!("entry {}: {}", i, e))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests_support::native_commit;
    use crate::engine::MemoryRepository;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn key(k: &str) -> IdentityKey {
        IdentityKey::new(k).unwrap()
    }

    fn entry(native: u8, identity: u8) -> MappingEntry {
        MappingEntry::new(Hash::from_bytes([native; 20]), Hash::from_bytes([identity; 20]), key("npub1alice"))
    }

    #[test]
    fn test_append_and_lookup() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        assert!(store.is_empty());

        assert_eq!(store.append(entry(1, 11)).unwrap(), AppendOutcome::Appended);
        assert_eq!(store.append(entry(1, 11)).unwrap(), AppendOutcome::AlreadyPresent);
        assert_eq!(store.len(), 1);

        let e = store.lookup_by_native(&Hash::from_bytes([1; 20])).unwrap();
        assert_eq!(e.identity_hash, Hash::from_bytes([11; 20]));
        let e = store.lookup_by_identity(&Hash::from_bytes([11; 20])).unwrap();
        assert_eq!(e.native_hash, Hash::from_bytes([1; 20]));
        assert_eq!(store.lookup_by_identity_key(&key("npub1alice")).len(), 1);
        assert!(store.lookup_by_identity_key(&key("npub1bob")).is_empty());
    }

    #[test]
    fn test_conflicting_append_is_refused() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        store.append(entry(1, 11)).unwrap();

        let err = store.append(entry(1, 12)).unwrap_err();
        assert!(matches!(err, MgitError::MappingConflict { .. }));
        assert!(matches!(store.append(entry(2, 11)), Err(MgitError::InvalidMapping(_))));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_log_persists_with_compat_copy() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = MappingStore::open(dir.path()).unwrap();
            store.append(entry(1, 11)).unwrap();
            store.append(entry(2, 12)).unwrap();
        }
        let store = MappingStore::open(dir.path()).unwrap();
        assert_eq!(store.all(), &[entry(1, 11), entry(2, 12)]);

        let primary = std::fs::read(dir.path().join(MAPPINGS_FILE)).unwrap();
        let compat = std::fs::read(dir.path().join(COMPAT_MAPPINGS_FILE)).unwrap();
        assert_eq!(primary, compat);
    }

    #[test]
    fn test_primary_log_is_authoritative() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        store.append(entry(1, 11)).unwrap();
        std::fs::write(dir.path().join(COMPAT_MAPPINGS_FILE), "[]").unwrap();
        assert_eq!(MappingStore::open(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_ingest_rejects_whole_payload_on_malformed_entry() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        let good = serde_json::to_value(entry(1, 11)).unwrap();
        let payload = serde_json::json!([good, {"gitHash": "xyz", "mgitHash": "00", "pubkey": "k"}]);

        let err = store.ingest(payload.to_string().as_bytes(), &MemoryRepository::new()).unwrap_err();
        match err {
            MgitError::InvalidMapping(msg) => assert!(msg.contains("entry 1"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.is_empty());
        assert!(!dir.path().join(MAPPINGS_FILE).exists());

        assert!(matches!(store.ingest(b"{\"not\": \"a list\"}", &MemoryRepository::new()), Err(MgitError::InvalidMapping(_))));
    }

    #[test]
    fn test_ingest_conflict_aborts_without_writing() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        store.append(entry(1, 11)).unwrap();

        let payload = serde_json::to_vec(&vec![entry(2, 12), entry(1, 13)]).unwrap();
        assert!(matches!(store.ingest(&payload, &MemoryRepository::new()), Err(MgitError::MappingConflict { .. })));
        assert_eq!(store.len(), 1);
        assert_eq!(MappingStore::open(dir.path()).unwrap().len(), 1);

        let payload = serde_json::to_vec(&vec![entry(1, 11), entry(2, 12)]).unwrap();
        let report = store.ingest(&payload, &MemoryRepository::new()).unwrap();
        assert_eq!(report, IngestReport { appended: 1, already_present: 1 });
        assert_eq!(MappingStore::open(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_ingest_refuses_forged_identity_hash() {
        let dir = TempDir::new().unwrap();
        let mut repo = MemoryRepository::new();
        let c1 = native_commit(1, &[], "one\n");
        let c2 = native_commit(2, &[1], "two\n");
        repo.add_commit(c1.clone());
        repo.add_commit(c2.clone());
        let k = key("npub1alice");
        let good = MappingEntry::new(c1.hash, canonical_identity(&c1, Some(&k)).canonical(), k.clone());
        let forged = MappingEntry::new(c2.hash, Hash::from_bytes([0xee; 20]), k.clone());

        let mut store = MappingStore::open(dir.path()).unwrap();
        let payload = serde_json::to_vec(&vec![good.clone(), forged]).unwrap();
        match store.ingest(&payload, &repo).unwrap_err() {
            MgitError::InvalidMapping(msg) => assert!(msg.contains("entry 1"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(store.is_empty());
        assert!(!dir.path().join(MAPPINGS_FILE).exists());

        // entries for commits the repository lacks are kept for later
        let absent = MappingEntry::new(Hash::from_bytes([9; 20]), Hash::from_bytes([0x99; 20]), k);
        let payload = serde_json::to_vec(&vec![good, absent]).unwrap();
        assert_eq!(store.ingest(&payload, &repo).unwrap().appended, 2);
        assert_eq!(MappingStore::open(dir.path()).unwrap().len(), 2);
    }

    #[test]
    fn test_identity_prefix_search() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        store.append(entry(1, 0xab)).unwrap();
        store.append(entry(2, 0xac)).unwrap();
        assert_eq!(store.find_identity_prefix("abab").len(), 1);
        assert_eq!(store.find_identity_prefix("a").len(), 2);
        assert!(store.find_identity_prefix("ffff").is_empty());
    }

    #[test]
    fn test_export_matches_wire_format() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path()).unwrap();
        store.append(entry(1, 11)).unwrap();
        let exported: serde_json::Value = serde_json::from_str(&store.export_json().unwrap()).unwrap();
        assert_eq!(exported[0]["pubkey"], "npub1alice");
        assert_eq!(exported[0]["gitHash"], "01".repeat(20));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_lookups_agree_with_log(pairs in proptest::collection::btree_map(any::<[u8; 20]>(), any::<[u8; 20]>(), 0..12)) {
            let dir = TempDir::new().unwrap();
            let mut store = MappingStore::open(dir.path()).unwrap();
            let mut seen_identity = std::collections::HashSet::new();
            for (native, identity) in pairs {
                if !seen_identity.insert(identity) {
                    continue;
                }
                store.append(MappingEntry::new(Hash::from_bytes(native), Hash::from_bytes(identity), key("npub1p"))).unwrap();
            }
            let reopened = MappingStore::open(dir.path()).unwrap();
            for e in reopened.all() {
                prop_assert_eq!(reopened.lookup_by_native(&e.native_hash).unwrap().identity_hash, e.identity_hash);
                prop_assert_eq!(reopened.lookup_by_identity(&e.identity_hash).unwrap().native_hash, e.native_hash);
            }
        }
    }
}
