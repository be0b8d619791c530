//! Content-addressed store of identity-bound commits
//!
//! Layout under the store root:
//! - `objects/ab/cdef...` one JSON `ObjectRecord` per identity hash
//! - `refs/heads/<branch>` identity hash of the branch tip
//! - `HEAD` symbolic (`ref: refs/heads/<branch>`) or a bare identity hash
//! - `mappings/` owned by [`crate::mapping::MappingStore`]

mod refs;

pub use refs::{validate_branch_name, Reference};

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::MgitError;
use crate::fsio::{read_optional, write_durable};
use crate::types::ids::Hash;
use crate::types::record::ObjectRecord;
use crate::walk::CommitLoader;

const OBJECTS_DIR: &str = "objects";
const HEADS_DIR: &str = "refs/heads";
const HEAD_FILE: &str = "HEAD";
const LOCK_FILE: &str = "lock";

/// Branch the identity HEAD points at in a fresh store
pub const DEFAULT_BRANCH: &str = "main";

/// Entries a store directory may contain before it has been initialized
const KNOWN_ENTRIES: &[&str] = &[
    "objects",
    "refs",
    "mappings",
    "HEAD",
    "config",
    "lock",
    "nostr_mappings.json",
];

/// Result of [`CommitStore::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Written,
    /// Identical record already stored
    Unchanged,
    /// Same hashed content; identity-domain parent links were refreshed
    Updated,
}

/// Exclusive writer lock on a store, released on drop
pub struct StoreLock {
    _lock_file: File,
    path: PathBuf,
}

impl StoreLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for StoreLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreLock").field("path", &self.path).finish()
    }
}

#[derive(Debug, Clone)]
pub struct CommitStore {
    root: PathBuf,
}

impl CommitStore {
    /// Create the store layout at `root`
    ///
    /// Idempotent on an existing store. Fails with `StorageInit` when `root`
    /// is a file or a directory holding anything that is not store content.
    pub fn initialize(root: &Path) -> Result<Self, MgitError> {
        if root.exists() {
            if !root.is_dir() {
                return Err(MgitError::StorageInit(format!(
                    "{} exists and is not a directory",
                    root.display()
                )));
            }
            for entry in fs::read_dir(root)? {
                let name = entry?.file_name();
                let name = name.to_string_lossy();
                // temp files left by an interrupted durable write
                if name.starts_with('.') {
                    continue;
                }
                if !KNOWN_ENTRIES.contains(&name.as_ref()) {
                    return Err(MgitError::StorageInit(format!(
                        "{} is not an mgit store (unexpected entry '{}')",
                        root.display(),
                        name
                    )));
                }
            }
            let objects = root.join(OBJECTS_DIR);
            if objects.exists() && !objects.is_dir() {
                return Err(MgitError::StorageInit(format!(
                    "{} is not a directory",
                    objects.display()
                )));
            }
        }

        fs::create_dir_all(root.join(OBJECTS_DIR))?;
        fs::create_dir_all(root.join(HEADS_DIR))?;
        fs::create_dir_all(root.join("mappings"))?;

        let store = Self {
            root: root.to_path_buf(),
        };
        if !store.head_path().exists() {
            store.write_head(&Reference::Symbolic(DEFAULT_BRANCH.to_string()))?;
        }
        debug!(root = %root.display(), "initialized identity store");
        Ok(store)
    }

    /// Open an initialized store
    pub fn open(root: &Path) -> Result<Self, MgitError> {
        if !root.join(OBJECTS_DIR).is_dir() {
            return Err(MgitError::NotFound(format!(
                "identity store at {}",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Take the exclusive writer lock without blocking
    pub fn lock(&self) -> Result<StoreLock, MgitError> {
        let path = self.root.join(LOCK_FILE);
        let lock_file = File::create(&path)?;
        lock_file.try_lock_exclusive().map_err(|e| {
            MgitError::StoreBusy(format!("store locked by another process: {}", e))
        })?;
        Ok(StoreLock {
            _lock_file: lock_file,
            path,
        })
    }

    fn object_path(&self, hash: &Hash) -> PathBuf {
        let hex = hash.to_hex();
        let (fan, rest) = hex.split_at(2);
        self.root.join(OBJECTS_DIR).join(fan).join(rest)
    }

    /// Persist `record` under its identity hash
    ///
    /// The hash is recomputed first; a record that does not hash to its own
    /// key is refused. An existing object at the key is never replaced by
    /// different hashed content.
    pub fn put(&self, record: &ObjectRecord) -> Result<PutOutcome, MgitError> {
        let computed = record.compute_hash();
        if computed != record.identity_hash {
            return Err(MgitError::Corruption {
                hash: record.identity_hash,
                computed,
            });
        }

        let path = self.object_path(&record.identity_hash);
        let outcome = match read_optional(&path)? {
            None => PutOutcome::Written,
            Some(bytes) => {
                let existing: ObjectRecord = serde_json::from_slice(&bytes)?;
                let existing_hash = existing.compute_hash();
                if existing_hash != record.identity_hash {
                    return Err(MgitError::Corruption {
                        hash: record.identity_hash,
                        computed: existing_hash,
                    });
                }
                if &existing == record {
                    return Ok(PutOutcome::Unchanged);
                }
                PutOutcome::Updated
            }
        };

        write_durable(&path, &serde_json::to_vec_pretty(record)?)?;
        debug!(hash = %record.identity_hash, native = %record.native_hash, ?outcome, "stored object");
        Ok(outcome)
    }

    /// Load the record stored under `hash`
    pub fn get(&self, hash: &Hash) -> Result<ObjectRecord, MgitError> {
        let bytes = read_optional(&self.object_path(hash))?
            .ok_or_else(|| MgitError::object_not_found(hash))?;
        let record: ObjectRecord = serde_json::from_slice(&bytes)?;
        if record.identity_hash != *hash {
            return Err(MgitError::Corruption {
                hash: *hash,
                computed: record.identity_hash,
            });
        }
        Ok(record)
    }

    pub fn contains(&self, hash: &Hash) -> bool {
        self.object_path(hash).is_file()
    }

    fn ref_path(&self, branch: &str) -> PathBuf {
        self.root.join(HEADS_DIR).join(branch)
    }

    /// Point `branch` at an identity hash that is already stored
    pub fn update_ref(&self, branch: &str, target: &Hash) -> Result<(), MgitError> {
        validate_branch_name(branch)?;
        if !self.contains(target) {
            return Err(MgitError::object_not_found(target));
        }
        write_durable(&self.ref_path(branch), format!("{}\n", target).as_bytes())?;
        debug!(branch, target = %target, "updated ref");
        Ok(())
    }

    pub fn read_ref(&self, branch: &str) -> Result<Option<Hash>, MgitError> {
        validate_branch_name(branch)?;
        match read_optional(&self.ref_path(branch))? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                Ok(Some(Hash::from_hex(text.trim())?))
            }
            None => Ok(None),
        }
    }

    pub fn delete_ref(&self, branch: &str) -> Result<(), MgitError> {
        validate_branch_name(branch)?;
        match fs::remove_file(self.ref_path(branch)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// All identity branches, sorted by name
    pub fn list_branches(&self) -> Result<Vec<(String, Hash)>, MgitError> {
        let heads = self.root.join(HEADS_DIR);
        let mut out = Vec::new();
        if heads.is_dir() {
            collect_refs(&heads, "", &mut out)?;
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn head_path(&self) -> PathBuf {
        self.root.join(HEAD_FILE)
    }

    fn write_head(&self, reference: &Reference) -> Result<(), MgitError> {
        write_durable(&self.head_path(), reference.to_file_contents().as_bytes())?;
        Ok(())
    }

    /// Point HEAD at a branch, which does not need to exist yet
    pub fn set_head_symbolic(&self, branch: &str) -> Result<(), MgitError> {
        validate_branch_name(branch)?;
        self.write_head(&Reference::Symbolic(branch.to_string()))
    }

    /// Detach HEAD at a stored identity hash
    pub fn set_head_detached(&self, target: &Hash) -> Result<(), MgitError> {
        if !self.contains(target) {
            return Err(MgitError::object_not_found(target));
        }
        self.write_head(&Reference::Direct(*target))
    }

    pub fn head(&self) -> Result<Option<Reference>, MgitError> {
        match read_optional(&self.head_path())? {
            Some(bytes) => Ok(Some(Reference::parse(&String::from_utf8_lossy(&bytes))?)),
            None => Ok(None),
        }
    }

    /// Follow symbolic indirection to the identity hash HEAD names, if any
    pub fn resolve_head(&self) -> Result<Option<Hash>, MgitError> {
        match self.head()? {
            Some(Reference::Symbolic(branch)) => self.read_ref(&branch),
            Some(Reference::Direct(hash)) => Ok(Some(hash)),
            None => Ok(None),
        }
    }

    pub fn head_commit(&self) -> Result<ObjectRecord, MgitError> {
        let hash = self
            .resolve_head()?
            .ok_or_else(|| MgitError::NotFound("identity HEAD has no commit yet".to_string()))?;
        self.get(&hash)
    }
}

impl CommitLoader for CommitStore {
    fn load_commit(&self, hash: &Hash) -> Result<ObjectRecord, MgitError> {
        self.get(hash)
    }
}

fn collect_refs(dir: &Path, prefix: &str, out: &mut Vec<(String, Hash)>) -> Result<(), MgitError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let full = if prefix.is_empty() {
            name
        } else {
            format!("{}/{}", prefix, name)
        };
        if entry.file_type()?.is_dir() {
            collect_refs(&entry.path(), &full, out)?;
        } else {
            let text = fs::read_to_string(entry.path())?;
            out.push((full, Hash::from_hex(text.trim())?));
        }
    }
    Ok(())
}
