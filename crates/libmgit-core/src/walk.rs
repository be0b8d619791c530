//! Breadth-first traversal of identity history

use std::collections::{HashSet, VecDeque};

use crate::error::MgitError;
use crate::types::ids::Hash;
use crate::types::record::ObjectRecord;

/// Source of identity commit records
pub trait CommitLoader {
    fn load_commit(&self, hash: &Hash) -> Result<ObjectRecord, MgitError>;
}

/// Commits reached by [`walk_history`], in visit order
#[derive(Debug, Default)]
pub struct History {
    pub commits: Vec<ObjectRecord>,
    /// Hashes that could not be loaded, with the reason
    pub unreadable: Vec<(Hash, String)>,
}

/// Visit commits from `start` following identity-domain parents
///
/// Each commit is visited at most once. A commit that fails to load is
/// recorded and its ancestry is not followed; the walk carries on with the
/// rest of the queue. `limit` caps the number of commits returned.
pub fn walk_history<L: CommitLoader + ?Sized>(loader: &L, start: Hash, limit: Option<usize>) -> History {
    let mut history = History::default();
    let mut queue = VecDeque::from([start]);
    let mut visited = HashSet::from([start]);

    while let Some(hash) = queue.pop_front() {
        if limit.is_some_and(|n| history.commits.len() >= n) {
            break;
        }
        match loader.load_commit(&hash) {
            Ok(record) => {
                for parent in &record.parent_hashes {
                    if visited.insert(*parent) {
                        queue.push_back(*parent);
                    }
                }
                history.commits.push(record);
            }
            Err(e) => history.unreadable.push((hash, e.to_string())),
        }
    }
    history
}
