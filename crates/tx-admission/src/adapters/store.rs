//! In-memory committed state.

use crate::domain::{AdmissionError, ChangeSet, CommitStore, StateError, StateOverlay, StateStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Committed key/value state behind a reader-writer lock.
///
/// Readers (concurrent tentative admissions) share the lock; `apply` takes
/// it exclusively.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    data: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a fresh overlay and commit whatever it wrote.
    pub fn seed<F>(&self, f: F) -> Result<(), AdmissionError>
    where
        F: FnOnce(&mut StateOverlay<'_>) -> Result<(), AdmissionError>,
    {
        let changes = {
            let mut overlay = StateOverlay::new(self);
            f(&mut overlay)?;
            overlay.into_changeset()
        };
        Ok(self.apply(changes)?)
    }

    /// Copy of the full committed state, for equality checks.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data.read().clone()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl StateStore for MemoryStateStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.read().get(key).cloned())
    }
}

impl CommitStore for MemoryStateStore {
    fn apply(&self, changes: ChangeSet) -> Result<(), StateError> {
        let mut data = self.data.write();
        for (key, value) in changes.inserts {
            data.insert(key, value);
        }
        for key in changes.deletes {
            data.remove(&key);
        }
        Ok(())
    }
}
