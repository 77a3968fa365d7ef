//! # Branched State View
//!
//! A copy-on-write overlay over the committed key/value state. Every write a
//! stage makes lands in the overlay; the committed store is only touched when
//! the caller applies the overlay's change set after a successful admission.
//! Dropping the overlay discards everything.

use super::errors::StateError;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;

/// Read access to committed global state.
pub trait StateStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
}

/// Committed state that accepts a change set. Callers serialize `apply`.
pub trait CommitStore: StateStore {
    fn apply(&self, changes: ChangeSet) -> Result<(), StateError>;
}

/// Ordered writes produced by one admission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub inserts: Vec<(Vec<u8>, Vec<u8>)>,
    pub deletes: Vec<Vec<u8>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.deletes.is_empty()
    }
}

/// Copy-on-write view of a `StateStore`, owned by one pipeline invocation.
#[derive(Clone)]
pub struct StateOverlay<'a> {
    base: &'a dyn StateStore,
    // BTreeMap keeps the change set in deterministic key order.
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> std::fmt::Debug for StateOverlay<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateOverlay")
            .field("pending_writes", &self.writes.len())
            .finish()
    }
}

impl<'a> StateOverlay<'a> {
    pub fn new(base: &'a dyn StateStore) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.writes.get(key) {
            Some(value) => Ok(value.clone()),
            None => self.base.get(key),
        }
    }

    pub fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.writes.insert(key.to_vec(), Some(value));
    }

    pub fn delete(&mut self, key: &[u8]) {
        self.writes.insert(key.to_vec(), None);
    }

    /// Decode a bincode value stored under `key`.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>, StateError> {
        self.get(key)?
            .map(|bytes| {
                bincode::deserialize(&bytes).map_err(|e| StateError::Codec {
                    key: hex::encode(key),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn set_typed<T: Serialize>(&mut self, key: &[u8], value: &T) -> Result<(), StateError> {
        let bytes = bincode::serialize(value).map_err(|e| StateError::Codec {
            key: hex::encode(key),
            reason: e.to_string(),
        })?;
        self.set(key, bytes);
        Ok(())
    }

    /// Number of keys written or deleted so far.
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Consumes the overlay and returns its writes in key order.
    pub fn into_changeset(self) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (key, value) in self.writes {
            match value {
                Some(value) => changes.inserts.push((key, value)),
                None => changes.deletes.push(key),
            }
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FixedStore(HashMap<Vec<u8>, Vec<u8>>);

    impl StateStore for FixedStore {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
            Ok(self.0.get(key).cloned())
        }
    }

    fn store() -> FixedStore {
        FixedStore(HashMap::from([(b"a".to_vec(), b"1".to_vec())]))
    }

    #[test]
    fn test_reads_fall_through_to_base() {
        let base = store();
        let overlay = StateOverlay::new(&base);
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert_eq!(overlay.get(b"b").unwrap(), None);
    }

    #[test]
    fn test_writes_shadow_base_without_touching_it() {
        let base = store();
        let mut overlay = StateOverlay::new(&base);
        overlay.set(b"a", b"2".to_vec());
        overlay.delete(b"c");
        assert_eq!(overlay.get(b"a").unwrap(), Some(b"2".to_vec()));
        assert_eq!(base.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_deleted_key_reads_as_absent() {
        let base = store();
        let mut overlay = StateOverlay::new(&base);
        overlay.delete(b"a");
        assert_eq!(overlay.get(b"a").unwrap(), None);
    }

    #[test]
    fn test_changeset_is_key_ordered() {
        let base = store();
        let mut overlay = StateOverlay::new(&base);
        overlay.set(b"z", vec![1]);
        overlay.set(b"b", vec![2]);
        overlay.delete(b"a");
        let changes = overlay.into_changeset();
        assert_eq!(changes.inserts[0].0, b"b".to_vec());
        assert_eq!(changes.inserts[1].0, b"z".to_vec());
        assert_eq!(changes.deletes, vec![b"a".to_vec()]);
    }

    #[test]
    fn test_typed_roundtrip_and_corruption() {
        let base = store();
        let mut overlay = StateOverlay::new(&base);
        overlay.set_typed(b"n", &42u64).unwrap();
        assert_eq!(overlay.get_typed::<u64>(b"n").unwrap(), Some(42));
        assert!(matches!(
            overlay.get_typed::<u64>(b"a"),
            Err(StateError::Codec { .. })
        ));
    }
}
