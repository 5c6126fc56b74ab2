//! In-memory object store using `DashMap`.
//!
//! Data is lost on process restart. Useful for tests and for pipelines that
//! run every stage inside one process.

use super::ObjectStore;
use crate::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::BTreeSet;

/// In-memory object store backed by a lock-free concurrent hashmap.
///
/// Conditional writes are available through the map's entry API, which makes
/// create-if-absent atomic per key.
///
/// # Example
///
/// ```rust
/// use pipeline_vault::backend::{MemoryObjectStore, ObjectStore};
///
/// # fn example() -> pipeline_vault::Result<()> {
/// let store = MemoryObjectStore::new();
/// assert!(store.create_new("dev/a/v1.pkl", b"x".to_vec())?);
/// assert!(!store.create_new("dev/a/v1.pkl", b"y".to_vec())?);
/// assert_eq!(store.read("dev/a/v1.pkl")?, b"x".to_vec());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
}

impl MemoryObjectStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
        }
    }

    /// Create with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            objects: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Remove every object.
    pub fn clear(&self) {
        self.objects.clear();
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .map(|v| v.value().clone())
            .ok_or_else(|| Error::NotFound(format!("No object at '{key}'")))
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects.insert(key.to_string(), bytes);
        Ok(())
    }

    fn supports_conditional_write(&self) -> bool {
        true
    }

    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        match self.objects.entry(key.to_string()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(bytes);
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::Arc;

    #[test]
    fn test_write_read() {
        let store = MemoryObjectStore::new();
        store.write("dev/test/v1.pq", b"value1".to_vec()).unwrap();
        assert_eq!(store.read("dev/test/v1.pq").unwrap(), b"value1".to_vec());
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let store = MemoryObjectStore::new();
        let err = store.read("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_write_overwrites() {
        let store = MemoryObjectStore::new();
        store.write("k", b"1".to_vec()).unwrap();
        store.write("k", b"2".to_vec()).unwrap();
        assert_eq!(store.read("k").unwrap(), b"2".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_list_by_prefix() {
        let store = MemoryObjectStore::new();
        store.write("dev/test/a.pq", vec![]).unwrap();
        store.write("dev/test/b.pq", vec![]).unwrap();
        store.write("dev/test2/c.pq", vec![]).unwrap();
        store.write("prod/test/d.pq", vec![]).unwrap();

        let listed = store.list("dev/test/").unwrap();
        assert_eq!(
            listed.into_iter().collect::<Vec<_>>(),
            vec!["dev/test/a.pq".to_string(), "dev/test/b.pq".to_string()]
        );
        assert_eq!(store.list("dev/test").unwrap().len(), 3);
        assert!(store.list("staging/").unwrap().is_empty());
    }

    #[test]
    fn test_create_new() {
        let store = MemoryObjectStore::new();
        assert!(store.supports_conditional_write());
        assert!(store.create_new("k", b"first".to_vec()).unwrap());
        assert!(!store.create_new("k", b"second".to_vec()).unwrap());
        assert_eq!(store.read("k").unwrap(), b"first".to_vec());
    }

    #[test]
    fn test_concurrent_create_new_single_winner() {
        let store = Arc::new(MemoryObjectStore::new());
        let handles: Vec<_> = (0..16u8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.create_new("race", vec![i]).unwrap())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_len_clear_default() {
        let store = MemoryObjectStore::default();
        assert!(store.is_empty());
        store.write("a", vec![1]).unwrap();
        store.write("b", vec![2]).unwrap();
        assert_eq!(store.len(), 2);
        store.clear();
        assert!(store.is_empty());

        let sized = MemoryObjectStore::with_capacity(8);
        assert!(sized.is_empty());
    }
}
