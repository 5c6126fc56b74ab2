//! Object store backends
//!
//! The artifact store only needs three primitives from blob storage:
//! prefix listing, whole-object reads and whole-object writes. No delete,
//! rename or conditional write is assumed; backends that *can* create an
//! object only if absent advertise it through
//! [`ObjectStore::supports_conditional_write`].
//!
//! Shipped backends:
//! - [`MemoryObjectStore`]: `DashMap`-backed, for tests and single-process use
//! - [`LocalObjectStore`]: a directory tree on local disk
//! - `CompressedObjectStore` (feature `compression`): LZ4/ZSTD wrapper
//!
//! # Example
//!
//! ```rust
//! use pipeline_vault::backend::{MemoryObjectStore, ObjectStore};
//!
//! # fn example() -> pipeline_vault::Result<()> {
//! let store = MemoryObjectStore::new();
//! store.write("dev/test/v1.pq", b"bytes".to_vec())?;
//!
//! assert!(store.list("dev/test/")?.contains("dev/test/v1.pq"));
//! assert_eq!(store.read("dev/test/v1.pq")?, b"bytes".to_vec());
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "compression")]
mod compressed;
mod local;
mod memory;

#[cfg(feature = "compression")]
pub use compressed::{CompressedObjectStore, Compression};
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Blob storage capability set consumed by the artifact store.
///
/// All calls are blocking. Implementations must give read-after-write
/// consistency for a single key; listings may lag concurrent writers.
pub trait ObjectStore: Send + Sync {
    /// All keys that start with `prefix`.
    ///
    /// # Errors
    /// Returns `StorageError` if the backend cannot be listed
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>>;

    /// Full contents of `key`.
    ///
    /// # Errors
    /// Returns `NotFound` if the key is absent, `StorageError` on backend failure
    fn read(&self, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` at `key`, replacing any existing object.
    ///
    /// # Errors
    /// Returns `StorageError` on backend failure
    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()>;

    /// Whether [`create_new`](Self::create_new) is available.
    fn supports_conditional_write(&self) -> bool {
        false
    }

    /// Store `bytes` at `key` only if nothing is there yet.
    ///
    /// Returns `false` if the key already existed (nothing written).
    ///
    /// # Errors
    /// Returns `StorageError` on backend failure or if unsupported
    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        let _ = bytes;
        Err(Error::StorageError(format!(
            "Conditional write of '{key}' not supported by this backend"
        )))
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Arc<S> {
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        (**self).list(prefix)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        (**self).write(key, bytes)
    }

    fn supports_conditional_write(&self) -> bool {
        (**self).supports_conditional_write()
    }

    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        (**self).create_new(key, bytes)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        (**self).list(prefix)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        (**self).read(key)
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        (**self).write(key, bytes)
    }

    fn supports_conditional_write(&self) -> bool {
        (**self).supports_conditional_write()
    }

    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        (**self).create_new(key, bytes)
    }
}
