//! Compressed object store wrapper
//!
//! Transparent LZ4/ZSTD compression of stored bytes for any `ObjectStore`.
//! Keys and listings are untouched; only object contents change on disk.

use super::ObjectStore;
use crate::{Error, Result};
use std::collections::BTreeSet;

/// Compression algorithm for stored artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// LZ4 - Fast compression (default)
    #[default]
    Lz4,
    /// ZSTD - Better ratio, slower
    Zstd,
}

impl Compression {
    /// Algorithm name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }

    /// Compress `data`
    ///
    /// # Errors
    /// Returns `StorageError` if the encoder fails
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Lz4 => Ok(lz4_flex::compress_prepend_size(data)),
            Self::Zstd => zstd::encode_all(data, 3)
                .map_err(|e| Error::StorageError(format!("ZSTD compression failed: {e}"))),
        }
    }

    /// Decompress `data`
    ///
    /// # Errors
    /// Returns `SerializationError` if the stored bytes are not valid for this
    /// algorithm; rereading the same object cannot fix that
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        match self {
            Self::Lz4 => lz4_flex::decompress_size_prepended(data)
                .map_err(|e| Error::serialization(format!("LZ4 decompression failed: {e}"))),
            Self::Zstd => zstd::decode_all(data)
                .map_err(|e| Error::serialization(format!("ZSTD decompression failed: {e}"))),
        }
    }
}

/// Object store wrapper that compresses on write and decompresses on read.
///
/// # Example
///
/// ```rust
/// use pipeline_vault::backend::{CompressedObjectStore, Compression, MemoryObjectStore, ObjectStore};
///
/// # fn example() -> pipeline_vault::Result<()> {
/// let store = CompressedObjectStore::new(MemoryObjectStore::new(), Compression::Zstd);
/// store.write("dev/big/v1.pq", vec![0u8; 10_000])?;
/// assert_eq!(store.read("dev/big/v1.pq")?.len(), 10_000);
/// assert!(store.inner().read("dev/big/v1.pq")?.len() < 1_000);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CompressedObjectStore<S: ObjectStore> {
    inner: S,
    compression: Compression,
}

impl<S: ObjectStore> CompressedObjectStore<S> {
    /// Wrap `inner`, compressing with `compression`
    #[must_use]
    pub const fn new(inner: S, compression: Compression) -> Self {
        Self { inner, compression }
    }

    /// Wrapped backend (sees compressed bytes)
    #[must_use]
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    /// Compression algorithm
    #[must_use]
    pub const fn compression(&self) -> Compression {
        self.compression
    }
}

impl<S: ObjectStore> ObjectStore for CompressedObjectStore<S> {
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        self.inner.list(prefix)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let stored = self.inner.read(key)?;
        self.compression.decompress(&stored)
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let compressed = self.compression.compress(&bytes)?;
        self.inner.write(key, compressed)
    }

    fn supports_conditional_write(&self) -> bool {
        self.inner.supports_conditional_write()
    }

    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        let compressed = self.compression.compress(&bytes)?;
        self.inner.create_new(key, compressed)
    }
}
