//! Component store - versioned save/load of pipeline stage outputs
//!
//! **Write-Once Design** (immutable artifacts):
//! - Every save creates `{namespace}/{component}/{version}.{ext}`
//! - Existing keys are protected unless the caller opts into overwrite
//! - Nothing is ever deleted or mutated in place by this layer
//!
//! Toyota Way Principles:
//! - Poka-Yoke: Overwrite guard and provenance check happen before any write
//! - Jidoka: Every failure surfaces immediately with a discriminated kind
//!
//! ## Known race
//!
//! The overwrite guard is list-then-write. Two concurrent saves of the same
//! key can both see "absent" and both write; the later one wins. Default
//! versions have one-second resolution, so rapid saves by a single caller
//! collide the same way. Enable [`StoreConfig::unique_versions`] to sequence
//! and tag generated versions, or [`StoreConfig::conditional_writes`] to use the
//! backend's create-if-absent primitive where it has one.

use crate::backend::ObjectStore;
use crate::codec::{self, ObjectPayload, Payload};
use crate::config::StoreConfig;
use crate::model::ModelArtifact;
use crate::naming::{
    self, build_key, component_prefix, split_key, validate_component, validate_version,
    Namespace, PayloadKind, VersionSequencer,
};
use crate::resolver::resolve_latest;
use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::collections::BTreeSet;

/// Per-call options for [`ComponentStore::save`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveOptions {
    namespace: Option<Namespace>,
    overwrite: bool,
    version: Option<String>,
}

impl SaveOptions {
    /// Defaults: configured namespace, generated version, no overwrite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Save into `namespace` instead of the configured default.
    #[must_use]
    pub const fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Allow replacing an existing artifact with the same key.
    #[must_use]
    pub const fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Use an explicit version instead of a generated timestamp.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Per-call options for [`ComponentStore::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    namespace: Option<Namespace>,
    version: Option<String>,
    kind: Option<PayloadKind>,
}

impl LoadOptions {
    /// Defaults: configured namespace, latest version, any kind.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `namespace` instead of the configured default.
    #[must_use]
    pub const fn namespace(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Load an explicit version instead of the latest.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Only consider artifacts of `kind`.
    #[must_use]
    pub const fn kind(mut self, kind: PayloadKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Facade over naming, version resolution, the codec and a blob backend.
///
/// # Example
///
/// ```rust
/// use pipeline_vault::backend::MemoryObjectStore;
/// use pipeline_vault::{ComponentStore, LoadOptions, SaveOptions};
/// use arrow::array::Int64Array;
/// use arrow::datatypes::{DataType, Field, Schema};
/// use arrow::record_batch::RecordBatch;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = ComponentStore::builder(MemoryObjectStore::new()).build()?;
///
/// let schema = Arc::new(Schema::new(vec![Field::new("col1", DataType::Int64, false)]));
/// let df = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))])?;
///
/// let key = store.save_table(&df, "test", &SaveOptions::new().version("v1"))?;
/// assert_eq!(key, "dev/test/v1.pq");
///
/// let loaded = store.load_table("test", &LoadOptions::new().version("v1"))?;
/// assert_eq!(loaded.num_rows(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ComponentStore<S: ObjectStore> {
    backend: S,
    config: StoreConfig,
    sequencer: VersionSequencer,
}

/// Builder for [`ComponentStore`].
#[derive(Debug)]
pub struct ComponentStoreBuilder<S: ObjectStore> {
    backend: S,
    config: StoreConfig,
}

impl<S: ObjectStore> ComponentStoreBuilder<S> {
    /// Start from the default configuration.
    #[must_use]
    pub fn new(backend: S) -> Self {
        Self {
            backend,
            config: StoreConfig::default(),
        }
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Default namespace for calls that do not name one.
    #[must_use]
    pub const fn namespace(mut self, namespace: Namespace) -> Self {
        self.config.namespace = namespace;
        self
    }

    /// Sequence generated versions and tag them with `suffix_len` random characters.
    #[must_use]
    pub const fn unique_versions(mut self, suffix_len: usize) -> Self {
        self.config.unique_versions = true;
        self.config.suffix_len = suffix_len;
        self
    }

    /// Use create-if-absent writes for guarded saves when the backend has them.
    #[must_use]
    pub const fn conditional_writes(mut self, enabled: bool) -> Self {
        self.config.conditional_writes = enabled;
        self
    }

    /// Key prefix for scratch tables.
    #[must_use]
    pub fn scratch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.scratch_prefix = prefix.into();
        self
    }

    /// Build the store.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configuration is inconsistent
    pub fn build(self) -> Result<ComponentStore<S>> {
        ComponentStore::new(self.backend, self.config)
    }
}

impl<S: ObjectStore> ComponentStore<S> {
    /// Create a store over `backend`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the scratch prefix is empty or not a
    /// plain relative path, or if unique versions are requested with a zero
    /// suffix length
    pub fn new(backend: S, config: StoreConfig) -> Result<Self> {
        let prefix = &config.scratch_prefix;
        if prefix.is_empty() || prefix.starts_with('/') || prefix.ends_with('/') {
            return Err(Error::invalid(format!(
                "Scratch prefix '{prefix}' must be a non-empty relative path"
            )));
        }
        if config.unique_versions && config.suffix_len == 0 {
            return Err(Error::invalid(
                "unique_versions requires a suffix_len greater than 0",
            ));
        }
        Ok(Self {
            backend,
            config,
            sequencer: VersionSequencer::new(),
        })
    }

    /// Create a builder over `backend`.
    #[must_use]
    pub fn builder(backend: S) -> ComponentStoreBuilder<S> {
        ComponentStoreBuilder::new(backend)
    }

    /// Underlying backend.
    #[must_use]
    pub const fn backend(&self) -> &S {
        &self.backend
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn next_version(&self) -> String {
        if self.config.unique_versions {
            self.sequencer.next_version(self.config.suffix_len)
        } else {
            naming::generate_version()
        }
    }

    /// Save `payload` as a new version of `component`.
    ///
    /// Returns the key the artifact was written to.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty component, bad version, or a model artifact
    ///   without data paths or metrics (checked before any I/O)
    /// - `Conflict`: the key exists and `overwrite` is off
    /// - `SerializationError`: the payload cannot be encoded
    /// - `StorageError`: the backend failed
    pub fn save(&self, payload: &Payload, component: &str, options: &SaveOptions) -> Result<String> {
        match payload {
            Payload::Table(batch) => self.save_table(batch, component, options),
            Payload::Object(ObjectPayload::Model(model)) => {
                self.save_model(model, component, options)
            }
            Payload::Object(ObjectPayload::Document(value)) => {
                self.save_document(value, component, options)
            }
        }
    }

    /// Save a table (`.pq`).
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save)
    pub fn save_table(
        &self,
        batch: &RecordBatch,
        component: &str,
        options: &SaveOptions,
    ) -> Result<String> {
        validate_component(component)?;
        self.save_encoded(PayloadKind::Tabular, component, options, || {
            codec::encode_table(batch)
        })
    }

    /// Save a model artifact (`.pkl`) after checking its provenance.
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save)
    pub fn save_model(
        &self,
        model: &ModelArtifact,
        component: &str,
        options: &SaveOptions,
    ) -> Result<String> {
        validate_component(component)?;
        model.validate()?;
        self.save_encoded(PayloadKind::Object, component, options, || {
            codec::encode_model(model)
        })
    }

    /// Save an arbitrary JSON document (`.pkl`).
    ///
    /// # Errors
    ///
    /// See [`save`](Self::save)
    pub fn save_document(
        &self,
        value: &serde_json::Value,
        component: &str,
        options: &SaveOptions,
    ) -> Result<String> {
        validate_component(component)?;
        self.save_encoded(PayloadKind::Object, component, options, || {
            codec::encode_document(value)
        })
    }

    fn save_encoded<F>(
        &self,
        kind: PayloadKind,
        component: &str,
        options: &SaveOptions,
        encode: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Result<Vec<u8>>,
    {
        let namespace = options.namespace.unwrap_or(self.config.namespace);
        let version = options
            .version
            .clone()
            .unwrap_or_else(|| self.next_version());
        let key = build_key(namespace, component, &version, kind)?;

        if !options.overwrite
            && self.config.conditional_writes
            && self.backend.supports_conditional_write()
        {
            let bytes = encode()?;
            let size = bytes.len();
            if !self.backend.create_new(&key, bytes)? {
                return Err(Error::Conflict { key });
            }
            tracing::info!(%key, bytes = size, "saved artifact (conditional)");
            return Ok(key);
        }

        let exists = self.backend.list(&key)?.contains(&key);
        if exists {
            if !options.overwrite {
                return Err(Error::Conflict { key });
            }
            tracing::warn!(%key, "overwriting existing artifact");
        }

        let bytes = encode()?;
        let size = bytes.len();
        self.backend.write(&key, bytes)?;
        tracing::info!(%key, bytes = size, "saved artifact");
        Ok(key)
    }

    /// Resolve the key a [`load`](Self::load) with these options would read.
    ///
    /// - explicit version and kind: the key is built directly, no listing
    /// - explicit version only: one listing of `{prefix}/{version}.`
    /// - no version: one listing of `{prefix}/`, then latest-version
    ///   resolution over direct children
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty component or bad version, or an explicit
    ///   version stored under both kinds with no kind given
    /// - `NotFound`: nothing resolves
    /// - `StorageError`: the backend listing failed
    pub fn resolve(&self, component: &str, options: &LoadOptions) -> Result<String> {
        let namespace = options.namespace.unwrap_or(self.config.namespace);
        let prefix = component_prefix(namespace, component)?;

        match (&options.version, options.kind) {
            (Some(version), Some(kind)) => build_key(namespace, component, version, kind),
            (Some(version), None) => {
                validate_version(version)?;
                let listing = self.backend.list(&format!("{prefix}/{version}."))?;
                let matches: Vec<String> = listing
                    .into_iter()
                    .filter(|key| {
                        split_key(key)
                            .map(|parts| parts.prefix == prefix && parts.version == version)
                            .unwrap_or(false)
                    })
                    .collect();
                match matches.len() {
                    0 => Err(Error::NotFound(format!(
                        "Version '{version}' of '{prefix}' does not exist"
                    ))),
                    1 => Ok(matches.into_iter().next().unwrap_or_default()),
                    _ => Err(Error::invalid(format!(
                        "Version '{version}' of '{prefix}' exists as several kinds \
                         ({}); specify a payload kind",
                        matches.join(", ")
                    ))),
                }
            }
            (None, kind) => {
                let candidates = self.children(&prefix, kind)?;
                let resolved = resolve_latest(&candidates).map_err(|_| {
                    Error::NotFound(format!(
                        "No valid version under '{prefix}' ({} candidate(s) listed)",
                        candidates.len()
                    ))
                })?;
                tracing::debug!(%prefix, version = %resolved.version, "resolved latest version");
                Ok(resolved.key)
            }
        }
    }

    /// Direct children of `prefix` with a recognised extension.
    fn children(&self, prefix: &str, kind: Option<PayloadKind>) -> Result<Vec<String>> {
        let dir = format!("{prefix}/");
        Ok(self
            .backend
            .list(&dir)?
            .into_iter()
            .filter(|key| key.strip_prefix(&dir).is_some_and(|rest| !rest.contains('/')))
            .filter(|key| match split_key(key) {
                Ok(parts) => kind.map_or(true, |k| k == parts.kind),
                Err(_) => false,
            })
            .collect())
    }

    /// Load the latest (or an explicit) version of `component`.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: empty component or bad version
    /// - `NotFound`: no version resolves, or the resolved key is missing
    /// - `SerializationError`: the stored bytes cannot be decoded
    /// - `StorageError`: the backend failed
    pub fn load(&self, component: &str, options: &LoadOptions) -> Result<Payload> {
        let key = self.resolve(component, options)?;
        let kind = split_key(&key)?.kind;
        let bytes = self.backend.read(&key)?;
        let size = bytes.len();
        let payload = codec::decode(&bytes, kind)?;
        tracing::info!(%key, bytes = size, "loaded artifact");
        Ok(payload)
    }

    /// Load a table, considering only `.pq` artifacts.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load)
    pub fn load_table(&self, component: &str, options: &LoadOptions) -> Result<RecordBatch> {
        let options = options.clone().kind(PayloadKind::Tabular);
        match self.load(component, &options)? {
            Payload::Table(batch) => Ok(batch),
            Payload::Object(_) => Err(Error::invalid("Expected a table, found an object")),
        }
    }

    /// Load a model artifact, considering only `.pkl` artifacts.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load); `InvalidArgument` if the object is a plain
    /// document rather than a model
    pub fn load_model(&self, component: &str, options: &LoadOptions) -> Result<ModelArtifact> {
        let options = options.clone().kind(PayloadKind::Object);
        match self.load(component, &options)? {
            Payload::Object(ObjectPayload::Model(model)) => Ok(model),
            Payload::Object(ObjectPayload::Document(_)) => Err(Error::invalid(
                "Expected a model artifact, found a plain document",
            )),
            Payload::Table(_) => Err(Error::invalid("Expected a model artifact, found a table")),
        }
    }

    /// Load a JSON document, considering only `.pkl` artifacts.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load); `InvalidArgument` if the object is a model
    pub fn load_document(
        &self,
        component: &str,
        options: &LoadOptions,
    ) -> Result<serde_json::Value> {
        let options = options.clone().kind(PayloadKind::Object);
        match self.load(component, &options)? {
            Payload::Object(ObjectPayload::Document(value)) => Ok(value),
            Payload::Object(ObjectPayload::Model(_)) => Err(Error::invalid(
                "Expected a document, found a model artifact",
            )),
            Payload::Table(_) => Err(Error::invalid("Expected a document, found a table")),
        }
    }

    /// Versions stored directly under `component`, sorted.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for an empty component, `StorageError` if listing fails
    pub fn list_versions(
        &self,
        component: &str,
        namespace: Option<Namespace>,
    ) -> Result<Vec<String>> {
        let namespace = namespace.unwrap_or(self.config.namespace);
        let prefix = component_prefix(namespace, component)?;
        let versions: BTreeSet<String> = self
            .children(&prefix, None)?
            .iter()
            .filter_map(|key| split_key(key).ok().map(|p| p.version.to_string()))
            .collect();
        Ok(versions.into_iter().collect())
    }

    fn scratch_key(&self, suffix: &str) -> Result<String> {
        if !(suffix.ends_with(".pq") || suffix.ends_with(".parquet")) {
            return Err(Error::invalid(format!(
                "Scratch path '{suffix}' must end with .pq or .parquet"
            )));
        }
        if suffix.starts_with('/') || suffix.split('/').any(|s| s.is_empty() || s == "..") {
            return Err(Error::invalid(format!(
                "Scratch path '{suffix}' must be a relative path"
            )));
        }
        Ok(format!("{}/{suffix}", self.config.scratch_prefix))
    }

    /// Write an unversioned table to `{scratch_prefix}/{suffix}`.
    ///
    /// Scratch space has no overwrite guard and no versioning.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` unless `suffix` is a relative path ending in `.pq`
    /// or `.parquet`; codec and backend errors as for [`save`](Self::save)
    pub fn write_scratch(&self, batch: &RecordBatch, suffix: &str) -> Result<String> {
        let key = self.scratch_key(suffix)?;
        let bytes = codec::encode_table(batch)?;
        let size = bytes.len();
        self.backend.write(&key, bytes)?;
        tracing::info!(%key, bytes = size, "wrote scratch table");
        Ok(key)
    }

    /// Read a table written by [`write_scratch`](Self::write_scratch).
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a bad suffix, `NotFound` if absent, codec and
    /// backend errors otherwise
    pub fn read_scratch(&self, suffix: &str) -> Result<RecordBatch> {
        let key = self.scratch_key(suffix)?;
        let bytes = self.backend.read(&key)?;
        match codec::decode(&bytes, PayloadKind::Tabular)? {
            Payload::Table(batch) => Ok(batch),
            Payload::Object(_) => Err(Error::serialization("Scratch object is not a table")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryObjectStore;
    use crate::model::ModelBinary;
    use crate::ErrorKind;
    use arrow::array::Int64Array;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend that counts calls and can be told to fail.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryObjectStore,
        lists: AtomicUsize,
        reads: AtomicUsize,
        writes: AtomicUsize,
        fail_writes: bool,
    }

    impl CountingStore {
        fn calls(&self) -> (usize, usize, usize) {
            (
                self.lists.load(Ordering::SeqCst),
                self.reads.load(Ordering::SeqCst),
                self.writes.load(Ordering::SeqCst),
            )
        }
    }

    impl ObjectStore for CountingStore {
        fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
            self.lists.fetch_add(1, Ordering::SeqCst);
            self.inner.list(prefix)
        }

        fn read(&self, key: &str) -> Result<Vec<u8>> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.read(key)
        }

        fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(Error::StorageError("bucket unavailable".to_string()));
            }
            self.inner.write(key, bytes)
        }
    }

    fn toy_df() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("col1", DataType::Int64, false),
            Field::new("col2", DataType::Int64, false),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(Int64Array::from(vec![2, 4, 6])),
            ],
        )
        .unwrap()
    }

    fn counting() -> ComponentStore<Arc<CountingStore>> {
        ComponentStore::builder(Arc::new(CountingStore::default()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_save_performs_one_list_and_one_write() {
        let store = counting();
        store
            .save_table(&toy_df(), "test", &SaveOptions::new().version("v1"))
            .unwrap();
        assert_eq!(store.backend().calls(), (1, 0, 1));
    }

    #[test]
    fn test_load_latest_performs_one_list_and_one_read() {
        let store = counting();
        store
            .save_table(&toy_df(), "test", &SaveOptions::new())
            .unwrap();
        store.load("test", &LoadOptions::new()).unwrap();
        assert_eq!(store.backend().calls(), (2, 1, 1));
    }

    #[test]
    fn test_load_explicit_kind_skips_listing() {
        let store = counting();
        store
            .save_table(&toy_df(), "test", &SaveOptions::new().version("v1"))
            .unwrap();
        store.load_table("test", &LoadOptions::new().version("v1")).unwrap();
        assert_eq!(store.backend().calls(), (1, 1, 1));
    }

    #[test]
    fn test_conflict_does_not_write() {
        let store = counting();
        let opts = SaveOptions::new().version("v1");
        store.save_table(&toy_df(), "test", &opts).unwrap();
        let err = store.save_table(&toy_df(), "test", &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(err.to_string().contains("dev/test/v1.pq"));
        assert_eq!(store.backend().calls(), (2, 0, 1));
    }

    #[test]
    fn test_model_without_metrics_fails_before_io() {
        let store = counting();
        let mut model = ModelArtifact::new("rf").with_model(ModelBinary::new("raw", vec![1]));
        model.add_data_path("train_df", "dev/split/v1.pq");

        let err = store
            .save_model(&model, "training/models", &SaveOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.backend().calls(), (0, 0, 0));
    }

    #[test]
    fn test_empty_component_fails_before_io() {
        let store = counting();
        let err = store
            .save(&Payload::Table(toy_df()), "", &SaveOptions::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = store.load("", &LoadOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(store.backend().calls(), (0, 0, 0));
    }

    #[test]
    fn test_storage_failure_propagates_without_retry() {
        let backend = Arc::new(CountingStore {
            fail_writes: true,
            ..CountingStore::default()
        });
        let store = ComponentStore::builder(Arc::clone(&backend)).build().unwrap();
        let err = store
            .save_table(&toy_df(), "test", &SaveOptions::new())
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(backend.calls(), (1, 0, 1));
        assert!(backend.inner.is_empty());
    }

    #[test]
    fn test_conditional_writes_replace_listing() {
        let store = ComponentStore::builder(MemoryObjectStore::new())
            .conditional_writes(true)
            .build()
            .unwrap();
        let opts = SaveOptions::new().version("v1");
        store.save_table(&toy_df(), "test", &opts).unwrap();
        let err = store.save_table(&toy_df(), "test", &opts).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        // overwrite bypasses the conditional path
        store
            .save_table(&toy_df(), "test", &opts.clone().overwrite(true))
            .unwrap();
    }

    #[test]
    fn test_resolve_explicit_version_unknown_kind() {
        let store = ComponentStore::builder(MemoryObjectStore::new()).build().unwrap();
        store
            .save_table(&toy_df(), "test", &SaveOptions::new().version("v1"))
            .unwrap();
        store
            .save_document(&serde_json::json!({"a": 1}), "test", &SaveOptions::new().version("v10"))
            .unwrap();

        let key = store.resolve("test", &LoadOptions::new().version("v1")).unwrap();
        assert_eq!(key, "dev/test/v1.pq");

        let err = store
            .resolve("test", &LoadOptions::new().version("v2"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_resolve_explicit_version_ambiguous() {
        let store = ComponentStore::builder(MemoryObjectStore::new()).build().unwrap();
        let opts = SaveOptions::new().version("v1");
        store.save_table(&toy_df(), "test", &opts).unwrap();
        store
            .save_document(&serde_json::json!([1, 2]), "test", &opts)
            .unwrap();

        let err = store.resolve("test", &LoadOptions::new().version("v1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(store
            .load_document("test", &LoadOptions::new().version("v1"))
            .is_ok());
    }

    #[test]
    fn test_latest_ignores_nested_components() {
        let backend = MemoryObjectStore::new();
        backend.write("dev/clean/20200101-000000.pq", vec![]).unwrap();
        backend
            .write("dev/clean/2020_01/20210101-000000.pq", vec![])
            .unwrap();
        let store = ComponentStore::builder(backend).build().unwrap();

        let key = store.resolve("clean", &LoadOptions::new()).unwrap();
        assert_eq!(key, "dev/clean/20200101-000000.pq");
    }

    #[test]
    fn test_typed_load_filters_by_kind() {
        let backend = MemoryObjectStore::new();
        let store = ComponentStore::builder(backend).build().unwrap();
        store
            .save_table(&toy_df(), "mixed", &SaveOptions::new().version("20200101-000000"))
            .unwrap();
        store
            .save_document(
                &serde_json::json!({"k": "v"}),
                "mixed",
                &SaveOptions::new().version("20200102-000000"),
            )
            .unwrap();

        let table = store.load_table("mixed", &LoadOptions::new()).unwrap();
        assert_eq!(table.num_rows(), 3);
        let doc = store.load_document("mixed", &LoadOptions::new()).unwrap();
        assert_eq!(doc["k"], "v");
        assert_eq!(
            store.load_model("mixed", &LoadOptions::new()).unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_list_versions() {
        let store = ComponentStore::builder(MemoryObjectStore::new()).build().unwrap();
        for version in ["20200102-000000", "20200101-000000", "v1"] {
            store
                .save_table(&toy_df(), "test", &SaveOptions::new().version(version))
                .unwrap();
        }
        assert_eq!(
            store.list_versions("test", None).unwrap(),
            vec!["20200101-000000", "20200102-000000", "v1"]
        );
        assert!(store
            .list_versions("test", Some(Namespace::Prod))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_scratch_roundtrip_and_validation() {
        let store = ComponentStore::builder(MemoryObjectStore::new()).build().unwrap();
        let key = store.write_scratch(&toy_df(), "test.pq").unwrap();
        assert_eq!(key, "scratch/test.pq");
        assert_eq!(store.read_scratch("test.pq").unwrap().num_rows(), 3);

        let key = store.write_scratch(&toy_df(), "test/test.parquet").unwrap();
        assert_eq!(key, "scratch/test/test.parquet");

        for bad in ["", "test.csv", "/abs.pq", "../up.pq"] {
            let err = store.write_scratch(&toy_df(), bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "suffix {bad:?}");
        }
    }

    #[test]
    fn test_unique_versions_do_not_collide() {
        let store = ComponentStore::builder(MemoryObjectStore::new())
            .unique_versions(8)
            .build()
            .unwrap();
        let keys: Vec<String> = (0..5)
            .map(|_| store.save_table(&toy_df(), "test", &SaveOptions::new()).unwrap())
            .collect();
        let distinct: BTreeSet<&String> = keys.iter().collect();
        assert_eq!(distinct.len(), keys.len());

        // Most recent save wins even inside one second
        let latest = store.resolve("test", &LoadOptions::new()).unwrap();
        assert_eq!(&latest, keys.last().unwrap());
    }

    #[test]
    fn test_config_validation() {
        let bad_prefix = StoreConfig {
            scratch_prefix: String::new(),
            ..StoreConfig::default()
        };
        assert!(ComponentStore::new(MemoryObjectStore::new(), bad_prefix).is_err());
        assert!(ComponentStore::builder(MemoryObjectStore::new())
            .unique_versions(0)
            .build()
            .is_err());
    }
}
