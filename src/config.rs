//! Store configuration
//!
//! Passed explicitly to [`ComponentStore`](crate::ComponentStore); there is no
//! process-wide default bucket or namespace.

use crate::naming::Namespace;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Default length of the random version tag
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// Default prefix for unversioned scratch tables
pub const DEFAULT_SCRATCH_PREFIX: &str = "scratch";

/// Configuration for a [`ComponentStore`](crate::ComponentStore).
///
/// ```rust
/// use pipeline_vault::{Namespace, StoreConfig};
///
/// let config = StoreConfig::from_json(r#"{"namespace": "prod", "unique_versions": true}"#)?;
/// assert_eq!(config.namespace, Namespace::Prod);
/// assert_eq!(config.suffix_len, 6);
/// # Ok::<(), pipeline_vault::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Namespace used when a call does not name one
    pub namespace: Namespace,
    /// Append a sequence number and random tag to generated versions
    /// (`YYYYMMDD-HHMMSS-<seq><tag>`). Saves through one store resolve in
    /// call order; saves from different stores in the same second do not.
    pub unique_versions: bool,
    /// Length of the random tag
    pub suffix_len: usize,
    /// Use create-if-absent writes for guarded saves when the backend has them
    pub conditional_writes: bool,
    /// Key prefix for [`write_scratch`](crate::ComponentStore::write_scratch)
    pub scratch_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            namespace: Namespace::Dev,
            unique_versions: false,
            suffix_len: DEFAULT_SUFFIX_LEN,
            conditional_writes: false,
            scratch_prefix: DEFAULT_SCRATCH_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Parse a JSON config; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns a serialization error if the JSON is malformed
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
