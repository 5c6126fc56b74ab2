//! Naming scheme for stage outputs
//!
//! Every artifact lives at a deterministic key:
//!
//! ```text
//! {namespace}/{component}/{version}.{ext}
//!
//! dev/clean/2020_01/20200101-093000.pq
//! prod/training/models/20200102-120000.pkl
//! ```
//!
//! The default version is a second-resolution wall-clock timestamp
//! (`YYYYMMDD-HHMMSS`). Fixed width and zero padding make lexicographic order
//! equal chronological order. Two calls inside the same second yield the same
//! version; [`VersionSequencer`] appends a sequence number and random tag
//! when that matters.

use crate::{Error, Result};
use chrono::Local;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, PoisonError};

/// `strftime` format of default versions
pub const VERSION_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Length of a default version string (`YYYYMMDD-HHMMSS`)
pub const VERSION_LEN: usize = 15;

/// Top-level partition of the key space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Development outputs
    #[default]
    Dev,
    /// Production outputs
    Prod,
}

impl Namespace {
    /// Key prefix for this namespace.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => Err(Error::invalid(format!(
                "Unknown namespace '{other}' (expected 'dev' or 'prod')"
            ))),
        }
    }
}

/// Declared kind of an artifact payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    /// Columnar row data, stored as Parquet
    Tabular,
    /// Framed structured value, e.g. a model artifact
    Object,
}

impl PayloadKind {
    /// File extension (without the dot) used for this kind.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Tabular => "pq",
            Self::Object => "pkl",
        }
    }

    /// Kind implied by a file extension, if recognised.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pq" => Some(Self::Tabular),
            "pkl" => Some(Self::Object),
            _ => None,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tabular => f.write_str("tabular"),
            Self::Object => f.write_str("object"),
        }
    }
}

/// A key broken back into its parts by [`split_key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParts<'a> {
    /// `{namespace}/{component}`
    pub prefix: &'a str,
    /// Version segment without extension
    pub version: &'a str,
    /// Kind implied by the extension
    pub kind: PayloadKind,
}

/// Reject empty component names.
///
/// # Errors
/// Returns `InvalidArgument` if `component` is empty
pub fn validate_component(component: &str) -> Result<()> {
    if component.is_empty() {
        return Err(Error::invalid("Component name should not be empty."));
    }
    Ok(())
}

/// Reject empty versions and versions spanning more than one path segment.
///
/// # Errors
/// Returns `InvalidArgument` if `version` is empty or contains `/`
pub fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() {
        return Err(Error::invalid("Version should not be empty."));
    }
    if version.contains('/') {
        return Err(Error::invalid(format!(
            "Version '{version}' must be a single path segment (no '/')"
        )));
    }
    Ok(())
}

/// `{namespace}/{component}`
///
/// # Errors
/// Returns `InvalidArgument` if `component` is empty
pub fn component_prefix(namespace: Namespace, component: &str) -> Result<String> {
    validate_component(component)?;
    Ok(format!("{namespace}/{component}"))
}

/// Build the storage key for one artifact.
///
/// # Errors
/// Returns `InvalidArgument` if `component` is empty or `version` is empty or
/// contains a separator
///
/// # Examples
///
/// ```rust
/// use pipeline_vault::naming::{build_key, Namespace, PayloadKind};
///
/// let key = build_key(Namespace::Dev, "test", "v1", PayloadKind::Tabular)?;
/// assert_eq!(key, "dev/test/v1.pq");
/// # Ok::<(), pipeline_vault::Error>(())
/// ```
pub fn build_key(
    namespace: Namespace,
    component: &str,
    version: &str,
    kind: PayloadKind,
) -> Result<String> {
    let prefix = component_prefix(namespace, component)?;
    validate_version(version)?;
    Ok(format!("{prefix}/{version}.{}", kind.extension()))
}

/// Parse a key produced by [`build_key`].
///
/// # Errors
/// Returns `InvalidArgument` if the key has no version segment or an
/// unrecognised extension
pub fn split_key(key: &str) -> Result<KeyParts<'_>> {
    let (prefix, file) = key
        .rsplit_once('/')
        .ok_or_else(|| Error::invalid(format!("Key '{key}' has no component prefix")))?;
    let (version, ext) = file
        .rsplit_once('.')
        .ok_or_else(|| Error::invalid(format!("Key '{key}' has no extension")))?;
    let kind = PayloadKind::from_extension(ext).ok_or_else(|| {
        Error::invalid(format!(
            "Unsupported extension '.{ext}' on '{key}' (expected .pq or .pkl)"
        ))
    })?;
    Ok(KeyParts {
        prefix,
        version,
        kind,
    })
}

/// Current local time as `YYYYMMDD-HHMMSS`.
#[must_use]
pub fn generate_version() -> String {
    Local::now().format(VERSION_FORMAT).to_string()
}

/// Width of the per-second sequence number in unique versions
pub const SEQUENCE_WIDTH: usize = 4;

fn random_tag(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Unique version `YYYYMMDD-HHMMSS-<seq><tag>` for a given timestamp.
///
/// `seq` is zero-padded to [`SEQUENCE_WIDTH`] digits so that, within one
/// timestamp, versions sort by sequence number before the random tag.
#[must_use]
pub fn unique_version(timestamp: &str, seq: u32, suffix_len: usize) -> String {
    format!(
        "{timestamp}-{seq:0width$}{}",
        random_tag(suffix_len),
        width = SEQUENCE_WIDTH
    )
}

/// Hands out unique versions whose order matches call order.
///
/// The sequence restarts at 0 whenever the timestamp changes. Ordering
/// within one second holds for up to 10 000 versions per sequencer. The
/// random tag only separates sequencers (e.g. two processes) sharing a
/// second; their relative order is arbitrary.
#[derive(Debug, Default)]
pub struct VersionSequencer {
    last: Mutex<(String, u32)>,
}

impl VersionSequencer {
    /// Fresh sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next version from the current local time.
    #[must_use]
    pub fn next_version(&self, suffix_len: usize) -> String {
        self.next_at(generate_version(), suffix_len)
    }

    fn next_at(&self, timestamp: String, suffix_len: usize) -> String {
        let seq = {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            if last.0 == timestamp {
                last.1 = last.1.saturating_add(1);
            } else {
                *last = (timestamp.clone(), 0);
            }
            last.1
        };
        unique_version(&timestamp, seq, suffix_len)
    }
}
