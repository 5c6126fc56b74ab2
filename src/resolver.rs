//! Latest-version resolution
//!
//! Given the keys listed under a component prefix, pick the most recent
//! timestamped version. Anything whose basename is not a timestamp (stray
//! files, explicit versions such as `v1`) is skipped without error; explicit
//! versions are only ever addressed by name.

use crate::naming::{VERSION_FORMAT, VERSION_LEN};
use crate::{Error, Result};
use chrono::NaiveDateTime;

/// Winner of a latest-version resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Full key of the winning artifact
    pub key: String,
    /// Version segment of that key (no extension)
    pub version: String,
}

/// Basename of `key` with its extension stripped.
#[must_use]
pub fn version_of(key: &str) -> &str {
    let file = key.rsplit_once('/').map_or(key, |(_, file)| file);
    file.rsplit_once('.').map_or(file, |(stem, _)| stem)
}

/// Whether `version` is a default timestamp version.
///
/// Accepts `YYYYMMDD-HHMMSS` naming a real calendar instant, optionally
/// followed by `-<alphanumeric tag>`.
#[must_use]
pub fn is_timestamp_version(version: &str) -> bool {
    if version.len() < VERSION_LEN || !version.is_char_boundary(VERSION_LEN) {
        return false;
    }
    let (stamp, suffix) = version.split_at(VERSION_LEN);

    // Fixed width, zero padded: chrono alone would accept `2020011-...`
    let shape_ok = stamp.bytes().enumerate().all(|(i, b)| {
        if i == 8 {
            b == b'-'
        } else {
            b.is_ascii_digit()
        }
    });
    if !shape_ok || NaiveDateTime::parse_from_str(stamp, VERSION_FORMAT).is_err() {
        return false;
    }

    match suffix.strip_prefix('-') {
        None => suffix.is_empty(),
        Some(tag) => !tag.is_empty() && tag.bytes().all(|b| b.is_ascii_alphanumeric()),
    }
}

/// Pick the latest timestamped key among `candidates`.
///
/// Ordering is lexicographic on the version, which equals chronological
/// ordering for the fixed-width format. Ties (same version, different
/// extension) go to the lexicographically greater key.
///
/// # Errors
/// Returns `NotFound` if no candidate carries a timestamp version
///
/// # Examples
///
/// ```rust
/// use pipeline_vault::resolver::resolve_latest;
///
/// let keys = [
///     "dev/test/20200101-000000.pq",
///     "dev/test/bad.pq",
///     "dev/test/20200102-000000.pq",
/// ];
/// let latest = resolve_latest(keys)?;
/// assert_eq!(latest.version, "20200102-000000");
/// # Ok::<(), pipeline_vault::Error>(())
/// ```
pub fn resolve_latest<I, S>(candidates: I) -> Result<Resolved>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(String, String)> = None;
    let mut seen = 0usize;

    for candidate in candidates {
        seen += 1;
        let key = candidate.as_ref();
        let version = version_of(key);
        if !is_timestamp_version(version) {
            tracing::debug!(key, "skipping non-timestamp candidate");
            continue;
        }
        let better = best
            .as_ref()
            .map_or(true, |(bv, bk)| (version, key) > (bv.as_str(), bk.as_str()));
        if better {
            best = Some((version.to_string(), key.to_string()));
        }
    }

    best.map(|(version, key)| Resolved { key, version })
        .ok_or_else(|| {
            Error::NotFound(format!(
                "No timestamped version among {seen} candidate(s)"
            ))
        })
}
