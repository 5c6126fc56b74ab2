//! Local filesystem object store.
//!
//! Keys map onto paths below a root directory (`dev/test/v1.pq` →
//! `{root}/dev/test/v1.pq`). Plain writes go through a sibling temp file and
//! a rename, so a reader never sees a half-written artifact.

use super::ObjectStore;
use crate::{Error, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEMP_MARKER: &str = ".tmp-";
const TEMP_TAG_LEN: usize = 8;

/// `.{name}.tmp-{8 alphanumerics}`, the shape of in-flight write files.
fn is_temp_name(name: &str) -> bool {
    name.starts_with('.')
        && name.rsplit_once(TEMP_MARKER).is_some_and(|(_, tag)| {
            tag.len() == TEMP_TAG_LEN && tag.chars().all(|c| c.is_ascii_alphanumeric())
        })
}

/// Object store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Store objects below `root`. The directory is created lazily on write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.starts_with('/') {
            return Err(Error::invalid(format!("Invalid object key '{key}'")));
        }
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(Error::invalid(format!(
                    "Invalid segment '{segment}' in object key '{key}'"
                )));
            }
            path.push(segment);
        }
        if key.rsplit('/').next().is_some_and(is_temp_name) {
            return Err(Error::invalid(format!(
                "Object key '{key}' has the reserved temp-file shape"
            )));
        }
        Ok(path)
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Option<Vec<&str>> = relative.iter().map(|s| s.to_str()).collect();
        Some(segments?.join("/"))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::StorageError(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        Ok(())
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let tag: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMP_TAG_LEN)
        .map(char::from)
        .collect();
    let name = path
        .file_name()
        .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}{TEMP_MARKER}{tag}"))
}

impl ObjectStore for LocalObjectStore {
    fn list(&self, prefix: &str) -> Result<BTreeSet<String>> {
        // Walk only below the deepest directory the prefix names
        let start = match prefix.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() => self.path_for(dir)?,
            _ => self.root.clone(),
        };
        if !start.exists() {
            return Ok(BTreeSet::new());
        }

        let mut keys = BTreeSet::new();
        for entry in WalkDir::new(&start) {
            let entry = entry.map_err(|e| {
                Error::StorageError(format!("Failed to list {}: {e}", start.display()))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let skip = entry.file_name().to_str().map_or(true, is_temp_name);
            if skip {
                continue;
            }
            if let Some(key) = self.key_for(entry.path()) {
                if key.starts_with(prefix) {
                    keys.insert(key);
                }
            }
        }
        Ok(keys)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        fs::read(&path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => Error::NotFound(format!("No object at '{key}'")),
            _ => Error::StorageError(format!("Failed to read {}: {e}", path.display())),
        })
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;

        let temp = temp_sibling(&path);
        let result = fs::write(&temp, &bytes).and_then(|()| fs::rename(&temp, &path));
        if let Err(e) = result {
            let _ = fs::remove_file(&temp);
            return Err(Error::StorageError(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }

    fn supports_conditional_write(&self) -> bool {
        true
    }

    fn create_new(&self, key: &str, bytes: Vec<u8>) -> Result<bool> {
        let path = self.path_for(key)?;
        Self::ensure_parent(&path)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => return Ok(false),
            Err(e) => {
                return Err(Error::StorageError(format!(
                    "Failed to create {}: {e}",
                    path.display()
                )))
            }
        };

        if let Err(e) = file.write_all(&bytes).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = fs::remove_file(&path);
            return Err(Error::StorageError(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }
        Ok(true)
    }
}
