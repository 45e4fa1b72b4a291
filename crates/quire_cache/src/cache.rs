//! The build cache: unit key → source mtime at last successful build.
//!
//! Stored as a small JSON document. Reads are fail-safe (a missing, corrupt
//! or incompatible file loads as an empty cache) and writes go through a
//! temporary file renamed over the target, so an interrupted save never
//! leaves a truncated cache behind.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use quire_common::Mtime;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// On-disk format version. Files with any other version are discarded.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Serialized form of the cache file.
#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    format_version: u32,
    #[serde(default)]
    mtimes: BTreeMap<String, Mtime>,
}

/// Persistent mapping from unit key to the source modification time
/// recorded at its last successful build.
///
/// The scheduler driver is the only writer: workers report mtimes in their
/// results and the driver applies them here after the phase completes.
#[derive(Debug, Clone)]
pub struct BuildCache {
    path: PathBuf,
    mtimes: BTreeMap<String, Mtime>,
}

impl BuildCache {
    /// Creates an empty cache that will be saved to `path`.
    pub fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            mtimes: BTreeMap::new(),
        }
    }

    /// Loads the cache at `path`, degrading to an empty cache on any problem.
    ///
    /// A missing file is the normal first-build case and is silent; a file
    /// that exists but cannot be used is reported as a warning.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(Some(cache)) => cache,
            Ok(None) => Self::empty(path),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unusable build cache, starting empty");
                Self::empty(path)
            }
        }
    }

    /// Loads the cache at `path`, returning `Ok(None)` if the file does not exist.
    pub fn try_load(path: &Path) -> Result<Option<Self>, CacheError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let file: CacheFile = serde_json::from_str(&content).map_err(|e| CacheError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if file.format_version != CACHE_FORMAT_VERSION {
            return Err(CacheError::VersionMismatch {
                path: path.to_path_buf(),
                expected: CACHE_FORMAT_VERSION,
                actual: file.format_version,
            });
        }
        Ok(Some(Self {
            path: path.to_path_buf(),
            mtimes: file.mtimes,
        }))
    }

    /// Recorded mtime for `key`, or [`Mtime::default`] (never built).
    pub fn get(&self, key: &str) -> Mtime {
        self.mtimes.get(key).copied().unwrap_or_default()
    }

    /// Records a successful build of `key` from a source with mtime `mtime`.
    pub fn record(&mut self, key: impl Into<String>, mtime: Mtime) {
        self.mtimes.insert(key.into(), mtime);
    }

    /// Forgets every key for which `keep` returns `false`.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.mtimes.retain(|k, _| keep(k));
    }

    /// Number of recorded units.
    pub fn len(&self) -> usize {
        self.mtimes.len()
    }

    /// Returns `true` if nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.mtimes.is_empty()
    }

    /// Iterates over all recorded entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Mtime)> {
        self.mtimes.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Path the cache is loaded from and saved to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persists the cache atomically: write a sibling temp file, then rename.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn save(&self) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = CacheFile {
            format_version: CACHE_FORMAT_VERSION,
            mtimes: self.mtimes.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let tmp = temp_path(&self.path);
        std::fs::write(&tmp, json).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Deletes the cache file if present and clears the in-memory entries.
    pub fn delete(&mut self) -> Result<bool, CacheError> {
        self.mtimes.clear();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Sibling temp file used for atomic saves.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
