//! Modification timestamps with a stable on-disk representation.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A file modification time, stored as nanoseconds since the Unix epoch.
///
/// Timestamps before the epoch clamp to zero. Zero also serves as the
/// "never built" value when a cache has no entry for a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mtime(pub u64);

impl Mtime {
    /// Reads the modification time of `path`.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self::from(modified))
    }

    /// Reads the modification time of `path`, or `None` if it cannot be read.
    pub fn of_existing(path: &Path) -> Option<Self> {
        Self::of(path).ok()
    }
}

impl From<SystemTime> for Mtime {
    fn from(time: SystemTime) -> Self {
        let nanos = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos().min(u64::MAX as u128) as u64)
            .unwrap_or(0);
        Self(nanos)
    }
}
