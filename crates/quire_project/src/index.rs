//! Flat discovery index so later invocations can skip the tree walk.
//!
//! One unit per line: `<kind>\t<path relative to the source root>`, with
//! forward slashes regardless of platform.

use std::path::{Path, PathBuf};

use quire_common::{CompilableUnit, Layout, UnitKind};

use crate::error::DiscoveryError;

/// File name of the index inside the data directory.
const INDEX_FILE: &str = "units.txt";

/// Reader and writer for the discovery index.
#[derive(Debug, Clone)]
pub struct DiscoveryIndex {
    path: PathBuf,
}

impl DiscoveryIndex {
    /// Index stored in `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(INDEX_FILE),
        }
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the index, replacing any previous one.
    pub fn save(&self, units: &[CompilableUnit]) -> Result<(), DiscoveryError> {
        let io_err = |source| DiscoveryError::Index {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut content = String::new();
        for unit in units {
            content.push_str(unit.kind.tag());
            content.push('\t');
            content.push_str(&unit.cache_key(None));
            content.push('\n');
        }
        std::fs::write(&self.path, content).map_err(io_err)
    }

    /// Reads the index, returning `Ok(None)` if it has never been written.
    ///
    /// Entries whose file no longer exists are dropped, so a stale index
    /// never schedules a job for a deleted unit.
    pub fn load(&self, layout: &Layout) -> Result<Option<Vec<CompilableUnit>>, DiscoveryError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(DiscoveryError::Index {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut units = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let line_err = |reason: String| DiscoveryError::IndexLine {
                path: self.path.clone(),
                line: idx + 1,
                reason,
            };
            let (tag, rel) = line
                .split_once('\t')
                .ok_or_else(|| line_err("expected '<kind>\\t<path>'".to_string()))?;
            let kind =
                UnitKind::from_tag(tag).ok_or_else(|| line_err(format!("unknown kind '{tag}'")))?;
            let path = rel
                .split('/')
                .fold(layout.source_root().to_path_buf(), |acc, seg| acc.join(seg));
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "dropping deleted unit from index");
                continue;
            }
            let unit = layout.unit(&path, kind).map_err(|e| line_err(e.to_string()))?;
            units.push(unit);
        }
        Ok(Some(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::find_compilable_units;
    use quire_config::DiscoveryConfig;

    fn setup() -> (tempfile::TempDir, Layout) {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::new(
            dir.path().join("src"),
            dir.path().join("build"),
            dir.path().join("logs"),
            dir.path().join("pdfs"),
        );
        for rel in ["M1/tds/td_main.tex", "M1/figures/src/g.tex", "M2/c_main.tex"] {
            let p = layout.source_root().join(rel);
            std::fs::create_dir_all(p.parent().unwrap()).unwrap();
            std::fs::write(p, "x").unwrap();
        }
        (dir, layout)
    }

    #[test]
    fn load_before_save_is_none() {
        let (dir, layout) = setup();
        let index = DiscoveryIndex::in_dir(&dir.path().join("data"));
        assert!(index.load(&layout).unwrap().is_none());
    }

    #[test]
    fn save_then_load_reproduces_units() {
        let (dir, layout) = setup();
        let found = find_compilable_units(&layout, &DiscoveryConfig::default());
        let index = DiscoveryIndex::in_dir(&dir.path().join("data"));
        index.save(&found.units).unwrap();

        let loaded = index.load(&layout).unwrap().unwrap();
        assert_eq!(loaded, found.units);
        let text = std::fs::read_to_string(index.path()).unwrap();
        assert!(text.contains("main\tM1/tds/td_main.tex"));
        assert!(text.contains("sub\tM1/figures/src/g.tex"));
    }

    #[test]
    fn deleted_units_are_dropped() {
        let (dir, layout) = setup();
        let found = find_compilable_units(&layout, &DiscoveryConfig::default());
        let index = DiscoveryIndex::in_dir(&dir.path().join("data"));
        index.save(&found.units).unwrap();
        std::fs::remove_file(layout.source_root().join("M2/c_main.tex")).unwrap();

        let loaded = index.load(&layout).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn malformed_line_errors() {
        let (dir, layout) = setup();
        let index = DiscoveryIndex::in_dir(&dir.path().join("data"));
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(index.path(), "bogus\tM2/c_main.tex\n").unwrap();
        let err = index.load(&layout).unwrap_err();
        assert!(matches!(err, DiscoveryError::IndexLine { line: 1, .. }));
    }
}
