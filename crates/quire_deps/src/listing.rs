//! Advisory listings of declared dependencies.
//!
//! One file per unit, named `<module>_<file name>.deps`, holding one
//! `directive<TAB>target` line per declared reference. Listings are for
//! humans and external tools; nothing in the build reads them back.

use std::path::{Path, PathBuf};

use quire_common::CompilableUnit;

use crate::declared::{extract_declared_file, DeclaredDep};
use crate::error::DepsError;

/// Directory of declared-dependency listings.
#[derive(Debug, Clone)]
pub struct DeclaredListingStore {
    dir: PathBuf,
}

impl DeclaredListingStore {
    /// Store rooted at `<data_dir>/deps`.
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("deps"),
        }
    }

    /// Directory holding the listings.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Listing path for `unit`.
    pub fn listing_path(&self, unit: &CompilableUnit) -> PathBuf {
        self.dir.join(format!("{}_{}.deps", unit.module, unit.file_name()))
    }

    /// Scans `unit` and writes its listing, returning the declared references.
    pub fn write(&self, unit: &CompilableUnit) -> Result<Vec<DeclaredDep>, DepsError> {
        let deps = extract_declared_file(&unit.path)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| DepsError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.listing_path(unit);
        let mut body = String::new();
        for dep in &deps {
            body.push_str(&dep.to_string());
            body.push('\n');
        }
        std::fs::write(&path, body).map_err(|source| DepsError::Io { path, source })?;
        Ok(deps)
    }

    /// Writes listings for every unit. Failures are collected, not fatal.
    pub fn write_all<'u>(
        &self,
        units: impl IntoIterator<Item = &'u CompilableUnit>,
    ) -> (usize, Vec<(PathBuf, DepsError)>) {
        let mut written = 0;
        let mut failures = Vec::new();
        for unit in units {
            match self.write(unit) {
                Ok(deps) => {
                    tracing::debug!(unit = %unit, count = deps.len(), "declared dependencies listed");
                    written += 1;
                }
                Err(e) => failures.push((unit.path.clone(), e)),
            }
        }
        (written, failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_common::{Layout, UnitKind};
    use std::fs;

    #[test]
    fn writes_listing_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("M1a/td")).unwrap();
        let file = src.join("M1a/td/x_main.tex");
        fs::write(&file, "\\input{common/macros}\n\\includegraphics{plot.png}\n").unwrap();
        let layout = Layout::new(src, dir.path().join("b"), dir.path().join("l"), dir.path().join("p"));
        let unit = layout.unit(&file, UnitKind::Main).unwrap();

        let store = DeclaredListingStore::in_data_dir(&dir.path().join("data"));
        let deps = store.write(&unit).unwrap();
        assert_eq!(deps.len(), 2);

        let listing = store.listing_path(&unit);
        assert!(listing.ends_with("deps/M1a_x_main.tex.deps"));
        let body = fs::read_to_string(listing).unwrap();
        assert_eq!(body, "input\tcommon/macros\nincludegraphics\tplot.png\n");
    }

    #[test]
    fn write_all_collects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let layout = Layout::new(src.clone(), dir.path().join("b"), dir.path().join("l"), dir.path().join("p"));
        let unit = layout.unit(&src.join("M1a/gone_main.tex"), UnitKind::Main).unwrap();
        let store = DeclaredListingStore::in_data_dir(dir.path());
        let (written, failures) = store.write_all([&unit]);
        assert_eq!(written, 0);
        assert_eq!(failures.len(), 1);
    }
}
