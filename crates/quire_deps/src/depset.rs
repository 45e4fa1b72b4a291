//! Directory-subtree dependency sets.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use quire_common::{CompilableUnit, Layout, UnitKind};
use quire_config::DependencyConfig;
use walkdir::WalkDir;

use crate::actual::extract_actual;

/// Every file whose modification may invalidate a unit's artifact.
///
/// Built as a union of independent sources. A source that cannot be
/// resolved contributes nothing; the others still apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySet {
    paths: BTreeSet<PathBuf>,
}

fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|w| w.eq_ignore_ascii_case(ext)))
}

impl DependencySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the set for `unit`.
    ///
    /// Sources:
    /// - the shared resources directory, recursively
    /// - the unit's module subtree, recursively (main units only)
    /// - the unit's own directory, non-recursively
    /// - files reported read by the previous build, if `report` exists
    pub fn for_unit(
        layout: &Layout,
        unit: &CompilableUnit,
        common_dir: &str,
        rules: &DependencyConfig,
        report: Option<(&Path, &Path)>,
    ) -> Self {
        let mut set = Self::new();

        let common = layout.source_root().join(common_dir);
        set.add_tree(&common, &rules.shared_extensions, None);

        // Figures export their artifacts into the module tree, so a figure
        // watching that tree would be invalidated by its siblings' exports.
        if unit.kind == UnitKind::Main {
            match layout.module_of(&unit.path) {
                Ok((module, _)) => {
                    set.add_tree(&layout.module_dir(&module), &rules.module_extensions, None);
                }
                Err(e) => tracing::debug!(unit = %unit, error = %e, "module subtree skipped"),
            }
        }

        set.add_tree(unit.source_dir(), &rules.module_extensions, Some(1));

        if let Some((report, working_dir)) = report {
            set.paths
                .extend(extract_actual(report, working_dir, &rules.reported_extensions));
        }
        set
    }

    /// Adds files under `root` with a matching extension.
    ///
    /// `max_depth` of `Some(1)` restricts the walk to direct children. A
    /// missing root adds nothing.
    pub fn add_tree(&mut self, root: &Path, extensions: &[String], max_depth: Option<usize>) {
        if !root.is_dir() {
            return;
        }
        let mut walker = WalkDir::new(root).follow_links(true);
        if let Some(depth) = max_depth {
            walker = walker.max_depth(depth);
        }
        for entry in walker.into_iter().filter_map(Result::ok) {
            if entry.file_type().is_file() && matches_extension(entry.path(), extensions) {
                self.paths.insert(entry.into_path());
            }
        }
    }

    /// Adds a single path.
    pub fn insert(&mut self, path: PathBuf) {
        self.paths.insert(path);
    }

    /// Iterates over the paths in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Whether `path` is in the set.
    pub fn contains(&self, path: &Path) -> bool {
        self.paths.contains(path)
    }

    /// Number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn layout(root: &Path) -> Layout {
        Layout::new(
            root.join("src"),
            root.join("build"),
            root.join("logs"),
            root.join("pdfs"),
        )
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn unions_all_sources() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let src = root.join("src");
        touch(&src.join("common/shared.sty"));
        touch(&src.join("common/deep/macros.tex"));
        touch(&src.join("common/logo.png"));
        touch(&src.join("M1a/intro.tex"));
        touch(&src.join("M1a/td/x_main.tex"));
        touch(&src.join("M1a/td/plot.png"));
        touch(&src.join("M1a/td/figures/graph.pdf"));
        touch(&src.join("M2b/other.tex"));

        let layout = layout(root);
        let unit = layout.unit(&src.join("M1a/td/x_main.tex"), UnitKind::Main).unwrap();
        let set = DependencySet::for_unit(&layout, &unit, "common", &DependencyConfig::default(), None);

        assert!(set.contains(&src.join("common/shared.sty")));
        assert!(set.contains(&src.join("common/deep/macros.tex")));
        assert!(!set.contains(&src.join("common/logo.png")));
        assert!(set.contains(&src.join("M1a/intro.tex")));
        assert!(set.contains(&src.join("M1a/td/x_main.tex")));
        assert!(set.contains(&src.join("M1a/td/plot.png")));
        assert!(set.contains(&src.join("M1a/td/figures/graph.pdf")));
        assert!(!set.contains(&src.join("M2b/other.tex")));
    }

    #[test]
    fn missing_common_dir_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        touch(&src.join("M1a/x_main.tex"));
        let layout = layout(dir.path());
        let unit = layout.unit(&src.join("M1a/x_main.tex"), UnitKind::Main).unwrap();
        let set = DependencySet::for_unit(&layout, &unit, "common", &DependencyConfig::default(), None);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn includes_reported_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        touch(&src.join("M1a/x_main.tex"));
        let report = dir.path().join("x_main.fls");
        fs::write(&report, "INPUT /opt/texmf/custom.sty\nINPUT /opt/texmf/font.tfm\n").unwrap();

        let layout = layout(dir.path());
        let unit = layout.unit(&src.join("M1a/x_main.tex"), UnitKind::Main).unwrap();
        let set = DependencySet::for_unit(
            &layout,
            &unit,
            "common",
            &DependencyConfig::default(),
            Some((&report, unit.source_dir())),
        );
        assert!(set.contains(Path::new("/opt/texmf/custom.sty")));
        assert!(!set.contains(Path::new("/opt/texmf/font.tfm")));
    }

    #[test]
    fn own_directory_is_not_recursive() {
        let dir = tempfile::tempdir().unwrap();
        let mut set = DependencySet::new();
        touch(&dir.path().join("a.tex"));
        touch(&dir.path().join("sub/b.tex"));
        set.add_tree(dir.path(), &["tex".to_string()], Some(1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn figures_ignore_module_tree_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        touch(&src.join("common/shared.sty"));
        touch(&src.join("M1a/x_main.tex"));
        touch(&src.join("M1a/figures/src/a.tex"));
        touch(&src.join("M1a/figures/src/b.tex"));
        touch(&src.join("M1a/figures/b.pdf"));

        let layout = layout(dir.path());
        let figure = layout.unit(&src.join("M1a/figures/src/a.tex"), UnitKind::SubArtifact).unwrap();
        let set = DependencySet::for_unit(&layout, &figure, "common", &DependencyConfig::default(), None);
        assert!(set.contains(&src.join("common/shared.sty")));
        assert!(set.contains(&src.join("M1a/figures/src/a.tex")));
        assert!(!set.contains(&src.join("M1a/figures/b.pdf")));
        assert!(!set.contains(&src.join("M1a/x_main.tex")));

        let main = layout.unit(&src.join("M1a/x_main.tex"), UnitKind::Main).unwrap();
        let set = DependencySet::for_unit(&layout, &main, "common", &DependencyConfig::default(), None);
        assert!(set.contains(&src.join("M1a/figures/b.pdf")));
    }
}
