//! Walking the source tree for compilable units.

use std::path::Path;

use quire_common::{CompilableUnit, Layout, UnitKind};
use quire_config::DiscoveryConfig;
use walkdir::{DirEntry, WalkDir};

use crate::error::DiscoveryError;

/// Result of a discovery walk.
///
/// `units` is sorted by kind then path so scheduling order is reproducible.
/// A missing source root is not raised: it yields no units and sets
/// `condition`, leaving the caller to decide whether that is fatal.
#[derive(Debug, Default)]
pub struct Discovery {
    /// All discovered units, main units first.
    pub units: Vec<CompilableUnit>,
    /// Set when the walk could not run at all.
    pub condition: Option<DiscoveryError>,
}

impl Discovery {
    /// Main units in discovery order.
    pub fn main_units(&self) -> impl Iterator<Item = &CompilableUnit> {
        self.units.iter().filter(|u| u.kind == UnitKind::Main)
    }

    /// Sub-artifact units in discovery order.
    pub fn sub_units(&self) -> impl Iterator<Item = &CompilableUnit> {
        self.units.iter().filter(|u| u.kind == UnitKind::SubArtifact)
    }
}

/// Finds every main unit and sub-artifact unit under the layout's source root.
///
/// Directories deeper than `rules.max_depth` below the root are not entered,
/// and any path segment listed in `rules.exclude` prunes its subtree. Files
/// directly in the source root or in the shared resources directory belong
/// to no module and are skipped.
pub fn find_compilable_units(layout: &Layout, rules: &DiscoveryConfig) -> Discovery {
    let root = layout.source_root();
    if !root.is_dir() {
        return Discovery {
            units: Vec::new(),
            condition: Some(DiscoveryError::RootNotFound(root.to_path_buf())),
        };
    }

    let mut units = Vec::new();
    let walker = WalkDir::new(root)
        .max_depth(rules.max_depth + 1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e, rules));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry during discovery");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(kind) = classify(entry.path(), rules) else {
            continue;
        };
        match layout.unit(entry.path(), kind) {
            Ok(unit) if unit.module == rules.common_dir => {
                tracing::debug!(path = %entry.path().display(), "ignoring unit in shared resources");
            }
            Ok(unit) => units.push(unit),
            Err(e) => tracing::debug!(error = %e, "ignoring file outside any module"),
        }
    }

    units.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));
    tracing::debug!(count = units.len(), root = %root.display(), "discovery finished");
    Discovery {
        units,
        condition: None,
    }
}

/// Returns `true` if the entry's own name is an excluded segment.
fn is_excluded(entry: &DirEntry, rules: &DiscoveryConfig) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| rules.exclude.iter().any(|x| x == name))
}

/// Decides whether a file is a unit and of which kind.
///
/// A `.tex` file whose parent is `<figures_source_dir>` inside
/// `<figures_dir>` is a sub-artifact, even if it also carries the main suffix.
fn classify(path: &Path, rules: &DiscoveryConfig) -> Option<UnitKind> {
    let file_name = path.file_name()?.to_str()?;
    let parent = path.parent()?;
    let in_figures = parent.file_name().and_then(|n| n.to_str())
        == Some(rules.figures_source_dir.as_str())
        && parent
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            == Some(rules.figures_dir.as_str());

    if in_figures {
        return path
            .extension()
            .is_some_and(|ext| ext == "tex")
            .then_some(UnitKind::SubArtifact);
    }
    file_name
        .ends_with(rules.main_suffix.as_str())
        .then_some(UnitKind::Main)
}
