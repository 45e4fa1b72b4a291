//! Compilable units and build modes.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::module::ModuleCode;

/// Whether a unit is a top-level document or an auxiliary sub-artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    /// A `*_main.tex` document producing a final artifact.
    Main,
    /// A figure source compiled on its own so main units can embed it.
    SubArtifact,
}

impl UnitKind {
    /// Short tag used in index files and log lines.
    pub fn tag(self) -> &'static str {
        match self {
            UnitKind::Main => "main",
            UnitKind::SubArtifact => "sub",
        }
    }

    /// Parses a tag produced by [`UnitKind::tag`].
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "main" => Some(UnitKind::Main),
            "sub" => Some(UnitKind::SubArtifact),
            _ => None,
        }
    }
}

/// One source document that produces one output artifact.
///
/// Units are created by discovery and never mutated. `path` is the full path
/// as found on disk and `rel_path` is the same file relative to the source
/// root; the module is the first segment of `rel_path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilableUnit {
    /// Full path of the source file.
    pub path: PathBuf,
    /// Path relative to the source root.
    pub rel_path: PathBuf,
    /// Module directory name (first segment under the source root).
    pub module: String,
    /// Module code, when the module name follows the naming convention.
    pub code: Option<ModuleCode>,
    /// Main document or sub-artifact.
    pub kind: UnitKind,
}

impl CompilableUnit {
    /// File name without its extension, e.g. `td_main`.
    pub fn stem(&self) -> &str {
        self.path.file_stem().and_then(|s| s.to_str()).unwrap_or("unit")
    }

    /// File name including its extension, e.g. `td_main.tex`.
    pub fn file_name(&self) -> &str {
        self.path.file_name().and_then(|s| s.to_str()).unwrap_or("unit")
    }

    /// Directory containing the source file.
    pub fn source_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Directory of the unit relative to the source root.
    pub fn rel_dir(&self) -> &Path {
        self.rel_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Name of the toolchain job, which keys every output of this unit.
    pub fn job_name(&self, mode: Option<&Mode>) -> String {
        match mode {
            Some(mode) => format!("{}-{}", self.stem(), mode.name),
            None => self.stem().to_string(),
        }
    }

    /// Key under which the build cache records this unit.
    ///
    /// Always uses forward slashes so the cache file is portable.
    pub fn cache_key(&self, mode: Option<&Mode>) -> String {
        let rel = self
            .rel_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        match mode {
            Some(mode) => format!("{rel}@{}", mode.name),
            None => rel,
        }
    }
}

impl fmt::Display for CompilableUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rel_path.display())
    }
}

/// A named build variant, e.g. a handout version of a slide deck.
///
/// The same unit can be built once per mode into differently keyed outputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mode {
    /// Mode name, appended to the job name.
    pub name: String,
    /// TeX code injected before the document is read.
    pub pretex: String,
}
