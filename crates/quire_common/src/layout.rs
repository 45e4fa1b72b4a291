//! Mirrored output layout.
//!
//! Every unit at `<source>/<rel_dir>/<file>` owns outputs at
//! `<build>/<rel_dir>/<job>/`, `<logs>/<rel_dir>/<job>.log` and
//! `<artifacts>/<rel_dir>/<job>.<ext>`. Paths are computed by stripping the
//! source root and joining onto the output root, never by rewriting strings.

use std::path::{Path, PathBuf};

use crate::error::LayoutError;
use crate::module::ModuleCode;
use crate::unit::{CompilableUnit, Mode, UnitKind};

/// One of the three output trees that mirror the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTree {
    /// Per-job working and output directories.
    Build,
    /// Captured toolchain output.
    Logs,
    /// Final artifacts.
    Artifacts,
}

/// Source root plus the three mirrored output roots.
#[derive(Debug, Clone)]
pub struct Layout {
    source_root: PathBuf,
    build_root: PathBuf,
    logs_root: PathBuf,
    artifacts_root: PathBuf,
}

impl Layout {
    /// Creates a layout from its four roots.
    pub fn new(
        source_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
        logs_root: impl Into<PathBuf>,
        artifacts_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            build_root: build_root.into(),
            logs_root: logs_root.into(),
            artifacts_root: artifacts_root.into(),
        }
    }

    /// The source root.
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    /// The root of the given output tree.
    pub fn root(&self, tree: OutputTree) -> &Path {
        match tree {
            OutputTree::Build => &self.build_root,
            OutputTree::Logs => &self.logs_root,
            OutputTree::Artifacts => &self.artifacts_root,
        }
    }

    /// Returns `path` relative to the source root.
    pub fn relative<'a>(&self, path: &'a Path) -> Result<&'a Path, LayoutError> {
        path.strip_prefix(&self.source_root)
            .map_err(|_| LayoutError::OutsideRoot {
                path: path.to_path_buf(),
                root: self.source_root.clone(),
            })
    }

    /// Returns the module name and optional code of the file at `path`.
    pub fn module_of(&self, path: &Path) -> Result<(String, Option<ModuleCode>), LayoutError> {
        let rel = self.relative(path)?;
        let mut components = rel.components();
        let first = components.next();
        if components.next().is_none() {
            return Err(LayoutError::NoModule(path.to_path_buf()));
        }
        let name = first
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .ok_or_else(|| LayoutError::NoModule(path.to_path_buf()))?;
        let code = ModuleCode::parse(&name);
        Ok((name, code))
    }

    /// Builds a [`CompilableUnit`] for a file under the source root.
    pub fn unit(&self, path: &Path, kind: UnitKind) -> Result<CompilableUnit, LayoutError> {
        let rel_path = self.relative(path)?.to_path_buf();
        let (module, code) = self.module_of(path)?;
        Ok(CompilableUnit {
            path: path.to_path_buf(),
            rel_path,
            module,
            code,
            kind,
        })
    }

    /// Root directory of `module` in the source tree.
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.source_root.join(module)
    }

    /// Directory mirroring the unit's source directory inside `tree`.
    pub fn mirrored_path(&self, tree: OutputTree, unit: &CompilableUnit) -> PathBuf {
        self.root(tree).join(unit.rel_dir())
    }

    /// Like [`Layout::mirrored_path`], creating the directory if absent.
    ///
    /// Safe to call from several jobs at once: `create_dir_all` tolerates
    /// directories that appear concurrently.
    pub fn ensure_mirrored_dir(
        &self,
        tree: OutputTree,
        unit: &CompilableUnit,
    ) -> Result<PathBuf, LayoutError> {
        let dir = self.mirrored_path(tree, unit);
        std::fs::create_dir_all(&dir).map_err(|source| LayoutError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }

    /// Private working/output directory of one (unit, mode) job.
    pub fn job_dir(&self, unit: &CompilableUnit, mode: Option<&Mode>) -> PathBuf {
        self.mirrored_path(OutputTree::Build, unit)
            .join(unit.job_name(mode))
    }

    /// Final artifact location of a (unit, mode) job.
    pub fn artifact_path(&self, unit: &CompilableUnit, mode: Option<&Mode>, ext: &str) -> PathBuf {
        self.mirrored_path(OutputTree::Artifacts, unit)
            .join(format!("{}.{ext}", unit.job_name(mode)))
    }

    /// Saved log location of a (unit, mode) job.
    pub fn log_path(&self, unit: &CompilableUnit, mode: Option<&Mode>) -> PathBuf {
        self.mirrored_path(OutputTree::Logs, unit)
            .join(format!("{}.log", unit.job_name(mode)))
    }
}
