//! Rebuild decisions.
//!
//! A unit is stale, checking in order and stopping at the first hit, when:
//! 1. its artifact does not exist
//! 2. its source is newer than the mtime recorded in the build cache
//! 3. any existing file of its [`DependencySet`] is newer than the artifact
//!
//! The cached mtime only ever marks a unit stale. A cache hit alone never
//! makes it fresh: a dependency change must still be caught by step 3.

use std::fmt;
use std::path::{Path, PathBuf};

use quire_cache::BuildCache;
use quire_common::{CompilableUnit, Layout, Mode, Mtime, UnitKind};
use quire_config::DependencyConfig;

use crate::depset::DependencySet;

/// Why a unit needs rebuilding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The artifact has never been produced, or was removed.
    MissingArtifact,
    /// The source changed since the last successful build.
    SourceChanged,
    /// The source itself could not be read.
    SourceUnreadable,
    /// The artifact exists but its mtime could not be read.
    ArtifactUnreadable,
    /// A dependency is newer than the artifact.
    NewerDependency(PathBuf),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingArtifact => write!(f, "artifact missing"),
            Self::SourceChanged => write!(f, "source changed"),
            Self::SourceUnreadable => write!(f, "source unreadable"),
            Self::ArtifactUnreadable => write!(f, "artifact unreadable"),
            Self::NewerDependency(path) => write!(f, "{} changed", path.display()),
        }
    }
}

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The artifact is up to date.
    Fresh,
    /// The unit must be rebuilt.
    Stale(StaleReason),
}

impl Verdict {
    /// Whether the unit must be rebuilt.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale(_))
    }
}

/// Decides whether units need rebuilding.
///
/// Read-only over the filesystem and the cache, so it can be consulted from
/// any thread.
#[derive(Debug, Clone)]
pub struct StalenessOracle<'a> {
    layout: &'a Layout,
    common_dir: &'a str,
    rules: &'a DependencyConfig,
    output_extension: &'a str,
    figure_inputs: Vec<PathBuf>,
}

impl<'a> StalenessOracle<'a> {
    /// Creates an oracle over `layout`.
    pub fn new(
        layout: &'a Layout,
        common_dir: &'a str,
        rules: &'a DependencyConfig,
        output_extension: &'a str,
    ) -> Self {
        Self {
            layout,
            common_dir,
            rules,
            output_extension,
            figure_inputs: Vec::new(),
        }
    }

    /// Extra files every sub-artifact depends on, such as wrapper preambles.
    pub fn with_figure_inputs(mut self, inputs: Vec<PathBuf>) -> Self {
        self.figure_inputs = inputs;
        self
    }

    /// Checks a (unit, mode) job against its artifact and the cache.
    pub fn check(&self, unit: &CompilableUnit, mode: Option<&Mode>, cache: &BuildCache) -> Verdict {
        let artifact = self.layout.artifact_path(unit, mode, self.output_extension);
        let job_dir = self.layout.job_dir(unit, mode);
        let report = job_dir.join(format!("{}.fls", unit.job_name(mode)));
        let working_dir = match unit.kind {
            UnitKind::Main => unit.source_dir().to_path_buf(),
            UnitKind::SubArtifact => job_dir,
        };
        let cached = cache.get(&unit.cache_key(mode));
        let verdict = self.check_artifact(unit, &artifact, cached, Some((&report, &working_dir)));
        match &verdict {
            Verdict::Fresh => tracing::debug!(unit = %unit, "up to date"),
            Verdict::Stale(reason) => tracing::debug!(unit = %unit, %reason, "stale"),
        }
        verdict
    }

    /// Convenience wrapper over [`StalenessOracle::check`].
    pub fn needs_rebuild(&self, unit: &CompilableUnit, mode: Option<&Mode>, cache: &BuildCache) -> bool {
        self.check(unit, mode, cache).is_stale()
    }

    /// Checks `unit` against an explicit artifact path and cached mtime.
    pub fn check_artifact(
        &self,
        unit: &CompilableUnit,
        artifact: &Path,
        cached: Mtime,
        report: Option<(&Path, &Path)>,
    ) -> Verdict {
        if !artifact.exists() {
            return Verdict::Stale(StaleReason::MissingArtifact);
        }

        let Some(source_mtime) = Mtime::of_existing(&unit.path) else {
            return Verdict::Stale(StaleReason::SourceUnreadable);
        };
        if source_mtime > cached {
            return Verdict::Stale(StaleReason::SourceChanged);
        }

        let Some(artifact_mtime) = Mtime::of_existing(artifact) else {
            return Verdict::Stale(StaleReason::ArtifactUnreadable);
        };

        let mut deps = DependencySet::for_unit(self.layout, unit, self.common_dir, self.rules, report);
        if unit.kind == UnitKind::SubArtifact {
            for input in &self.figure_inputs {
                deps.insert(input.clone());
            }
        }

        for dep in deps.iter() {
            // Vanished dependencies are skipped; the build itself reports them.
            let Some(dep_mtime) = Mtime::of_existing(dep) else {
                continue;
            };
            if dep_mtime > artifact_mtime {
                return Verdict::Stale(StaleReason::NewerDependency(dep.to_path_buf()));
            }
        }
        Verdict::Fresh
    }
}
