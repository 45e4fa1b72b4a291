//! Shared helpers for CLI commands: locating the project, loading its
//! configuration and discovering its units.

use std::path::{Path, PathBuf};

use quire_common::{CompilableUnit, Layout};
use quire_config::{QuireConfig, CONFIG_FILE};
use quire_project::{find_compilable_units, DiscoveryIndex};

use crate::GlobalArgs;

/// A resolved project: root directory, configuration and path layout.
pub struct Project {
    /// Directory holding `quire.toml` (or the working directory).
    pub root: PathBuf,
    /// Loaded configuration.
    pub config: QuireConfig,
    /// Paths derived from the configuration.
    pub layout: Layout,
}

impl Project {
    fn new(root: PathBuf, config: QuireConfig) -> Self {
        let layout = config.layout(&root);
        Self {
            root,
            config,
            layout,
        }
    }

    /// Directory for the discovery index and dependency listings.
    pub fn data_dir(&self) -> PathBuf {
        self.config.data_dir(&self.root)
    }

    /// Walks the source tree. A missing source root is an error here.
    pub fn discover(&self) -> Result<Vec<CompilableUnit>, Box<dyn std::error::Error>> {
        let discovery = find_compilable_units(&self.layout, &self.config.discovery);
        if let Some(condition) = discovery.condition {
            return Err(condition.into());
        }
        Ok(discovery.units)
    }

    /// Units from the discovery index when asked and available, otherwise
    /// from a fresh walk.
    pub fn units(&self, from_index: bool) -> Result<Vec<CompilableUnit>, Box<dyn std::error::Error>> {
        if from_index {
            let index = DiscoveryIndex::in_dir(&self.data_dir());
            match index.load(&self.layout)? {
                Some(units) => return Ok(units),
                None => tracing::warn!(
                    index = %index.path().display(),
                    "no discovery index, walking the source tree"
                ),
            }
        }
        self.discover()
    }
}

/// Walks up from `start` looking for the nearest directory containing
/// `quire.toml`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(CONFIG_FILE).is_file())
        .map(Path::to_path_buf)
}

/// Resolves the project from global CLI args.
///
/// `--config` may name a file (its directory becomes the root) or a
/// directory. Without it, the nearest `quire.toml` above the current
/// directory is used; failing that, the current directory with defaults.
pub fn resolve_project(global: &GlobalArgs) -> Result<Project, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let path = PathBuf::from(config_path);
        if path.is_file() {
            let root = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            let config = quire_config::load_config_file(&path)?;
            return Ok(Project::new(root, config));
        }
        let config = quire_config::load_config(&path)?;
        return Ok(Project::new(path, config));
    }

    let cwd = std::env::current_dir()?;
    let root = find_project_root(&cwd).unwrap_or(cwd);
    let config = quire_config::load_config(&root)?;
    Ok(Project::new(root, config))
}
