//! Configuration types deserialized from `quire.toml`.
//!
//! Every section is optional; omitted fields fall back to the conventional
//! layout (`src/`, `build/`, `logs/`, `pdfs/`) and a `latexmk` toolchain.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use quire_common::{Layout, Mode};

use crate::error::ConfigError;

/// The top-level project configuration parsed from `quire.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct QuireConfig {
    /// Source and output directory locations.
    pub paths: PathsConfig,
    /// Rules for finding compilable units.
    pub discovery: DiscoveryConfig,
    /// The external document compiler.
    pub toolchain: ToolchainConfig,
    /// Which files count as dependencies.
    pub dependencies: DependencyConfig,
    /// Wrapper document settings for sub-artifacts.
    pub figures: FiguresConfig,
    /// Scheduler settings.
    pub build: BuildConfig,
    /// Named build variants.
    pub modes: BTreeMap<String, ModeConfig>,
}

/// Directory locations, relative to the project root.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Source root containing one directory per module.
    pub source: PathBuf,
    /// Root of per-job working directories.
    pub build: PathBuf,
    /// Root of saved logs.
    pub logs: PathBuf,
    /// Root of final artifacts.
    pub artifacts: PathBuf,
    /// Directory for the discovery index and declared-dependency listings.
    pub data: PathBuf,
    /// Build cache file.
    pub cache: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("src"),
            build: PathBuf::from("build"),
            logs: PathBuf::from("logs"),
            artifacts: PathBuf::from("pdfs"),
            data: PathBuf::from("data"),
            cache: PathBuf::from(".build_cache.json"),
        }
    }
}

/// Discovery rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File-name suffix marking a main unit.
    pub main_suffix: String,
    /// First directory of the reserved pair holding sub-artifact sources.
    pub figures_dir: String,
    /// Second directory of the pair (`figures/src/`).
    pub figures_source_dir: String,
    /// Directories deeper than this below the source root are not descended into.
    pub max_depth: usize,
    /// Path segments that exclude a file from discovery.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub exclude: Vec<String>,
    /// Shared resources directory under the source root.
    pub common_dir: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            main_suffix: "_main.tex".to_string(),
            figures_dir: "figures".to_string(),
            figures_source_dir: "src".to_string(),
            max_depth: 5,
            exclude: ["legacy", "templates", "tmp", "temp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            common_dir: "common".to_string(),
        }
    }
}

/// External toolchain invocation.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Executable name or path.
    pub program: String,
    /// Fixed flags passed to every invocation.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub flags: Vec<String>,
    /// Flag used as `<flag>=<dir>` to redirect outputs.
    pub output_dir_flag: String,
    /// Flag used as `<flag>=<name>` to rename the job in a mode build.
    pub jobname_flag: String,
    /// Flag used as `<flag>=<tex>` to inject mode-specific TeX.
    pub pretex_flag: String,
    /// Extension of the produced artifact.
    pub output_extension: String,
    /// Wall-clock limit per job, in seconds.
    pub timeout_secs: u64,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            program: "latexmk".to_string(),
            flags: [
                "-pdf",
                "-shell-escape",
                "-interaction=nonstopmode",
                "-halt-on-error",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            output_dir_flag: "-outdir".to_string(),
            jobname_flag: "-jobname".to_string(),
            pretex_flag: "-usepretex".to_string(),
            output_extension: "pdf".to_string(),
            timeout_secs: 180,
        }
    }
}

impl ToolchainConfig {
    /// The per-job timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// File extensions considered when computing dependency sets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DependencyConfig {
    /// Extensions scanned (recursively) in the shared resources directory.
    pub shared_extensions: Vec<String>,
    /// Extensions scanned in the module subtree and the unit's own directory.
    pub module_extensions: Vec<String>,
    /// Extensions kept from the toolchain's files-read report.
    pub reported_extensions: Vec<String>,
}

impl Default for DependencyConfig {
    fn default() -> Self {
        let list = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect();
        Self {
            shared_extensions: list(&["tex", "sty", "cls"]),
            module_extensions: list(&["tex", "sty", "cls", "png", "jpg", "pdf"]),
            reported_extensions: list(&["tex", "sty", "cls"]),
        }
    }
}

/// Settings for the wrapper document synthesized around each figure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FiguresConfig {
    /// Document class of the wrapper.
    pub document_class: String,
    /// Class options of the wrapper.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub class_options: Vec<String>,
    /// Shared header files, relative to the source root, input by every wrapper.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub preamble: Vec<String>,
}

impl Default for FiguresConfig {
    fn default() -> Self {
        Self {
            document_class: "standalone".to_string(),
            class_options: vec!["tikz".to_string(), "border=2pt".to_string()],
            preamble: Vec::new(),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker count; `0` derives it from available parallelism.
    pub jobs: usize,
    /// Cores left free when deriving the worker count.
    pub reserved_cores: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: 0,
            reserved_cores: 1,
        }
    }
}

impl BuildConfig {
    /// Resolves the worker count, preferring `cli_jobs`, then `jobs`, then
    /// available parallelism minus the reserved margin. Never below one.
    pub fn worker_count(&self, cli_jobs: Option<usize>) -> usize {
        if let Some(n) = cli_jobs.filter(|&n| n > 0) {
            return n;
        }
        if self.jobs > 0 {
            return self.jobs;
        }
        let available = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        available.saturating_sub(self.reserved_cores).max(1)
    }
}

/// A named build variant.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModeConfig {
    /// TeX code injected before the document.
    pub pretex: String,
}

impl QuireConfig {
    /// Builds the mirrored output layout, anchoring relative paths at `project_dir`.
    pub fn layout(&self, project_dir: &Path) -> Layout {
        Layout::new(
            project_dir.join(&self.paths.source),
            project_dir.join(&self.paths.build),
            project_dir.join(&self.paths.logs),
            project_dir.join(&self.paths.artifacts),
        )
    }

    /// Location of the build cache file.
    pub fn cache_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.cache)
    }

    /// Location of the data directory.
    pub fn data_dir(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.paths.data)
    }

    /// Looks up a configured mode by name.
    pub fn mode(&self, name: &str) -> Result<Mode, ConfigError> {
        let mode = self
            .modes
            .get(name)
            .ok_or_else(|| ConfigError::UnknownMode(name.to_string()))?;
        Ok(Mode {
            name: name.to_string(),
            pretex: mode.pretex.clone(),
        })
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `flags = "-pdf"` (string) and
/// `flags = ["-pdf", "-halt-on-error"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}
