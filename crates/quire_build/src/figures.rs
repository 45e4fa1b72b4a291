//! Wrapper documents for figure sub-artifacts.
//!
//! Figure sources are bare fragments. Each figure job writes a private
//! wrapper into its own job directory that loads the shared preamble and
//! inputs the fragment by absolute path.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use quire_common::CompilableUnit;
use quire_config::{DiscoveryConfig, FiguresConfig};

/// Synthesizes wrapper documents and locates figure exports.
#[derive(Debug, Clone)]
pub struct FigureWrapper {
    document_class: String,
    class_options: Vec<String>,
    preamble: Vec<PathBuf>,
    figures_dir: String,
    figures_source_dir: String,
}

/// Path as written inside TeX source: forward slashes only.
fn tex_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

impl FigureWrapper {
    /// Builds a wrapper generator.
    ///
    /// Preamble entries are resolved against `source_root`; entries that do
    /// not exist are dropped with a warning.
    pub fn new(figures: &FiguresConfig, discovery: &DiscoveryConfig, source_root: &Path) -> Self {
        let preamble = figures
            .preamble
            .iter()
            .map(|rel| source_root.join(rel))
            .filter(|path| {
                let exists = path.is_file();
                if !exists {
                    tracing::warn!(path = %path.display(), "figure preamble file not found");
                }
                exists
            })
            .collect();
        Self {
            document_class: figures.document_class.clone(),
            class_options: figures.class_options.clone(),
            preamble,
            figures_dir: discovery.figures_dir.clone(),
            figures_source_dir: discovery.figures_source_dir.clone(),
        }
    }

    /// Resolved preamble files every wrapper inputs.
    pub fn preamble(&self) -> &[PathBuf] {
        &self.preamble
    }

    /// Wrapper document source for `figure`.
    pub fn source(&self, figure: &Path) -> String {
        let mut doc = String::new();
        if self.class_options.is_empty() {
            let _ = writeln!(doc, "\\documentclass{{{}}}", self.document_class);
        } else {
            let _ = writeln!(
                doc,
                "\\documentclass[{}]{{{}}}",
                self.class_options.join(","),
                self.document_class
            );
        }
        for header in &self.preamble {
            let _ = writeln!(doc, "\\input{{{}}}", tex_path(header));
        }
        doc.push_str("\\begin{document}\n");
        let _ = writeln!(doc, "\\input{{{}}}", tex_path(figure));
        doc.push_str("\\end{document}\n");
        doc
    }

    /// Writes the wrapper for `unit` into `job_dir`, returning its file name.
    pub fn write(&self, unit: &CompilableUnit, job_dir: &Path) -> std::io::Result<String> {
        let name = format!("{}.tex", unit.stem());
        std::fs::write(job_dir.join(&name), self.source(&unit.path))?;
        Ok(name)
    }

    /// Directory the compiled figure is exported to, so main units can embed
    /// it: the `figures` directory enclosing the figure's `src` directory.
    pub fn export_dir(&self, unit: &CompilableUnit) -> Option<PathBuf> {
        unit.path.ancestors().skip(1).find_map(|dir| {
            let parent = dir.parent()?;
            let is_pair = dir.file_name()? == self.figures_source_dir.as_str()
                && parent.file_name()? == self.figures_dir.as_str();
            is_pair.then(|| parent.to_path_buf())
        })
    }
}
