//! Files-read report parsing.
//!
//! The toolchain writes a `.fls` report next to its outputs listing every
//! file it opened. Lines of the form `INPUT <path>` name files that were
//! read; relative paths are relative to the directory the toolchain ran in,
//! which for main units is the unit's own directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const INPUT_PREFIX: &str = "INPUT ";

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext))
}

/// Parses report text into absolute paths filtered by extension.
///
/// Paths are not checked for existence here.
pub fn parse_files_read_report(
    content: &str,
    working_dir: &Path,
    extensions: &[String],
) -> BTreeSet<PathBuf> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix(INPUT_PREFIX))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let path = Path::new(entry);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                working_dir.join(path)
            }
        })
        .filter(|path| has_extension(path, extensions))
        .collect()
}

/// Reads the report at `report` and extracts the files it lists.
///
/// A missing or unreadable report yields an empty set: the unit has simply
/// never been built, or the toolchain did not produce a report.
pub fn extract_actual(report: &Path, working_dir: &Path, extensions: &[String]) -> BTreeSet<PathBuf> {
    match std::fs::read(report) {
        Ok(bytes) => parse_files_read_report(&String::from_utf8_lossy(&bytes), working_dir, extensions),
        Err(e) => {
            tracing::trace!(report = %report.display(), error = %e, "no files-read report");
            BTreeSet::new()
        }
    }
}
