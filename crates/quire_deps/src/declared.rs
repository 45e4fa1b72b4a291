//! Lexical scan for include-like directives.
//!
//! The scan sees only what is written literally in the unit. Macros, search
//! paths and conditional inclusion are invisible to it, which is why its
//! results are advisory and never feed rebuild decisions.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::DepsError;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\(includegraphics|include|input)\s*(?:\[[^\]]*\])?\s*\{([^}]*)\}")
        .expect("valid regex")
});

/// Kind of include directive found in a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `\input{...}`: verbatim embed.
    Input,
    /// `\include{...}`: embed as a separately compiled part.
    Include,
    /// `\includegraphics[...]{...}`: image embed.
    Graphics,
}

impl Directive {
    fn from_command(command: &str) -> Option<Self> {
        match command {
            "input" => Some(Self::Input),
            "include" => Some(Self::Include),
            "includegraphics" => Some(Self::Graphics),
            _ => None,
        }
    }

    /// Command name as written in sources.
    pub fn command(self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Include => "include",
            Self::Graphics => "includegraphics",
        }
    }
}

/// One declared reference: the directive and its literal target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredDep {
    /// Which directive referenced the target.
    pub directive: Directive,
    /// Target text between the braces, trimmed.
    pub target: String,
}

impl fmt::Display for DeclaredDep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}", self.directive.command(), self.target)
    }
}

/// Strips a trailing comment: everything from the first `%` not preceded by
/// a backslash.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'%' && (i == 0 || bytes[i - 1] != b'\\') {
            return &line[..i];
        }
    }
    line
}

/// Extracts declared references from source text, in order of appearance.
///
/// Commented-out directives are ignored. Empty targets are dropped.
pub fn extract_declared(content: &str) -> Vec<DeclaredDep> {
    let mut deps = Vec::new();
    for line in content.lines() {
        let code = strip_comment(line);
        if !code.contains('\\') {
            continue;
        }
        for caps in DIRECTIVE_RE.captures_iter(code) {
            let Some(directive) = Directive::from_command(&caps[1]) else {
                continue;
            };
            let target = caps[2].trim();
            if target.is_empty() {
                continue;
            }
            deps.push(DeclaredDep {
                directive,
                target: target.to_string(),
            });
        }
    }
    deps
}

/// Reads a unit from disk and extracts its declared references.
pub fn extract_declared_file(path: &Path) -> Result<Vec<DeclaredDep>, DepsError> {
    let bytes = std::fs::read(path).map_err(|source| DepsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(extract_declared(&String::from_utf8_lossy(&bytes)))
}
