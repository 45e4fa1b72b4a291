//! Dependency extraction and staleness decisions.
//!
//! Two extraction strategies live here. The declared scan is a purely
//! lexical pass over `\input`, `\include` and `\includegraphics` directives
//! whose output is written to advisory listings and never consulted for
//! rebuild decisions. The actual scan reads the toolchain's own files-read
//! report (`.fls`) from a previous build. The [`StalenessOracle`] combines
//! directory-subtree dependency sets with the actual scan and the build cache.

#![warn(missing_docs)]

pub mod actual;
pub mod declared;
pub mod depset;
pub mod error;
pub mod listing;
pub mod staleness;

pub use actual::{extract_actual, parse_files_read_report};
pub use declared::{extract_declared, extract_declared_file, DeclaredDep, Directive};
pub use depset::DependencySet;
pub use error::DepsError;
pub use listing::DeclaredListingStore;
pub use staleness::{StaleReason, StalenessOracle, Verdict};
