//! Shared foundational types used across the quire build orchestrator.
//!
//! This crate provides the path/module model: compilable units, module codes,
//! build modes, modification timestamps, and the mirrored output layout that
//! maps a source file onto the build, log, and artifact trees.

#![warn(missing_docs)]

pub mod error;
pub mod layout;
pub mod module;
pub mod mtime;
pub mod unit;

pub use error::LayoutError;
pub use layout::{Layout, OutputTree};
pub use module::ModuleCode;
pub use mtime::Mtime;
pub use unit::{CompilableUnit, Mode, UnitKind};
