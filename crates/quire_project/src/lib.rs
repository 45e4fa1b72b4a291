//! Project discovery: finding compilable units, grouping them into modules,
//! selecting subsets by module name or code, and persisting the discovered
//! list so later invocations can skip the walk.

#![warn(missing_docs)]

pub mod discover;
pub mod error;
pub mod index;
pub mod modules;

pub use discover::{find_compilable_units, Discovery};
pub use error::DiscoveryError;
pub use index::DiscoveryIndex;
pub use modules::{group_modules, select_units, ModuleInfo, Selection, SelectionOutcome};
