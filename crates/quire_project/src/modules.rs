//! Module grouping and unit selection.

use std::collections::BTreeMap;

use quire_common::{CompilableUnit, ModuleCode, UnitKind};

/// All units belonging to one module directory.
#[derive(Debug, Clone)]
pub struct ModuleInfo {
    /// Module directory name.
    pub name: String,
    /// Module code, if the name follows the naming convention.
    pub code: Option<ModuleCode>,
    /// Units of the module in discovery order.
    pub units: Vec<CompilableUnit>,
}

impl ModuleInfo {
    /// Number of main units in the module.
    pub fn main_count(&self) -> usize {
        self.units.iter().filter(|u| u.kind == UnitKind::Main).count()
    }

    /// Returns `true` if `pattern` selects this module.
    ///
    /// A pattern matches on the exact name, the module code (full or numeric
    /// part), or as a case-insensitive substring of the name.
    pub fn matches(&self, pattern: &str) -> bool {
        pattern == self.name
            || self.code.as_ref().is_some_and(|c| c.matches(pattern))
            || self
                .name
                .to_lowercase()
                .contains(&pattern.to_lowercase())
    }
}

/// Groups units by module, keyed and ordered by module name.
pub fn group_modules(units: &[CompilableUnit]) -> BTreeMap<String, ModuleInfo> {
    let mut modules: BTreeMap<String, ModuleInfo> = BTreeMap::new();
    for unit in units {
        modules
            .entry(unit.module.clone())
            .or_insert_with(|| ModuleInfo {
                name: unit.module.clone(),
                code: unit.code.clone(),
                units: Vec::new(),
            })
            .units
            .push(unit.clone());
    }
    modules
}

/// Which modules a build should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every discovered unit.
    All,
    /// Modules matching any of the patterns (see [`ModuleInfo::matches`]).
    Patterns(Vec<String>),
    /// Modules whose numeric code lies in the inclusive range.
    CodeRange {
        /// Lowest code included.
        start: u32,
        /// Highest code included.
        end: u32,
    },
}

/// Units picked by a [`Selection`], plus patterns that matched nothing.
#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    /// Selected units, in their original order.
    pub units: Vec<CompilableUnit>,
    /// Patterns that selected no module.
    pub unmatched: Vec<String>,
}

/// Applies a selection to a list of units, keeping their order.
///
/// Modules without a code never match a code range.
pub fn select_units(units: &[CompilableUnit], selection: &Selection) -> SelectionOutcome {
    let modules = group_modules(units);
    let (chosen, unmatched): (Vec<&str>, Vec<String>) = match selection {
        Selection::All => {
            return SelectionOutcome {
                units: units.to_vec(),
                unmatched: Vec::new(),
            }
        }
        Selection::Patterns(patterns) => {
            let mut chosen = Vec::new();
            let mut unmatched = Vec::new();
            for pattern in patterns {
                let hits: Vec<&str> = modules
                    .values()
                    .filter(|m| m.matches(pattern))
                    .map(|m| m.name.as_str())
                    .collect();
                if hits.is_empty() {
                    unmatched.push(pattern.clone());
                }
                chosen.extend(hits);
            }
            (chosen, unmatched)
        }
        Selection::CodeRange { start, end } => {
            let chosen = modules
                .values()
                .filter(|m| {
                    m.code
                        .as_ref()
                        .is_some_and(|c| (*start..=*end).contains(&c.number))
                })
                .map(|m| m.name.as_str())
                .collect();
            (chosen, Vec::new())
        }
    };

    SelectionOutcome {
        units: units
            .iter()
            .filter(|u| chosen.contains(&u.module.as_str()))
            .cloned()
            .collect(),
        unmatched,
    }
}
