//! `quire discover`, `quire deps` and `quire init-index`.

use quire_common::UnitKind;
use quire_deps::DeclaredListingStore;
use quire_project::DiscoveryIndex;

use crate::pipeline::{resolve_project, Project};
use crate::GlobalArgs;

fn write_index(project: &Project, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let units = project.discover()?;
    let index = DiscoveryIndex::in_dir(&project.data_dir());
    index.save(&units)?;
    if !global.quiet {
        eprintln!(
            "     Indexed {} unit(s) in {}",
            units.len(),
            index.path().display()
        );
    }
    Ok(0)
}

fn write_listings(project: &Project, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let units = project.discover()?;
    let store = DeclaredListingStore::in_data_dir(&project.data_dir());
    let (written, failures) = store.write_all(units.iter().filter(|u| u.kind == UnitKind::Main));
    for (path, err) in &failures {
        eprintln!("warning: {}: {err}", path.display());
    }
    if !global.quiet {
        eprintln!(
            "      Listed dependencies of {written} unit(s) in {}",
            store.dir().display()
        );
    }
    Ok(if failures.is_empty() { 0 } else { 1 })
}

/// Runs the `quire discover` command.
pub fn discover(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    write_index(&project, global)
}

/// Runs the `quire deps` command.
pub fn deps(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    write_listings(&project, global)
}

/// Runs the `quire init-index` command.
pub fn init_index(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let code = write_index(&project, global)?;
    if code != 0 {
        return Ok(code);
    }
    write_listings(&project, global)
}
