//! `quire modules`, `quire files` and `quire info`.

use std::collections::BTreeMap;

use quire_build::{find_program, Toolchain};
use quire_common::UnitKind;
use quire_project::{group_modules, select_units, ModuleInfo, Selection};

use crate::pipeline::resolve_project;
use crate::{FilesArgs, GlobalArgs};

/// One table row per module: name, code, main and figure counts.
pub fn module_rows(modules: &BTreeMap<String, ModuleInfo>) -> Vec<String> {
    let width = modules.keys().map(String::len).max().unwrap_or(0);
    modules
        .values()
        .map(|m| {
            let code = m.code.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string());
            let figures = m.units.len() - m.main_count();
            format!(
                "{:<width$}  {:<10}  {} main, {} figure(s)",
                m.name,
                code,
                m.main_count(),
                figures
            )
        })
        .collect()
}

/// Runs the `quire modules` command.
pub fn modules(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let units = project.discover()?;
    let modules = group_modules(&units);
    for row in module_rows(&modules) {
        println!("{row}");
    }
    if !global.quiet {
        eprintln!();
        eprintln!("   {} module(s)", modules.len());
    }
    Ok(0)
}

/// Runs the `quire files` command: main units relative to the source root.
pub fn files(args: &FilesArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let units = project.discover()?;
    let selection = if args.modules.is_empty() {
        Selection::All
    } else {
        Selection::Patterns(args.modules.clone())
    };
    let selected = select_units(&units, &selection);
    for pattern in &selected.unmatched {
        eprintln!("warning: no module matches `{pattern}`");
    }
    let mains: Vec<_> = selected
        .units
        .iter()
        .filter(|u| u.kind == UnitKind::Main)
        .collect();
    for unit in &mains {
        println!("{}", unit.cache_key(None));
    }
    if !global.quiet {
        eprintln!();
        eprintln!("   {} main unit(s)", mains.len());
    }
    Ok(0)
}

/// Runs the `quire info` command.
pub fn info(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let config = &project.config;
    let layout = &project.layout;

    println!("Project     {}", project.root.display());
    println!("Sources     {}", layout.source_root().display());
    println!("Build       {}", layout.root(quire_common::OutputTree::Build).display());
    println!("Logs        {}", layout.root(quire_common::OutputTree::Logs).display());
    println!("Artifacts   {}", layout.root(quire_common::OutputTree::Artifacts).display());
    println!("Data        {}", project.data_dir().display());
    println!("Cache       {}", config.cache_path(&project.root).display());

    let toolchain = Toolchain::from_config(&config.toolchain);
    let located = find_program(toolchain.program())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "not found".to_string());
    println!("Toolchain   {} ({located})", toolchain.program());
    println!("Timeout     {}s", toolchain.timeout().as_secs());
    println!("Workers     {}", config.build.worker_count(None));
    if !config.modes.is_empty() {
        let names: Vec<&str> = config.modes.keys().map(String::as_str).collect();
        println!("Modes       {}", names.join(", "));
    }

    let units = project.discover()?;
    let modules = group_modules(&units);
    let mains = units.iter().filter(|u| u.kind == UnitKind::Main).count();
    println!("Modules     {}", modules.len());
    println!("Main units  {mains}");
    println!("Figures     {}", units.len() - mains);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_common::Layout;
    use std::path::Path;

    #[test]
    fn rows_show_code_and_counts() {
        let layout = Layout::new("/p/src", "/p/build", "/p/logs", "/p/pdfs");
        let units = vec![
            layout.unit(Path::new("/p/src/HAI722I_algo/td1_main.tex"), UnitKind::Main).unwrap(),
            layout
                .unit(Path::new("/p/src/HAI722I_algo/figures/src/g.tex"), UnitKind::SubArtifact)
                .unwrap(),
            layout.unit(Path::new("/p/src/notes/n_main.tex"), UnitKind::Main).unwrap(),
        ];
        let rows = module_rows(&group_modules(&units));
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("HAI722I_algo  HAI722I"));
        assert!(rows[0].ends_with("1 main, 1 figure(s)"));
        assert!(rows[1].starts_with("notes         -"));
    }
}
