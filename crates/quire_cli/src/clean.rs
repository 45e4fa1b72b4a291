//! `quire clean`: remove generated outputs.

use std::fs;
use std::path::Path;

use quire_cache::BuildCache;
use quire_common::OutputTree;

use crate::pipeline::{resolve_project, Project};
use crate::{CleanArgs, GlobalArgs};

/// What a clean run removes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanPlan {
    /// Output trees to empty.
    pub trees: Vec<OutputTree>,
    /// Whether to delete the cache file.
    pub cache: bool,
    /// Restrict removal to this module's subtree in each tree.
    pub module: Option<String>,
}

impl CleanPlan {
    /// Plan for the given flags.
    ///
    /// No flags removes build, logs and the cache; `--all` adds artifacts;
    /// `--module` removes that module from all three trees.
    pub fn from_args(args: &CleanArgs) -> Self {
        const EVERY_TREE: [OutputTree; 3] = [OutputTree::Build, OutputTree::Logs, OutputTree::Artifacts];

        if let Some(module) = &args.module {
            return Self {
                trees: EVERY_TREE.to_vec(),
                cache: false,
                module: Some(module.clone()),
            };
        }
        if args.all {
            return Self {
                trees: EVERY_TREE.to_vec(),
                cache: true,
                module: None,
            };
        }
        let mut trees = Vec::new();
        if args.build {
            trees.push(OutputTree::Build);
        }
        if args.logs {
            trees.push(OutputTree::Logs);
        }
        if args.artifacts {
            trees.push(OutputTree::Artifacts);
        }
        if trees.is_empty() {
            return Self {
                trees: vec![OutputTree::Build, OutputTree::Logs],
                cache: true,
                module: None,
            };
        }
        Self {
            trees,
            cache: false,
            module: None,
        }
    }
}

/// Removes everything inside `dir`, keeping `dir` itself. Returns the
/// number of entries removed.
fn empty_dir(dir: &Path) -> std::io::Result<usize> {
    if !dir.is_dir() {
        fs::create_dir_all(dir)?;
        return Ok(0);
    }
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
        removed += 1;
    }
    Ok(removed)
}

/// Drops cached timestamps of `module`'s units so they rebuild next run.
fn forget_module(cache_path: &Path, module: &str) {
    if !cache_path.is_file() {
        return;
    }
    let mut cache = BuildCache::load(cache_path);
    let before = cache.len();
    let prefix = format!("{module}/");
    cache.retain(|key| !key.starts_with(&prefix));
    if cache.len() == before {
        return;
    }
    if let Err(e) = cache.save() {
        tracing::warn!(error = %e, "could not update build cache");
    }
}

/// Carries out `plan`, returning the number of entries removed.
pub fn execute(project: &Project, plan: &CleanPlan) -> std::io::Result<usize> {
    let mut removed = 0;
    for &tree in &plan.trees {
        let root = project.layout.root(tree);
        match &plan.module {
            Some(module) => {
                let dir = root.join(module);
                if dir.is_dir() {
                    fs::remove_dir_all(&dir)?;
                    removed += 1;
                }
            }
            None => removed += empty_dir(root)?,
        }
    }
    if let Some(module) = &plan.module {
        forget_module(&project.config.cache_path(&project.root), module);
    }
    if plan.cache {
        let mut cache = BuildCache::empty(&project.config.cache_path(&project.root));
        match cache.delete() {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "could not delete build cache"),
        }
    }
    Ok(removed)
}

/// Runs the `quire clean` command.
pub fn run(args: &CleanArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let plan = CleanPlan::from_args(args);
    let removed = execute(&project, &plan)?;
    if !global.quiet {
        match &plan.module {
            Some(module) => eprintln!("     Cleaned {removed} output tree(s) of {module}"),
            None => eprintln!("     Cleaned {removed} entr{}", if removed == 1 { "y" } else { "ies" }),
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlobalArgs;
    use tempfile::TempDir;

    fn project(tmp: &TempDir) -> Project {
        let global = GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(tmp.path().to_str().unwrap().to_string()),
        };
        resolve_project(&global).unwrap()
    }

    fn populate(root: &Path) {
        for tree in ["build", "logs", "pdfs"] {
            for module in ["M1a", "M2b"] {
                let dir = root.join(tree).join(module);
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join("x.out"), "x").unwrap();
            }
        }
        fs::write(root.join(".build_cache.json"), "{}").unwrap();
    }

    #[test]
    fn default_plan_keeps_artifacts() {
        let plan = CleanPlan::from_args(&CleanArgs::default());
        assert_eq!(plan.trees, vec![OutputTree::Build, OutputTree::Logs]);
        assert!(plan.cache);
    }

    #[test]
    fn explicit_tree_flags() {
        let args = CleanArgs {
            logs: true,
            artifacts: true,
            ..CleanArgs::default()
        };
        let plan = CleanPlan::from_args(&args);
        assert_eq!(plan.trees, vec![OutputTree::Logs, OutputTree::Artifacts]);
        assert!(!plan.cache);
    }

    #[test]
    fn default_clean_empties_build_and_logs() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path());
        let p = project(&tmp);
        let removed = execute(&p, &CleanPlan::from_args(&CleanArgs::default())).unwrap();
        assert_eq!(removed, 5);
        assert!(tmp.path().join("build").is_dir());
        assert!(!tmp.path().join("build/M1a").exists());
        assert!(tmp.path().join("pdfs/M1a/x.out").is_file());
        assert!(!tmp.path().join(".build_cache.json").exists());
    }

    #[test]
    fn module_clean_touches_only_that_module() {
        let tmp = TempDir::new().unwrap();
        populate(tmp.path());
        let p = project(&tmp);
        let args = CleanArgs {
            module: Some("M1a".to_string()),
            ..CleanArgs::default()
        };
        let removed = execute(&p, &CleanPlan::from_args(&args)).unwrap();
        assert_eq!(removed, 3);
        assert!(!tmp.path().join("pdfs/M1a").exists());
        assert!(tmp.path().join("pdfs/M2b/x.out").is_file());
        assert!(tmp.path().join(".build_cache.json").is_file());
    }

    #[test]
    fn module_clean_forgets_cached_timestamps() {
        let tmp = TempDir::new().unwrap();
        let p = project(&tmp);
        let mut cache = BuildCache::empty(&p.config.cache_path(&p.root));
        cache.record("M1a/x_main.tex", quire_common::Mtime(10));
        cache.record("M2b/y_main.tex", quire_common::Mtime(20));
        cache.save().unwrap();

        let args = CleanArgs {
            module: Some("M1a".to_string()),
            ..CleanArgs::default()
        };
        execute(&p, &CleanPlan::from_args(&args)).unwrap();
        let reloaded = BuildCache::load(&p.config.cache_path(&p.root));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("M2b/y_main.tex"), quire_common::Mtime(20));
    }

    #[test]
    fn clean_recreates_missing_roots() {
        let tmp = TempDir::new().unwrap();
        let p = project(&tmp);
        let args = CleanArgs {
            all: true,
            ..CleanArgs::default()
        };
        assert_eq!(execute(&p, &CleanPlan::from_args(&args)).unwrap(), 0);
        assert!(tmp.path().join("logs").is_dir());
        assert!(tmp.path().join("pdfs").is_dir());
    }
}
