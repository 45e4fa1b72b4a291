//! `quire build`: rebuild stale units.
//!
//! Steps:
//! 1. Resolve the project and the optional mode
//! 2. Check the toolchain is installed
//! 3. Discover units (or read the index) and apply module filters
//! 4. Run the two-phase build
//! 5. Save the cache, print the summary and pick the exit code

use quire_build::{
    install_interrupt_handler, BuildRequest, CompilationJob, FigureWrapper, JobEvent, Scheduler,
    Toolchain,
};
use quire_cache::BuildCache;
use quire_deps::StalenessOracle;
use quire_project::{select_units, Selection};

use crate::pipeline::resolve_project;
use crate::report::{exit_code, print_event, print_summary, Style};
use crate::{BuildArgs, GlobalArgs};

/// Turns module arguments into a [`Selection`].
pub fn selection_from(args: &BuildArgs) -> Selection {
    if let Some(range) = &args.range {
        if let [start, end] = range.as_slice() {
            return Selection::CodeRange {
                start: *start.min(end),
                end: *start.max(end),
            };
        }
    }
    if args.modules.is_empty() {
        Selection::All
    } else {
        Selection::Patterns(args.modules.clone())
    }
}

/// Runs the `quire build` command.
///
/// Returns exit code 0 when every unit is up to date or compiled, 1 when
/// any unit failed, and 130 when interrupted.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = resolve_project(global)?;
    let config = &project.config;
    let mode = args.mode.as_deref().map(|name| config.mode(name)).transpose()?;

    let toolchain = Toolchain::from_config(&config.toolchain);
    let program = toolchain.locate()?;
    tracing::debug!(program = %program.display(), "toolchain located");

    let units = project.units(args.from_index)?;
    let selected = select_units(&units, &selection_from(args));
    for pattern in &selected.unmatched {
        eprintln!("warning: no module matches `{pattern}`");
    }
    if selected.units.is_empty() {
        eprintln!("error: no units selected");
        return Ok(1);
    }

    let workers = config.build.worker_count(args.jobs);
    if !global.quiet {
        eprintln!(
            "    Building {} unit(s) with {} worker(s)",
            selected.units.len(),
            workers
        );
        if let Some(mode) = &mode {
            eprintln!("        Mode {}", mode.name);
        }
    }

    let interrupt = install_interrupt_handler()?;
    let figures = FigureWrapper::new(&config.figures, &config.discovery, project.layout.source_root());
    let oracle = StalenessOracle::new(
        &project.layout,
        &config.discovery.common_dir,
        &config.dependencies,
        &config.toolchain.output_extension,
    )
    .with_figure_inputs(figures.preamble().to_vec());
    let job = CompilationJob::new(project.layout.clone(), toolchain, figures);
    let scheduler = Scheduler::new(job, workers, interrupt)?;

    let mut cache = BuildCache::load(&config.cache_path(&project.root));
    let request = BuildRequest {
        units: selected.units,
        mode,
        force: args.force,
    };
    let style = Style::new(global.color);
    let outcome = scheduler.run_build(&request, &oracle, &mut cache, &mut |event: JobEvent<'_>| {
        print_event(event, global, &style)
    });

    if let Err(e) = cache.save() {
        eprintln!("warning: could not save build cache: {e}");
    }
    print_summary(&outcome, &project.root, global, &style);
    Ok(exit_code(&outcome))
}
