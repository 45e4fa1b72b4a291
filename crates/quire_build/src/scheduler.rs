//! Two-phase parallel build scheduling.
//!
//! Phase one builds every stale sub-artifact; phase two starts only after
//! all of them reached a terminal state, since main units embed their
//! outputs. Within a phase jobs run on a fixed-size rayon pool in no
//! particular order. Every job result is sent back to the calling thread,
//! which is the only place the build cache is mutated.

use std::collections::BTreeMap;
use std::sync::{mpsc, Arc};
use std::time::Instant;

use quire_cache::BuildCache;
use quire_common::{CompilableUnit, Mode, UnitKind};
use quire_deps::StalenessOracle;
use rayon::prelude::*;

use crate::error::BuildError;
use crate::interrupt::InterruptFlag;
use crate::job::{CompilationJob, CompileResult, JobStatus};
use crate::metrics::BuildMetrics;

/// Progress notification delivered on the driver thread.
#[derive(Debug, Clone, Copy)]
pub enum JobEvent<'a> {
    /// A worker picked up the unit.
    Started(&'a CompilableUnit),
    /// The unit reached a terminal state.
    Finished(&'a CompileResult),
    /// The unit was dropped because the run was interrupted.
    NotStarted(&'a CompilableUnit),
}

/// Results of one phase.
#[derive(Debug, Default)]
pub struct PhaseOutcome {
    /// One result per unit that ran or was skipped.
    pub results: Vec<CompileResult>,
    /// Units that never started.
    pub interrupted: Vec<CompilableUnit>,
}

/// What to build.
#[derive(Debug, Clone, Default)]
pub struct BuildRequest {
    /// Units of both kinds, in discovery order.
    pub units: Vec<CompilableUnit>,
    /// Variant applied to main units.
    pub mode: Option<Mode>,
    /// Rebuild everything regardless of staleness.
    pub force: bool,
}

/// Aggregate result of a build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Every result, sub-artifacts first.
    pub results: Vec<CompileResult>,
    /// Units that never started.
    pub interrupted: Vec<CompilableUnit>,
    /// Counters folded from `results`.
    pub metrics: BuildMetrics,
}

impl BuildOutcome {
    /// Failed results in the order they were reported.
    pub fn failures(&self) -> impl Iterator<Item = &CompileResult> {
        self.results.iter().filter(|r| r.is_failure())
    }

    /// Whether the run stopped early on user interrupt.
    pub fn was_interrupted(&self) -> bool {
        !self.interrupted.is_empty()
    }
}

enum Message {
    Started(CompilableUnit),
    Finished(CompileResult),
    NotStarted(CompilableUnit),
}

/// Runs compilation jobs on a worker pool.
pub struct Scheduler {
    pool: rayon::ThreadPool,
    job: Arc<CompilationJob>,
    interrupt: InterruptFlag,
    workers: usize,
}

impl Scheduler {
    /// Creates a scheduler with `workers` threads (at least one).
    pub fn new(job: CompilationJob, workers: usize, interrupt: InterruptFlag) -> Result<Self, BuildError> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quire-worker-{i}"))
            .build()
            .map_err(|e| BuildError::Pool(e.to_string()))?;
        Ok(Self {
            pool,
            job: Arc::new(job),
            interrupt,
            workers,
        })
    }

    /// Runs every unit and waits for all of them.
    ///
    /// A failing job never stops the phase. Once the interrupt flag is
    /// raised, queued units are reported as not started.
    pub fn run_phase(
        &self,
        units: Vec<CompilableUnit>,
        mode: Option<&Mode>,
        on_event: &mut dyn FnMut(JobEvent<'_>),
    ) -> PhaseOutcome {
        let (tx, rx) = mpsc::channel();
        for unit in units {
            let tx = tx.clone();
            let job = Arc::clone(&self.job);
            let interrupt = self.interrupt.clone();
            let mode = mode.cloned();
            self.pool.spawn_fifo(move || {
                if interrupt.is_raised() {
                    let _ = tx.send(Message::NotStarted(unit));
                    return;
                }
                let _ = tx.send(Message::Started(unit.clone()));
                let result = job.run(&unit, mode.as_ref());
                let _ = tx.send(Message::Finished(result));
            });
        }
        drop(tx);

        let mut outcome = PhaseOutcome::default();
        for message in rx {
            match message {
                Message::Started(unit) => on_event(JobEvent::Started(&unit)),
                Message::Finished(result) => {
                    on_event(JobEvent::Finished(&result));
                    outcome.results.push(result);
                }
                Message::NotStarted(unit) => {
                    on_event(JobEvent::NotStarted(&unit));
                    outcome.interrupted.push(unit);
                }
            }
        }
        outcome
    }

    /// Builds `request`: figures first, then main units.
    ///
    /// Main units of a module with a failed figure are reported failed
    /// without running. Successful compilations are recorded in `cache`
    /// after each phase; saving it is left to the caller.
    pub fn run_build(
        &self,
        request: &BuildRequest,
        oracle: &StalenessOracle<'_>,
        cache: &mut BuildCache,
        on_event: &mut dyn FnMut(JobEvent<'_>),
    ) -> BuildOutcome {
        let start = Instant::now();
        let (subs, mains): (Vec<_>, Vec<_>) = request
            .units
            .iter()
            .cloned()
            .partition(|u| u.kind == UnitKind::SubArtifact);

        let mut results = Vec::new();
        let mut interrupted = Vec::new();

        tracing::info!(units = subs.len(), workers = self.workers, "figure phase");
        let figures = self.stale_then_run(subs, None, request.force, oracle, cache, on_event);
        let mut failed_figures: BTreeMap<String, String> = BTreeMap::new();
        for result in figures.results.iter().filter(|r| r.is_failure()) {
            failed_figures
                .entry(result.unit.module.clone())
                .or_insert_with(|| result.unit.to_string());
        }
        absorb(figures, cache, &mut results, &mut interrupted);

        let mode = request.mode.as_ref();
        let mut runnable = Vec::with_capacity(mains.len());
        for unit in mains {
            match failed_figures.get(&unit.module) {
                Some(figure) => {
                    let result = CompileResult::failed(&unit, mode, format!("blocked by failed figure {figure}"));
                    on_event(JobEvent::Finished(&result));
                    results.push(result);
                }
                None => runnable.push(unit),
            }
        }

        tracing::info!(units = runnable.len(), workers = self.workers, "main phase");
        let main = self.stale_then_run(runnable, mode, request.force, oracle, cache, on_event);
        absorb(main, cache, &mut results, &mut interrupted);

        let metrics = BuildMetrics::from_results(&results)
            .with_interrupted(interrupted.len())
            .with_elapsed(start.elapsed());
        BuildOutcome {
            results,
            interrupted,
            metrics,
        }
    }

    /// Reports fresh units as skipped and runs the rest.
    fn stale_then_run(
        &self,
        units: Vec<CompilableUnit>,
        mode: Option<&Mode>,
        force: bool,
        oracle: &StalenessOracle<'_>,
        cache: &BuildCache,
        on_event: &mut dyn FnMut(JobEvent<'_>),
    ) -> PhaseOutcome {
        if self.interrupt.is_raised() {
            for unit in &units {
                on_event(JobEvent::NotStarted(unit));
            }
            return PhaseOutcome {
                results: Vec::new(),
                interrupted: units,
            };
        }

        let stale: Vec<bool> = if force {
            vec![true; units.len()]
        } else {
            self.pool.install(|| {
                units
                    .par_iter()
                    .map(|unit| oracle.needs_rebuild(unit, mode, cache))
                    .collect()
            })
        };

        let mut skipped = Vec::new();
        let mut to_run = Vec::new();
        for (unit, stale) in units.into_iter().zip(stale) {
            if stale {
                to_run.push(unit);
            } else {
                let result = CompileResult::skipped(&unit, mode, self.job.artifact_path(&unit, mode));
                on_event(JobEvent::Finished(&result));
                skipped.push(result);
            }
        }

        let mut outcome = self.run_phase(to_run, mode, on_event);
        skipped.append(&mut outcome.results);
        outcome.results = skipped;
        outcome
    }
}

/// Moves a phase's results into the run totals, recording compiled units in
/// the cache.
fn absorb(
    phase: PhaseOutcome,
    cache: &mut BuildCache,
    results: &mut Vec<CompileResult>,
    interrupted: &mut Vec<CompilableUnit>,
) {
    for result in &phase.results {
        if result.status != JobStatus::Compiled {
            continue;
        }
        if let Some(mtime) = result.source_mtime {
            cache.record(result.cache_key.clone(), mtime);
        }
    }
    results.extend(phase.results);
    interrupted.extend(phase.interrupted);
}
