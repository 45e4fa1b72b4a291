//! End-to-end engine scenarios against a fake toolchain.
//!
//! The fake is a shell script mimicking latexmk: it honors `-outdir=` and
//! `-jobname=`, writes `<job>.pdf` plus a `.fls` report, and reacts to
//! marker comments in the unit (or in files a figure wrapper inputs):
//! `%FAIL%` exits non-zero, `%SLOW%` sleeps a second, `%HANG%` sleeps ten,
//! `%NOPDF%` exits 0 without output. Every run appends `start <job>` and
//! `end <job>` to an order log.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::{set_file_mtime, FileTime};
use quire_build::{
    BuildOutcome, BuildRequest, CompilationJob, FigureWrapper, InterruptFlag, JobEvent, JobStatus,
    Scheduler, Toolchain,
};
use quire_cache::BuildCache;
use quire_common::{CompilableUnit, Layout, Mode, Mtime};
use quire_config::QuireConfig;
use quire_deps::StalenessOracle;

const FAKE_LATEXMK: &str = r#"#!/bin/sh
outdir=.
job=
input=
for arg in "$@"; do
    case "$arg" in
        -outdir=*) outdir="${arg#-outdir=}" ;;
        -jobname=*) job="${arg#-jobname=}" ;;
        -*) ;;
        *) input="$arg" ;;
    esac
done
[ -n "$job" ] || job=$(basename "$input" .tex)
content=$(cat "$input"; sed -n 's/.*\\input{\([^}]*\)}.*/\1/p' "$input" | while read -r f; do cat "$f"; done)
echo "start $job" >> "{ORDER}"
echo "Latexmk: fake run of $input"
case "$content" in *%SLOW%*) sleep 1 ;; esac
case "$content" in *%HANG%*) sleep 10 ;; esac
case "$content" in
    *%FAIL%*)
        echo "! Undefined control sequence."
        echo "end $job" >> "{ORDER}"
        exit 12 ;;
esac
case "$content" in
    *%NOPDF%*)
        echo "end $job" >> "{ORDER}"
        exit 0 ;;
esac
printf 'PWD %s\nINPUT %s\n' "$(pwd)" "$input" > "$outdir/$job.fls"
echo "%PDF fake" > "$outdir/$job.pdf"
echo "end $job" >> "{ORDER}"
"#;

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config: QuireConfig,
    layout: Layout,
}

fn past() -> SystemTime {
    SystemTime::now() - Duration::from_secs(600)
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let script = root.join("fake-latexmk.sh");
        let order = root.join("order.log");
        fs::write(&script, FAKE_LATEXMK.replace("{ORDER}", &order.display().to_string())).unwrap();

        let mut config = QuireConfig::default();
        config.toolchain.program = "sh".to_string();
        config.toolchain.flags = vec![
            script.display().to_string(),
            "-pdf".to_string(),
            "-interaction=nonstopmode".to_string(),
        ];
        let layout = config.layout(&root);
        Self {
            _dir: dir,
            root,
            config,
            layout,
        }
    }

    /// Writes a source file with a pinned, old modification time.
    fn source(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.layout.source_root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        set_file_mtime(&path, FileTime::from_system_time(past())).unwrap();
        path
    }

    fn units(&self) -> Vec<CompilableUnit> {
        quire_project::find_compilable_units(&self.layout, &self.config.discovery).units
    }

    fn wrapper(&self) -> FigureWrapper {
        FigureWrapper::new(&self.config.figures, &self.config.discovery, self.layout.source_root())
    }

    fn scheduler(&self, workers: usize, timeout: Option<Duration>, interrupt: InterruptFlag) -> Scheduler {
        let mut toolchain = Toolchain::from_config(&self.config.toolchain);
        if let Some(timeout) = timeout {
            toolchain = toolchain.with_timeout(timeout);
        }
        let job = CompilationJob::new(self.layout.clone(), toolchain, self.wrapper());
        Scheduler::new(job, workers, interrupt).unwrap()
    }

    fn cache(&self) -> BuildCache {
        BuildCache::load(&self.config.cache_path(&self.root))
    }

    fn build_with(
        &self,
        scheduler: &Scheduler,
        cache: &mut BuildCache,
        request: BuildRequest,
        events: &mut Vec<String>,
    ) -> BuildOutcome {
        let oracle = StalenessOracle::new(
            &self.layout,
            &self.config.discovery.common_dir,
            &self.config.dependencies,
            &self.config.toolchain.output_extension,
        )
        .with_figure_inputs(self.wrapper().preamble().to_vec());
        scheduler.run_build(&request, &oracle, cache, &mut |event: JobEvent<'_>| {
            events.push(match event {
                JobEvent::Started(unit) => format!("started {unit}"),
                JobEvent::Finished(result) => format!("{} {}", result.status, result.unit),
                JobEvent::NotStarted(unit) => format!("not-started {unit}"),
            })
        })
    }

    fn build(&self, cache: &mut BuildCache) -> BuildOutcome {
        let scheduler = self.scheduler(2, None, InterruptFlag::new());
        let request = BuildRequest {
            units: self.units(),
            ..BuildRequest::default()
        };
        self.build_with(&scheduler, cache, request, &mut Vec::new())
    }

    fn order_log(&self) -> Vec<String> {
        fs::read_to_string(self.root.join("order.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn status_of(outcome: &BuildOutcome, rel: &str) -> JobStatus {
    outcome
        .results
        .iter()
        .find(|r| r.unit.rel_path == Path::new(rel))
        .map(|r| r.status)
        .unwrap_or_else(|| panic!("no result for {rel}"))
}

#[test]
fn incremental_rebuild_follows_shared_dependency() {
    let fx = Fixture::new();
    let shared = fx.source("common/shared.sty", "\\ProvidesPackage{shared}\n");
    let main = fx.source("modA/x_main.tex", "\\documentclass{article}\n");

    let mut cache = fx.cache();
    let first = fx.build(&mut cache);
    assert_eq!(status_of(&first, "modA/x_main.tex"), JobStatus::Compiled);
    assert_eq!(cache.get("modA/x_main.tex"), Mtime::of(&main).unwrap());
    assert!(fx.root.join("pdfs/modA/x_main.pdf").is_file());
    assert!(fx.root.join("logs/modA/x_main.log").is_file());

    let second = fx.build(&mut cache);
    assert_eq!(status_of(&second, "modA/x_main.tex"), JobStatus::Skipped);
    assert_eq!(second.metrics.compiled, 0);

    let later = SystemTime::now() + Duration::from_secs(5);
    set_file_mtime(&shared, FileTime::from_system_time(later)).unwrap();
    let third = fx.build(&mut cache);
    assert_eq!(status_of(&third, "modA/x_main.tex"), JobStatus::Compiled);
    assert!(third.metrics.succeeded());
}

#[test]
fn cache_survives_save_and_reload_between_runs() {
    let fx = Fixture::new();
    fx.source("modA/x_main.tex", "\\documentclass{article}\n");

    let mut cache = fx.cache();
    fx.build(&mut cache);
    cache.save().unwrap();

    let mut reloaded = fx.cache();
    assert_eq!(reloaded.len(), 1);
    let again = fx.build(&mut reloaded);
    assert_eq!(status_of(&again, "modA/x_main.tex"), JobStatus::Skipped);
}

#[test]
fn timeout_is_reported_as_timeout() {
    let fx = Fixture::new();
    fx.source("modA/slow_main.tex", "%HANG%\n");
    let scheduler = fx.scheduler(1, Some(Duration::from_millis(300)), InterruptFlag::new());
    let mut cache = fx.cache();
    let request = BuildRequest {
        units: fx.units(),
        ..BuildRequest::default()
    };
    let outcome = fx.build_with(&scheduler, &mut cache, request, &mut Vec::new());

    let result = &outcome.results[0];
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.detail[0].contains("timed out"), "{:?}", result.detail);
    assert!(cache.is_empty());
}

#[test]
fn failures_do_not_stop_other_jobs() {
    let fx = Fixture::new();
    fx.source("modA/a_main.tex", "%FAIL%\n");
    fx.source("modB/b_main.tex", "ok\n");

    let mut cache = fx.cache();
    let outcome = fx.build(&mut cache);

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(status_of(&outcome, "modA/a_main.tex"), JobStatus::Failed);
    assert_eq!(status_of(&outcome, "modB/b_main.tex"), JobStatus::Compiled);
    assert_eq!(outcome.metrics.failed, 1);
    assert_eq!(outcome.metrics.compiled, 1);
    assert!(!outcome.metrics.succeeded());
    assert!(fx.root.join("pdfs/modB/b_main.pdf").is_file());

    let failed = outcome.failures().next().unwrap();
    assert_eq!(failed.detail[0], "sh exited with code 12");
    assert!(failed.detail.iter().any(|l| l.starts_with("! Undefined control sequence")));
    assert!(failed.log.as_ref().is_some_and(|l| l.is_file()));
    assert!(cache.get("modA/a_main.tex") == Mtime::default());
}

#[test]
fn missing_artifact_after_success_is_a_failure() {
    let fx = Fixture::new();
    fx.source("modA/n_main.tex", "%NOPDF%\n");
    let mut cache = fx.cache();
    let outcome = fx.build(&mut cache);
    let result = &outcome.results[0];
    assert_eq!(result.status, JobStatus::Failed);
    assert!(result.detail[0].contains("no artifact"));
}

#[test]
fn figures_finish_before_main_units_start() {
    let fx = Fixture::new();
    fx.source("modA/figures/src/graph.tex", "%SLOW%\n\\draw (0,0) -- (1,1);\n");
    fx.source("modA/x_main.tex", "\\includegraphics{figures/graph.pdf}\n");
    fx.source("modB/y_main.tex", "plain\n");

    let mut cache = fx.cache();
    let scheduler = fx.scheduler(4, None, InterruptFlag::new());
    let request = BuildRequest {
        units: fx.units(),
        ..BuildRequest::default()
    };
    let mut events = Vec::new();
    let outcome = fx.build_with(&scheduler, &mut cache, request, &mut events);
    assert!(outcome.metrics.succeeded(), "{events:?}");

    let order = fx.order_log();
    let figure_end = order.iter().position(|l| l == "end graph").unwrap();
    for main in ["start x_main", "start y_main"] {
        let main_start = order.iter().position(|l| l == main).unwrap();
        assert!(figure_end < main_start, "{order:?}");
    }

    let event_end = events.iter().position(|e| e == "compiled modA/figures/src/graph.tex").unwrap();
    let event_main = events.iter().position(|e| e.starts_with("started modA/x_main")).unwrap();
    assert!(event_end < event_main);

    assert!(fx.root.join("pdfs/modA/figures/src/graph.pdf").is_file());
    let exported = fx.root.join("src/modA/figures/graph.pdf");
    assert!(exported.is_file());
    let artifact = fx.root.join("pdfs/modA/figures/src/graph.pdf");
    assert_eq!(Mtime::of(&exported).unwrap(), Mtime::of(&artifact).unwrap());
}

#[test]
fn module_with_several_figures_settles_after_one_build() {
    let fx = Fixture::new();
    fx.source("modA/figures/src/a.tex", "\\draw (0,0) -- (1,1);\n");
    fx.source("modA/figures/src/b.tex", "%SLOW%\n\\draw (0,0) circle (1);\n");
    fx.source("modA/figures/src/c.tex", "\\node {c};\n");
    fx.source("modA/x_main.tex", "\\includegraphics{figures/a}\n");

    let mut cache = fx.cache();
    let first = fx.build(&mut cache);
    assert_eq!(first.metrics.compiled, 4);
    assert!(fx.layout.source_root().join("modA/figures/b.pdf").is_file());

    let second = fx.build(&mut cache);
    let rebuilt: Vec<_> = second
        .results
        .iter()
        .filter(|r| r.status != JobStatus::Skipped)
        .map(|r| r.unit.rel_path.display().to_string())
        .collect();
    assert!(rebuilt.is_empty(), "rebuilt {rebuilt:?} without changes");
    assert_eq!(second.metrics.compiled, 0);
    assert_eq!(second.metrics.skipped, 4);
}

#[test]
fn failed_figure_blocks_its_module_only() {
    let fx = Fixture::new();
    fx.source("modA/figures/src/broken.tex", "%FAIL%\n");
    fx.source("modA/x_main.tex", "main\n");
    fx.source("modB/y_main.tex", "main\n");

    let mut cache = fx.cache();
    let outcome = fx.build(&mut cache);

    assert_eq!(status_of(&outcome, "modA/figures/src/broken.tex"), JobStatus::Failed);
    assert_eq!(status_of(&outcome, "modA/x_main.tex"), JobStatus::Failed);
    assert_eq!(status_of(&outcome, "modB/y_main.tex"), JobStatus::Compiled);
    let blocked = outcome
        .results
        .iter()
        .find(|r| r.unit.rel_path == Path::new("modA/x_main.tex"))
        .unwrap();
    assert_eq!(blocked.detail[0], "blocked by failed figure modA/figures/src/broken.tex");
    assert!(!fx.order_log().contains(&"start x_main".to_string()));
}

#[test]
fn mode_builds_into_separate_outputs() {
    let fx = Fixture::new();
    fx.source("modA/slides_main.tex", "slides\n");
    let scheduler = fx.scheduler(1, None, InterruptFlag::new());
    let mut cache = fx.cache();
    let mode = Mode {
        name: "handout".to_string(),
        pretex: "\\def\\handout{}".to_string(),
    };
    let request = BuildRequest {
        units: fx.units(),
        mode: Some(mode),
        force: false,
    };
    let outcome = fx.build_with(&scheduler, &mut cache, request, &mut Vec::new());

    assert_eq!(outcome.results[0].status, JobStatus::Compiled);
    assert!(fx.root.join("pdfs/modA/slides_main-handout.pdf").is_file());
    assert!(!fx.root.join("pdfs/modA/slides_main.pdf").exists());
    assert!(cache.get("modA/slides_main.tex@handout") > Mtime::default());
    assert_eq!(cache.get("modA/slides_main.tex"), Mtime::default());
}

#[test]
fn force_rebuilds_fresh_units() {
    let fx = Fixture::new();
    fx.source("modA/x_main.tex", "x\n");
    let mut cache = fx.cache();
    fx.build(&mut cache);

    let scheduler = fx.scheduler(1, None, InterruptFlag::new());
    let request = BuildRequest {
        units: fx.units(),
        mode: None,
        force: true,
    };
    let outcome = fx.build_with(&scheduler, &mut cache, request, &mut Vec::new());
    assert_eq!(outcome.metrics.compiled, 1);
}

#[test]
fn raised_interrupt_starts_nothing() {
    let fx = Fixture::new();
    fx.source("modA/figures/src/g.tex", "fig\n");
    fx.source("modA/x_main.tex", "x\n");
    fx.source("modB/y_main.tex", "y\n");

    let interrupt = InterruptFlag::new();
    interrupt.raise();
    let scheduler = fx.scheduler(2, None, interrupt);
    let mut cache = fx.cache();
    let request = BuildRequest {
        units: fx.units(),
        ..BuildRequest::default()
    };
    let mut events = Vec::new();
    let outcome = fx.build_with(&scheduler, &mut cache, request, &mut events);

    assert!(outcome.was_interrupted());
    assert_eq!(outcome.interrupted.len(), 3);
    assert_eq!(outcome.metrics.interrupted, 3);
    assert!(outcome.results.is_empty());
    assert!(events.iter().all(|e| e.starts_with("not-started")));
    assert!(fx.order_log().is_empty());
}

#[test]
fn unknown_toolchain_is_detected_up_front() {
    let mut config = QuireConfig::default();
    config.toolchain.program = "quire-no-such-latexmk".to_string();
    let toolchain = Toolchain::from_config(&config.toolchain);
    assert!(toolchain.locate().is_err());
}
