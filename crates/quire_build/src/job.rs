//! One compilation job: one unit, one optional mode, one artifact.

use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use filetime::FileTime;
use quire_common::{CompilableUnit, Layout, Mode, Mtime, OutputTree, UnitKind};

use crate::error::JobError;
use crate::figures::FigureWrapper;
use crate::toolchain::{Invocation, RunOutcome, Toolchain};

/// Maximum number of error lines quoted from a failed job's log.
const EXCERPT_LINES: usize = 5;

/// Terminal state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// The toolchain ran and produced the artifact.
    Compiled,
    /// The artifact was up to date; the toolchain did not run.
    Skipped,
    /// The job failed or was blocked.
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compiled => write!(f, "compiled"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of one job. Immutable once created.
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// The unit that was built.
    pub unit: CompilableUnit,
    /// Mode name, if the job built a variant.
    pub mode: Option<String>,
    /// Terminal state.
    pub status: JobStatus,
    /// Final artifact location, when one exists.
    pub artifact: Option<PathBuf>,
    /// Saved log location, when the toolchain ran.
    pub log: Option<PathBuf>,
    /// Failure diagnostic, one line per entry.
    pub detail: Vec<String>,
    /// Wall-clock time spent in the job.
    pub duration: Duration,
    /// Source mtime captured before the toolchain ran. Recorded in the
    /// build cache when the job compiled.
    pub source_mtime: Option<Mtime>,
    /// Build cache key of this (unit, mode) pair.
    pub cache_key: String,
}

impl CompileResult {
    fn new(unit: &CompilableUnit, mode: Option<&Mode>, status: JobStatus) -> Self {
        Self {
            unit: unit.clone(),
            mode: mode.map(|m| m.name.clone()),
            status,
            artifact: None,
            log: None,
            detail: Vec::new(),
            duration: Duration::ZERO,
            source_mtime: None,
            cache_key: unit.cache_key(mode),
        }
    }

    /// Result for an up-to-date unit.
    pub fn skipped(unit: &CompilableUnit, mode: Option<&Mode>, artifact: PathBuf) -> Self {
        let mut result = Self::new(unit, mode, JobStatus::Skipped);
        result.artifact = Some(artifact);
        result
    }

    /// Failed result that never ran the toolchain.
    pub fn failed(unit: &CompilableUnit, mode: Option<&Mode>, reason: impl Into<String>) -> Self {
        let mut result = Self::new(unit, mode, JobStatus::Failed);
        result.detail.push(reason.into());
        result
    }

    /// Whether this result counts as a failure.
    pub fn is_failure(&self) -> bool {
        self.status == JobStatus::Failed
    }
}

/// Runs units through the toolchain.
///
/// Holds only read-only configuration and is shared by every worker.
#[derive(Debug, Clone)]
pub struct CompilationJob {
    layout: Layout,
    toolchain: Toolchain,
    figures: FigureWrapper,
}

impl CompilationJob {
    /// Creates a job runner.
    pub fn new(layout: Layout, toolchain: Toolchain, figures: FigureWrapper) -> Self {
        Self {
            layout,
            toolchain,
            figures,
        }
    }

    /// Final artifact path of a (unit, mode) job.
    pub fn artifact_path(&self, unit: &CompilableUnit, mode: Option<&Mode>) -> PathBuf {
        self.layout
            .artifact_path(unit, mode, self.toolchain.output_extension())
    }

    /// Builds `unit`, optionally as variant `mode`.
    ///
    /// Never panics and never returns an error: every failure, including a
    /// panic inside the job, becomes a failed [`CompileResult`].
    pub fn run(&self, unit: &CompilableUnit, mode: Option<&Mode>) -> CompileResult {
        let start = Instant::now();
        let source_mtime = Mtime::of_existing(&unit.path);
        let mut log = None;

        tracing::debug!(unit = %unit, mode = mode.map(|m| m.name.as_str()), "job started");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(unit, mode, &mut log)))
            .unwrap_or_else(|payload| Err(JobError::Panic(panic_message(payload.as_ref()))));

        let mut result = match outcome {
            Ok(artifact) => {
                let mut result = CompileResult::new(unit, mode, JobStatus::Compiled);
                result.artifact = Some(artifact);
                result.source_mtime = source_mtime;
                result
            }
            Err(err) => {
                let mut result = CompileResult::failed(unit, mode, err.to_string());
                if matches!(err, JobError::Exit { .. }) {
                    if let Some(log) = &log {
                        result.detail.extend(error_excerpt(log));
                    }
                }
                result
            }
        };
        result.log = log;
        result.duration = start.elapsed();
        tracing::debug!(unit = %unit, status = %result.status, elapsed_ms = result.duration.as_millis() as u64, "job finished");
        result
    }

    fn execute(
        &self,
        unit: &CompilableUnit,
        mode: Option<&Mode>,
        log: &mut Option<PathBuf>,
    ) -> Result<PathBuf, JobError> {
        let job_name = unit.job_name(mode);
        let job_dir = self.layout.job_dir(unit, mode);
        fs::create_dir_all(&job_dir).map_err(io_error(&job_dir))?;
        self.layout.ensure_mirrored_dir(OutputTree::Logs, unit)?;
        self.layout.ensure_mirrored_dir(OutputTree::Artifacts, unit)?;

        let (input, working_dir) = match unit.kind {
            UnitKind::Main => (unit.file_name().to_string(), unit.source_dir().to_path_buf()),
            UnitKind::SubArtifact => {
                let wrapper = self.figures.write(unit, &job_dir).map_err(io_error(&job_dir))?;
                (wrapper, job_dir.clone())
            }
        };

        let invocation = Invocation {
            input: &input,
            working_dir: &working_dir,
            output_dir: &job_dir,
            job_name: mode.map(|_| job_name.as_str()),
            pretex: mode.map(|m| m.pretex.as_str()),
        };
        let capture = job_dir.join(format!("{job_name}.console.log"));
        let outcome = self
            .toolchain
            .run(&invocation, &capture)
            .map_err(|source| JobError::Spawn {
                program: self.toolchain.program().to_string(),
                source,
            })?;
        *log = self.save_log(unit, mode, &capture);

        match outcome {
            RunOutcome::TimedOut => return Err(JobError::Timeout(self.toolchain.timeout())),
            RunOutcome::Exited(status) if !status.success() => {
                return Err(JobError::Exit {
                    program: self.toolchain.program().to_string(),
                    code: status.code(),
                });
            }
            RunOutcome::Exited(_) => {}
        }

        let produced = job_dir.join(format!("{job_name}.{}", self.toolchain.output_extension()));
        if !produced.is_file() {
            return Err(JobError::MissingArtifact(produced));
        }

        let artifact = self.artifact_path(unit, mode);
        copy_preserving_mtime(&produced, &artifact)?;
        if unit.kind == UnitKind::SubArtifact {
            if let Some(export_dir) = self.figures.export_dir(unit) {
                let exported = export_dir.join(format!("{}.{}", unit.stem(), self.toolchain.output_extension()));
                copy_preserving_mtime(&produced, &exported)?;
            }
        }
        Ok(artifact)
    }

    /// Moves the captured console log into the mirrored log tree.
    fn save_log(&self, unit: &CompilableUnit, mode: Option<&Mode>, capture: &Path) -> Option<PathBuf> {
        let target = self.layout.log_path(unit, mode);
        if fs::rename(capture, &target).is_ok() {
            return Some(target);
        }
        // Rename fails across filesystems.
        match fs::copy(capture, &target).and_then(|_| fs::remove_file(capture)) {
            Ok(()) => Some(target),
            Err(e) => {
                tracing::warn!(log = %capture.display(), error = %e, "could not save job log");
                capture.is_file().then(|| capture.to_path_buf())
            }
        }
    }
}

/// Copies `from` to `to`, giving the copy the source's modification time.
fn copy_preserving_mtime(from: &Path, to: &Path) -> Result<(), JobError> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    fs::copy(from, to).map_err(io_error(to))?;
    let modified = fs::metadata(from)
        .and_then(|m| m.modified())
        .map_err(io_error(from))?;
    filetime::set_file_mtime(to, FileTime::from_system_time(modified)).map_err(io_error(to))?;
    Ok(())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> JobError {
    let path = path.to_path_buf();
    move |source| JobError::Io { path, source }
}

/// Picks error-indicating lines out of a toolchain log.
fn error_excerpt(log: &Path) -> Vec<String> {
    let Ok(bytes) = fs::read(log) else {
        return Vec::new();
    };
    String::from_utf8_lossy(&bytes)
        .lines()
        .map(str::trim_end)
        .filter(|line| line.starts_with('!') || line.contains("Error") || line.contains("error:"))
        .take(EXCERPT_LINES)
        .map(str::to_string)
        .collect()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}
