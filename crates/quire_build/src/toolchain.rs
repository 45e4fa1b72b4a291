//! External toolchain invocation.
//!
//! The toolchain is an opaque program taking a fixed flag set, an output
//! directory override and an input file name. It always runs with an
//! explicit working directory; the process-wide current directory is never
//! touched, so jobs on different worker threads cannot interfere.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use quire_config::ToolchainConfig;

use crate::error::BuildError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Configured toolchain program and flags.
#[derive(Debug, Clone)]
pub struct Toolchain {
    program: String,
    flags: Vec<String>,
    output_dir_flag: String,
    jobname_flag: String,
    pretex_flag: String,
    output_extension: String,
    timeout: Duration,
}

/// Arguments of a single toolchain run.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// Input file, relative to `working_dir`.
    pub input: &'a str,
    /// Directory the process runs in.
    pub working_dir: &'a Path,
    /// Directory the toolchain writes its outputs to.
    pub output_dir: &'a Path,
    /// Job name override, for mode variants.
    pub job_name: Option<&'a str>,
    /// Code injected before the document, for mode variants.
    pub pretex: Option<&'a str>,
}

/// How a toolchain run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The process exited on its own.
    Exited(ExitStatus),
    /// The process exceeded the timeout and was killed.
    TimedOut,
}

impl Toolchain {
    /// Builds a toolchain from configuration.
    pub fn from_config(config: &ToolchainConfig) -> Self {
        Self {
            program: config.program.clone(),
            flags: config.flags.clone(),
            output_dir_flag: config.output_dir_flag.clone(),
            jobname_flag: config.jobname_flag.clone(),
            pretex_flag: config.pretex_flag.clone(),
            output_extension: config.output_extension.clone(),
            timeout: config.timeout(),
        }
    }

    /// Replaces the per-job timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Extension of the artifact the toolchain produces.
    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// Per-job wall-clock limit.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves the program, failing if it cannot be found.
    pub fn locate(&self) -> Result<PathBuf, BuildError> {
        find_program(&self.program).ok_or_else(|| BuildError::ToolchainNotFound(self.program.clone()))
    }

    /// Full argument list for `invocation`, excluding the program.
    pub fn args(&self, invocation: &Invocation<'_>) -> Vec<String> {
        let mut args = self.flags.clone();
        args.push(format!("{}={}", self.output_dir_flag, invocation.output_dir.display()));
        if let Some(name) = invocation.job_name {
            args.push(format!("{}={name}", self.jobname_flag));
        }
        if let Some(pretex) = invocation.pretex {
            args.push(format!("{}={pretex}", self.pretex_flag));
        }
        args.push(invocation.input.to_string());
        args
    }

    /// Runs the toolchain, sending stdout and stderr to `capture`.
    ///
    /// Blocks until the process exits or the timeout elapses, in which case
    /// the process is killed.
    pub fn run(&self, invocation: &Invocation<'_>, capture: &Path) -> std::io::Result<RunOutcome> {
        let log = File::create(capture)?;
        let mut command = Command::new(&self.program);
        command
            .args(self.args(invocation))
            .current_dir(invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // New group led by the child, so a timeout can reach the engine it spawns.
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(RunOutcome::Exited(status));
            }
            if start.elapsed() >= self.timeout {
                tracing::debug!(program = %self.program, input = invocation.input, "killing timed out toolchain");
                kill_process_tree(&mut child);
                child.wait()?;
                return Ok(RunOutcome::TimedOut);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

/// Kills `child` and, on Unix, every process in its group.
///
/// latexmk runs pdflatex as a grandchild that would otherwise keep writing
/// into the job directory after the timeout. Errors are ignored: the
/// processes may exit on their own between the timeout check and the kill.
fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let _ = Command::new("kill")
            .args(["-s", "KILL", "--", group.as_str()])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
}

/// Locates `program` the way a shell would.
///
/// Names containing a path separator are checked directly; bare names are
/// looked up on `PATH`.
pub fn find_program(program: &str) -> Option<PathBuf> {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file().then(|| path.to_path_buf());
    }
    let search = std::env::var_os("PATH")?;
    std::env::split_paths(&search).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = candidate.with_extension("exe");
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}
