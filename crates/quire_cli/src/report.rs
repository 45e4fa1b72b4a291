//! Progress lines and the end-of-build summary.

use std::path::Path;

use quire_build::{BuildOutcome, CompileResult, JobEvent, JobStatus};

use crate::GlobalArgs;

/// Exit code when the run was interrupted by the user.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Optional ANSI styling.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    /// Styling enabled when `color` is set.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Green text.
    pub fn green(&self, text: &str) -> String {
        self.paint("32", text)
    }

    /// Red text.
    pub fn red(&self, text: &str) -> String {
        self.paint("31", text)
    }

    /// Yellow text.
    pub fn yellow(&self, text: &str) -> String {
        self.paint("33", text)
    }

    /// Bold text.
    pub fn bold(&self, text: &str) -> String {
        self.paint("1", text)
    }
}

/// Right-aligns a status word in the twelve-column gutter.
fn gutter(word: &str) -> String {
    format!("{word:>12}")
}

/// Prints one progress line for `event`.
pub fn print_event(event: JobEvent<'_>, global: &GlobalArgs, style: &Style) {
    if global.quiet {
        return;
    }
    match event {
        JobEvent::Started(unit) => {
            eprintln!("{} {unit}", style.green(&gutter("Compiling")));
        }
        JobEvent::Finished(result) => match result.status {
            JobStatus::Compiled => {
                if global.verbose {
                    eprintln!(
                        "{} {} ({:.1}s)",
                        style.green(&gutter("Finished")),
                        result.unit,
                        result.duration.as_secs_f64()
                    );
                }
            }
            JobStatus::Skipped => {
                if global.verbose {
                    eprintln!("{} {}", gutter("Fresh"), result.unit);
                }
            }
            JobStatus::Failed => {
                let reason = result.detail.first().map(String::as_str).unwrap_or("failed");
                eprintln!("{} {}: {reason}", style.red(&gutter("Failed")), result.unit);
            }
        },
        JobEvent::NotStarted(unit) => {
            if global.verbose {
                eprintln!("{} {unit}", style.yellow(&gutter("Cancelled")));
            }
        }
    }
}

/// Shows `path` relative to `root` when possible.
fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

/// One-line totals: total, compiled, skipped, failed and time.
pub fn summary_line(outcome: &BuildOutcome) -> String {
    let m = &outcome.metrics;
    let mut line = format!(
        "{} total, {} compiled, {} skipped, {} failed in {:.1}s",
        m.total,
        m.compiled,
        m.skipped,
        m.failed,
        m.elapsed.as_secs_f64()
    );
    if m.interrupted > 0 {
        line.push_str(&format!(", {} not started", m.interrupted));
    }
    line
}

fn print_failure(result: &CompileResult, root: &Path, style: &Style) {
    eprintln!("   {}", style.bold(&result.unit.to_string()));
    if let Some(mode) = &result.mode {
        eprintln!("      mode: {mode}");
    }
    for line in &result.detail {
        eprintln!("      {line}");
    }
    if let Some(log) = &result.log {
        eprintln!("      log: {}", display_path(log, root));
    }
}

/// Prints the summary. Failures are listed even in quiet mode.
pub fn print_summary(outcome: &BuildOutcome, root: &Path, global: &GlobalArgs, style: &Style) {
    if !global.quiet {
        eprintln!();
        eprintln!("   Summary: {}", summary_line(outcome));
    }

    let mut failures: Vec<&CompileResult> = outcome.failures().collect();
    if !failures.is_empty() {
        failures.sort_by(|a, b| a.unit.rel_path.cmp(&b.unit.rel_path));
        eprintln!();
        eprintln!("   {} {} unit(s):", style.red("Failed"), failures.len());
        for result in failures {
            print_failure(result, root, style);
        }
    }

    if outcome.was_interrupted() {
        eprintln!();
        eprintln!(
            "   {} {} unit(s) were not started",
            style.yellow("Interrupted:"),
            outcome.interrupted.len()
        );
        if global.verbose {
            for unit in &outcome.interrupted {
                eprintln!("      {unit}");
            }
        }
    }
}

/// Process exit code for a finished build.
pub fn exit_code(outcome: &BuildOutcome) -> i32 {
    if outcome.was_interrupted() {
        EXIT_INTERRUPTED
    } else if outcome.metrics.failed > 0 {
        1
    } else {
        0
    }
}
