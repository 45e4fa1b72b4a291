//! Run-scoped build counters.

use std::time::Duration;

use crate::job::{CompileResult, JobStatus};

/// Counters for one build invocation.
///
/// A plain value folded from results by the driver thread; workers never
/// touch it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildMetrics {
    /// Units considered, including interrupted ones.
    pub total: usize,
    /// Units the toolchain compiled.
    pub compiled: usize,
    /// Units that were up to date.
    pub skipped: usize,
    /// Units that failed or were blocked.
    pub failed: usize,
    /// Units never started because the run was interrupted.
    pub interrupted: usize,
    /// Wall-clock time of the whole run.
    pub elapsed: Duration,
}

impl BuildMetrics {
    /// Returns the metrics with `result` counted.
    #[must_use]
    pub fn record(self, result: &CompileResult) -> Self {
        let mut next = Self {
            total: self.total + 1,
            ..self
        };
        match result.status {
            JobStatus::Compiled => next.compiled += 1,
            JobStatus::Skipped => next.skipped += 1,
            JobStatus::Failed => next.failed += 1,
        }
        next
    }

    /// Folds a sequence of results.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a CompileResult>) -> Self {
        results.into_iter().fold(Self::default(), Self::record)
    }

    /// Returns the metrics with `count` interrupted units added.
    #[must_use]
    pub fn with_interrupted(self, count: usize) -> Self {
        Self {
            total: self.total + count,
            interrupted: self.interrupted + count,
            ..self
        }
    }

    /// Returns the metrics with the elapsed time set.
    #[must_use]
    pub fn with_elapsed(self, elapsed: Duration) -> Self {
        Self { elapsed, ..self }
    }

    /// Whether the run completed with no failures.
    pub fn succeeded(&self) -> bool {
        self.failed == 0 && self.interrupted == 0
    }
}
