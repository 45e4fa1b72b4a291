//! Build execution for quire.
//!
//! A [`CompilationJob`] turns one unit into one artifact by running the
//! external toolchain in a directory private to that (unit, mode) pair. The
//! [`Scheduler`] runs jobs in two phases on a fixed-size worker pool:
//! sub-artifacts (figures) first, then main units. Results flow back to the
//! driver thread, which alone updates the build cache and folds
//! [`BuildMetrics`].

#![warn(missing_docs)]

pub mod error;
pub mod figures;
pub mod interrupt;
pub mod job;
pub mod metrics;
pub mod scheduler;
pub mod toolchain;

pub use error::{BuildError, JobError};
pub use figures::FigureWrapper;
pub use interrupt::{install_interrupt_handler, InterruptFlag};
pub use job::{CompilationJob, CompileResult, JobStatus};
pub use metrics::BuildMetrics;
pub use scheduler::{BuildOutcome, BuildRequest, JobEvent, PhaseOutcome, Scheduler};
pub use toolchain::{find_program, Invocation, RunOutcome, Toolchain};
