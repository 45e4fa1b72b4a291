//! Process-level interrupt handling.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::BuildError;

/// Shared flag raised when the user interrupts the run.
///
/// The scheduler stops starting new jobs once it is raised. Jobs already
/// running are left to finish.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// A lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Installs a Ctrl-C handler that raises the returned flag.
///
/// Can only be called once per process.
pub fn install_interrupt_handler() -> Result<InterruptFlag, BuildError> {
    let flag = InterruptFlag::new();
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || {
        if !handler_flag.is_raised() {
            eprintln!("\n   Interrupted: waiting for running jobs to finish");
        }
        handler_flag.raise();
    })
    .map_err(|e| BuildError::Interrupt(e.to_string()))?;
    Ok(flag)
}
