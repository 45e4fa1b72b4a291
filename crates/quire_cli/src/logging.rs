//! Diagnostic logging setup.
//!
//! Library crates emit `tracing` events; this installs the subscriber that
//! prints them to stderr. User-facing progress is printed separately.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Default filter directive for the given verbosity flags.
pub fn default_directive(verbose: bool, quiet: bool) -> String {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    format!("quire={level}")
}

/// Installs the global subscriber. `RUST_LOG` overrides the flags.
pub fn init(verbose: bool, quiet: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(verbose))
            .init();
    });
}
