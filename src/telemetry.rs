//! Tracing setup for the binary
//!
//! Log lines go to stderr so that report and CSV output on stdout stays
//! machine-readable. The filter comes from `RUST_LOG` and defaults to `info`.

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber
///
/// Calling this more than once is harmless; later calls are ignored.
pub fn setup_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
