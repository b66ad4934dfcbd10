//! Tracing subscriber setup for the binary.
//!
//! Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
//! overrides the default level.

use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "sadaqa=info,sadaqa_core=info";
const VERBOSE_FILTER: &str = "sadaqa=debug,sadaqa_core=debug";

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    });

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
