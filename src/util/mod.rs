//! Shared utilities.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initializes tracing for embedding applications and tests.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `info`, or
/// `debug` when `verbose` is true. Safe to call more than once.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "verdigris=debug"
    } else {
        "verdigris=info"
    };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .try_init();
}
