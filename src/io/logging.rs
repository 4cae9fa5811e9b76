//! Structured logging setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset
pub const fn default_directive(debug: bool) -> &'static str {
    if debug {
        "deepisles_runner=debug,info"
    } else {
        "info"
    }
}

/// Install the global subscriber writing to stderr
///
/// `RUST_LOG` takes precedence over the default filter. Returns `false` if a
/// subscriber was already installed.
pub fn init_logging(debug: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}
