//! Log capture for tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Directives applied when `RUST_LOG` is unset: dependencies at `ERROR`, putstorm at `TRACE`.
const DEFAULT_DIRECTIVES: &str = "ERROR,putstorm=TRACE,putstorm_engine=TRACE";

/// Routes log events into the output captured by the test harness.
///
/// `RUST_LOG` replaces the default directives, e.g. to see `reqwest` internals while debugging a
/// test. Calling this more than once is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let layer = tracing_subscriber::fmt::layer()
        .with_test_writer()
        .with_target(true)
        .compact();

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .ok();
}
