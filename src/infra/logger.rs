// src/infra/logger.rs — Tracing subscriber setup

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber. An explicit `RUST_LOG` wins over the
/// given default directive.
pub fn init_logging(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .compact()
        .with_target(false)
        .with_env_filter(filter)
        .init();
}
