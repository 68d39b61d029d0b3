//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_FILTER: &str = "info";

/// Initialize JSON logging filtered by `RUST_LOG`.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    init_with(filter);
}

/// Initialize JSON logging with an explicit filter directive, ignoring `RUST_LOG`.
pub fn init_with_directive(directive: &str) {
    init_with(EnvFilter::new(directive));
}

fn init_with(filter: EnvFilter) {
    // Token values are never logged; spans carry URLs and usernames only.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
