//! Process-wide logging setup shared by every bankflow binary.

/// Tracing configuration (filters, formatter).
pub mod tracing;

/// Initialize process-wide tracing/logging.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}
