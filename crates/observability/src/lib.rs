//! Tracing/logging setup shared by console binaries.

/// Initialize process-wide logging with `default_filter` as the fallback
/// when `RUST_LOG` is unset.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(default_filter: &str) {
    tracing::init(default_filter);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
