//! Tracing/logging initialization.
//!
//! Services log structured JSON (one object per line, ingestion-friendly);
//! tests use the compact human-readable form.

use tracing_subscriber::EnvFilter;

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize tracing/logging for a service process.
///
/// JSON logs + timestamps, filterable via `RUST_LOG`. Safe to call multiple
/// times (subsequent calls are no-ops).
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}

/// Initialize compact, human-readable tracing for tests.
///
/// Quiet by default (`warn`); turn up with `RUST_LOG` when debugging a
/// failing test. Safe to call from every test.
pub fn init_for_tests() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("warn"))
        .compact()
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_harmless() {
        init_for_tests();
        init_for_tests();
        init();
        tracing::debug!("still alive after double init");
    }
}
