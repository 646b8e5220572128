//! Tracing setup for tests.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `warn` so passing tests stay quiet.
/// Output goes through the test harness's capture.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_repeatable() {
        init_tracing();
        init_tracing();
        tracing::debug!("tracing initialized");
    }
}
