//! Tracing setup for tests
//!
//! Installs a global subscriber once per test binary. The filter is read
//! from `RUST_LOG` and otherwise shows repository debug events only.

use once_cell::sync::Lazy;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TRACING: Lazy<()> = Lazy::new(|| {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,domain_repository=debug"));

    // Another harness may already own the global subscriber
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_test_writer())
        .try_init();
});

/// Installs the test subscriber; safe to call from every test
pub fn init_test_tracing() {
    Lazy::force(&TRACING);
}
