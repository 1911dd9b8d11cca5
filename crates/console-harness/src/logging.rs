//! Tracing subscriber setup for test binaries and the operator CLI.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "console_harness=info";

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global subscriber writing to stderr, honoring `RUST_LOG`, else
/// `default_filter`. Returns false when a subscriber is already installed.
pub fn init_with(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
        .is_ok()
}

/// Subscriber for test binaries; output is captured per test.
///
/// Safe to call from every test.
pub fn init_test_tracing() -> bool {
    tracing_subscriber::registry()
        .with(env_filter(DEFAULT_FILTER))
        .with(fmt::layer().with_test_writer())
        .try_init()
        .is_ok()
}
