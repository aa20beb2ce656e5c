// Rust guideline compliant 2026-10-19

//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (for example `info`
/// or `balance_alerts=debug,info`) is used.
pub fn init(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
