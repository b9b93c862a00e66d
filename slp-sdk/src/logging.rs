//! Tracing subscriber setup.
//!
//! The library crates only emit `tracing` events; applications pick the
//! subscriber. [`init`] installs a formatted one filtered by `RUST_LOG`.

use tracing_subscriber::{fmt, EnvFilter};

/// Directive used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (or [`DEFAULT_FILTER`]).
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_filter: Option<&str>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_FILTER)));
    fmt().with_env_filter(filter).with_target(true).try_init().is_ok()
}
