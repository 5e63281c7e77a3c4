//! Tracing subscriber setup.
//!
//! The crate only emits `tracing` events; hosts that do not install their
//! own subscriber can call [`init_logging`] once at startup:
//!
//! ```bash
//! # Show route registration and per-request logs
//! RUST_LOG=trellis=debug cargo run --example routing
//! ```

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a formatted stdout subscriber filtered by `RUST_LOG`
/// (default `info`). Calling it again, or after another subscriber was
/// installed, does nothing.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
