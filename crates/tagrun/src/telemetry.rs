//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

/// Installs a stderr subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn try_init() -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
}

/// Like [`try_init`], ignoring an already installed subscriber.
pub fn init() {
    let _ = try_init();
}
