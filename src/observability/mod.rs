//! Logging setup for binaries and tests embedding the session store.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Install a global fmt subscriber honouring `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"` or `"sessionvault=debug"`).
///
/// Returns an error instead of panicking if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}
