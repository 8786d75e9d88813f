//! Internal diagnostics
//!
//! The logger reports its own problems (failed writes, rotation) through
//! `tracing`. Binaries route those events to stderr here; they never end up
//! in the managed log files.

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the diagnostics filter
pub const DIAGNOSTICS_ENV: &str = "FILELOG_LOG";

const DEFAULT_FILTER: &str = "filelog=warn";

/// Install a stderr subscriber filtered by `FILELOG_LOG` (default: `filelog=warn`)
pub fn init_diagnostics() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_env(DIAGNOSTICS_ENV)
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install diagnostics subscriber")
}
