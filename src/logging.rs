//! Optional tracing-subscriber setup for binaries and examples.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the host program's choice. This module offers a ready-made one behind
//! the `logging` feature.

use tracing_subscriber::EnvFilter;

/// Install a global subscriber reading filter directives from
/// `TASKGRID_LOG` (falling back to `info`).
///
/// Returns an error if a global subscriber is already set.
///
/// # Errors
///
/// Propagates the subscriber library's setup failure.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_env("TASKGRID_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()?;
    Ok(())
}
