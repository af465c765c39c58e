//! CLI command implementations

pub mod batch;
pub mod run;
pub mod tools;

pub use batch::batch_command;
pub use run::{run_command, RunOptions};
pub use tools::tools_command;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `token` on Ctrl-C
///
/// The run stops at its next cancellation point and keeps whatever it
/// produced so far.
pub fn install_interrupt_handler(token: CancellationToken) -> Result<()> {
    ctrlc::set_handler(move || {
        if !token.is_cancelled() {
            eprintln!("\nInterrupted, stopping the run...");
        }
        token.cancel();
    })
    .context("Failed to install Ctrl-C handler")
}

/// Cancel `token` once `timeout_secs` of wall-clock time have passed
pub fn spawn_deadline(token: CancellationToken, timeout_secs: u64) {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(timeout_secs)) => {
                warn!("run exceeded {}s wall-clock limit, cancelling", timeout_secs);
                token.cancel();
            }
        }
    });
}
