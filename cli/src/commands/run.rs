//! Single build execution command

use crate::config::CliConfigLoader;
use crate::materialize::materialize;
use crate::output::{CliOutputConfig, CliOutputHandler};
use anyhow::Result;
use appgen_core::{AgentBuilder, RunOutcome, RunRequest, TrajectoryRecorder};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{install_interrupt_handler, spawn_deadline};

/// Options shared by `appgen "<goal>"` and `appgen batch`
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub max_iterations: Option<u32>,
    pub output_dir: PathBuf,
    pub keep_partial: bool,
    pub trajectory_file: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub verbose: bool,
}

/// Build one application; returns whether the run completed
pub async fn run_command(
    goal: String,
    config_loader: CliConfigLoader,
    options: RunOptions,
) -> Result<bool> {
    info!("Building: {}", goal);

    let config = config_loader.load().await?;
    info!("🤖 Using protocol: {}", config.llm.protocol.as_str());
    info!("🤖 Using model: {}", config.llm.model);
    debug!("Configuration source: {}", config.source);

    let output = CliOutputHandler::new(CliOutputConfig {
        verbose: options.verbose,
        label: None,
    });

    let mut builder = AgentBuilder::new(config.llm)
        .with_agent_config(config.agent)
        .with_output(Box::new(output));
    if let Some(path) = &options.trajectory_file {
        info!("📊 Trajectory file: {}", path.display());
        builder = builder.with_trajectory_recorder(TrajectoryRecorder::with_file(path));
    }
    let agent = builder.build()?;

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone())?;
    if let Some(secs) = options.timeout_secs {
        spawn_deadline(cancel.clone(), secs);
    }

    let mut request = RunRequest::new(goal).with_cancellation(cancel.clone());
    if let Some(max) = options.max_iterations {
        request = request.with_max_iterations(max);
    }

    let outcome = agent.run(request).await;
    // Stops the deadline task
    cancel.cancel();

    report_outcome(&outcome, &options.output_dir, options.keep_partial)?;
    Ok(outcome.is_completed())
}

/// Print the outcome line and write files when the run allows it
pub(crate) fn report_outcome(outcome: &RunOutcome, output_dir: &Path, keep_partial: bool) -> Result<()> {
    let line = outcome.summary_line();
    if outcome.is_completed() {
        println!("{}", line.green());
    } else {
        println!("{}", line.red());
    }
    println!("Iterations: {}", outcome.iterations);

    let usage = &outcome.usage;
    if usage.total_tokens > 0 {
        println!(
            "🪙 Tokens: {} input + {} output = {} total",
            usage.input_tokens, usage.output_tokens, usage.total_tokens
        );
    }

    if outcome.is_completed() || (keep_partial && !outcome.workspace.is_empty()) {
        let report = materialize(&outcome.workspace, output_dir)?;
        println!(
            "📁 Wrote {} files ({} bytes) to {}",
            report.total(),
            outcome.workspace.total_bytes(),
            output_dir.display()
        );
    } else if !outcome.workspace.is_empty() {
        println!(
            "{}",
            format!(
                "Discarded {} partial files (use --keep-partial to write them)",
                outcome.workspace.len()
            )
            .dimmed()
        );
    }

    Ok(())
}
