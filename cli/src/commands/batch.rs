//! Concurrent builds, one per goal line

use super::{install_interrupt_handler, spawn_deadline, RunOptions};
use crate::config::CliConfigLoader;
use crate::materialize::materialize;
use crate::output::{CliOutputConfig, CliOutputHandler};
use anyhow::{Context, Result};
use appgen_core::llm::{create_client, ChatOptions};
use appgen_core::{AgentBuilder, RunOutcome, RunRequest, ToolRegistry, TrajectoryRecorder};
use colored::Colorize;
use futures::future::join_all;
use indicatif::MultiProgress;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Read goals from a file: one per non-empty line
pub fn read_goals(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run every goal in `goals_file` concurrently; returns whether all completed
pub async fn batch_command(
    goals_file: &Path,
    config_loader: CliConfigLoader,
    options: RunOptions,
) -> Result<bool> {
    let content = tokio::fs::read_to_string(goals_file)
        .await
        .with_context(|| format!("Failed to read goals file: {}", goals_file.display()))?;
    let goals = read_goals(&content);
    if goals.is_empty() {
        anyhow::bail!("No goals found in {}", goals_file.display());
    }
    info!("Starting {} builds", goals.len());

    let config = config_loader.load().await?;
    let client = create_client(&config.llm)?;
    let chat_options = ChatOptions::from_params(&config.llm.params);
    let registry = Arc::new(ToolRegistry::default());
    let multi = MultiProgress::new();

    let cancel = CancellationToken::new();
    install_interrupt_handler(cancel.clone())?;
    if let Some(secs) = options.timeout_secs {
        spawn_deadline(cancel.clone(), secs);
    }

    let mut runs = Vec::with_capacity(goals.len());
    for (index, goal) in goals.iter().enumerate() {
        let label = format!("run-{}", index + 1);
        let output = CliOutputHandler::new(CliOutputConfig {
            verbose: options.verbose,
            label: Some(label.clone()),
        })
        .with_multi(multi.clone());

        let mut builder = AgentBuilder::with_client_options(client.clone(), chat_options.clone())
            .with_agent_config(config.agent.clone())
            .with_registry(registry.clone())
            .with_output(Box::new(output));
        if let Some(dir) = &options.trajectory_file {
            let path = dir.join(format!("{}.json", label));
            builder = builder.with_trajectory_recorder(TrajectoryRecorder::with_file(path));
        }
        let agent = builder.build()?;

        let mut request = RunRequest::new(goal.clone()).with_cancellation(cancel.child_token());
        if let Some(max) = options.max_iterations {
            request = request.with_max_iterations(max);
        }

        runs.push(async move { (label, agent.run(request).await) });
    }

    let outcomes: Vec<(String, RunOutcome)> = join_all(runs).await;
    cancel.cancel();

    let mut all_completed = true;
    for ((label, outcome), goal) in outcomes.iter().zip(&goals) {
        all_completed &= outcome.is_completed();
        let line = format!("{} {}: {}", label, outcome.summary_line(), goal);
        if outcome.is_completed() {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }

        if outcome.is_completed() || (options.keep_partial && !outcome.workspace.is_empty()) {
            let dir = options.output_dir.join(label);
            if let Err(e) = materialize(&outcome.workspace, &dir) {
                warn!("{}: failed to write files: {:#}", label, e);
                all_completed = false;
            }
        }
    }

    Ok(all_completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_goals_skips_blank_lines() {
        let goals = read_goals("a todo app\n\n   \n  a blog with comments  \n");
        assert_eq!(goals, vec!["a todo app", "a blog with comments"]);
        assert!(read_goals("\n\n").is_empty());
    }
}
