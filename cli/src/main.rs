//! # appgen CLI
//!
//! Command-line interface for appgen: describe a web application in one
//! sentence and let a tool-using model write it file by file.
//!
//! ## Usage
//!
//! - `appgen "a todo app with tags"` - Build one application
//! - `appgen batch goals.txt` - Build one application per line, concurrently
//! - `appgen tools` - Show the tools offered to the model

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod materialize;
mod output;

use commands::{batch_command, run_command, tools_command, RunOptions};
use config::CliConfigLoader;

/// appgen - Build a multi-file web application from a description
#[derive(Parser)]
#[command(name = "appgen")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build a multi-file web application from a one-line description")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file or directory path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Protocol to use (openai, openai_compat, anthropic)
    #[arg(long, global = true)]
    protocol: Option<String>,

    /// API key override
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL override
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name override
    #[arg(long, global = true)]
    model: Option<String>,

    /// Enable verbose logging and show model commentary
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Iteration budget for each run
    #[arg(long, global = true)]
    max_iterations: Option<u32>,

    /// Directory the generated files are written to
    #[arg(short, long, global = true, default_value = "generated")]
    output_dir: PathBuf,

    /// Write the files of a failed run too
    #[arg(long, global = true)]
    keep_partial: bool,

    /// Trajectory file (a directory for `batch`)
    #[arg(long, global = true)]
    trajectory_file: Option<PathBuf>,

    /// Cancel the run after this many seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Description of the application to build
    goal: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show available tools
    Tools,

    /// Build one application per non-empty line of a file
    Batch {
        /// File with one goal per line
        goals_file: PathBuf,
    },
}

/// Build a configuration loader from CLI arguments
fn build_config_loader(cli: &Cli) -> CliConfigLoader {
    let mut loader = CliConfigLoader::new();

    if let Some(config_path) = &cli.config {
        loader = loader.with_config_override(config_path.clone());
    }

    if let Some(protocol) = &cli.protocol {
        loader = loader.with_protocol_override(protocol.clone());
    }

    if let Some(api_key) = &cli.api_key {
        loader = loader.with_api_key_override(api_key.clone());
    }

    if let Some(base_url) = &cli.base_url {
        loader = loader.with_base_url_override(base_url.clone());
    }

    if let Some(model) = &cli.model {
        loader = loader.with_model_override(model.clone());
    }

    loader
}

fn run_options(cli: &Cli) -> RunOptions {
    RunOptions {
        max_iterations: cli.max_iterations,
        output_dir: cli.output_dir.clone(),
        keep_partial: cli.keep_partial,
        trajectory_file: cli.trajectory_file.clone(),
        timeout_secs: cli.timeout_secs,
        verbose: cli.verbose,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    appgen_core::init_tracing_with_debug(cli.verbose);

    let config_loader = build_config_loader(&cli);
    let options = run_options(&cli);

    let completed = match (cli.goal, cli.command) {
        (Some(goal), None) => run_command(goal, config_loader, options).await?,
        (None, Some(Commands::Tools)) => {
            tools_command().await?;
            true
        }
        (None, Some(Commands::Batch { goals_file })) => {
            batch_command(&goals_file, config_loader, options).await?
        }
        (Some(_), Some(_)) => {
            anyhow::bail!("Cannot specify both a goal and a subcommand");
        }
        (None, None) => {
            anyhow::bail!("Describe the application to build, e.g. appgen \"a todo app\"");
        }
    };

    if !completed {
        std::process::exit(1);
    }
    Ok(())
}
