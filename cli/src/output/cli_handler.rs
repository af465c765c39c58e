//! CLI output handler implementation

use appgen_core::output::{AgentEvent, AgentOutput, OutputResult, ToolExecutionInfo};
use async_trait::async_trait;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Longest single line of tool output echoed to the terminal
const MAX_RESULT_LINE: usize = 100;

/// CLI output configuration
#[derive(Debug, Clone, Default)]
pub struct CliOutputConfig {
    /// Show free text the model writes next to its tool calls
    pub verbose: bool,
    /// Prefix for every line, used to tell concurrent batch runs apart
    pub label: Option<String>,
}

/// CLI output handler that formats events for terminal display
pub struct CliOutputHandler {
    config: CliOutputConfig,
    multi: Option<MultiProgress>,
    spinner: Mutex<Option<ProgressBar>>,
}

impl CliOutputHandler {
    /// Create a new CLI output handler
    pub fn new(config: CliOutputConfig) -> Self {
        Self {
            config,
            multi: None,
            spinner: Mutex::new(None),
        }
    }

    /// Draw the spinner inside a shared multi-progress area
    pub fn with_multi(mut self, multi: MultiProgress) -> Self {
        self.multi = Some(multi);
        self
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn start_spinner(&self) {
        let pb = ProgressBar::new_spinner();
        let pb = match &self.multi {
            Some(multi) => multi.add(pb),
            None => pb,
        };
        pb.set_style(Self::spinner_style());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("starting...");

        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(previous) = slot.replace(pb) {
                previous.finish_and_clear();
            }
        }
    }

    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(slot) = self.spinner.lock() {
            if let Some(pb) = slot.as_ref() {
                f(pb);
            }
        }
    }

    fn finish_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(pb) = slot.take() {
                pb.finish_and_clear();
            }
        }
    }

    /// Print above the spinner when there is one
    fn line(&self, text: String) {
        let text = match &self.config.label {
            Some(label) => format!("{} {}", format!("[{}]", label).dimmed(), text),
            None => text,
        };

        let mut printed = false;
        self.with_spinner(|pb| {
            pb.println(&text);
            printed = true;
        });
        if !printed {
            match &self.multi {
                Some(multi) => {
                    let _ = multi.println(&text);
                }
                None => println!("{}", text),
            }
        }
    }

    fn format_tool(info: &ToolExecutionInfo) -> String {
        let target = info
            .target()
            .map(|path| format!(" {}", path))
            .unwrap_or_default();
        let detail = first_line(&info.result.content);

        if info.result.success {
            format!(
                "  {} {}{} {}",
                "✓".green(),
                info.invocation.name.bold(),
                target,
                detail.dimmed()
            )
        } else {
            format!(
                "  {} {}{} {}",
                "✗".red(),
                info.invocation.name.bold(),
                target,
                detail.red()
            )
        }
    }
}

fn first_line(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default();
    if line.chars().count() > MAX_RESULT_LINE {
        let cut: String = line.chars().take(MAX_RESULT_LINE).collect();
        format!("{}...", cut)
    } else {
        line.to_string()
    }
}

#[async_trait]
impl AgentOutput for CliOutputHandler {
    async fn emit_event(&self, event: AgentEvent) -> OutputResult {
        match event {
            AgentEvent::RunStarted {
                run_id,
                goal,
                max_iterations,
            } => {
                debug!("run {} started with budget {}", run_id, max_iterations);
                self.line(format!("🏗️  {} {}", "Building:".bold(), goal));
                self.start_spinner();
            }

            AgentEvent::IterationStarted {
                iteration,
                max_iterations,
            } => {
                self.with_spinner(|pb| {
                    pb.set_prefix(format!("[{}/{}]", iteration, max_iterations));
                    pb.set_message("waiting for model...");
                });
            }

            AgentEvent::ModelRetry {
                attempt,
                max_attempts,
                error,
                ..
            } => {
                self.line(format!(
                    "  {} model call failed (attempt {}/{}): {}",
                    "⚠".yellow(),
                    attempt,
                    max_attempts,
                    error
                ));
            }

            AgentEvent::ModelText { text, .. } => {
                if self.config.verbose {
                    for line in text.lines() {
                        self.line(format!("  {}", line.italic().dimmed()));
                    }
                }
            }

            AgentEvent::ToolExecuted { info } => {
                self.line(Self::format_tool(&info));
                self.with_spinner(|pb| pb.set_message("waiting for model..."));
            }

            AgentEvent::MalformedResponse { reason, .. } => {
                self.line(format!(
                    "  {} {}",
                    "⚠".yellow(),
                    format!("unusable model response: {}", reason).yellow()
                ));
            }

            AgentEvent::TokenUsageUpdated { token_usage } => {
                self.with_spinner(|pb| {
                    pb.set_message(format!("{} tokens used", token_usage.total_tokens));
                });
            }

            AgentEvent::RunFinished {
                success,
                summary,
                iterations,
                files,
                ..
            } => {
                self.finish_spinner();
                if success {
                    self.line(format!(
                        "🎉 {} {} files in {} iterations",
                        "Completed".green().bold(),
                        files,
                        iterations
                    ));
                    if !summary.is_empty() {
                        self.line(format!("   {}", summary));
                    }
                } else {
                    self.line(format!("❌ {} {}", "Failed:".red().bold(), summary));
                }
            }
        }

        Ok(())
    }

    async fn flush(&self) -> OutputResult {
        use std::io::Write;
        std::io::stdout().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appgen_core::tools::{ToolInvocation, ToolResult};
    use serde_json::json;

    #[test]
    fn test_first_line_truncates() {
        assert_eq!(first_line("Created file: app.py (10 bytes)\nmore"), "Created file: app.py (10 bytes)");
        let long = "x".repeat(150);
        assert_eq!(first_line(&long).len(), MAX_RESULT_LINE + 3);
        assert_eq!(first_line(""), "");
    }

    #[test]
    fn test_format_tool_includes_target_and_outcome() {
        colored::control::set_override(false);

        let invocation =
            ToolInvocation::with_id("c1", "write_file", json!({"path": "app.py", "content": "x"}));
        let result = ToolResult::success("c1", "write_file", "Created file: app.py (1 bytes)");
        let line = CliOutputHandler::format_tool(&ToolExecutionInfo::new(1, &invocation, &result));
        assert!(line.contains("write_file app.py"));
        assert!(line.contains("Created file"));
        assert!(line.contains('✓'));
    }

    #[tokio::test]
    async fn test_handler_accepts_full_event_sequence() {
        let handler = CliOutputHandler::new(CliOutputConfig {
            verbose: true,
            label: Some("run-1".to_string()),
        });

        let events = vec![
            AgentEvent::RunStarted {
                run_id: "r".to_string(),
                goal: "a todo app".to_string(),
                max_iterations: 3,
            },
            AgentEvent::IterationStarted {
                iteration: 1,
                max_iterations: 3,
            },
            AgentEvent::ModelText {
                iteration: 1,
                text: "planning".to_string(),
            },
            AgentEvent::RunFinished {
                run_id: "r".to_string(),
                success: true,
                summary: "done".to_string(),
                iterations: 1,
                files: 0,
            },
        ];
        for event in events {
            handler.emit_event(event).await.unwrap();
        }
        assert!(handler.spinner.lock().unwrap().is_none());
    }
}
