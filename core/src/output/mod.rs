//! Output abstraction for run progress
//!
//! The controller reports what it is doing through [`AgentOutput`]; the CLI
//! renders events to a terminal, tests and batch runs can discard them.

use crate::llm::Usage;
use crate::tools::{ToolInvocation, ToolResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub type OutputResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Null output handler that discards all events
pub struct NullOutput;

#[async_trait]
impl AgentOutput for NullOutput {
    async fn emit_event(&self, _event: AgentEvent) -> OutputResult {
        Ok(())
    }
}

/// Token usage accumulated over a run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn add(&mut self, usage: &Usage) {
        self.input_tokens += usage.prompt_tokens;
        self.output_tokens += usage.completion_tokens;
        self.total_tokens += usage.total_tokens;
    }
}

/// One executed tool invocation, as shown to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionInfo {
    pub iteration: u32,
    pub invocation: ToolInvocation,
    pub result: ToolResult,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ToolExecutionInfo {
    pub fn new(iteration: u32, invocation: &ToolInvocation, result: &ToolResult) -> Self {
        Self {
            iteration,
            invocation: invocation.clone(),
            result: result.clone(),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Path argument of the invocation, if it had one
    pub fn target(&self) -> Option<&str> {
        self.invocation.target_path()
    }
}

/// Events emitted during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentEvent {
    RunStarted {
        run_id: String,
        goal: String,
        max_iterations: u32,
    },
    IterationStarted {
        iteration: u32,
        max_iterations: u32,
    },
    /// A model call failed and will be retried
    ModelRetry {
        iteration: u32,
        attempt: u32,
        max_attempts: u32,
        error: String,
    },
    /// Free text the model produced alongside (or instead of) tool calls
    ModelText {
        iteration: u32,
        text: String,
    },
    ToolExecuted {
        info: ToolExecutionInfo,
    },
    MalformedResponse {
        iteration: u32,
        reason: String,
    },
    TokenUsageUpdated {
        token_usage: TokenUsage,
    },
    RunFinished {
        run_id: String,
        success: bool,
        summary: String,
        iterations: u32,
        files: usize,
    },
}

/// Abstract output interface for run progress
#[async_trait]
pub trait AgentOutput: Send + Sync {
    /// Emit an event
    async fn emit_event(&self, event: AgentEvent) -> OutputResult;

    /// Emit token usage update
    async fn emit_token_update(&self, token_usage: TokenUsage) -> OutputResult {
        self.emit_event(AgentEvent::TokenUsageUpdated { token_usage })
            .await
    }

    /// Flush any buffered output
    async fn flush(&self) -> OutputResult {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_accumulates() {
        let mut usage = TokenUsage::default();
        let call = Usage {
            prompt_tokens: 100,
            completion_tokens: 20,
            total_tokens: 120,
        };
        usage.add(&call);
        usage.add(&call);
        assert_eq!(usage.total_tokens, 240);
        assert_eq!(usage.input_tokens, 200);
    }

    #[tokio::test]
    async fn test_null_output_accepts_everything() {
        let output = NullOutput;
        assert!(output
            .emit_event(AgentEvent::IterationStarted {
                iteration: 1,
                max_iterations: 3
            })
            .await
            .is_ok());
        assert!(output.emit_token_update(TokenUsage::default()).await.is_ok());
    }
}
