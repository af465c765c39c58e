//! Trajectory entry structures

use crate::llm::{LlmMessage, Usage};
use crate::tools::{ToolInvocation, ToolResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single entry in the run history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrajectoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub entry_type: EntryType,

    /// Iteration the entry belongs to (0 before the first model call)
    pub iteration: u32,
}

/// Type of trajectory entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryType {
    RunStart {
        run_id: String,
        goal: String,
        max_iterations: u32,
        agent_config: serde_json::Value,
    },

    LlmRequest {
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
    },

    LlmResponse {
        message: LlmMessage,
        usage: Option<Usage>,
        finish_reason: Option<String>,
    },

    ToolInvocation {
        invocation: ToolInvocation,
    },

    ToolResult {
        result: ToolResult,
    },

    MalformedResponse {
        reason: String,
    },

    /// A failed model call; `attempt` counts from 1
    ModelError {
        error: String,
        attempt: u32,
    },

    IterationComplete {
        tool_calls: usize,
        files: usize,
    },

    RunComplete {
        success: bool,
        outcome: String,
        iterations: u32,
        files: Vec<String>,
        duration_ms: u64,
    },
}

impl TrajectoryEntry {
    pub fn new(entry_type: EntryType, iteration: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            entry_type,
            iteration,
        }
    }

    pub fn run_start(
        run_id: String,
        goal: String,
        max_iterations: u32,
        agent_config: serde_json::Value,
    ) -> Self {
        Self::new(
            EntryType::RunStart {
                run_id,
                goal,
                max_iterations,
                agent_config,
            },
            0,
        )
    }

    pub fn llm_request(
        messages: Vec<LlmMessage>,
        model: String,
        provider: String,
        iteration: u32,
    ) -> Self {
        Self::new(
            EntryType::LlmRequest {
                messages,
                model,
                provider,
            },
            iteration,
        )
    }

    pub fn llm_response(
        message: LlmMessage,
        usage: Option<Usage>,
        finish_reason: Option<String>,
        iteration: u32,
    ) -> Self {
        Self::new(
            EntryType::LlmResponse {
                message,
                usage,
                finish_reason,
            },
            iteration,
        )
    }

    pub fn tool_invocation(invocation: ToolInvocation, iteration: u32) -> Self {
        Self::new(EntryType::ToolInvocation { invocation }, iteration)
    }

    pub fn tool_result(result: ToolResult, iteration: u32) -> Self {
        Self::new(EntryType::ToolResult { result }, iteration)
    }

    pub fn malformed_response(reason: String, iteration: u32) -> Self {
        Self::new(EntryType::MalformedResponse { reason }, iteration)
    }

    pub fn model_error(error: String, attempt: u32, iteration: u32) -> Self {
        Self::new(EntryType::ModelError { error, attempt }, iteration)
    }

    pub fn iteration_complete(tool_calls: usize, files: usize, iteration: u32) -> Self {
        Self::new(EntryType::IterationComplete { tool_calls, files }, iteration)
    }

    pub fn run_complete(
        success: bool,
        outcome: String,
        iterations: u32,
        files: Vec<String>,
        duration_ms: u64,
    ) -> Self {
        Self::new(
            EntryType::RunComplete {
                success,
                outcome,
                iterations,
                files,
                duration_ms,
            },
            iterations,
        )
    }
}
