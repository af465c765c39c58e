//! Run request and outcome structures

use crate::conversation::Conversation;
use crate::output::TokenUsage;
use crate::workspace::Workspace;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

/// Input for one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub goal: String,

    /// Overrides the configured iteration budget for this run only
    pub max_iterations: Option<u32>,

    /// Checked between iterations and while waiting on the model
    pub cancel: CancellationToken,
}

impl RunRequest {
    pub fn new<S: Into<String>>(goal: S) -> Self {
        Self {
            goal: goal.into(),
            max_iterations: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Init,
    Running,
    Completed,
    Failed,
}

/// Why a run failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum FailureReason {
    #[error("iteration budget of {max_iterations} exhausted")]
    BudgetExceeded { max_iterations: u32 },

    #[error("model unavailable after {attempts} attempts: {last_error}")]
    ModelUnavailable { attempts: u32, last_error: String },

    #[error("cancelled")]
    Cancelled,
}

/// Terminal status of a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed { summary: String },
    Failed { reason: FailureReason },
}

/// Terminal record of a run, owned by the caller
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,

    /// Model turns consumed
    pub iterations: u32,

    /// Final (or partial) workspace
    pub workspace: Workspace,

    /// Full, uncompacted transcript
    pub conversation: Conversation,

    pub usage: TokenUsage,
    pub duration_ms: u64,
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, RunStatus::Completed { .. })
    }

    pub fn state(&self) -> LoopState {
        if self.is_completed() {
            LoopState::Completed
        } else {
            LoopState::Failed
        }
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.status {
            RunStatus::Failed { reason } => Some(reason),
            RunStatus::Completed { .. } => None,
        }
    }

    /// "completed with N files" or "failed: <reason>"
    pub fn summary_line(&self) -> String {
        match &self.status {
            RunStatus::Completed { .. } => format!(
                "completed with {} files in {} iterations",
                self.workspace.len(),
                self.iterations
            ),
            RunStatus::Failed { reason } => format!(
                "failed: {} (after {} iterations, {} files written)",
                reason,
                self.iterations,
                self.workspace.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status: RunStatus) -> RunOutcome {
        let mut workspace = Workspace::new();
        workspace.put("app.py", "x".to_string()).unwrap();
        RunOutcome {
            run_id: "run".to_string(),
            status,
            iterations: 4,
            workspace,
            conversation: Conversation::new(),
            usage: TokenUsage::default(),
            duration_ms: 0,
        }
    }

    #[test]
    fn test_summary_lines() {
        let done = outcome(RunStatus::Completed {
            summary: "done".to_string(),
        });
        assert_eq!(done.summary_line(), "completed with 1 files in 4 iterations");
        assert_eq!(done.state(), LoopState::Completed);

        let failed = outcome(RunStatus::Failed {
            reason: FailureReason::BudgetExceeded { max_iterations: 4 },
        });
        assert_eq!(
            failed.summary_line(),
            "failed: iteration budget of 4 exhausted (after 4 iterations, 1 files written)"
        );
        assert_eq!(failed.failure(), Some(&FailureReason::BudgetExceeded { max_iterations: 4 }));
    }

    #[test]
    fn test_request_builder() {
        let request = RunRequest::new("a blog").with_max_iterations(7);
        assert_eq!(request.max_iterations, Some(7));
        assert!(!request.cancel.is_cancelled());
    }
}
