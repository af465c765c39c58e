//! AgentCore: the build loop controller

use super::config::AgentConfig;
use super::execution::{FailureReason, LoopState, RunOutcome, RunRequest, RunStatus};
use super::parser::parse_response;
use super::prompt::{build_user_message, malformed_response_note, NO_TOOL_CALL_NOTE};
use crate::conversation::{to_messages, Conversation, Turn};
use crate::error::LlmError;
use crate::llm::{ChatOptions, LlmClient, LlmMessage, LlmResponse};
use crate::output::{AgentEvent, AgentOutput, TokenUsage, ToolExecutionInfo};
use crate::tools::{ToolExecutor, ToolKind};
use crate::trajectory::{TrajectoryEntry, TrajectoryRecorder};
use crate::workspace::Workspace;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

/// Drives a model through the tool loop until it finishes or the run fails
///
/// One `AgentCore` can serve several runs; every run gets its own
/// conversation and workspace.
pub struct AgentCore {
    config: AgentConfig,
    llm_client: Arc<dyn LlmClient>,
    tool_executor: ToolExecutor,
    chat_options: ChatOptions,
    system_prompt: String,
    output: Box<dyn AgentOutput>,
    trajectory_recorder: Option<TrajectoryRecorder>,
}

impl AgentCore {
    pub(crate) fn new(
        config: AgentConfig,
        llm_client: Arc<dyn LlmClient>,
        tool_executor: ToolExecutor,
        chat_options: ChatOptions,
        system_prompt: String,
        output: Box<dyn AgentOutput>,
        trajectory_recorder: Option<TrajectoryRecorder>,
    ) -> Self {
        Self {
            config,
            llm_client,
            tool_executor,
            chat_options,
            system_prompt,
            output,
            trajectory_recorder,
        }
    }

    /// Get agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The rendered system prompt every run is seeded with
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn trajectory_recorder(&self) -> Option<&TrajectoryRecorder> {
        self.trajectory_recorder.as_ref()
    }

    /// Execute one run to a terminal outcome
    pub async fn run(&self, request: RunRequest) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!("run", run_id = %run_id);
        self.execute(run_id, request).instrument(span).await
    }

    async fn execute(&self, run_id: String, request: RunRequest) -> RunOutcome {
        let start_time = Instant::now();
        let max_iterations = request.max_iterations.unwrap_or(self.config.max_iterations);

        let mut state = LoopState::Init;
        let mut conversation = Conversation::new();
        let mut workspace = Workspace::new();
        let mut usage = TokenUsage::default();
        let mut iteration: u32 = 0;

        tracing::info!(
            model = self.llm_client.model_name(),
            max_iterations,
            "starting run: {}",
            request.goal
        );

        conversation.append(Turn::instruction(self.system_prompt.as_str()));
        conversation.append(Turn::user_goal(build_user_message(&request.goal)));

        self.emit(AgentEvent::RunStarted {
            run_id: run_id.clone(),
            goal: request.goal.clone(),
            max_iterations,
        })
        .await;
        self.record(|| {
            TrajectoryEntry::run_start(
                run_id.clone(),
                request.goal.clone(),
                max_iterations,
                serde_json::to_value(&self.config).unwrap_or_default(),
            )
        })
        .await;

        state = self.transition(state, LoopState::Running);

        let status = 'iterations: loop {
            if request.cancel.is_cancelled() {
                break RunStatus::Failed {
                    reason: FailureReason::Cancelled,
                };
            }
            if iteration >= max_iterations {
                break RunStatus::Failed {
                    reason: FailureReason::BudgetExceeded { max_iterations },
                };
            }

            iteration += 1;
            tracing::debug!("iteration {}/{}", iteration, max_iterations);
            self.emit(AgentEvent::IterationStarted {
                iteration,
                max_iterations,
            })
            .await;

            let messages = to_messages(&conversation.render(self.config.context_window, iteration));
            self.record(|| {
                TrajectoryEntry::llm_request(
                    messages.clone(),
                    self.llm_client.model_name().to_string(),
                    self.llm_client.provider_name().to_string(),
                    iteration,
                )
            })
            .await;

            let response = match self.call_model(messages, iteration, &request.cancel).await {
                Ok(response) => response,
                Err(reason) => break 'iterations RunStatus::Failed { reason },
            };

            if let Some(call_usage) = &response.usage {
                usage.add(call_usage);
                if let Err(e) = self.output.emit_token_update(usage).await {
                    tracing::debug!("Failed to emit token update event: {}", e);
                }
            }
            self.record(|| {
                TrajectoryEntry::llm_response(
                    response.message.clone(),
                    response.usage,
                    response.finish_reason.as_ref().map(|r| format!("{:?}", r)),
                    iteration,
                )
            })
            .await;

            let parsed = match parse_response(&response.message) {
                Ok(parsed) => parsed,
                Err(malformed) => {
                    tracing::warn!("iteration {}: {}", iteration, malformed);
                    self.emit(AgentEvent::MalformedResponse {
                        iteration,
                        reason: malformed.reason.clone(),
                    })
                    .await;
                    self.record(|| {
                        TrajectoryEntry::malformed_response(malformed.reason.clone(), iteration)
                    })
                    .await;

                    if let Some(text) = response.message.get_text() {
                        conversation.append(Turn::ModelProposal {
                            iteration,
                            text: Some(text),
                            invocations: Vec::new(),
                        });
                    }
                    conversation.append(Turn::instruction(malformed_response_note(
                        &malformed.reason,
                    )));
                    continue;
                }
            };

            if let Some(text) = &parsed.text {
                self.emit(AgentEvent::ModelText {
                    iteration,
                    text: text.clone(),
                })
                .await;
            }

            if parsed.invocations.is_empty() {
                tracing::debug!("iteration {}: no tool calls", iteration);
                if parsed.text.is_some() {
                    conversation.append(Turn::ModelProposal {
                        iteration,
                        text: parsed.text,
                        invocations: Vec::new(),
                    });
                }
                conversation.append(Turn::instruction(NO_TOOL_CALL_NOTE));
                self.record(|| TrajectoryEntry::iteration_complete(0, workspace.len(), iteration))
                    .await;
                continue;
            }

            let invocations = parsed.invocations;
            conversation.append(Turn::ModelProposal {
                iteration,
                text: parsed.text,
                invocations: invocations.clone(),
            });

            for (index, invocation) in invocations.iter().enumerate() {
                self.record(|| TrajectoryEntry::tool_invocation(invocation.clone(), iteration))
                    .await;

                let result = self.tool_executor.execute(invocation, &mut workspace);
                if result.success {
                    tracing::info!(
                        tool = %invocation.name,
                        path = invocation.target_path().unwrap_or("-"),
                        "tool executed"
                    );
                } else {
                    tracing::info!(tool = %invocation.name, "tool failed: {}", result.content);
                }

                self.record(|| TrajectoryEntry::tool_result(result.clone(), iteration))
                    .await;
                self.emit(AgentEvent::ToolExecuted {
                    info: ToolExecutionInfo::new(iteration, invocation, &result),
                })
                .await;

                let finished = result.success && result.kind == Some(ToolKind::Finish);
                conversation.append(Turn::ToolResult { iteration, result });

                if finished {
                    let ignored = invocations.len() - index - 1;
                    if ignored > 0 {
                        tracing::debug!("ignoring {} tool calls after finish", ignored);
                    }
                    self.record(|| {
                        TrajectoryEntry::iteration_complete(index + 1, workspace.len(), iteration)
                    })
                    .await;

                    let summary = invocation
                        .arguments
                        .get("summary")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    break 'iterations RunStatus::Completed { summary };
                }
            }

            self.record(|| {
                TrajectoryEntry::iteration_complete(invocations.len(), workspace.len(), iteration)
            })
            .await;
        };

        let terminal = match status {
            RunStatus::Completed { .. } => LoopState::Completed,
            RunStatus::Failed { .. } => LoopState::Failed,
        };
        self.transition(state, terminal);

        debug_assert_eq!(conversation.replay_workspace(), workspace);

        let outcome = RunOutcome {
            run_id,
            status,
            iterations: iteration,
            workspace,
            conversation,
            usage,
            duration_ms: start_time.elapsed().as_millis() as u64,
        };
        self.finish_run(&outcome).await;
        outcome
    }

    /// Call the model, retrying transport failures
    ///
    /// Retries stay inside the current iteration. Cancellation interrupts
    /// both the in-flight call and the backoff wait.
    async fn call_model(
        &self,
        messages: Vec<LlmMessage>,
        iteration: u32,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, FailureReason> {
        let max_attempts = self.config.max_model_retries.saturating_add(1);
        let timeout = Duration::from_secs(self.config.model_timeout_secs);
        let backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let manifest = self.tool_executor.registry().manifest();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let call = self.llm_client.chat_completion(
                messages.clone(),
                Some(manifest.clone()),
                Some(self.chat_options.clone()),
            );
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                result = tokio::time::timeout(timeout, call) => result,
            };

            let error = match result {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => e.to_string(),
                Err(_) => LlmError::Timeout {
                    seconds: self.config.model_timeout_secs,
                }
                .to_string(),
            };

            tracing::warn!(
                "model call failed (attempt {}/{}): {}",
                attempt,
                max_attempts,
                error
            );
            self.record(|| TrajectoryEntry::model_error(error.clone(), attempt, iteration))
                .await;

            if attempt >= max_attempts {
                tracing::error!("giving up on the model after {} attempts", attempt);
                return Err(FailureReason::ModelUnavailable {
                    attempts: attempt,
                    last_error: error,
                });
            }

            self.emit(AgentEvent::ModelRetry {
                iteration,
                attempt,
                max_attempts,
                error,
            })
            .await;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    async fn finish_run(&self, outcome: &RunOutcome) {
        let success = outcome.is_completed();
        let summary = outcome.summary_line();
        if success {
            tracing::info!("{}", summary);
        } else {
            tracing::warn!("{}", summary);
        }

        self.record(|| {
            TrajectoryEntry::run_complete(
                success,
                summary.clone(),
                outcome.iterations,
                outcome.workspace.list(),
                outcome.duration_ms,
            )
        })
        .await;

        self.emit(AgentEvent::RunFinished {
            run_id: outcome.run_id.clone(),
            success,
            summary: match &outcome.status {
                RunStatus::Completed { summary } => summary.clone(),
                RunStatus::Failed { reason } => reason.to_string(),
            },
            iterations: outcome.iterations,
            files: outcome.workspace.len(),
        })
        .await;

        if let Err(e) = self.output.flush().await {
            tracing::debug!("Failed to flush output: {}", e);
        }
    }

    fn transition(&self, from: LoopState, to: LoopState) -> LoopState {
        tracing::debug!("state {:?} -> {:?}", from, to);
        to
    }

    async fn emit(&self, event: AgentEvent) {
        if let Err(e) = self.output.emit_event(event).await {
            tracing::debug!("Failed to emit event: {}", e);
        }
    }

    /// Record a trajectory entry; the entry is only built when recording
    async fn record<F>(&self, entry: F)
    where
        F: FnOnce() -> TrajectoryEntry,
    {
        if let Some(recorder) = &self.trajectory_recorder {
            if let Err(e) = recorder.record(entry()).await {
                tracing::warn!("Failed to record trajectory entry: {}", e);
            }
        }
    }
}
