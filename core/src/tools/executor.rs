//! Tool executor: validate an invocation, apply it, report the outcome

use crate::error::ToolError;
use crate::tools::builtin::{self, ToolOutput};
use crate::tools::{ToolAction, ToolInvocation, ToolKind, ToolRegistry, ToolResult};
use crate::workspace::Workspace;
use std::sync::Arc;
use std::time::Instant;

/// Executes tool invocations against one run's workspace
///
/// Failures are never propagated: every error becomes a failed
/// [`ToolResult`] the model can read and react to.
#[derive(Debug, Clone)]
pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a single invocation
    pub fn execute(&self, invocation: &ToolInvocation, workspace: &mut Workspace) -> ToolResult {
        let start_time = Instant::now();
        let kind = self.kind_of(&invocation.name);
        let outcome = self.apply(invocation, workspace);
        let duration = start_time.elapsed().as_millis() as u64;

        match outcome {
            Ok(output) => {
                tracing::debug!(
                    tool = %invocation.name,
                    call_id = %invocation.id,
                    "tool succeeded"
                );
                let result = ToolResult::success(
                    invocation.id.as_str(),
                    invocation.name.as_str(),
                    output.content.as_str(),
                );
                match output.data {
                    Some(data) => result.with_data(data),
                    None => result,
                }
                .with_kind(kind)
                .with_duration(duration)
            }
            Err(e) => {
                tracing::debug!(
                    tool = %invocation.name,
                    call_id = %invocation.id,
                    error = %e,
                    "tool failed"
                );
                ToolResult::error(invocation.id.as_str(), invocation.name.as_str(), &e)
                    .with_kind(kind)
                    .with_duration(duration)
            }
        }
    }

    /// Kind of a known tool name
    pub fn kind_of(&self, name: &str) -> Option<ToolKind> {
        self.registry.lookup(name).ok().map(|d| d.kind)
    }

    fn apply(
        &self,
        invocation: &ToolInvocation,
        workspace: &mut Workspace,
    ) -> Result<ToolOutput, ToolError> {
        let definition = self.registry.lookup(&invocation.name)?;
        let args = definition.validate(&invocation.arguments)?;
        let action = ToolAction::from_arguments(definition.kind, args)?;
        builtin::run(action, workspace)
    }
}
