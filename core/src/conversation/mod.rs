//! Conversation State: the append-only transcript of a run
//!
//! Stored turns are never edited or removed. The view sent to the model is
//! produced by [`Conversation::render`], which may compact old payloads
//! without touching the stored transcript.

mod render;

pub use render::{to_messages, ELISION_THRESHOLD};

use crate::tools::{ToolInvocation, ToolResult};
use crate::workspace::Workspace;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One entry in the transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    /// System instructions, or a corrective note from the controller
    Instruction { content: String },

    /// The user's natural-language goal
    UserGoal { content: String },

    /// What the model said and asked for in one iteration
    ModelProposal {
        iteration: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default)]
        invocations: Vec<ToolInvocation>,
    },

    /// Outcome of one invocation
    ToolResult { iteration: u32, result: ToolResult },
}

impl Turn {
    pub fn instruction<S: Into<String>>(content: S) -> Self {
        Turn::Instruction {
            content: content.into(),
        }
    }

    pub fn user_goal<S: Into<String>>(content: S) -> Self {
        Turn::UserGoal {
            content: content.into(),
        }
    }

    /// Role tag of the turn
    pub fn role(&self) -> &'static str {
        match self {
            Turn::Instruction { .. } => "instruction",
            Turn::UserGoal { .. } => "user_goal",
            Turn::ModelProposal { .. } => "model_proposal",
            Turn::ToolResult { .. } => "tool_result",
        }
    }

    /// Iteration the turn belongs to; `None` for instructions and the goal
    pub fn iteration(&self) -> Option<u32> {
        match self {
            Turn::ModelProposal { iteration, .. } | Turn::ToolResult { iteration, .. } => {
                Some(*iteration)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Model-facing view of the transcript
    ///
    /// With `window = Some(n)`, proposals and results from iterations older
    /// than the `n` most recent ones before `current_iteration` have large
    /// file payloads replaced by an elision marker. `None` renders verbatim.
    pub fn render(&self, window: Option<u32>, current_iteration: u32) -> Vec<Turn> {
        let writes = self.write_call_ids();
        self.turns
            .iter()
            .map(|turn| match (window, turn.iteration()) {
                (Some(window), Some(iteration))
                    if iteration.saturating_add(window) < current_iteration =>
                {
                    render::elide(turn, &writes)
                }
                _ => turn.clone(),
            })
            .collect()
    }

    /// `(iteration, call id)` of every invocation that resolved to a write tool
    fn write_call_ids(&self) -> HashSet<(u32, &str)> {
        self.turns
            .iter()
            .filter_map(|turn| match turn {
                Turn::ToolResult { iteration, result }
                    if result.kind.map(|kind| kind.is_write()).unwrap_or(false) =>
                {
                    Some((*iteration, result.tool_call_id.as_str()))
                }
                _ => None,
            })
            .collect()
    }

    /// Rebuild the workspace from the transcript alone
    ///
    /// Applies, in order, every write proposal whose result succeeded. For a
    /// completed run this equals the final workspace.
    pub fn replay_workspace(&self) -> Workspace {
        let mut proposed: HashMap<(u32, &str), &ToolInvocation> = HashMap::new();
        let mut workspace = Workspace::new();

        for turn in &self.turns {
            match turn {
                Turn::ModelProposal {
                    iteration,
                    invocations,
                    ..
                } => {
                    for invocation in invocations {
                        proposed.insert((*iteration, invocation.id.as_str()), invocation);
                    }
                }
                Turn::ToolResult { iteration, result } if result.is_successful_write() => {
                    let Some(invocation) =
                        proposed.get(&(*iteration, result.tool_call_id.as_str()))
                    else {
                        continue;
                    };
                    let path = invocation.target_path();
                    let content = invocation.arguments.get("content").and_then(|c| c.as_str());
                    if let (Some(path), Some(content)) = (path, content) {
                        // Already validated once; a failure here means the log is inconsistent
                        if let Err(e) = workspace.put(path, content.to_string()) {
                            tracing::warn!("replay skipped {}: {}", path, e);
                        }
                    }
                }
                _ => {}
            }
        }

        workspace
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolExecutor, ToolRegistry};
    use serde_json::json;
    use std::sync::Arc;

    fn record(
        conversation: &mut Conversation,
        workspace: &mut Workspace,
        iteration: u32,
        invocations: Vec<ToolInvocation>,
    ) {
        let executor = ToolExecutor::new(Arc::new(ToolRegistry::default()));
        conversation.append(Turn::ModelProposal {
            iteration,
            text: None,
            invocations: invocations.clone(),
        });
        for invocation in &invocations {
            let result = executor.execute(invocation, workspace);
            conversation.append(Turn::ToolResult { iteration, result });
        }
    }

    #[test]
    fn test_append_only_order() {
        let mut conversation = Conversation::new();
        conversation.append(Turn::instruction("system"));
        conversation.append(Turn::user_goal("a blog"));
        let roles: Vec<&str> = conversation.turns().iter().map(Turn::role).collect();
        assert_eq!(roles, vec!["instruction", "user_goal"]);
    }

    #[test]
    fn test_replay_matches_final_workspace() {
        let mut conversation = Conversation::new();
        let mut workspace = Workspace::new();

        record(
            &mut conversation,
            &mut workspace,
            1,
            vec![
                ToolInvocation::new("write_file", json!({"path": "app.py", "content": "v1"})),
                ToolInvocation::new("write_file", json!({"path": "../x", "content": "bad"})),
            ],
        );
        record(
            &mut conversation,
            &mut workspace,
            2,
            vec![
                ToolInvocation::new("update_file", json!({"path": "app.py", "content": "v2"})),
                ToolInvocation::new("update_file", json!({"path": "nope.py", "content": "x"})),
                ToolInvocation::new("write_file", json!({"path": "templates/index.html", "content": "<html>"})),
            ],
        );

        assert_eq!(conversation.replay_workspace(), workspace);
        assert_eq!(workspace.list(), vec!["app.py", "templates/index.html"]);
    }

    #[test]
    fn test_render_elides_old_payloads_only() {
        let mut conversation = Conversation::new();
        let mut workspace = Workspace::new();
        let big = "x".repeat(ELISION_THRESHOLD + 50);

        conversation.append(Turn::instruction("system"));
        record(
            &mut conversation,
            &mut workspace,
            1,
            vec![ToolInvocation::new("write_file", json!({"path": "app.py", "content": big}))],
        );
        record(
            &mut conversation,
            &mut workspace,
            2,
            vec![ToolInvocation::new("read_file", json!({"path": "app.py"}))],
        );

        // Both iterations inside the window
        assert_eq!(conversation.render(Some(2), 3), conversation.turns());

        let rendered = conversation.render(Some(1), 3);
        match &rendered[1] {
            Turn::ModelProposal { invocations, .. } => {
                let content = invocations[0].arguments["content"].as_str().unwrap();
                assert!(content.starts_with("[elided 250 bytes"));
            }
            other => panic!("unexpected turn {:?}", other),
        }
        match &rendered[4] {
            Turn::ToolResult { result, .. } => assert_eq!(result.content.len(), 250),
            other => panic!("unexpected turn {:?}", other),
        }

        // Stored transcript untouched
        assert!(conversation.replay_workspace().get("app.py").unwrap().len() == 250);
        assert_eq!(conversation.render(None, 3), conversation.turns());
    }
}
