//! Compaction and message conversion for the model-facing view

use super::Turn;
use crate::llm::{ContentBlock, LlmMessage};
use crate::tools::ToolKind;
use serde_json::Value;
use std::collections::HashSet;

/// Payloads at or below this many bytes are never elided
pub const ELISION_THRESHOLD: usize = 200;

fn marker(bytes: usize) -> String {
    format!(
        "[elided {} bytes from an earlier iteration; use read_file for the current content]",
        bytes
    )
}

/// Copy of `turn` with large file payloads replaced by a marker
///
/// `writes` holds the `(iteration, call id)` of invocations that resolved to a
/// write tool; only their `content` arguments are elided.
pub(super) fn elide(turn: &Turn, writes: &HashSet<(u32, &str)>) -> Turn {
    match turn {
        Turn::ModelProposal {
            iteration,
            text,
            invocations,
        } => {
            let invocations = invocations
                .iter()
                .map(|invocation| {
                    let mut invocation = invocation.clone();
                    if writes.contains(&(*iteration, invocation.id.as_str())) {
                        if let Some(Value::String(content)) = invocation.arguments.get_mut("content")
                        {
                            if content.len() > ELISION_THRESHOLD {
                                *content = marker(content.len());
                            }
                        }
                    }
                    invocation
                })
                .collect();
            Turn::ModelProposal {
                iteration: *iteration,
                text: text.clone(),
                invocations,
            }
        }
        Turn::ToolResult { iteration, result }
            if result.success
                && result.kind == Some(ToolKind::ReadFile)
                && result.content.len() > ELISION_THRESHOLD =>
        {
            let mut result = result.clone();
            result.content = marker(result.content.len());
            Turn::ToolResult {
                iteration: *iteration,
                result,
            }
        }
        other => other.clone(),
    }
}

/// Convert rendered turns into provider-neutral chat messages
///
/// The first instruction becomes the system message; later instructions
/// (corrective notes) are sent as user messages.
pub fn to_messages(turns: &[Turn]) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(turns.len());
    let mut seen_system = false;

    for turn in turns {
        match turn {
            Turn::Instruction { content } if !seen_system => {
                seen_system = true;
                messages.push(LlmMessage::system(content.as_str()));
            }
            Turn::Instruction { content } | Turn::UserGoal { content } => {
                messages.push(LlmMessage::user(content.as_str()));
            }
            Turn::ModelProposal {
                text, invocations, ..
            } => {
                let mut blocks = Vec::with_capacity(invocations.len() + 1);
                if let Some(text) = text {
                    blocks.push(ContentBlock::Text { text: text.clone() });
                }
                blocks.extend(invocations.iter().map(|invocation| ContentBlock::ToolUse {
                    id: invocation.id.clone(),
                    name: invocation.name.clone(),
                    input: invocation.arguments.clone(),
                }));
                if !blocks.is_empty() {
                    messages.push(LlmMessage::assistant_blocks(blocks));
                }
            }
            Turn::ToolResult { result, .. } => {
                messages.push(LlmMessage::tool_result(
                    result.tool_call_id.as_str(),
                    result.content.as_str(),
                    !result.success,
                ));
            }
        }
    }

    messages
}
