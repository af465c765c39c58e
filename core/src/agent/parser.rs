//! Strict parser from a model message to tool invocations
//!
//! Either every tool call in the message is well formed, or the whole
//! response is rejected as malformed. There is no partial or best-effort
//! recovery.

use crate::llm::{ContentBlock, LlmMessage, MessageContent, MessageRole};
use crate::tools::ToolInvocation;
use serde_json::{Map, Value};
use std::collections::HashSet;
use uuid::Uuid;

/// A model response that could not be read as tool calls
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed model response: {reason}")]
pub struct MalformedResponse {
    pub reason: String,
}

impl MalformedResponse {
    fn new<S: Into<String>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Text and tool calls extracted from one model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub text: Option<String>,
    pub invocations: Vec<ToolInvocation>,
}

impl ParsedResponse {
    /// True when the model produced neither text nor tool calls
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.invocations.is_empty()
    }
}

pub fn parse_response(message: &LlmMessage) -> Result<ParsedResponse, MalformedResponse> {
    if message.role != MessageRole::Assistant {
        return Err(MalformedResponse::new(format!(
            "expected an assistant message, got {:?}",
            message.role
        )));
    }

    let blocks = match &message.content {
        MessageContent::Text(text) => {
            return Ok(ParsedResponse {
                text: non_empty(text),
                invocations: Vec::new(),
            })
        }
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut text_parts = Vec::new();
    let mut invocations = Vec::new();
    let mut seen_ids = HashSet::new();

    for block in blocks {
        match block {
            ContentBlock::Text { text } => {
                if let Some(text) = non_empty(text) {
                    text_parts.push(text);
                }
            }
            ContentBlock::ToolUse { id, name, input } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(MalformedResponse::new("tool call without a tool name"));
                }
                if !name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
                {
                    return Err(MalformedResponse::new(format!(
                        "'{}' is not a valid tool name",
                        name
                    )));
                }

                let id = if id.trim().is_empty() {
                    Uuid::new_v4().to_string()
                } else {
                    id.clone()
                };
                if !seen_ids.insert(id.clone()) {
                    return Err(MalformedResponse::new(format!(
                        "duplicate tool call id '{}'",
                        id
                    )));
                }

                let arguments = parse_arguments(name, input)?;
                invocations.push(ToolInvocation::with_id(id, name.to_string(), arguments));
            }
            ContentBlock::ToolResult { .. } => {
                return Err(MalformedResponse::new(
                    "the response contains a tool result, only tool calls are expected",
                ));
            }
        }
    }

    Ok(ParsedResponse {
        text: if text_parts.is_empty() {
            None
        } else {
            Some(text_parts.join("\n"))
        },
        invocations,
    })
}

fn parse_arguments(tool: &str, input: &Value) -> Result<Value, MalformedResponse> {
    match input {
        Value::Object(_) => Ok(input.clone()),
        Value::Null => Ok(Value::Object(Map::new())),
        // Providers hand over unparsed argument strings as-is
        Value::String(raw) if raw.trim().is_empty() => Ok(Value::Object(Map::new())),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => Err(MalformedResponse::new(format!(
                "arguments for '{}' must be a JSON object",
                tool
            ))),
            Err(e) => Err(MalformedResponse::new(format!(
                "arguments for '{}' are not valid JSON: {}",
                tool, e
            ))),
        },
        _ => Err(MalformedResponse::new(format!(
            "arguments for '{}' must be a JSON object",
            tool
        ))),
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool_use(id: &str, name: &str, input: Value) -> ContentBlock {
        ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }
    }

    #[test]
    fn test_parses_text_and_calls_in_order() {
        let message = LlmMessage::assistant_blocks(vec![
            ContentBlock::Text {
                text: "Writing the app".to_string(),
            },
            tool_use("c1", "write_file", json!({"path": "app.py", "content": "x"})),
            tool_use("c2", "read_file", json!({"path": "app.py"})),
        ]);

        let parsed = parse_response(&message).unwrap();
        assert_eq!(parsed.text.as_deref(), Some("Writing the app"));
        let names: Vec<&str> = parsed.invocations.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["write_file", "read_file"]);
        assert_eq!(parsed.invocations[0].id, "c1");
    }

    #[test]
    fn test_text_only_is_not_malformed() {
        let parsed = parse_response(&LlmMessage::assistant("I will build it now")).unwrap();
        assert!(parsed.invocations.is_empty());
        assert!(!parsed.is_empty());

        let parsed = parse_response(&LlmMessage::assistant("   ")).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_string_arguments() {
        let message = LlmMessage::assistant_blocks(vec![
            tool_use("c1", "list_files", json!("")),
            tool_use("c2", "read_file", json!("{\"path\": \"app.py\"}")),
        ]);
        let parsed = parse_response(&message).unwrap();
        assert_eq!(parsed.invocations[0].arguments, json!({}));
        assert_eq!(parsed.invocations[1].arguments, json!({"path": "app.py"}));
    }

    #[test]
    fn test_rejects_malformed() {
        let cases = vec![
            tool_use("c1", "write_file", json!("{\"path\": \"app.py\"")),
            tool_use("c1", "write_file", json!(["app.py", "x"])),
            tool_use("c1", "", json!({})),
            tool_use("c1", "write file", json!({})),
        ];
        for block in cases {
            let message = LlmMessage::assistant_blocks(vec![block.clone()]);
            assert!(parse_response(&message).is_err(), "accepted {:?}", block);
        }

        let duplicate = LlmMessage::assistant_blocks(vec![
            tool_use("c1", "list_files", json!({})),
            tool_use("c1", "list_files", json!({})),
        ]);
        let err = parse_response(&duplicate).unwrap_err();
        assert!(err.reason.contains("duplicate tool call id"));

        assert!(parse_response(&LlmMessage::user("hi")).is_err());
    }

    #[test]
    fn test_missing_ids_are_generated() {
        let message = LlmMessage::assistant_blocks(vec![
            tool_use("", "list_files", json!({})),
            tool_use("", "list_files", json!({})),
        ]);
        let parsed = parse_response(&message).unwrap();
        assert_ne!(parsed.invocations[0].id, parsed.invocations[1].id);
    }

    #[test]
    fn test_unknown_tool_name_is_well_formed() {
        // Unknown names are the executor's concern
        let message = LlmMessage::assistant_blocks(vec![tool_use("c1", "deploy", json!({}))]);
        assert_eq!(parse_response(&message).unwrap().invocations.len(), 1);
    }
}
