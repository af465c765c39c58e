//! Anthropic Claude client implementation

use crate::config::ResolvedLlmConfig;
use crate::error::{LlmError, Result};
use crate::llm::{
    ChatOptions, ContentBlock, FinishReason, FunctionDefinition, LlmClient, LlmMessage,
    LlmResponse, MessageContent, MessageRole, Usage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    headers: HashMap<String, String>,
}

impl AnthropicClient {
    /// Create a new Anthropic client
    pub fn new(config: &ResolvedLlmConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(LlmError::Authentication {
                message: "No API key found for Anthropic".to_string(),
            }
            .into());
        }

        Ok(Self {
            client: Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            headers: config.headers.clone(),
        })
    }

    fn build_request(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<FunctionDefinition>>,
        options: Option<ChatOptions>,
    ) -> AnthropicRequest {
        let options = options.unwrap_or_default();

        // The Messages API takes system text out of band
        let mut system_parts = Vec::new();
        let mut conversation: Vec<AnthropicMessage> = Vec::new();

        for message in messages {
            if message.role == MessageRole::System {
                if let Some(text) = message.get_text() {
                    system_parts.push(text);
                }
                continue;
            }

            let role = match message.role {
                MessageRole::Assistant => "assistant",
                _ => "user",
            };
            let content = convert_content(&message.content);

            // Consecutive same-role messages must be merged (tool results
            // from one batch arrive as several messages)
            match conversation.last_mut() {
                Some(last) if last.role == role => last.content.extend(content),
                _ => conversation.push(AnthropicMessage {
                    role,
                    content,
                }),
            }
        }

        AnthropicRequest {
            model: self.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(4096),
            temperature: options.temperature,
            system: if system_parts.is_empty() {
                None
            } else {
                Some(system_parts.join("\n\n"))
            },
            messages: conversation,
            tools: tools.map(|t| {
                t.into_iter()
                    .map(|tool| AnthropicTool {
                        name: tool.name,
                        description: tool.description,
                        input_schema: tool.parameters,
                    })
                    .collect()
            }),
            stop_sequences: options.stop,
        }
    }

    fn convert_response(&self, response: AnthropicResponse) -> LlmResponse {
        let blocks = response
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicContent::Text { text } => Some(ContentBlock::Text { text }),
                AnthropicContent::ToolUse { id, name, input } => {
                    Some(ContentBlock::ToolUse { id, name, input })
                }
                AnthropicContent::Other => None,
            })
            .collect();

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
            total_tokens: u.input_tokens + u.output_tokens,
        });

        let finish_reason = response.stop_reason.map(|reason| match reason.as_str() {
            "end_turn" | "stop_sequence" => FinishReason::Stop,
            "max_tokens" => FinishReason::Length,
            "tool_use" => FinishReason::ToolCalls,
            _ => FinishReason::Other(reason),
        });

        LlmResponse {
            message: LlmMessage::assistant_blocks(blocks),
            usage,
            model: response.model,
            finish_reason,
        }
    }
}

fn convert_content(content: &MessageContent) -> Vec<Value> {
    match content {
        MessageContent::Text(text) => vec![json!({ "type": "text", "text": text })],
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => json!({ "type": "text", "text": text }),
                ContentBlock::ToolUse { id, name, input } => {
                    // The API only accepts object inputs
                    let input = if input.is_object() {
                        input.clone()
                    } else {
                        json!({ "raw": input })
                    };
                    json!({ "type": "tool_use", "id": id, "name": name, "input": input })
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    is_error,
                    content,
                } => json!({
                    "type": "tool_result",
                    "tool_use_id": tool_use_id,
                    "is_error": is_error.unwrap_or(false),
                    "content": content,
                }),
            })
            .collect(),
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        tools: Option<Vec<FunctionDefinition>>,
        options: Option<ChatOptions>,
    ) -> Result<LlmResponse> {
        let request = self.build_request(messages, tools, options);

        let mut builder = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json");
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication {
                    message: error_text,
                },
                429 => LlmError::RateLimit,
                code => LlmError::ApiError {
                    status: code,
                    message: error_text,
                },
            }
            .into());
        }

        let anthropic_response: AnthropicResponse =
            response.json().await.map_err(|e| LlmError::Network {
                message: format!("Failed to parse response: {}", e),
            })?;

        Ok(self.convert_response(anthropic_response))
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<AnthropicTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;

    fn client() -> AnthropicClient {
        let config = ResolvedLlmConfig::new(
            Protocol::Anthropic,
            "https://api.anthropic.com/".to_string(),
            "sk-ant-test".to_string(),
            "claude-3-5-sonnet-20241022".to_string(),
        );
        AnthropicClient::new(&config).unwrap()
    }

    #[test]
    fn test_build_request_lifts_system_and_merges_tool_results() {
        let messages = vec![
            LlmMessage::system("You build Flask apps."),
            LlmMessage::user("a blog"),
            LlmMessage::assistant_blocks(vec![
                ContentBlock::ToolUse {
                    id: "tu_1".to_string(),
                    name: "list_files".to_string(),
                    input: json!({}),
                },
                ContentBlock::ToolUse {
                    id: "tu_2".to_string(),
                    name: "read_file".to_string(),
                    input: json!({"path": "app.py"}),
                },
            ]),
            LlmMessage::tool_result("tu_1", "[]", false),
            LlmMessage::tool_result("tu_2", "File not found: app.py", true),
        ];

        let request = client().build_request(messages, None, None);
        assert_eq!(request.system.as_deref(), Some("You build Flask apps."));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[2].role, "user");
        assert_eq!(request.messages[2].content.len(), 2);
        assert_eq!(request.messages[2].content[1]["is_error"], json!(true));
    }

    #[test]
    fn test_convert_response_extracts_tool_use() {
        let raw = json!({
            "id": "msg_1",
            "model": "claude-3-5-sonnet-20241022",
            "type": "message",
            "role": "assistant",
            "content": [
                {"type": "text", "text": "Writing the app"},
                {"type": "tool_use", "id": "tu_9", "name": "write_file",
                 "input": {"path": "app.py", "content": "print(1)"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });
        let parsed: AnthropicResponse = serde_json::from_value(raw).unwrap();
        let response = client().convert_response(parsed);

        assert_eq!(response.finish_reason, Some(FinishReason::ToolCalls));
        assert_eq!(response.usage.unwrap().total_tokens, 15);
        assert_eq!(response.message.get_tool_uses().len(), 1);
        assert_eq!(response.message.get_text().as_deref(), Some("Writing the app"));
    }
}
