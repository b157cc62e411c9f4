//! Chat-model collaborator contract.
//!
//! The generation step is external; the core only depends on this contract:
//! given the system prompt, the session history and the tool definitions, the
//! model answers with either tool invocations or a final structured reply.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use crate::models::message::{ConversationMessage, RequestPart, ResponsePart};

#[derive(Debug, Error)]
pub enum ChatModelError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Tool definition advertised to the model.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema for the arguments object.
    pub parameters: Value,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: Value,
}

/// Final structured reply for a turn.
#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub reply: String,
    pub recommended_ids: Vec<String>,
}

/// Outcome of one model completion.
#[derive(Debug, Clone)]
pub enum ModelTurn {
    ToolCalls(Vec<ToolCallRequest>),
    Final(AssistantReply),
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelTurn, ChatModelError>;
}

const COMPLETION_TIMEOUT: Duration = Duration::from_secs(30);

/// OpenAI-style `/v1/chat/completions` implementation.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelTurn, ChatModelError> {
        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
        for message in history {
            messages.extend(wire_messages(message));
        }

        let wire_tools: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": wire_tools,
            "temperature": 0.2,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(COMPLETION_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatModelError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChatModelError::Api {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| ChatModelError::Http(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ChatModelError::InvalidResponse("no choices".to_string()))?;

        parse_model_turn(choice.message)
    }
}

/// Renders one history message into its wire-format counterpart(s).
fn wire_messages(message: &ConversationMessage) -> Vec<Value> {
    match message {
        ConversationMessage::Request { parts } => parts
            .iter()
            .map(|part| match part {
                RequestPart::UserText { content } => {
                    json!({ "role": "user", "content": content })
                }
                RequestPart::ToolResult {
                    call_id, content, ..
                } => json!({
                    "role": "tool",
                    "tool_call_id": call_id,
                    "content": content.to_string(),
                }),
            })
            .collect(),
        ConversationMessage::Response { parts } => {
            // All parts of one response collapse into a single assistant
            // message: text as content, tool calls in tool_calls.
            let mut content: Option<String> = None;
            let mut tool_calls = Vec::new();
            for part in parts {
                match part {
                    ResponsePart::AssistantText { content: text } => {
                        content = Some(text.clone());
                    }
                    ResponsePart::ToolCall {
                        call_id,
                        tool_name,
                        arguments,
                    } => tool_calls.push(json!({
                        "id": call_id,
                        "type": "function",
                        "function": {
                            "name": tool_name,
                            "arguments": arguments.to_string(),
                        }
                    })),
                }
            }
            let mut msg = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                msg["tool_calls"] = Value::Array(tool_calls);
            }
            vec![msg]
        }
    }
}

fn parse_model_turn(message: CompletionMessage) -> Result<ModelTurn, ChatModelError> {
    if !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .into_iter()
            .map(|call| {
                // Malformed argument JSON degrades to an empty object; the
                // dispatcher applies its defaults.
                let arguments =
                    serde_json::from_str(&call.function.arguments).unwrap_or_else(|e| {
                        warn!(error = %e, tool = %call.function.name, "unparseable tool arguments");
                        json!({})
                    });
                ToolCallRequest {
                    call_id: call.id,
                    name: call.function.name,
                    arguments,
                }
            })
            .collect();
        return Ok(ModelTurn::ToolCalls(calls));
    }

    let content = message
        .content
        .ok_or_else(|| ChatModelError::InvalidResponse("no content and no tool calls".to_string()))?;

    // The final turn is asked for as JSON, but a bare-text reply from the
    // model is tolerated rather than failing the turn.
    match serde_json::from_str::<ReplyPayload>(&content) {
        Ok(payload) if payload.reply.is_some() => Ok(ModelTurn::Final(AssistantReply {
            reply: payload.reply.unwrap_or_default(),
            recommended_ids: payload.recommended_ids,
        })),
        _ => Ok(ModelTurn::Final(AssistantReply {
            reply: content,
            recommended_ids: Vec::new(),
        })),
    }
}

// ==================== Wire DTOs ====================

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ReplyPayload {
    reply: Option<String>,
    #[serde(default)]
    recommended_ids: Vec<String>,
}
