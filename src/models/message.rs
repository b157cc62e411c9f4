//! Session message model with explicit tagged variants.
//!
//! Message kinds and part kinds are carried as serialized tags so the
//! tool-call/tool-result pairing invariant can be checked by direct field
//! inspection. The invariant: a response message containing a tool-call part
//! is immediately followed, in session order, by the request message carrying
//! the matching tool-result part. Truncation must never separate the two.

use serde::{Deserialize, Serialize};

/// One entry in a session's ordered history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConversationMessage {
    /// Input to the model: user text and/or tool results.
    Request { parts: Vec<RequestPart> },
    /// Output from the model: assistant text and/or tool calls.
    Response { parts: Vec<ResponsePart> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestPart {
    UserText {
        content: String,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        content: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResponsePart {
    AssistantText {
        content: String,
    },
    ToolCall {
        call_id: String,
        tool_name: String,
        arguments: serde_json::Value,
    },
}

impl ConversationMessage {
    pub fn user_text(content: impl Into<String>) -> Self {
        ConversationMessage::Request {
            parts: vec![RequestPart::UserText {
                content: content.into(),
            }],
        }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        ConversationMessage::Response {
            parts: vec![ResponsePart::AssistantText {
                content: content.into(),
            }],
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(self, ConversationMessage::Request { .. })
    }

    /// True when this is a request carrying at least one user-text part.
    pub fn has_user_text(&self) -> bool {
        match self {
            ConversationMessage::Request { parts } => parts
                .iter()
                .any(|p| matches!(p, RequestPart::UserText { .. })),
            ConversationMessage::Response { .. } => false,
        }
    }

    /// True when this is a request carrying at least one tool-result part.
    ///
    /// Such a message is pinned to the tool-call response immediately before
    /// it; cutting history between the two breaks the downstream provider.
    pub fn has_tool_result(&self) -> bool {
        match self {
            ConversationMessage::Request { parts } => parts
                .iter()
                .any(|p| matches!(p, RequestPart::ToolResult { .. })),
            ConversationMessage::Response { .. } => false,
        }
    }

    /// True when this is a response carrying at least one tool-call part.
    pub fn has_tool_call(&self) -> bool {
        match self {
            ConversationMessage::Request { .. } => false,
            ConversationMessage::Response { parts } => parts
                .iter()
                .any(|p| matches!(p, ResponsePart::ToolCall { .. })),
        }
    }
}
