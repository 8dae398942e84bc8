//! Message history exchanged between an agent and a model.
//!
//! The history is provider-neutral and serializable, so a run's messages can be
//! printed, dumped as JSON, or fed back in as the history of a follow-up run.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message in a conversation: either what we sent or what the model answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModelMessage {
    Request {
        parts: Vec<RequestPart>,
    },
    Response {
        parts: Vec<ResponsePart>,
        model_name: String,
        timestamp: DateTime<Utc>,
    },
}

impl ModelMessage {
    /// Build a request message.
    pub fn request(parts: Vec<RequestPart>) -> Self {
        ModelMessage::Request { parts }
    }

    /// Whether this message is a request containing tool returns.
    pub fn has_tool_returns(&self) -> bool {
        match self {
            ModelMessage::Request { parts } => parts
                .iter()
                .any(|p| matches!(p, RequestPart::ToolReturn { .. })),
            ModelMessage::Response { .. } => false,
        }
    }

    /// Tool returns carried by a request message.
    pub fn tool_returns(&self) -> Vec<(&str, &str)> {
        match self {
            ModelMessage::Request { parts } => parts
                .iter()
                .filter_map(|p| match p {
                    RequestPart::ToolReturn {
                        tool_name, content, ..
                    } => Some((tool_name.as_str(), content.as_str())),
                    _ => None,
                })
                .collect(),
            ModelMessage::Response { .. } => Vec::new(),
        }
    }
}

/// A part of a request sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum RequestPart {
    SystemPrompt {
        content: String,
    },
    UserPrompt {
        content: String,
        timestamp: DateTime<Utc>,
    },
    ToolReturn {
        tool_name: String,
        tool_call_id: String,
        content: String,
        timestamp: DateTime<Utc>,
    },
}

impl RequestPart {
    pub fn system(content: impl Into<String>) -> Self {
        RequestPart::SystemPrompt {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        RequestPart::UserPrompt {
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn tool_return(
        tool_name: impl Into<String>,
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        RequestPart::ToolReturn {
            tool_name: tool_name.into(),
            tool_call_id: tool_call_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A part of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "part_kind", rename_all = "kebab-case")]
pub enum ResponsePart {
    Text {
        content: String,
    },
    ToolCall {
        tool_name: String,
        /// Raw JSON arguments as produced by the model.
        args: String,
        tool_call_id: String,
    },
}

impl ResponsePart {
    pub fn text(content: impl Into<String>) -> Self {
        ResponsePart::Text {
            content: content.into(),
        }
    }

    pub fn tool_call(
        tool_name: impl Into<String>,
        args: impl Into<String>,
        tool_call_id: impl Into<String>,
    ) -> Self {
        ResponsePart::ToolCall {
            tool_name: tool_name.into(),
            args: args.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Parse tool call arguments. Empty arguments parse as an empty object.
    pub fn args_as_value(&self) -> Result<serde_json::Value> {
        match self {
            ResponsePart::ToolCall { args, .. } if args.trim().is_empty() => {
                Ok(serde_json::json!({}))
            }
            ResponsePart::ToolCall { args, .. } => Ok(serde_json::from_str(args)?),
            ResponsePart::Text { .. } => Ok(serde_json::Value::Null),
        }
    }
}

/// Token accounting for one or more model requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub requests: u32,
    pub request_tokens: u32,
    pub response_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Add another usage record to this one.
    pub fn incr(&mut self, other: &Usage) {
        self.requests += other.requests;
        self.request_tokens += other.request_tokens;
        self.response_tokens += other.response_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A complete response returned by a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResponse {
    pub parts: Vec<ResponsePart>,
    pub model_name: String,
    pub usage: Usage,
}

impl ModelResponse {
    /// Build a response from parts, counting one request.
    pub fn new(parts: Vec<ResponsePart>, model_name: impl Into<String>) -> Self {
        Self {
            parts,
            model_name: model_name.into(),
            usage: Usage {
                requests: 1,
                ..Usage::default()
            },
        }
    }

    /// Concatenated text of all text parts, if any.
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                ResponsePart::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();

        if texts.is_empty() {
            None
        } else {
            Some(texts.concat())
        }
    }

    /// Tool call parts of this response.
    pub fn tool_calls(&self) -> Vec<&ResponsePart> {
        self.parts
            .iter()
            .filter(|p| matches!(p, ResponsePart::ToolCall { .. }))
            .collect()
    }

    /// Convert into a history message.
    pub fn into_message(self) -> ModelMessage {
        ModelMessage::Response {
            parts: self.parts,
            model_name: self.model_name,
            timestamp: Utc::now(),
        }
    }
}
