//! Chat model abstraction.
//!
//! A `ChatModel` turns a message history plus request parameters (tools,
//! output schema, settings) into a response. Agents only ever talk to this
//! trait, so the same agent can run against OpenAI, Gemini, or an offline
//! test model.

mod function;
mod messages;
mod openai;
mod stream;
mod test;

pub use function::FunctionModel;
pub use messages::{ModelMessage, ModelResponse, RequestPart, ResponsePart, Usage};
pub use openai::OpenAIModel;
pub use stream::{PartUpdate, ResponseAssembler};
pub use test::{synthesize_value, TestModel};

use crate::error::{CookbookError, Result};
use crate::openai::Provider;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A function tool as offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters_json_schema: serde_json::Value,
}

/// JSON schema the final answer must follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    pub name: String,
    pub description: Option<String>,
    pub schema: serde_json::Value,
}

/// Sampling settings. Unset fields fall back to the provider default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub seed: Option<i64>,
}

impl ModelSettings {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Overlay `overrides` on top of these settings.
    pub fn merge(&self, overrides: &ModelSettings) -> ModelSettings {
        ModelSettings {
            temperature: overrides.temperature.or(self.temperature),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            top_p: overrides.top_p.or(self.top_p),
            seed: overrides.seed.or(self.seed),
        }
    }
}

/// Everything besides the history that shapes a model request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequestParameters {
    pub function_tools: Vec<ToolDefinition>,
    pub output_schema: Option<OutputSchema>,
    pub settings: ModelSettings,
}

/// An incremental piece of a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    TextDelta(String),
    ToolCallDelta {
        index: u32,
        id: Option<String>,
        name: Option<String>,
        args_delta: Option<String>,
    },
    Usage(Usage),
}

/// Trait for chat model implementations.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name used in responses and logs.
    fn name(&self) -> &str;

    /// Send the conversation and wait for the full response.
    async fn request(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<ModelResponse>;

    /// Send the conversation and stream the response.
    ///
    /// Models without native streaming replay their full response as chunks.
    async fn request_stream(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let response = self.request(messages, params).await?;
        let chunks: Vec<Result<StreamChunk>> =
            response_to_chunks(response).into_iter().map(Ok).collect();
        Ok(futures::stream::iter(chunks).boxed())
    }
}

/// Split a full response into the chunks a streaming provider would send.
pub fn response_to_chunks(response: ModelResponse) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();
    let mut tool_index = 0u32;

    for part in response.parts {
        match part {
            ResponsePart::Text { content } => chunks.push(StreamChunk::TextDelta(content)),
            ResponsePart::ToolCall {
                tool_name,
                args,
                tool_call_id,
            } => {
                chunks.push(StreamChunk::ToolCallDelta {
                    index: tool_index,
                    id: Some(tool_call_id),
                    name: Some(tool_name),
                    args_delta: Some(args),
                });
                tool_index += 1;
            }
        }
    }

    chunks.push(StreamChunk::Usage(response.usage));
    chunks
}

/// Resolve a model name such as `openai:gpt-4o`, `google-gla:gemini-1.5-flash`,
/// a bare OpenAI model name, or `test`.
pub fn infer_model(name: &str) -> Result<Arc<dyn ChatModel>> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CookbookError::Config("Model name is empty".to_string()));
    }

    if name == "test" {
        return Ok(Arc::new(TestModel::new()));
    }

    let (provider, model) = match name.split_once(':') {
        Some(("openai", model)) => (Provider::OpenAI, model),
        Some(("google-gla", model)) | Some(("gemini", model)) => (Provider::Gemini, model),
        Some((prefix, _)) => {
            return Err(CookbookError::Config(format!(
                "Unknown model provider '{}' in '{}'",
                prefix, name
            )))
        }
        None => (Provider::OpenAI, name),
    };

    Ok(Arc::new(OpenAIModel::new(provider, model)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_model() {
        assert_eq!(infer_model("test").unwrap().name(), "test");
        assert_eq!(infer_model("openai:gpt-4o").unwrap().name(), "gpt-4o");
        assert_eq!(infer_model("gpt-4.1-mini").unwrap().name(), "gpt-4.1-mini");
        assert_eq!(
            infer_model("google-gla:gemini-1.5-flash").unwrap().name(),
            "gemini-1.5-flash"
        );
        assert!(infer_model("anthropic:claude").is_err());
        assert!(infer_model("  ").is_err());
    }

    #[test]
    fn test_settings_merge() {
        let base = ModelSettings::default().with_temperature(0.7).with_max_tokens(100);
        let overrides = ModelSettings::default().with_temperature(0.0);

        let merged = base.merge(&overrides);
        assert_eq!(merged.temperature, Some(0.0));
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.top_p, None);
    }

    #[test]
    fn test_response_to_chunks() {
        let response = ModelResponse::new(
            vec![
                ResponsePart::text("checking"),
                ResponsePart::tool_call("roll_die", "{}", "call_a"),
                ResponsePart::tool_call("get_player_name", "{}", "call_b"),
            ],
            "test",
        );

        let chunks = response_to_chunks(response);
        assert_eq!(chunks.len(), 4);
        assert!(matches!(&chunks[1], StreamChunk::ToolCallDelta { index: 0, .. }));
        assert!(matches!(&chunks[2], StreamChunk::ToolCallDelta { index: 1, .. }));
        assert!(matches!(&chunks[3], StreamChunk::Usage(u) if u.requests == 1));
    }
}
