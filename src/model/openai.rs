//! OpenAI chat completions model (also used for Gemini's compatible endpoint).

use super::{
    ChatModel, ModelMessage, ModelRequestParameters, ModelResponse, RequestPart, ResponsePart,
    StreamChunk, Usage,
};
use crate::error::{CookbookError, Result};
use crate::openai::{create_provider_client, Provider};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CompletionUsage, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs, CreateChatCompletionStreamResponse, FunctionCall,
    FunctionObject, ResponseFormat, ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, instrument};

/// Chat model backed by an OpenAI-compatible chat completions API.
pub struct OpenAIModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl OpenAIModel {
    /// Create a model for the given provider and model name.
    pub fn new(provider: Provider, model: &str) -> Result<Self> {
        Ok(Self {
            client: create_provider_client(provider)?,
            model: model.to_string(),
        })
    }

    fn build_request(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<CreateChatCompletionRequest> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages(to_openai_messages(messages)?);

        if !params.function_tools.is_empty() {
            builder.tools(to_openai_tools(params));
        }

        if let Some(output) = &params.output_schema {
            builder.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: output.description.clone(),
                    name: output.name.clone(),
                    schema: Some(output.schema.clone()),
                    strict: None,
                },
            });
        }

        let settings = &params.settings;
        if let Some(temperature) = settings.temperature {
            builder.temperature(temperature);
        }
        if let Some(max_tokens) = settings.max_tokens {
            builder.max_completion_tokens(max_tokens);
        }
        if let Some(top_p) = settings.top_p {
            builder.top_p(top_p);
        }
        if let Some(seed) = settings.seed {
            builder.seed(seed);
        }

        builder
            .build()
            .map_err(|e| CookbookError::Model(format!("Failed to build request: {}", e)))
    }
}

#[async_trait]
impl ChatModel for OpenAIModel {
    fn name(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, messages, params), fields(model = %self.model, messages = messages.len()))]
    async fn request(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<ModelResponse> {
        let request = self.build_request(messages, params)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CookbookError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| CookbookError::UnexpectedModelBehavior("No choices in response".to_string()))?;

        let mut parts = Vec::new();
        if let Some(content) = choice.message.content.as_ref().filter(|c| !c.is_empty()) {
            parts.push(ResponsePart::text(content.clone()));
        }
        if let Some(refusal) = &choice.message.refusal {
            return Err(CookbookError::UnexpectedModelBehavior(format!(
                "Model refused: {}",
                refusal
            )));
        }
        for call in choice.message.tool_calls.iter().flatten() {
            parts.push(ResponsePart::tool_call(
                call.function.name.clone(),
                call.function.arguments.clone(),
                call.id.clone(),
            ));
        }

        debug!("Received {} response parts", parts.len());

        Ok(ModelResponse {
            parts,
            model_name: response.model,
            usage: convert_usage(response.usage.as_ref()),
        })
    }

    #[instrument(skip(self, messages, params), fields(model = %self.model, messages = messages.len()))]
    async fn request_stream(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let request = self.build_request(messages, params)?;

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| CookbookError::OpenAI(format!("Chat stream error: {}", e)))?;

        let chunks = stream.flat_map(|item| {
            let chunks: Vec<Result<StreamChunk>> = match item {
                Ok(response) => stream_chunks(response).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(CookbookError::OpenAI(format!("Chat stream error: {}", e)))],
            };
            futures::stream::iter(chunks)
        });

        Ok(chunks.boxed())
    }
}

fn convert_usage(usage: Option<&CompletionUsage>) -> Usage {
    let mut converted = Usage {
        requests: 1,
        ..Usage::default()
    };
    if let Some(u) = usage {
        converted.request_tokens = u.prompt_tokens;
        converted.response_tokens = u.completion_tokens;
        converted.total_tokens = u.total_tokens;
    }
    converted
}

/// Break a streamed completion response into provider-neutral chunks.
fn stream_chunks(response: CreateChatCompletionStreamResponse) -> Vec<StreamChunk> {
    let mut chunks = Vec::new();

    for choice in response.choices {
        if let Some(content) = choice.delta.content {
            chunks.push(StreamChunk::TextDelta(content));
        }
        for call in choice.delta.tool_calls.into_iter().flatten() {
            let (name, args_delta) = match call.function {
                Some(function) => (function.name, function.arguments),
                None => (None, None),
            };
            chunks.push(StreamChunk::ToolCallDelta {
                index: call.index,
                id: call.id,
                name,
                args_delta,
            });
        }
    }

    if let Some(usage) = response.usage {
        chunks.push(StreamChunk::Usage(Usage {
            requests: 0,
            request_tokens: usage.prompt_tokens,
            response_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }));
    }

    chunks
}

fn to_openai_tools(params: &ModelRequestParameters) -> Vec<ChatCompletionTool> {
    params
        .function_tools
        .iter()
        .map(|tool| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: tool.name.clone(),
                description: Some(tool.description.clone()).filter(|d| !d.is_empty()),
                parameters: Some(tool.parameters_json_schema.clone()),
                strict: None,
            },
        })
        .collect()
}

/// Map the neutral history onto chat completion messages.
pub(crate) fn to_openai_messages(
    messages: &[ModelMessage],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let build_err = |e: async_openai::error::OpenAIError| CookbookError::Model(e.to_string());
    let mut converted: Vec<ChatCompletionRequestMessage> = Vec::new();

    for message in messages {
        match message {
            ModelMessage::Request { parts } => {
                for part in parts {
                    let msg: ChatCompletionRequestMessage = match part {
                        RequestPart::SystemPrompt { content } => {
                            ChatCompletionRequestSystemMessageArgs::default()
                                .content(content.clone())
                                .build()
                                .map_err(build_err)?
                                .into()
                        }
                        RequestPart::UserPrompt { content, .. } => {
                            ChatCompletionRequestUserMessageArgs::default()
                                .content(content.clone())
                                .build()
                                .map_err(build_err)?
                                .into()
                        }
                        RequestPart::ToolReturn {
                            tool_call_id,
                            content,
                            ..
                        } => ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(tool_call_id.clone())
                            .content(content.clone())
                            .build()
                            .map_err(build_err)?
                            .into(),
                    };
                    converted.push(msg);
                }
            }
            ModelMessage::Response { parts, .. } => {
                let mut text = String::new();
                let mut tool_calls = Vec::new();

                for part in parts {
                    match part {
                        ResponsePart::Text { content } => text.push_str(content),
                        ResponsePart::ToolCall {
                            tool_name,
                            args,
                            tool_call_id,
                        } => tool_calls.push(ChatCompletionMessageToolCall {
                            id: tool_call_id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: tool_name.clone(),
                                arguments: args.clone(),
                            },
                        }),
                    }
                }

                let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    builder.content(text);
                }
                if !tool_calls.is_empty() {
                    builder.tool_calls(tool_calls);
                }
                converted.push(builder.build().map_err(build_err)?.into());
            }
        }
    }

    Ok(converted)
}
