//! Model whose responses come from a plain Rust closure.

use super::{
    response_to_chunks, ChatModel, ModelMessage, ModelRequestParameters, ModelResponse, StreamChunk,
};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;

type ResponseFn =
    Arc<dyn Fn(&[ModelMessage], &ModelRequestParameters) -> Result<ModelResponse> + Send + Sync>;
type StreamFn =
    Arc<dyn Fn(&[ModelMessage], &ModelRequestParameters) -> Result<Vec<StreamChunk>> + Send + Sync>;

/// Model that delegates every request to a closure.
///
/// Handy for inspecting exactly what an agent sends (tool schemas, settings)
/// and for scripting multi-turn conversations in tests.
pub struct FunctionModel {
    name: String,
    function: ResponseFn,
    stream_function: Option<StreamFn>,
}

impl FunctionModel {
    pub fn new<F>(function: F) -> Self
    where
        F: Fn(&[ModelMessage], &ModelRequestParameters) -> Result<ModelResponse>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: "function".to_string(),
            function: Arc::new(function),
            stream_function: None,
        }
    }

    /// Script the chunks returned by streamed requests.
    pub fn with_stream<F>(mut self, stream_function: F) -> Self
    where
        F: Fn(&[ModelMessage], &ModelRequestParameters) -> Result<Vec<StreamChunk>>
            + Send
            + Sync
            + 'static,
    {
        self.stream_function = Some(Arc::new(stream_function));
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

#[async_trait]
impl ChatModel for FunctionModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn request(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<ModelResponse> {
        (self.function)(messages, params)
    }

    async fn request_stream(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<BoxStream<'static, Result<StreamChunk>>> {
        let chunks = match &self.stream_function {
            Some(stream_function) => stream_function(messages, params)?,
            None => response_to_chunks((self.function)(messages, params)?),
        };
        Ok(futures::stream::iter(chunks.into_iter().map(Ok)).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RequestPart, ResponsePart};

    #[tokio::test]
    async fn test_function_model_sees_messages() {
        let model = FunctionModel::new(|messages, _params| {
            Ok(ModelResponse::new(
                vec![ResponsePart::text(format!("{} messages", messages.len()))],
                "function",
            ))
        })
        .with_name("echo");

        let response = model
            .request(
                &[ModelMessage::request(vec![RequestPart::user("hi")])],
                &ModelRequestParameters::default(),
            )
            .await
            .unwrap();

        assert_eq!(model.name(), "echo");
        assert_eq!(response.text().as_deref(), Some("1 messages"));
    }
}
