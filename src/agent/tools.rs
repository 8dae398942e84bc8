//! Tool registration for agents.
//!
//! A tool is a name, a description, a hand-written JSON schema for its
//! arguments and an async handler. Handlers receive the run context, so they
//! can reach the run's dependencies.

use crate::error::CookbookError;
use crate::model::ToolDefinition;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Per-run context handed to tools and dynamic system prompts.
pub struct RunContext<D> {
    /// Dependencies injected by the caller of the run.
    pub deps: Arc<D>,
    /// Name of the model serving the run.
    pub model_name: String,
    /// Number of model requests made so far.
    pub run_step: usize,
    /// The user prompt that started the run.
    pub prompt: String,
}

impl<D> Clone for RunContext<D> {
    fn clone(&self) -> Self {
        Self {
            deps: Arc::clone(&self.deps),
            model_name: self.model_name.clone(),
            run_step: self.run_step,
            prompt: self.prompt.clone(),
        }
    }
}

/// Error raised by a tool handler. Reported back to the model as text.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Failed(String),
}

impl From<CookbookError> for ToolError {
    fn from(e: CookbookError) -> Self {
        ToolError::Failed(e.to_string())
    }
}

/// What a tool handler returns: text for the model, or an error reported as text.
pub type ToolResult = std::result::Result<String, ToolError>;

/// Deserialize tool arguments into a typed struct.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T, ToolError> {
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

type ToolFn<D> =
    Arc<dyn Fn(RunContext<D>, Value) -> BoxFuture<'static, ToolResult> + Send + Sync>;
type PrepareFn<D> =
    Arc<dyn Fn(&RunContext<D>, ToolDefinition) -> Option<ToolDefinition> + Send + Sync>;

/// A function the model can ask the agent to call.
pub struct Tool<D> {
    definition: ToolDefinition,
    handler: ToolFn<D>,
    prepare: Option<PrepareFn<D>>,
}

impl<D> Clone for Tool<D> {
    fn clone(&self) -> Self {
        Self {
            definition: self.definition.clone(),
            handler: Arc::clone(&self.handler),
            prepare: self.prepare.clone(),
        }
    }
}

impl<D: Send + Sync + 'static> Tool<D> {
    /// Create a tool that takes no arguments until `with_parameters` says otherwise.
    pub fn new<F, Fut>(name: &str, description: &str, handler: F) -> Self
    where
        F: Fn(RunContext<D>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        Self {
            definition: ToolDefinition {
                name: name.to_string(),
                description: description.to_string(),
                parameters_json_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            handler: Arc::new(
                move |ctx: RunContext<D>, args: Value| -> BoxFuture<'static, ToolResult> {
                    Box::pin(handler(ctx, args))
                },
            ),
            prepare: None,
        }
    }

    /// Set the JSON schema of the tool's arguments.
    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.definition.parameters_json_schema = schema;
        self
    }

    /// Adjust or hide the tool per run. Returning `None` hides it.
    pub fn with_prepare<F>(mut self, prepare: F) -> Self
    where
        F: Fn(&RunContext<D>, ToolDefinition) -> Option<ToolDefinition> + Send + Sync + 'static,
    {
        self.prepare = Some(Arc::new(prepare) as PrepareFn<D>);
        self
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// The definition offered to the model for this run, if any.
    pub fn prepared_definition(&self, ctx: &RunContext<D>) -> Option<ToolDefinition> {
        match &self.prepare {
            Some(prepare) => prepare(ctx, self.definition.clone()),
            None => Some(self.definition.clone()),
        }
    }

    /// Run the handler.
    pub async fn call(&self, ctx: RunContext<D>, args: Value) -> ToolResult {
        (self.handler)(ctx, args).await
    }
}
