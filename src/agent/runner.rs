//! Agent runner with tool calling loop.

use super::output::AgentOutput;
use super::tools::{RunContext, Tool, ToolError};
use crate::error::{CookbookError, Result};
use crate::model::{
    infer_model, ChatModel, ModelMessage, ModelRequestParameters, ModelResponse, ModelSettings,
    PartUpdate, RequestPart, ResponseAssembler, ResponsePart, ToolDefinition, Usage,
};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

type SystemPromptFn<D> = Arc<dyn Fn(RunContext<D>) -> BoxFuture<'static, String> + Send + Sync>;

/// Something that happened during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    /// The run started with this prompt.
    UserPrompt { prompt: String },
    /// A model request is about to be sent.
    ModelRequest { step: usize },
    /// A streamed response part started.
    PartStart { index: usize, part: ResponsePart },
    /// More text for a streamed text part.
    TextDelta { index: usize, delta: String },
    /// More arguments for a streamed tool call.
    ToolArgsDelta { index: usize, delta: String },
    /// The model produced its final answer.
    FinalResult { tool_name: Option<String> },
    ToolCall {
        tool_name: String,
        args: String,
        tool_call_id: String,
    },
    ToolResult {
        tool_call_id: String,
        content: String,
    },
    /// The run finished.
    End { output: String },
}

/// Per-run overrides.
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Earlier conversation to continue from.
    pub message_history: Vec<ModelMessage>,
    /// Model to use instead of the agent's own.
    pub model: Option<Arc<dyn ChatModel>>,
    /// Settings overlaid on the agent's settings.
    pub model_settings: Option<ModelSettings>,
}

impl RunOptions {
    pub fn with_history(history: Vec<ModelMessage>) -> Self {
        Self {
            message_history: history,
            ..Self::default()
        }
    }
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunResult<O> {
    pub output: O,
    pub messages: Vec<ModelMessage>,
    /// Index of the first message produced by this run.
    pub new_message_index: usize,
    pub usage: Usage,
}

impl<O> RunResult<O> {
    /// Full history, including any history the run was started with.
    pub fn all_messages(&self) -> &[ModelMessage] {
        &self.messages
    }

    /// Messages produced by this run only.
    pub fn new_messages(&self) -> &[ModelMessage] {
        &self.messages[self.new_message_index.min(self.messages.len())..]
    }

    /// Full history as JSON.
    pub fn all_messages_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.messages)?)
    }
}

/// An LLM agent: a model plus prompts, tools and an output type.
pub struct Agent<D = (), O = String> {
    model: Arc<dyn ChatModel>,
    system_prompts: Vec<String>,
    dynamic_system_prompts: Vec<SystemPromptFn<D>>,
    instructions: Option<String>,
    tools: Vec<Tool<D>>,
    model_settings: ModelSettings,
    max_iterations: usize,
    _output: PhantomData<fn() -> O>,
}

impl<D: Send + Sync + 'static, O: AgentOutput> Agent<D, O> {
    /// Create a new agent for the given model.
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            system_prompts: Vec::new(),
            dynamic_system_prompts: Vec::new(),
            instructions: None,
            tools: Vec::new(),
            model_settings: ModelSettings::default(),
            max_iterations: 15,
            _output: PhantomData,
        }
    }

    /// Create an agent from a model name such as `openai:gpt-4o`.
    pub fn from_name(model: &str) -> Result<Self> {
        Ok(Self::new(infer_model(model)?))
    }

    /// Add a static system prompt.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompts.push(prompt.to_string());
        self
    }

    /// Add a system prompt computed from the run context when the run starts.
    pub fn with_dynamic_system_prompt<F, Fut>(mut self, prompt: F) -> Self
    where
        F: Fn(RunContext<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = String> + Send + 'static,
    {
        self.dynamic_system_prompts.push(Arc::new(
            move |ctx: RunContext<D>| -> BoxFuture<'static, String> { Box::pin(prompt(ctx)) },
        ));
        self
    }

    /// Set instructions. Sent with every request but never stored in history.
    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_tool(mut self, tool: Tool<D>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_model_settings(mut self, settings: ModelSettings) -> Self {
        self.model_settings = settings;
        self
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    /// The agent's default model.
    pub fn model(&self) -> &Arc<dyn ChatModel> {
        &self.model
    }

    /// Run the agent with a user prompt.
    pub async fn run(&self, prompt: &str, deps: D) -> Result<RunResult<O>> {
        self.drive(prompt, deps, RunOptions::default(), None, false)
            .await
    }

    /// Run with a message history, model or settings override.
    pub async fn run_with(&self, prompt: &str, deps: D, options: RunOptions) -> Result<RunResult<O>> {
        self.drive(prompt, deps, options, None, false).await
    }

    /// Run without streaming, reporting each step as an event.
    pub async fn run_with_events(
        &self,
        prompt: &str,
        deps: D,
        options: RunOptions,
        events: &UnboundedSender<AgentEvent>,
    ) -> Result<RunResult<O>> {
        self.drive(prompt, deps, options, Some(events), false).await
    }

    /// Run with every model request streamed; deltas arrive as events.
    pub async fn run_stream(
        &self,
        prompt: &str,
        deps: D,
        options: RunOptions,
        events: &UnboundedSender<AgentEvent>,
    ) -> Result<RunResult<O>> {
        self.drive(prompt, deps, options, Some(events), true).await
    }

    async fn drive(
        &self,
        prompt: &str,
        deps: D,
        options: RunOptions,
        events: Option<&UnboundedSender<AgentEvent>>,
        stream: bool,
    ) -> Result<RunResult<O>> {
        let model = options.model.unwrap_or_else(|| Arc::clone(&self.model));
        let settings = match &options.model_settings {
            Some(overrides) => self.model_settings.merge(overrides),
            None => self.model_settings.clone(),
        };

        let mut messages = options.message_history;
        let new_message_index = messages.len();
        let mut ctx = RunContext {
            deps: Arc::new(deps),
            model_name: model.name().to_string(),
            run_step: 0,
            prompt: prompt.to_string(),
        };

        let mut parts = Vec::new();
        if messages.is_empty() {
            for system in &self.system_prompts {
                parts.push(RequestPart::system(system.clone()));
            }
            for dynamic in &self.dynamic_system_prompts {
                parts.push(RequestPart::system(dynamic(ctx.clone()).await));
            }
        }
        parts.push(RequestPart::user(prompt));
        messages.push(ModelMessage::request(parts));
        emit(events, AgentEvent::UserPrompt {
            prompt: prompt.to_string(),
        });

        let mut usage = Usage::default();

        loop {
            ctx.run_step += 1;
            if ctx.run_step > self.max_iterations {
                return Err(CookbookError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}", ctx.run_step);

            let offered: Vec<(ToolDefinition, &Tool<D>)> = self
                .tools
                .iter()
                .filter_map(|tool| tool.prepared_definition(&ctx).map(|def| (def, tool)))
                .collect();
            let params = ModelRequestParameters {
                function_tools: offered.iter().map(|(def, _)| def.clone()).collect(),
                output_schema: O::output_schema(),
                settings: settings.clone(),
            };

            let request_messages = self.request_messages(&messages);
            emit(events, AgentEvent::ModelRequest { step: ctx.run_step });

            let (response, final_reported) = if stream {
                stream_response(model.as_ref(), &request_messages, &params, events).await?
            } else {
                (model.request(&request_messages, &params).await?, false)
            };
            usage.incr(&response.usage);
            messages.push(response.clone().into_message());

            let calls: Vec<&ResponsePart> = response.tool_calls();
            if !calls.is_empty() {
                let mut returns = Vec::with_capacity(calls.len());
                for call in calls {
                    if let ResponsePart::ToolCall {
                        tool_name,
                        args,
                        tool_call_id,
                    } = call
                    {
                        emit(events, AgentEvent::ToolCall {
                            tool_name: tool_name.clone(),
                            args: args.clone(),
                            tool_call_id: tool_call_id.clone(),
                        });

                        let content = self.execute_tool_call(&ctx, &offered, call).await;

                        emit(events, AgentEvent::ToolResult {
                            tool_call_id: tool_call_id.clone(),
                            content: content.clone(),
                        });
                        returns.push(RequestPart::tool_return(
                            tool_name.clone(),
                            tool_call_id.clone(),
                            content,
                        ));
                    }
                }
                messages.push(ModelMessage::request(returns));
                continue;
            }

            if !final_reported {
                emit(events, AgentEvent::FinalResult { tool_name: None });
            }
            let text = response.text().unwrap_or_default();
            let output = O::from_model_text(&text)?;
            emit(events, AgentEvent::End {
                output: output.render(),
            });

            info!(
                "Agent finished after {} requests ({} tokens)",
                usage.requests, usage.total_tokens
            );

            return Ok(RunResult {
                output,
                messages,
                new_message_index,
                usage,
            });
        }
    }

    /// History as sent to the model: instructions first, then the stored messages.
    fn request_messages(&self, messages: &[ModelMessage]) -> Vec<ModelMessage> {
        let mut request = Vec::with_capacity(messages.len() + 1);
        if let Some(instructions) = &self.instructions {
            request.push(ModelMessage::request(vec![RequestPart::system(
                instructions.clone(),
            )]));
        }
        request.extend(messages.iter().cloned());
        request
    }

    /// Execute a single tool call and return the text reported to the model.
    async fn execute_tool_call(
        &self,
        ctx: &RunContext<D>,
        offered: &[(ToolDefinition, &Tool<D>)],
        call: &ResponsePart,
    ) -> String {
        let ResponsePart::ToolCall {
            tool_name, args, ..
        } = call
        else {
            return String::new();
        };

        info!("Agent calling tool: {} with args: {}", tool_name, args);

        let Some(tool) = offered
            .iter()
            .find(|(def, _)| def.name == *tool_name)
            .map(|(_, tool)| *tool)
        else {
            return format!("Unknown tool: {}", tool_name);
        };

        let args = match call.args_as_value() {
            Ok(args) => args,
            Err(e) => return format!("Failed to parse tool call: {}", e),
        };

        match tool.call(ctx.clone(), args).await {
            Ok(output) => output,
            Err(ToolError::InvalidArguments(e)) => format!("Failed to parse tool call: {}", e),
            Err(e) => format!("Tool error: {}", e),
        }
    }
}

fn emit(events: Option<&UnboundedSender<AgentEvent>>, event: AgentEvent) {
    if let Some(tx) = events {
        // A dropped receiver only means nobody is listening.
        let _ = tx.send(event);
    }
}

/// Stream one model response. Also reports whether `FinalResult` was already
/// emitted, which happens when a text part starts before any tool call.
async fn stream_response(
    model: &dyn ChatModel,
    messages: &[ModelMessage],
    params: &ModelRequestParameters,
    events: Option<&UnboundedSender<AgentEvent>>,
) -> Result<(ModelResponse, bool)> {
    let mut stream = model.request_stream(messages, params).await?;
    let mut assembler = ResponseAssembler::new();
    let mut saw_tool_call = false;
    let mut final_reported = false;

    while let Some(chunk) = stream.next().await {
        let Some(update) = assembler.push(chunk?) else {
            continue;
        };
        match update {
            PartUpdate::Start { index, part } => {
                let is_text = matches!(part, ResponsePart::Text { .. });
                saw_tool_call |= !is_text;
                emit(events, AgentEvent::PartStart { index, part });
                if is_text && !saw_tool_call && !final_reported {
                    final_reported = true;
                    emit(events, AgentEvent::FinalResult { tool_name: None });
                }
            }
            PartUpdate::TextDelta { index, delta } => {
                emit(events, AgentEvent::TextDelta { index, delta })
            }
            PartUpdate::ArgsDelta { index, delta } => {
                emit(events, AgentEvent::ToolArgsDelta { index, delta })
            }
        }
    }

    let response = assembler.finish(model.name());
    let final_reported = final_reported && response.tool_calls().is_empty();
    Ok((response, final_reported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ToolResult;
    use crate::model::{FunctionModel, StreamChunk, TestModel};
    use serde_json::Value;
    use tokio::sync::mpsc;

    async fn roll_die(_ctx: RunContext<()>, _args: Value) -> ToolResult {
        Ok("4".to_string())
    }

    async fn greet(ctx: RunContext<String>) -> String {
        format!("The user's name is {}.", ctx.deps)
    }

    fn always_call(tool: &'static str) -> FunctionModel {
        FunctionModel::new(move |messages, _params| {
            let returned = messages.last().map(|m| m.tool_returns()).unwrap_or_default();
            match returned.first() {
                Some((_, content)) => Ok(ModelResponse::new(
                    vec![ResponsePart::text(content.to_string())],
                    "function",
                )),
                None => Ok(ModelResponse::new(
                    vec![ResponsePart::tool_call(tool, "{}", "call_1")],
                    "function",
                )),
            }
        })
    }

    #[tokio::test]
    async fn test_plain_run() {
        let agent: Agent = Agent::new(Arc::new(TestModel::new()));
        let result = agent.run("What is the capital of France?", ()).await.unwrap();

        assert_eq!(result.output, "success (no tool calls)");
        assert_eq!(result.new_messages().len(), 2);
        assert_eq!(result.usage.requests, 1);
    }

    #[tokio::test]
    async fn test_tool_run_reports_returns() {
        let agent: Agent = Agent::new(Arc::new(TestModel::new()))
            .with_tool(Tool::new("roll_die", "Roll a six-sided die", roll_die));
        let result = agent.run("My guess is 4", ()).await.unwrap();

        assert_eq!(result.output, r#"{"roll_die":4}"#);
        assert_eq!(result.usage.requests, 2);
        assert_eq!(result.all_messages().len(), 4);
    }

    #[tokio::test]
    async fn test_dynamic_system_prompt_only_on_fresh_conversation() {
        let model = FunctionModel::new(|messages, _params| {
            let systems = messages
                .iter()
                .filter_map(|m| match m {
                    ModelMessage::Request { parts } => Some(parts),
                    _ => None,
                })
                .flatten()
                .filter(|p| matches!(p, RequestPart::SystemPrompt { .. }))
                .count();
            Ok(ModelResponse::new(
                vec![ResponsePart::text(format!("{} system prompts", systems))],
                "function",
            ))
        });
        let agent: Agent<String> = Agent::new(Arc::new(model))
            .with_system_prompt("Be concise.")
            .with_dynamic_system_prompt(greet);

        let first = agent.run("hi", "Frank".to_string()).await.unwrap();
        assert_eq!(first.output, "2 system prompts");

        let second = agent
            .run_with(
                "and again",
                "Frank".to_string(),
                RunOptions::with_history(first.all_messages().to_vec()),
            )
            .await
            .unwrap();
        assert_eq!(second.output, "2 system prompts");
        assert_eq!(second.new_message_index, 2);
        assert_eq!(second.new_messages().len(), 2);
    }

    #[tokio::test]
    async fn test_instructions_sent_but_not_stored() {
        let model = FunctionModel::new(|messages, _params| {
            let first = match messages.first() {
                Some(ModelMessage::Request { parts }) => match parts.first() {
                    Some(RequestPart::SystemPrompt { content }) => content.clone(),
                    _ => String::new(),
                },
                _ => String::new(),
            };
            Ok(ModelResponse::new(vec![ResponsePart::text(first)], "function"))
        });
        let agent: Agent = Agent::new(Arc::new(model)).with_instructions("Answer in French.");
        let result = agent.run("hello", ()).await.unwrap();

        assert_eq!(result.output, "Answer in French.");
        let stored_system = result.all_messages().iter().any(|m| match m {
            ModelMessage::Request { parts } => parts
                .iter()
                .any(|p| matches!(p, RequestPart::SystemPrompt { .. })),
            _ => false,
        });
        assert!(!stored_system);
    }

    #[tokio::test]
    async fn test_iteration_cap() {
        let model = FunctionModel::new(|_messages, _params| {
            Ok(ModelResponse::new(
                vec![ResponsePart::tool_call("roll_die", "{}", "call_1")],
                "function",
            ))
        });
        let agent: Agent = Agent::new(Arc::new(model))
            .with_tool(Tool::new("roll_die", "", roll_die))
            .with_max_iterations(3);

        let err = agent.run("loop forever", ()).await.unwrap_err();
        assert!(matches!(err, CookbookError::Agent(_)));
    }

    #[tokio::test]
    async fn test_unknown_tool_reported_to_model() {
        let agent: Agent = Agent::new(Arc::new(always_call("missing")));
        let result = agent.run("call something", ()).await.unwrap();
        assert_eq!(result.output, "Unknown tool: missing");
    }

    #[tokio::test]
    async fn test_hidden_tool_is_not_offered() {
        async fn answer(_ctx: RunContext<i64>, _args: Value) -> ToolResult {
            Ok("42".to_string())
        }

        let model = Arc::new(TestModel::new());
        let agent: Agent<i64> = Agent::new(model.clone()).with_tool(
            Tool::new("hitchhiker", "", answer)
                .with_prepare(|ctx, def| if *ctx.deps == 42 { Some(def) } else { None }),
        );

        let hidden = agent.run("testing...", 41).await.unwrap();
        assert_eq!(hidden.output, "success (no tool calls)");
        assert!(model.last_request_parameters().unwrap().function_tools.is_empty());

        let shown = agent.run("testing...", 42).await.unwrap();
        assert_eq!(shown.output, r#"{"hitchhiker":42}"#);
    }

    #[tokio::test]
    async fn test_structured_output() {
        let agent: Agent<(), bool> =
            Agent::new(Arc::new(TestModel::new().with_output_args(serde_json::json!({"response": true}))));
        let result = agent.run("Put my money on square eighteen", ()).await.unwrap();
        assert!(result.output);
    }

    #[tokio::test]
    async fn test_run_stream_emits_deltas_and_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent: Agent = Agent::new(Arc::new(TestModel::new().with_output_text("Hello world")));

        let result = agent
            .run_stream("Hello", (), RunOptions::default(), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(result.output, "Hello world");
        assert!(events.iter().any(|e| matches!(e, AgentEvent::PartStart { .. })));
        assert_eq!(
            events.last(),
            Some(&AgentEvent::End {
                output: "Hello world".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_final_result_reported_before_text_deltas() {
        let model = FunctionModel::new(|_messages, _params| {
            Ok(ModelResponse::new(vec![ResponsePart::text("It will rain")], "function"))
        })
        .with_stream(|_messages, _params| {
            Ok(vec![
                StreamChunk::TextDelta("It ".to_string()),
                StreamChunk::TextDelta("will ".to_string()),
                StreamChunk::TextDelta("rain".to_string()),
            ])
        });
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent: Agent = Agent::new(Arc::new(model));

        agent
            .run_stream("Weather in London?", (), RunOptions::default(), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        let position = |wanted: fn(&AgentEvent) -> bool| events.iter().position(wanted);
        let final_at = position(|e| matches!(e, AgentEvent::FinalResult { .. })).unwrap();
        let delta_at = position(|e| matches!(e, AgentEvent::TextDelta { .. })).unwrap();
        assert!(final_at < delta_at);
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, AgentEvent::FinalResult { .. }))
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_run_with_events_reports_tool_calls() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent: Agent = Agent::new(Arc::new(TestModel::new()))
            .with_tool(Tool::new("roll_die", "", roll_die));

        agent
            .run_with_events("roll", (), RunOptions::default(), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut results = Vec::new();
        while let Some(event) = rx.recv().await {
            if let AgentEvent::ToolResult { content, .. } = event {
                results.push(content);
            }
        }
        assert_eq!(results, vec!["4".to_string()]);
    }

    #[test]
    fn test_all_messages_json() {
        let result = RunResult {
            output: String::new(),
            messages: vec![ModelMessage::request(vec![RequestPart::user("hi")])],
            new_message_index: 0,
            usage: Usage::default(),
        };
        let json = result.all_messages_json().unwrap();
        assert!(json.contains("\"kind\":\"request\""));
    }
}
