//! Streaming: node events with tool calls, text deltas, partial structured output.

use crate::agent::{
    parse_args, partial_json, Agent, AgentEvent, AgentOutput, RunContext, RunOptions, RunResult,
    StructuredOutput, Tool, ToolResult,
};
use crate::error::Result;
use crate::model::{ChatModel, ResponsePart};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Stream a run, handing each event to `on_event` as it arrives.
async fn stream_run<D, O, F>(
    agent: &Agent<D, O>,
    prompt: &str,
    deps: D,
    options: RunOptions,
    mut on_event: F,
) -> Result<RunResult<O>>
where
    D: Send + Sync + 'static,
    O: AgentOutput,
    F: FnMut(AgentEvent),
{
    let (tx, rx) = mpsc::unbounded_channel();

    let run = async move {
        let result = agent.run_stream(prompt, deps, options, &tx).await;
        drop(tx);
        result
    };
    let consume = async move {
        let mut rx: UnboundedReceiver<AgentEvent> = rx;
        while let Some(event) = rx.recv().await {
            on_event(event);
        }
    };

    let (result, ()) = tokio::join!(run, consume);
    result
}

/// Stand-in for a weather API.
#[derive(Debug, Clone, Default)]
pub struct WeatherService;

impl WeatherService {
    pub async fn get_forecast(&self, location: &str, forecast_date: NaiveDate) -> String {
        format!(
            "The forecast in {} on {} is sunny with a high of 25C and a low of 15C",
            location, forecast_date
        )
    }

    pub async fn get_historic_weather(&self, location: &str, forecast_date: NaiveDate) -> String {
        format!(
            "The weather in {} on {} was cloudy with a high of 20C and a low of 10C",
            location, forecast_date
        )
    }
}

#[derive(Deserialize)]
struct ForecastArgs {
    location: String,
    forecast_date: NaiveDate,
}

async fn weather_forecast(ctx: RunContext<WeatherService>, args: Value) -> ToolResult {
    let args: ForecastArgs = parse_args(args)?;
    let today = chrono::Local::now().date_naive();

    if args.forecast_date >= today {
        Ok(ctx.deps.get_forecast(&args.location, args.forecast_date).await)
    } else {
        Ok(ctx
            .deps
            .get_historic_weather(&args.location, args.forecast_date)
            .await)
    }
}

/// Describe each event the way a node-by-node trace would.
fn describe_event(event: &AgentEvent, in_tools: &mut bool) -> Vec<String> {
    let mut lines = Vec::new();
    match event {
        AgentEvent::UserPrompt { prompt } => {
            lines.push(format!("=== UserPromptNode: {} ===", prompt));
        }
        AgentEvent::ModelRequest { .. } => {
            *in_tools = false;
            lines.push("=== ModelRequestNode: streaming partial request tokens ===".to_string());
        }
        AgentEvent::PartStart { index, part } => {
            lines.push(format!("[Request] Starting part {}: {:?}", index, part));
        }
        AgentEvent::TextDelta { index, delta } => {
            lines.push(format!("[Request] Delta part {} text delta: {:?}", index, delta));
        }
        AgentEvent::ToolArgsDelta { index, delta } => {
            lines.push(format!("[Request] Part {} args_delta={}", index, delta));
        }
        AgentEvent::FinalResult { tool_name } => {
            lines.push(format!(
                "[Result] The model produced a final output (tool_name={})",
                tool_name.as_deref().unwrap_or("None")
            ));
        }
        AgentEvent::ToolCall {
            tool_name,
            args,
            tool_call_id,
        } => {
            if !*in_tools {
                *in_tools = true;
                lines.push("=== CallToolsNode: streaming partial response & tool usage ===".to_string());
            }
            lines.push(format!(
                "[Tools] The LLM calls tool={:?} with args={} (tool_call_id={:?})",
                tool_name, args, tool_call_id
            ));
        }
        AgentEvent::ToolResult {
            tool_call_id,
            content,
        } => {
            lines.push(format!("[Tools] Tool call {:?} returned => {}", tool_call_id, content));
        }
        AgentEvent::End { output } => {
            lines.push(format!("=== Final Agent Output: {} ===", output));
        }
    }
    lines
}

/// Weather agent run streamed node by node, including tool calls and results.
pub async fn weather_stream(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<WeatherService> = Agent::new(model)
        .with_system_prompt("Providing a weather forecast at the location the user provides")
        .with_tool(
            Tool::new("weather_forecast", "", weather_forecast).with_parameters(json!({
                "type": "object",
                "properties": {
                    "location": {"type": "string"},
                    "forecast_date": {"type": "string", "format": "date"}
                },
                "required": ["location", "forecast_date"]
            })),
        );

    let mut lines = Vec::new();
    let mut in_tools = false;
    stream_run(
        &agent,
        "What will the weather be like in Nairobi on Tuesday?",
        WeatherService,
        RunOptions::default(),
        |event| lines.extend(describe_event(&event, &mut in_tools)),
    )
    .await?;

    Ok(lines)
}

/// Print text as it streams in.
pub async fn streamed_hello_world(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model);

    let mut lines = Vec::new();
    stream_run(
        &agent,
        "Where does 'hello world' come from?",
        (),
        RunOptions::default(),
        |event| match event {
            AgentEvent::PartStart {
                part: ResponsePart::Text { content },
                ..
            } => lines.push(content),
            AgentEvent::TextDelta { delta, .. } => lines.push(delta),
            _ => {}
        },
    )
    .await?;

    Ok(lines)
}

/// A user profile where every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl StructuredOutput for UserProfile {
    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "dob": {"type": "string", "format": "date"},
                "bio": {"type": "string"}
            }
        })
    }
}

/// Show the structured output growing while the JSON streams in.
pub async fn streamed_user_profile(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<(), UserProfile> =
        Agent::new(model).with_instructions("Extract a user profile from the input");

    let user_input = "My name is Ben, I was born on January 28th 1990, I like the chain the dog and the pyramid.";

    let mut lines = Vec::new();
    let mut buffer = String::new();
    let mut last: Option<Value> = None;

    let result = stream_run(&agent, user_input, (), RunOptions::default(), |event| {
        match event {
            AgentEvent::PartStart {
                part: ResponsePart::Text { content },
                ..
            } => buffer.push_str(&content),
            AgentEvent::TextDelta { delta, .. } => buffer.push_str(&delta),
            _ => return,
        }
        if let Some(profile) = partial_json::complete(&buffer) {
            if last.as_ref() != Some(&profile) {
                lines.push(profile.to_string());
                last = Some(profile);
            }
        }
    })
    .await?;

    lines.push(format!("{:?}", result.output));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestModel;

    #[tokio::test]
    async fn test_weather_stream_trace() {
        let lines = weather_stream(Arc::new(TestModel::new())).await.unwrap();

        assert_eq!(
            lines[0],
            "=== UserPromptNode: What will the weather be like in Nairobi on Tuesday? ==="
        );
        assert!(lines.iter().any(|l| l.starts_with("[Tools] The LLM calls tool=\"weather_forecast\"")));
        assert!(lines
            .iter()
            .any(|l| l.contains("The weather in a on 2024-01-01 was cloudy")));
        assert!(lines.last().unwrap().starts_with("=== Final Agent Output:"));
    }

    #[tokio::test]
    async fn test_weather_forecast_future_date() {
        let ctx = RunContext {
            deps: Arc::new(WeatherService),
            model_name: "test".to_string(),
            run_step: 1,
            prompt: String::new(),
        };
        let out = weather_forecast(ctx, json!({"location": "Nairobi", "forecast_date": "2999-01-01"}))
            .await
            .unwrap();
        assert!(out.starts_with("The forecast in Nairobi on 2999-01-01 is sunny"));
    }

    #[tokio::test]
    async fn test_streamed_hello_world() {
        let model = TestModel::new().with_output_text("hello world comes from a C tutorial");
        let lines = streamed_hello_world(Arc::new(model)).await.unwrap();
        assert_eq!(lines, vec!["hello world comes from a C tutorial"]);
    }

    #[tokio::test]
    async fn test_streamed_user_profile() {
        let model = TestModel::new().with_output_args(json!({
            "name": "Ben",
            "dob": "1990-01-28",
            "bio": "Likes the chain, the dog and the pyramid"
        }));
        let lines = streamed_user_profile(Arc::new(model)).await.unwrap();

        assert!(lines[0].contains("\"name\":\"Ben\""));
        assert!(lines.last().unwrap().contains("1990-01-28"));
    }
}
