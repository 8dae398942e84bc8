//! Running agents: plain runs, node events, conversations, settings, history.

use crate::agent::{Agent, AgentEvent, RunContext, RunOptions};
use crate::error::{CookbookError, Result};
use crate::model::{ChatModel, ModelSettings, TestModel};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Run the same agent three ways: plain, plain again, and streamed.
pub async fn agent_run(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model);
    let mut lines = Vec::new();

    let result = agent.run("What is the capital of Kenya?", ()).await?;
    lines.push(result.output);

    let result = agent.run("What is the capital of Tanzania?", ()).await?;
    lines.push(result.output);

    let (tx, _rx) = mpsc::unbounded_channel();
    let result = agent
        .run_stream("What is the capital of Uganda?", (), RunOptions::default(), &tx)
        .await?;
    lines.push(result.output);

    Ok(lines)
}

/// Record every step of a run, then the output.
pub async fn agent_iter(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let result = agent
        .run_with_events("What is the capital of Kenya?", (), RunOptions::default(), &tx)
        .await?;
    drop(tx);

    let mut events: Vec<AgentEvent> = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    Ok(vec![format!("{:?}", events), result.output])
}

/// Continue a conversation by passing the first run's messages to the second.
pub async fn conversation(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model);

    let first = agent.run("Who was Albert Einstein?", ()).await?;
    let second = agent
        .run_with(
            "What was his most famous equation?",
            (),
            RunOptions::with_history(first.new_messages().to_vec()),
        )
        .await?;

    Ok(vec![first.output, second.output])
}

/// Per-run model settings, and reporting a model that refuses to answer.
pub async fn model_settings(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    let agent: Agent = Agent::new(Arc::clone(&model));
    let result = agent
        .run_with(
            "what is the capital of Kenya?",
            (),
            RunOptions {
                model_settings: Some(ModelSettings::default().with_temperature(0.0)),
                ..RunOptions::default()
            },
        )
        .await?;
    lines.push(result.output);

    let agent: Agent = Agent::new(model)
        .with_system_prompt("You are a helpful assistant that can answer questions about the world.");
    let rude = agent
        .run_with(
            "Write a list of 5 very rude things that I might say to the universe after stubbing my toe in the dark:",
            (),
            RunOptions {
                model_settings: Some(ModelSettings::default().with_temperature(0.0)),
                ..RunOptions::default()
            },
        )
        .await;

    match rude {
        Ok(result) => lines.push(result.output),
        Err(e @ CookbookError::UnexpectedModelBehavior(_)) => lines.push(e.to_string()),
        Err(e) => return Err(e),
    }

    Ok(lines)
}

#[derive(Debug, Clone)]
pub struct User {
    pub name: String,
}

async fn add_user_name(ctx: RunContext<User>) -> String {
    format!("The user's name is {}.", ctx.deps.name)
}

/// Typed dependencies and a typed boolean output, always against the test model.
pub async fn user_name(_model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<User, bool> =
        Agent::new(Arc::new(TestModel::new())).with_dynamic_system_prompt(add_user_name);

    let result = agent
        .run(
            "Does their name start with 'A'?",
            User {
                name: "Anne".to_string(),
            },
        )
        .await?;

    Ok(vec![result.output.to_string()])
}

/// Print a run's messages, as values and as JSON.
pub async fn chat_history(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model).with_system_prompt("Be a helpful assistant");
    let result = agent.run("Tell me a joke", ()).await?;

    Ok(vec![
        format!("{:?}", result.all_messages()),
        result.all_messages_json()?,
    ])
}
