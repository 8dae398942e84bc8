//! Function tools: dependencies, prepare hooks, schemas and tool results.

use crate::agent::{
    parse_args, Agent, RunContext, StructuredOutput, Tool, ToolError, ToolResult,
};
use crate::error::{CookbookError, Result};
use crate::model::{ChatModel, FunctionModel, ModelResponse, ResponsePart, TestModel};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::{Arc, Mutex};

const DICE_SYSTEM_PROMPT: &str = "You're a dice game, you should roll the die and see if the number \
you get back matches the user's guess. If so, tell them they're a winner. \
Use the player's name in the response.";

async fn roll_die(_ctx: RunContext<String>, _args: Value) -> ToolResult {
    Ok(rand::thread_rng().gen_range(1..=6).to_string())
}

async fn get_player_name(ctx: RunContext<String>, _args: Value) -> ToolResult {
    Ok(ctx.deps.to_string())
}

fn dice_agent(model: Arc<dyn ChatModel>) -> Agent<String> {
    Agent::new(model)
        .with_system_prompt(DICE_SYSTEM_PROMPT)
        .with_tool(Tool::new(
            "roll_die",
            "Roll a six-sided die and return the result",
            roll_die,
        ))
        .with_tool(Tool::new("get_player_name", "Get the player's name", get_player_name))
}

/// Dice game with a plain tool and a tool reading the player's name from deps.
pub async fn dice_game(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let result = dice_agent(model)
        .run("My guess is 4", "Abdul".to_string())
        .await?;

    Ok(vec![
        result.output.clone(),
        format!("{:?}", result.all_messages()),
    ])
}

/// The same dice agent shared between two players.
pub async fn dice_game_players(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent = dice_agent(model);
    let a = agent.run("My guess is 4", "Yashar".to_string()).await?;
    let b = agent.run("My guess is 6", "Anne".to_string()).await?;
    Ok(vec![a.output, b.output])
}

#[derive(Debug, Serialize)]
struct User {
    name: String,
    age: u32,
}

async fn get_current_time(_ctx: RunContext<()>, _args: Value) -> ToolResult {
    Ok(chrono::Local::now().to_rfc3339())
}

async fn get_user(_ctx: RunContext<()>, _args: Value) -> ToolResult {
    let user = User {
        name: "John".to_string(),
        age: 30,
    };
    serde_json::to_string(&user).map_err(|e| ToolError::Failed(e.to_string()))
}

async fn get_company_logo(_ctx: RunContext<()>, _args: Value) -> ToolResult {
    Ok("https://iili.io/3Hs4FMg.png".to_string())
}

async fn get_document(_ctx: RunContext<()>, _args: Value) -> ToolResult {
    Ok("https://www.w3.org/WAI/ER/tests/xhtml/testfiles/resources/pdf/dummy.pdf".to_string())
}

/// Tools returning a timestamp, a JSON object and URLs.
pub async fn tool_output(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent = Agent::new(model)
        .with_tool(Tool::new("get_current_time", "Get the current time", get_current_time))
        .with_tool(Tool::new("get_user", "Get the current user", get_user))
        .with_tool(Tool::new(
            "get_company_logo",
            "Get the URL of the company logo",
            get_company_logo,
        ))
        .with_tool(Tool::new(
            "get_document",
            "Get the URL of the company document",
            get_document,
        ));

    let mut lines = Vec::new();
    for prompt in [
        "What time is it?",
        "What is the user's name?",
        "What is the company name in the logo?",
        "What is the main content of the document?",
    ] {
        lines.push(agent.run(prompt, ()).await?.output);
    }
    Ok(lines)
}

#[derive(Deserialize)]
struct HitchhikerArgs {
    answer: String,
}

async fn hitchhiker(ctx: RunContext<i64>, args: Value) -> ToolResult {
    let args: HitchhikerArgs = parse_args(args)?;
    Ok(format!("{} {}", ctx.deps, args.answer))
}

/// A tool that is only offered when the run's deps equal 42.
pub async fn tool_only_if_42(_model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<i64> = Agent::new(Arc::new(TestModel::new())).with_tool(
        Tool::new("hitchhiker", "", hitchhiker)
            .with_parameters(json!({
                "type": "object",
                "properties": {"answer": {"type": "string"}},
                "required": ["answer"]
            }))
            .with_prepare(|ctx, def| if *ctx.deps == 42 { Some(def) } else { None }),
    );

    let hidden = agent.run("testing...", 41).await?;
    let shown = agent.run("testing...", 42).await?;
    Ok(vec![hidden.output, shown.output])
}

#[derive(Deserialize)]
struct FoobarArgs {
    a: i64,
    b: String,
    c: std::collections::BTreeMap<String, Vec<f64>>,
}

async fn foobar(_ctx: RunContext<()>, args: Value) -> ToolResult {
    let args: FoobarArgs = parse_args(args)?;
    Ok(format!("{} {} {:?}", args.a, args.b, args.c))
}

/// Show the description and parameter schema the model receives for a tool.
pub async fn tool_schema(_model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let model = FunctionModel::new(move |_messages, params| {
        let tool = params.function_tools.first().ok_or_else(|| {
            CookbookError::UnexpectedModelBehavior("No tools offered".to_string())
        })?;
        if let Ok(mut seen) = recorder.lock() {
            seen.push(tool.description.clone());
            seen.push(serde_json::to_string_pretty(&tool.parameters_json_schema)?);
        }
        Ok(ModelResponse::new(vec![ResponsePart::text("foobar")], "function"))
    });

    let agent: Agent = Agent::new(Arc::new(model)).with_tool(
        Tool::new("foobar", "Get me foobar.", foobar).with_parameters(json!({
            "type": "object",
            "properties": {
                "a": {"type": "integer", "description": "apple pie"},
                "b": {"type": "string", "description": "banana cake"},
                "c": {
                    "type": "object",
                    "additionalProperties": {"type": "array", "items": {"type": "number"}},
                    "description": "carrot smoothie"
                }
            },
            "required": ["a", "b", "c"]
        })),
    );

    agent.run("hello", ()).await?;

    let lines = seen
        .lock()
        .map(|s| s.clone())
        .map_err(|e| CookbookError::Agent(e.to_string()))?;
    Ok(lines)
}

/// Who a greeting is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greetee {
    Human,
    Machine,
}

impl fmt::Display for Greetee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Greetee::Human => f.write_str("human"),
            Greetee::Machine => f.write_str("machine"),
        }
    }
}

#[derive(Deserialize)]
struct GreetArgs {
    name: String,
}

async fn greet(_ctx: RunContext<Greetee>, args: Value) -> ToolResult {
    let args: GreetArgs = parse_args(args)?;
    Ok(format!("Hello {}", args.name))
}

/// A prepare hook that rewrites a parameter description from the deps.
pub async fn customize_name(_model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let test_model = Arc::new(TestModel::new());
    let agent: Agent<Greetee> = Agent::new(test_model.clone()).with_tool(
        Tool::new("greet", "", greet)
            .with_parameters(json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }))
            .with_prepare(|ctx, mut def| {
                def.parameters_json_schema["properties"]["name"]["description"] =
                    json!(format!("Name of the {} to greet", ctx.deps));
                Some(def)
            }),
    );

    let result = agent.run("testing...", Greetee::Machine).await?;
    let tools = test_model
        .last_request_parameters()
        .map(|p| p.function_tools)
        .unwrap_or_default();

    Ok(vec![result.output, format!("{:?}", tools)])
}

#[derive(Debug, Deserialize)]
struct Foobar {
    x: i64,
    y: String,
    #[serde(default = "default_z")]
    z: f64,
}

fn default_z() -> f64 {
    0.5
}

async fn foobar_v2(_ctx: RunContext<()>, args: Value) -> ToolResult {
    let f: Foobar = parse_args(args)?;
    Ok(format!("x={} y='{}' z={}", f.x, f.y, f.z))
}

/// A tool whose single object parameter is the whole argument schema.
pub async fn single_parameter_tool(_model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let test_model = Arc::new(TestModel::new());
    let agent: Agent = Agent::new(test_model.clone()).with_tool(
        Tool::new("foobar_v2", "", foobar_v2).with_parameters(json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer"},
                "y": {"type": "string"},
                "z": {"type": "number", "default": 0.5}
            },
            "required": ["x", "y"]
        })),
    );

    let result = agent.run("hello", ()).await?;
    let tools = test_model
        .last_request_parameters()
        .map(|p| p.function_tools)
        .unwrap_or_default();

    Ok(vec![result.output, format!("{:?}", tools)])
}

#[derive(Deserialize)]
struct SquareArgs {
    square: i64,
}

async fn roulette_wheel(ctx: RunContext<i64>, args: Value) -> ToolResult {
    let args: SquareArgs = parse_args(args)?;
    Ok(if args.square == *ctx.deps { "winner" } else { "loser" }.to_string())
}

/// A boolean output decided with the help of a deps-aware tool.
pub async fn roulette(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let success_number = 18;
    let agent: Agent<i64, bool> = Agent::new(model)
        .with_system_prompt(
            "Use the 'roulette_wheel' function to see if the customer has won based on the number they provide",
        )
        .with_tool(
            Tool::new("roulette_wheel", "Check if the square is a winner", roulette_wheel)
                .with_parameters(json!({
                    "type": "object",
                    "properties": {"square": {"type": "integer"}},
                    "required": ["square"]
                })),
        );

    let first = agent
        .run("Put my money on square eighteen", success_number)
        .await?;
    let second = agent.run("I bet five is the winner", success_number).await?;
    Ok(vec![first.output.to_string(), second.output.to_string()])
}

/// Stand-in for a customer database.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConn;

impl DatabaseConn {
    pub async fn customer_name(&self, id: i64) -> Option<String> {
        (id == 123).then(|| "Abdul".to_string())
    }

    pub async fn customer_balance(&self, id: i64, _include_pending: bool) -> Result<f64> {
        if id == 123 {
            Ok(123.45)
        } else {
            Err(CookbookError::InvalidInput("Customer not found".to_string()))
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupportDependencies {
    pub customer_id: i64,
    pub db: DatabaseConn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportOutput {
    pub support_advice: String,
    pub block_card: bool,
    pub risk: i64,
}

impl StructuredOutput for SupportOutput {
    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "support_advice": {"type": "string", "description": "Advice returned to the customer"},
                "block_card": {"type": "boolean", "description": "Whether to block the customer's card"},
                "risk": {"type": "integer", "description": "Risk level of query", "minimum": 0, "maximum": 10}
            },
            "required": ["support_advice", "block_card", "risk"]
        })
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if !(0..=10).contains(&self.risk) {
            return Err(format!("risk must be between 0 and 10, got {}", self.risk));
        }
        Ok(())
    }
}

async fn add_customer_name(ctx: RunContext<SupportDependencies>) -> String {
    match ctx.deps.db.customer_name(ctx.deps.customer_id).await {
        Some(name) => format!("The customer's name is {}", name),
        None => "The customer's name is unknown".to_string(),
    }
}

#[derive(Deserialize)]
struct BalanceArgs {
    include_pending: bool,
}

async fn customer_balance(
    ctx: RunContext<SupportDependencies>,
    args: Value,
) -> ToolResult {
    let args: BalanceArgs = parse_args(args)?;
    let balance = ctx
        .deps
        .db
        .customer_balance(ctx.deps.customer_id, args.include_pending)
        .await?;
    Ok(format!("Kshs {:.2}", balance))
}

/// Bank support agent: deps, a dynamic system prompt, a tool and validated output.
pub async fn bank_support(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<SupportDependencies, SupportOutput> = Agent::new(model)
        .with_system_prompt(
            "You are a support agent in our bank, give the customer support and judge the risk level of their query",
        )
        .with_dynamic_system_prompt(add_customer_name)
        .with_tool(
            Tool::new(
                "customer_balance",
                "Returns the customer's current account balance",
                customer_balance,
            )
            .with_parameters(json!({
                "type": "object",
                "properties": {"include_pending": {"type": "boolean"}},
                "required": ["include_pending"]
            })),
        );

    let deps = SupportDependencies {
        customer_id: 123,
        db: DatabaseConn,
    };

    let mut lines = Vec::new();
    for prompt in [
        "What is my balance?",
        "I just lost my card",
        "I want to block my card",
    ] {
        let result = agent.run(prompt, deps.clone()).await?;
        lines.push(format!("{:?}", result.output));
    }
    Ok(lines)
}
