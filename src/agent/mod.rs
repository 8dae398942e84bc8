//! Agents: a model, prompts, tools and an output type run in a tool calling loop.
//!
//! An agent sends the conversation to its model, executes any tool calls the
//! model makes, feeds the results back and repeats until the model produces a
//! final answer that can be turned into the agent's output type.

mod output;
pub mod partial_json;
mod runner;
mod tools;

pub use output::{extract_json, wrap_schema, AgentOutput, StructuredOutput};
pub use runner::{Agent, AgentEvent, RunOptions, RunResult};
pub use tools::{parse_args, RunContext, Tool, ToolError, ToolResult};
