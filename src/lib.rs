//! Agent Cookbook - runnable recipes for LLM agents
//!
//! A small agent framework and a set of recipes built on it.
//!
//! # Overview
//!
//! The cookbook lets you:
//! - Run agents with tools, dependencies and dynamic system prompts
//! - Ask for structured, schema-validated output
//! - Stream text, tool calls and partial structured output as it arrives
//! - Extract exam questions from PDFs, index them and retrieve them by topic
//!
//! # Architecture
//!
//! - `config` - Configuration and prompt templates
//! - `model` - Chat model abstraction (OpenAI, Gemini, offline test models)
//! - `agent` - Agent run loop, tools, structured output and events
//! - `embedding` - Embedding generation
//! - `vector_store` - Vector database abstraction
//! - `exam` - Exam question extraction and retrieval pipeline
//! - `demos` - One runnable recipe per agent feature
//!
//! # Example
//!
//! ```rust,no_run
//! use agent_cookbook::agent::Agent;
//! use agent_cookbook::model::infer_model;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let agent: Agent = Agent::new(infer_model("openai:gpt-4o")?)
//!         .with_system_prompt("Be concise, reply with one sentence.");
//!
//!     let result = agent.run("Where does \"hello world\" come from?", ()).await?;
//!     println!("{}", result.output);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod demos;
pub mod embedding;
pub mod error;
pub mod exam;
pub mod model;
pub mod openai;
pub mod vector_store;

pub use error::{CookbookError, Result};
