//! CLI command implementations.

mod config;
mod demo;
mod questions;

pub use config::run_config;
pub use demo::run_demo;
pub use questions::run_questions;
