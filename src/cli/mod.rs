//! CLI module for the cookbook.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Agent Cookbook - runnable recipes for LLM agents
///
/// Tool calling, structured output, streaming and an exam question
/// retrieval pipeline, all driven from one command line.
#[derive(Parser, Debug)]
#[command(name = "cookbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one of the agent demos
    Demo {
        /// Demo name (see --list)
        name: Option<String>,

        /// Model to use, e.g. openai:gpt-4o, google-gla:gemini-1.5-flash or test
        #[arg(short, long)]
        model: Option<String>,

        /// List available demos
        #[arg(short, long)]
        list: bool,

        /// PDF used by the local-file demo
        #[arg(long)]
        pdf: Option<PathBuf>,
    },

    /// Extract, index and retrieve exam questions
    Questions {
        #[command(subcommand)]
        action: QuestionsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum QuestionsAction {
    /// Create the exam question tables
    InitDb,

    /// Extract questions from a past paper and index them
    Extract {
        /// Path to the exam paper PDF
        #[arg(default_value = "cre.pdf")]
        pdf: PathBuf,
    },

    /// Ask the retrieval agent for questions on a topic
    Retrieve {
        /// What to look for
        #[arg(default_value = "Outline six attributes of God")]
        query: String,
    },

    /// Run a plain similarity search without the agent
    Search {
        /// Search query
        query: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_demo() {
        let cli = Cli::parse_from(["cookbook", "-vv", "demo", "dice-game", "--model", "test"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Demo { name, model, list, .. } => {
                assert_eq!(name.as_deref(), Some("dice-game"));
                assert_eq!(model.as_deref(), Some("test"));
                assert!(!list);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_questions_defaults() {
        let cli = Cli::parse_from(["cookbook", "questions", "extract"]);
        match cli.command {
            Commands::Questions {
                action: QuestionsAction::Extract { pdf },
            } => assert_eq!(pdf, PathBuf::from("cre.pdf")),
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::parse_from(["cookbook", "questions", "retrieve"]);
        match cli.command {
            Commands::Questions {
                action: QuestionsAction::Retrieve { query },
            } => assert_eq!(query, "Outline six attributes of God"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_search_requires_query() {
        assert!(Cli::try_parse_from(["cookbook", "questions", "search"]).is_err());
    }
}
