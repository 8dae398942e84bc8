//! Runnable agent demos.
//!
//! Each demo builds one or more agents, runs them and returns the lines it
//! would print. Demos that exist to show the offline test models pick their
//! own model; the rest run against the model they are given.

mod basics;
mod output;
mod streaming;
mod tools;

pub use basics::User;
pub use output::{BoxDimensions, BoxOrMessage, ColorsOrSizes};
pub use streaming::{UserProfile, WeatherService};
pub use tools::{DatabaseConn, Greetee, SupportDependencies, SupportOutput};

use crate::error::{CookbookError, Result};
use crate::model::ChatModel;
use std::path::Path;
use std::sync::Arc;

/// Default PDF read by the `local-file` demo.
pub const DEFAULT_PDF: &str = "cre.pdf";

/// A runnable demo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    /// False for demos that always run on an offline test model.
    pub needs_model: bool,
}

/// Every demo with a one-line description.
pub const DEMOS: &[Demo] = &[
    Demo {
        name: "agent-run",
        description: "Plain and streamed runs of a bare agent",
        needs_model: true,
    },
    Demo {
        name: "agent-iter",
        description: "List the steps of a run",
        needs_model: true,
    },
    Demo {
        name: "conversation",
        description: "Continue a conversation from earlier messages",
        needs_model: true,
    },
    Demo {
        name: "model-settings",
        description: "Per-run model settings and refusals",
        needs_model: true,
    },
    Demo {
        name: "weather-stream",
        description: "Stream a tool-using run node by node",
        needs_model: true,
    },
    Demo {
        name: "user-name",
        description: "Typed deps and boolean output with the test model",
        needs_model: false,
    },
    Demo {
        name: "bank-support",
        description: "Support agent with deps, tools and validated output",
        needs_model: true,
    },
    Demo {
        name: "roulette",
        description: "Boolean output decided by a deps-aware tool",
        needs_model: true,
    },
    Demo {
        name: "box-or-error",
        description: "Union output: box dimensions or a message",
        needs_model: true,
    },
    Demo {
        name: "colors-or-sizes",
        description: "Union of two list outputs",
        needs_model: true,
    },
    Demo {
        name: "streamed-hello-world",
        description: "Stream text deltas",
        needs_model: true,
    },
    Demo {
        name: "streamed-user-profile",
        description: "Stream a partially complete structured output",
        needs_model: true,
    },
    Demo {
        name: "dice-game",
        description: "Dice game with plain and deps-aware tools",
        needs_model: true,
    },
    Demo {
        name: "dice-game-players",
        description: "One dice agent, two players",
        needs_model: true,
    },
    Demo {
        name: "tool-output",
        description: "Tools returning times, objects and URLs",
        needs_model: true,
    },
    Demo {
        name: "tool-only-if-42",
        description: "Tool offered only when deps equal 42",
        needs_model: false,
    },
    Demo {
        name: "tool-schema",
        description: "Inspect the schema a tool sends to the model",
        needs_model: false,
    },
    Demo {
        name: "customize-name",
        description: "Rewrite a tool's schema per run",
        needs_model: false,
    },
    Demo {
        name: "single-parameter-tool",
        description: "Tool taking a single object parameter",
        needs_model: false,
    },
    Demo {
        name: "local-file",
        description: "Extract typed questions from a local PDF",
        needs_model: true,
    },
    Demo {
        name: "chat-history",
        description: "Print a run's messages and their JSON",
        needs_model: true,
    },
];

/// Look up a demo by name.
pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|demo| demo.name == name)
}

/// Run a demo by name.
pub async fn run(name: &str, model: Arc<dyn ChatModel>, pdf: Option<&Path>) -> Result<Vec<String>> {
    match name {
        "agent-run" => basics::agent_run(model).await,
        "agent-iter" => basics::agent_iter(model).await,
        "conversation" => basics::conversation(model).await,
        "model-settings" => basics::model_settings(model).await,
        "user-name" => basics::user_name(model).await,
        "chat-history" => basics::chat_history(model).await,
        "weather-stream" => streaming::weather_stream(model).await,
        "streamed-hello-world" => streaming::streamed_hello_world(model).await,
        "streamed-user-profile" => streaming::streamed_user_profile(model).await,
        "bank-support" => tools::bank_support(model).await,
        "roulette" => tools::roulette(model).await,
        "dice-game" => tools::dice_game(model).await,
        "dice-game-players" => tools::dice_game_players(model).await,
        "tool-output" => tools::tool_output(model).await,
        "tool-only-if-42" => tools::tool_only_if_42(model).await,
        "tool-schema" => tools::tool_schema(model).await,
        "customize-name" => tools::customize_name(model).await,
        "single-parameter-tool" => tools::single_parameter_tool(model).await,
        "box-or-error" => output::box_or_error(model).await,
        "colors-or-sizes" => output::colors_or_sizes(model).await,
        "local-file" => {
            let path = pdf.unwrap_or_else(|| Path::new(DEFAULT_PDF));
            output::local_file(model, path).await
        }
        other => Err(CookbookError::InvalidInput(format!(
            "Unknown demo '{}'. Run `cookbook demo --list` to see all demos",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestModel;

    #[tokio::test]
    async fn test_every_listed_demo_runs_offline() {
        for demo in DEMOS {
            let name = demo.name;
            if name == "local-file" {
                continue;
            }
            let lines = run(name, Arc::new(TestModel::new()), None)
                .await
                .unwrap_or_else(|e| panic!("demo {} failed: {}", name, e));
            assert!(!lines.is_empty(), "demo {} printed nothing", name);
        }
    }

    #[test]
    fn test_find_marks_offline_demos() {
        assert!(!find("tool-only-if-42").unwrap().needs_model);
        assert!(!find("user-name").unwrap().needs_model);
        assert!(find("weather-stream").unwrap().needs_model);
        assert!(find("sql-gen").is_none());
        assert_eq!(DEMOS.len(), 21);
    }

    #[tokio::test]
    async fn test_unknown_demo() {
        let err = run("sql-gen", Arc::new(TestModel::new()), None).await.unwrap_err();
        assert!(matches!(err, CookbookError::InvalidInput(_)));
    }
}
