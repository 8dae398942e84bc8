//! Demo command implementation.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::demos::{self, DEMOS};
use crate::model::infer_model;
use anyhow::Result;
use std::path::PathBuf;

/// Run the demo command.
pub async fn run_demo(
    name: Option<String>,
    model: Option<String>,
    list: bool,
    pdf: Option<PathBuf>,
    settings: Settings,
) -> Result<()> {
    let name = match name {
        Some(name) if !list => name,
        _ => {
            Output::header("Demos");
            for demo in DEMOS {
                Output::list_item(&format!("{:<24} {}", demo.name, demo.description));
            }
            return Ok(());
        }
    };

    let Some(demo) = demos::find(&name) else {
        anyhow::bail!(
            "Unknown demo '{}'. Run `cookbook demo --list` to see all demos",
            name
        );
    };

    let model_name = model_for(demo, model, &settings);
    preflight::check_models(&[&model_name])?;
    let model = infer_model(&model_name)?;

    Output::info(&format!("Running {} with {}", demo.name, model.name()));
    for line in demos::run(demo.name, model, pdf.as_deref()).await? {
        println!("{}", line);
    }

    Ok(())
}

/// Offline demos ignore the configured model and never need an API key.
fn model_for(demo: &demos::Demo, requested: Option<String>, settings: &Settings) -> String {
    if !demo.needs_model {
        return "test".to_string();
    }
    requested.unwrap_or_else(|| settings.models.default.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_demo_uses_test_model() {
        let settings = Settings::default();
        let offline = demos::find("tool-only-if-42").unwrap();
        assert_eq!(model_for(offline, None, &settings), "test");
        assert_eq!(
            model_for(offline, Some("openai:gpt-4o".to_string()), &settings),
            "test"
        );

        let online = demos::find("dice-game").unwrap();
        assert_eq!(model_for(online, None, &settings), settings.models.default);
        assert_eq!(
            model_for(online, Some("test".to_string()), &settings),
            "test"
        );
    }

    #[tokio::test]
    async fn test_offline_demo_runs_with_default_settings() {
        run_demo(
            Some("tool-only-if-42".to_string()),
            None,
            false,
            None,
            Settings::default(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_demo_fails_before_preflight() {
        let err = run_demo(Some("sql-gen".to_string()), None, false, None, Settings::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown demo"));
    }
}
