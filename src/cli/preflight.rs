//! Pre-flight checks before commands that call a model provider.
//!
//! Fails early with a readable message when the provider's API key is missing,
//! instead of deep inside an agent run.

use crate::error::{CookbookError, Result};
use crate::openai::Provider;

/// Provider a model name resolves to, or `None` for the offline test model.
pub fn provider_for(model: &str) -> Option<Provider> {
    let model = model.trim();
    if model == "test" {
        return None;
    }
    match model.split_once(':') {
        Some(("google-gla", _)) | Some(("gemini", _)) => Some(Provider::Gemini),
        _ => Some(Provider::OpenAI),
    }
}

/// Check that every model in `models` can be reached.
pub fn check_models(models: &[&str]) -> Result<()> {
    for model in models {
        if let Some(provider) = provider_for(model) {
            check_api_key(provider)?;
        }
    }
    Ok(())
}

/// Check that the embedding provider can be reached.
pub fn check_embeddings() -> Result<()> {
    check_api_key(Provider::OpenAI)
}

fn check_api_key(provider: Provider) -> Result<()> {
    let var = provider.api_key_var();
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(CookbookError::Config(format!(
            "{} is empty. Set it with: export {}='...'",
            var, var
        ))),
        Err(_) => Err(CookbookError::Config(format!(
            "{} not set. Set it with: export {}='...'",
            var, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_for() {
        assert_eq!(provider_for("test"), None);
        assert_eq!(provider_for("openai:gpt-4o"), Some(Provider::OpenAI));
        assert_eq!(provider_for("gpt-4o"), Some(Provider::OpenAI));
        assert_eq!(
            provider_for("google-gla:gemini-1.5-flash"),
            Some(Provider::Gemini)
        );
    }

    #[test]
    fn test_check_test_model_has_no_requirements() {
        assert!(check_models(&["test", "test"]).is_ok());
    }
}
