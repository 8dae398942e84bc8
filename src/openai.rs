//! OpenAI-compatible client construction.
//!
//! Both OpenAI and Gemini (through its OpenAI-compatible endpoint) are reached
//! with the same `async-openai` client, only the base URL and key differ.

use crate::error::{CookbookError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Base URL of Gemini's OpenAI-compatible API.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Provider behind an OpenAI-compatible endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

impl Provider {
    /// Environment variable holding the API key for this provider.
    pub fn api_key_var(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
        }
    }

    fn config(&self) -> OpenAIConfig {
        match self {
            Provider::OpenAI => OpenAIConfig::default(),
            Provider::Gemini => OpenAIConfig::new()
                .with_api_base(GEMINI_API_BASE)
                .with_api_key(std::env::var(self.api_key_var()).unwrap_or_default()),
        }
    }
}

/// Create an OpenAI client with the default timeout.
pub fn create_client() -> Result<Client<OpenAIConfig>> {
    create_client_for(Provider::OpenAI, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client for the given provider with a custom timeout.
pub fn create_client_for(provider: Provider, timeout: Duration) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CookbookError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(provider.config()).with_http_client(http_client))
}

/// Create a client for the given provider with the default timeout.
pub fn create_provider_client(provider: Provider) -> Result<Client<OpenAIConfig>> {
    create_client_for(provider, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}
