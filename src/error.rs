//! Error types for the cookbook.

use thiserror::Error;

/// Library-level error type for cookbook operations.
#[derive(Error, Debug)]
pub enum CookbookError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Unexpected model behavior: {0}")]
    UnexpectedModelBehavior(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Question store error: {0}")]
    QuestionStore(String),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for cookbook operations.
pub type Result<T> = std::result::Result<T, CookbookError>;
