//! Configuration settings for the cookbook.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub models: ModelSettingsConfig,
    pub embedding: EmbeddingSettings,
    pub vector_store: VectorStoreSettings,
    pub database: DatabaseSettings,
    pub exam: ExamSettings,
    pub agent: AgentSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.agent-cookbook".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Which models each recipe talks to.
///
/// Names take the form `provider:model` (`openai:gpt-4o`, `google-gla:gemini-1.5-flash`),
/// a bare model name (OpenAI), or `test` for the offline model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettingsConfig {
    /// Model used by the general demos.
    pub default: String,
    /// Model that reads exam papers.
    pub extraction: String,
    /// Model that refines retrieved questions.
    pub retrieval: String,
}

impl Default for ModelSettingsConfig {
    fn default() -> Self {
        Self {
            default: "openai:gpt-4.1-mini".to_string(),
            extraction: "openai:gpt-4o".to_string(),
            retrieval: "openai:gpt-4o".to_string(),
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Vector store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreSettings {
    /// Vector store provider (sqlite, memory).
    pub provider: String,
    /// Path to SQLite database (for sqlite provider).
    pub sqlite_path: String,
    /// Collection holding question embeddings.
    pub collection: String,
    /// Similarity metric (ip, cosine).
    pub metric: String,
    /// Number of hits returned by a search.
    pub search_limit: usize,
}

impl Default for VectorStoreSettings {
    fn default() -> Self {
        Self {
            provider: "sqlite".to_string(),
            sqlite_path: "~/.agent-cookbook/vectors.db".to_string(),
            collection: "my_rag_collection".to_string(),
            metric: "ip".to_string(),
            search_limit: 5,
        }
    }
}

/// Relational question database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Path to the SQLite exam database.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "~/.agent-cookbook/exam.db".to_string(),
        }
    }
}

/// Labels attached to every extracted question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamSettings {
    pub exam_name: String,
    pub subject: String,
    pub year: String,
}

impl Default for ExamSettings {
    fn default() -> Self {
        Self {
            exam_name: "KCSE".to_string(),
            subject: "CRE".to_string(),
            year: "2024".to_string(),
        }
    }
}

/// Agent loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum model requests per run.
    pub max_iterations: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            timeout_seconds: 300,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::CookbookError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("agent-cookbook")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded vector store path.
    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.vector_store.sqlite_path)
    }

    /// Get the expanded exam database path.
    pub fn database_path(&self) -> PathBuf {
        Self::expand_path(&self.database.path)
    }
}
