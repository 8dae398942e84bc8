//! Configuration module.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ExtractionPrompts, Prompts, RetrievalPrompts};
pub use settings::{
    AgentSettings, DatabaseSettings, EmbeddingSettings, ExamSettings, GeneralSettings,
    ModelSettingsConfig, PromptSettings, Settings, VectorStoreSettings,
};
