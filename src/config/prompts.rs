//! Prompt templates for the question pipeline.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub extraction: ExtractionPrompts,
    pub retrieval: RetrievalPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for reading questions out of an exam paper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ExtractionPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert at extracting questions from documents.
Your task is to read through documents and identify any questions that are asked.
Extract both explicit questions (ending with ?) and implicit questions that are phrased as statements.

For each question:
1. Identify the question number (e.g. "1", "17")
2. Break down into parts if present (e.g. "(a)", "(b)") and ensure related parts are grouped together
3. Extract any marks allocated
4. Preserve any mathematical equations
5. Group related questions and their parts together (e.g. if question 1.a and 1.b are about the same topic or build on each other)
6. Pay special attention to questions with marks allocated and maintain their relationships
7. When parts of a question reference each other or build on previous parts, keep them grouped as a single unit

Return the questions structured according to the provided model schema."#
                .to_string(),

            user: r#"Extract questions from this document.

Document: {{file_name}}

{{document}}"#
                .to_string(),
        }
    }
}

/// Prompts for refining retrieved questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalPrompts {
    pub system: String,
}

impl Default for RetrievalPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an intelligent assistant helping to refine or relay user queries based on retrieved information. You will be given a list of relevant questions retrieved from a vector database.
Your task is:
- To decide whether the retrieved questions need to be rephrased, or modified for clarity, context, or improved relevance.
- Or, if they are already appropriate, to return them as-is without unnecessary changes.
- Respond with your best judgment: only modify if it adds value. If no modifications are necessary, just return the original questions unchanged.
- When possible, group related questions together in your response
- Highlight questions that have marks allocated

Use the 'retrieve' tool to look up questions related to the user's query."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let extraction_path = custom_path.join("extraction.toml");
            if extraction_path.exists() {
                let content = std::fs::read_to_string(&extraction_path)?;
                prompts.extraction = toml::from_str(&content)?;
            }

            let retrieval_path = custom_path.join("retrieval.toml");
            if retrieval_path.exists() {
                let content = std::fs::read_to_string(&retrieval_path)?;
                prompts.retrieval = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
