//! Structured outputs: unions, wrapped non-object schemas, documents.

use crate::agent::{Agent, StructuredOutput};
use crate::error::Result;
use crate::exam::{extract_pdf_text, Questions};
use crate::model::ChatModel;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxDimensions {
    pub width: i64,
    pub height: i64,
    pub depth: i64,
    pub unit: String,
}

/// Either the box dimensions or a message asking the user to try again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoxOrMessage {
    Box(BoxDimensions),
    Message(String),
}

impl StructuredOutput for BoxOrMessage {
    fn json_schema() -> Value {
        json!({
            "anyOf": [
                {
                    "type": "object",
                    "properties": {
                        "width": {"type": "integer"},
                        "height": {"type": "integer"},
                        "depth": {"type": "integer"},
                        "unit": {"type": "string"}
                    },
                    "required": ["width", "height", "depth", "unit"]
                },
                {"type": "string"}
            ]
        })
    }
}

pub async fn box_or_error(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<(), BoxOrMessage> = Agent::new(model).with_system_prompt(
        "Extract me the dimensions of a box, \
         if you can't extract all data, ask the user to try again.",
    );

    let mut lines = Vec::new();
    for prompt in [
        "The box is 10*20*30",
        "The box is 10*20",
        "The box is 10*20*30 cm",
    ] {
        lines.push(format!("{:?}", agent.run(prompt, ()).await?.output));
    }
    Ok(lines)
}

/// A list of colors or a list of sizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorsOrSizes {
    Colors(Vec<String>),
    Sizes(Vec<i64>),
}

impl StructuredOutput for ColorsOrSizes {
    fn json_schema() -> Value {
        json!({
            "anyOf": [
                {"type": "array", "items": {"type": "string"}},
                {"type": "array", "items": {"type": "integer"}}
            ]
        })
    }
}

pub async fn colors_or_sizes(model: Arc<dyn ChatModel>) -> Result<Vec<String>> {
    let agent: Agent<(), ColorsOrSizes> =
        Agent::new(model).with_system_prompt("Extract either colors or sizes from the shapes provided");

    let mut lines = Vec::new();
    for prompt in [
        "red square, blue circle, green triangle",
        "square size 10, circle size 20, triangle size 30",
    ] {
        lines.push(format!("{:?}", agent.run(prompt, ()).await?.output));
    }
    Ok(lines)
}

/// Extract questions from a local PDF straight into a typed output.
pub async fn local_file(model: Arc<dyn ChatModel>, path: &Path) -> Result<Vec<String>> {
    let document = extract_pdf_text(path)?;
    let agent: Agent<(), Questions> = Agent::new(model);

    let prompt = format!("Extract questions from this document?\n\n{}", document);
    let result = agent.run(&prompt, ()).await?;
    Ok(vec![format!("{:?}", result.output)])
}
