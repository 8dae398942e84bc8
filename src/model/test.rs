//! Offline model that exercises tools and output schemas without a provider.
//!
//! On the first turn it calls every offered tool once, with arguments
//! synthesized from the tool's JSON schema. Once tool returns are in the
//! history it produces the final answer: a value synthesized from the output
//! schema, or for plain text the JSON map of tool returns.

use super::{ChatModel, ModelMessage, ModelRequestParameters, ModelResponse, ResponsePart};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Mutex;

/// Deterministic model for tests and offline demos.
#[derive(Debug, Default)]
pub struct TestModel {
    custom_output_text: Option<String>,
    custom_output_args: Option<Value>,
    call_tools: bool,
    last_params: Mutex<Option<ModelRequestParameters>>,
}

impl TestModel {
    pub fn new() -> Self {
        Self {
            call_tools: true,
            ..Self::default()
        }
    }

    /// Answer plain-text runs with this text.
    pub fn with_output_text(mut self, text: &str) -> Self {
        self.custom_output_text = Some(text.to_string());
        self
    }

    /// Answer structured runs with this value.
    pub fn with_output_args(mut self, args: Value) -> Self {
        self.custom_output_args = Some(args);
        self
    }

    /// Skip calling tools and answer straight away.
    pub fn without_tool_calls(mut self) -> Self {
        self.call_tools = false;
        self
    }

    /// Parameters of the most recent request.
    pub fn last_request_parameters(&self) -> Option<ModelRequestParameters> {
        self.last_params.lock().ok().and_then(|p| p.clone())
    }

    fn final_response(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<ResponsePart> {
        if let Some(output) = &params.output_schema {
            let value = match &self.custom_output_args {
                Some(args) => args.clone(),
                None => synthesize_value(&output.schema),
            };
            return Ok(ResponsePart::text(serde_json::to_string(&value)?));
        }

        if let Some(text) = &self.custom_output_text {
            return Ok(ResponsePart::text(text.clone()));
        }

        let returns = messages
            .last()
            .map(|m| m.tool_returns())
            .unwrap_or_default();

        if returns.is_empty() {
            return Ok(ResponsePart::text("success (no tool calls)"));
        }

        let mut map = Map::new();
        for (name, content) in returns {
            let value = serde_json::from_str(content).unwrap_or_else(|_| json!(content));
            map.insert(name.to_string(), value);
        }
        Ok(ResponsePart::text(serde_json::to_string(&Value::Object(map))?))
    }
}

#[async_trait]
impl ChatModel for TestModel {
    fn name(&self) -> &str {
        "test"
    }

    async fn request(
        &self,
        messages: &[ModelMessage],
        params: &ModelRequestParameters,
    ) -> Result<ModelResponse> {
        if let Ok(mut last) = self.last_params.lock() {
            *last = Some(params.clone());
        }

        let tools_already_called = messages.iter().any(|m| m.has_tool_returns());

        let parts = if self.call_tools && !tools_already_called && !params.function_tools.is_empty()
        {
            params
                .function_tools
                .iter()
                .map(|tool| -> Result<ResponsePart> {
                    let args = synthesize_value(&tool.parameters_json_schema);
                    Ok(ResponsePart::tool_call(
                        tool.name.clone(),
                        serde_json::to_string(&args)?,
                        format!("test_call_{}", tool.name),
                    ))
                })
                .collect::<Result<Vec<_>>>()?
        } else {
            vec![self.final_response(messages, params)?]
        };

        Ok(ModelResponse::new(parts, "test"))
    }
}

/// Produce a minimal value that satisfies a JSON schema.
pub fn synthesize_value(schema: &Value) -> Value {
    if let Some(value) = schema.get("const") {
        return value.clone();
    }
    if let Some(first) = schema.get("enum").and_then(|e| e.as_array()).and_then(|e| e.first()) {
        return first.clone();
    }
    for key in ["anyOf", "oneOf"] {
        if let Some(first) = schema.get(key).and_then(|v| v.as_array()).and_then(|v| v.first()) {
            return synthesize_value(first);
        }
    }
    if let Some(default) = schema.get("default") {
        return default.clone();
    }

    let ty = match schema.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .find(|t| *t != "null")
            .unwrap_or("null"),
        _ if schema.get("properties").is_some() => "object",
        _ => "null",
    };

    match ty {
        "object" => {
            let mut map = Map::new();
            if let Some(properties) = schema.get("properties").and_then(|p| p.as_object()) {
                let required: Vec<&str> = schema
                    .get("required")
                    .and_then(|r| r.as_array())
                    .map(|r| r.iter().filter_map(|v| v.as_str()).collect())
                    .unwrap_or_else(|| properties.keys().map(|k| k.as_str()).collect());

                for (name, property) in properties {
                    if required.contains(&name.as_str()) {
                        map.insert(name.clone(), synthesize_value(property));
                    }
                }
            }
            Value::Object(map)
        }
        "array" => match schema.get("items") {
            Some(items) => json!([synthesize_value(items)]),
            None => json!([]),
        },
        "string" => match schema.get("format").and_then(|f| f.as_str()) {
            Some("date") => json!("2024-01-01"),
            Some("date-time") => json!("2024-01-01T00:00:00Z"),
            _ => json!("a"),
        },
        "integer" => json!(schema.get("minimum").and_then(|m| m.as_i64()).unwrap_or(0)),
        "number" => json!(schema.get("minimum").and_then(|m| m.as_f64()).unwrap_or(0.0)),
        "boolean" => json!(false),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutputSchema, RequestPart, ToolDefinition};

    fn roll_die_tool() -> ToolDefinition {
        ToolDefinition {
            name: "roll_die".to_string(),
            description: "Roll a six-sided die and return the result".to_string(),
            parameters_json_schema: json!({"type": "object", "properties": {}}),
        }
    }

    #[test]
    fn test_synthesize_object() {
        let schema = json!({
            "type": "object",
            "properties": {
                "x": {"type": "integer"},
                "y": {"type": "string"},
                "z": {"type": "number", "default": 2.5}
            },
            "required": ["x", "y"]
        });
        assert_eq!(synthesize_value(&schema), json!({"x": 0, "y": "a"}));
    }

    #[test]
    fn test_synthesize_nested_and_union() {
        let schema = json!({
            "type": "object",
            "properties": {
                "response": {"anyOf": [
                    {"type": "array", "items": {"type": "string"}},
                    {"type": "array", "items": {"type": "integer"}}
                ]},
                "dob": {"type": "string", "format": "date"},
                "risk": {"type": "integer", "minimum": 0, "maximum": 10},
                "label": {"type": ["string", "null"]}
            }
        });
        assert_eq!(
            synthesize_value(&schema),
            json!({"response": ["a"], "dob": "2024-01-01", "risk": 0, "label": "a"})
        );
    }

    #[tokio::test]
    async fn test_calls_all_tools_then_reports_returns() {
        let model = TestModel::new();
        let params = ModelRequestParameters {
            function_tools: vec![roll_die_tool()],
            ..Default::default()
        };

        let first = model
            .request(&[ModelMessage::request(vec![RequestPart::user("My guess is 4")])], &params)
            .await
            .unwrap();
        assert_eq!(first.tool_calls().len(), 1);

        let history = vec![
            ModelMessage::request(vec![RequestPart::user("My guess is 4")]),
            first.into_message(),
            ModelMessage::request(vec![RequestPart::tool_return("roll_die", "test_call_roll_die", "4")]),
        ];
        let second = model.request(&history, &params).await.unwrap();
        assert_eq!(second.text().as_deref(), Some(r#"{"roll_die":4}"#));

        let recorded = model.last_request_parameters().unwrap();
        assert_eq!(recorded.function_tools[0].name, "roll_die");
    }

    #[tokio::test]
    async fn test_no_tools_plain_text() {
        let model = TestModel::new();
        let response = model
            .request(
                &[ModelMessage::request(vec![RequestPart::user("hello")])],
                &ModelRequestParameters::default(),
            )
            .await
            .unwrap();
        assert_eq!(response.text().as_deref(), Some("success (no tool calls)"));
    }

    #[tokio::test]
    async fn test_structured_output_from_schema() {
        let model = TestModel::new().without_tool_calls();
        let params = ModelRequestParameters {
            function_tools: vec![roll_die_tool()],
            output_schema: Some(OutputSchema {
                name: "final_result".to_string(),
                description: None,
                schema: json!({
                    "type": "object",
                    "properties": {"response": {"type": "boolean"}},
                    "required": ["response"]
                }),
            }),
            ..Default::default()
        };

        let response = model
            .request(&[ModelMessage::request(vec![RequestPart::user("bet")])], &params)
            .await
            .unwrap();
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.text().as_deref(), Some(r#"{"response":false}"#));
    }
}
