//! Output types an agent run can produce.
//!
//! Plain `String` output is the model's final text. Structured output types
//! carry a JSON schema that is sent to the model and used to parse the reply.

use crate::error::{CookbookError, Result};
use crate::model::OutputSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Key used when a non-object schema is wrapped in an object.
const WRAPPER_KEY: &str = "response";

/// Anything an agent run can return.
pub trait AgentOutput: Sized + Send + 'static {
    /// Schema the model must follow, or `None` for free text.
    fn output_schema() -> Option<OutputSchema>;

    /// Build the output from the model's final text.
    fn from_model_text(text: &str) -> Result<Self>;

    /// Human readable form, used for end-of-run events.
    fn render(&self) -> String;
}

impl AgentOutput for String {
    fn output_schema() -> Option<OutputSchema> {
        None
    }

    fn from_model_text(text: &str) -> Result<Self> {
        Ok(text.to_string())
    }

    fn render(&self) -> String {
        self.clone()
    }
}

/// A typed output described by a hand-written JSON schema.
pub trait StructuredOutput: DeserializeOwned + Serialize + Send + 'static {
    fn name() -> &'static str {
        "final_result"
    }

    fn description() -> Option<&'static str> {
        None
    }

    fn json_schema() -> Value;

    /// Extra checks after deserialization.
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl<T: StructuredOutput> AgentOutput for T {
    fn output_schema() -> Option<OutputSchema> {
        let (schema, _) = wrap_schema(T::json_schema());
        Some(OutputSchema {
            name: T::name().to_string(),
            description: T::description().map(str::to_string),
            schema,
        })
    }

    fn from_model_text(text: &str) -> Result<Self> {
        let (_, wrapped) = wrap_schema(T::json_schema());
        let json = extract_json(text).ok_or_else(|| {
            CookbookError::UnexpectedModelBehavior(format!("No JSON object in response: {}", text))
        })?;

        let mut value: Value = serde_json::from_str(json).map_err(|e| {
            CookbookError::UnexpectedModelBehavior(format!("Invalid JSON in response: {}", e))
        })?;
        if wrapped {
            value = value
                .get_mut(WRAPPER_KEY)
                .map(Value::take)
                .ok_or_else(|| {
                    CookbookError::UnexpectedModelBehavior(format!(
                        "Missing '{}' key in response",
                        WRAPPER_KEY
                    ))
                })?;
        }

        let output: T = serde_json::from_value(value).map_err(|e| {
            CookbookError::UnexpectedModelBehavior(format!("Response does not match schema: {}", e))
        })?;
        output
            .validate()
            .map_err(|e| CookbookError::UnexpectedModelBehavior(format!("Validation failed: {}", e)))?;
        Ok(output)
    }

    fn render(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl StructuredOutput for bool {
    fn json_schema() -> Value {
        serde_json::json!({"type": "boolean"})
    }
}

/// Wrap schemas whose root is not an object. Returns the schema and whether it was wrapped.
pub fn wrap_schema(schema: Value) -> (Value, bool) {
    if schema.get("type").and_then(|t| t.as_str()) == Some("object") {
        return (schema, false);
    }
    let wrapped = serde_json::json!({
        "type": "object",
        "properties": { WRAPPER_KEY: schema },
        "required": [WRAPPER_KEY]
    });
    (wrapped, true)
}

/// The slice between the first `{` and the last `}`.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct CityLocation {
        city: String,
        country: String,
    }

    impl StructuredOutput for CityLocation {
        fn json_schema() -> Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "city": {"type": "string"},
                    "country": {"type": "string"}
                },
                "required": ["city", "country"]
            })
        }

        fn validate(&self) -> std::result::Result<(), String> {
            if self.city.is_empty() {
                return Err("city must not be empty".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_extract_json_strips_prose() {
        let text = "Sure! ```json\n{\"city\": \"London\", \"country\": \"UK\"}\n```";
        assert_eq!(
            extract_json(text),
            Some("{\"city\": \"London\", \"country\": \"UK\"}")
        );
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_object_schema_not_wrapped() {
        let schema = CityLocation::output_schema().unwrap();
        assert_eq!(schema.name, "final_result");
        assert!(schema.schema["properties"].get("city").is_some());

        let parsed =
            CityLocation::from_model_text(r#"{"city": "London", "country": "United Kingdom"}"#)
                .unwrap();
        assert_eq!(parsed.city, "London");
    }

    #[test]
    fn test_bool_is_wrapped() {
        let schema = bool::output_schema().unwrap();
        assert_eq!(schema.schema["properties"]["response"]["type"], "boolean");
        assert!(bool::from_model_text(r#"{"response": true}"#).unwrap());
        assert!(bool::from_model_text("true").is_err());
    }

    #[test]
    fn test_validation_failure_is_unexpected_behavior() {
        let err = CityLocation::from_model_text(r#"{"city": "", "country": "UK"}"#).unwrap_err();
        assert!(matches!(err, CookbookError::UnexpectedModelBehavior(_)));
    }

    #[test]
    fn test_string_passthrough() {
        assert!(String::output_schema().is_none());
        assert_eq!(String::from_model_text("hello").unwrap(), "hello");
    }
}
