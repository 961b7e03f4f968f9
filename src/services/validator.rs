//! Lightweight JSON-schema validation of tool input.
//!
//! Checks the object shape, declared property types, and required fields.
//! This is intentionally not a full JSON-schema implementation; tools
//! declare simple parameter objects.

use serde_json::Value;

use crate::domain::errors::{AgentError, AgentResult};

/// Validate `args` against a declared parameter schema.
pub fn validate_input(args: &Value, schema: &Value) -> AgentResult<()> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };
    if schema.is_empty() {
        return Ok(());
    }

    if schema.get("type").and_then(Value::as_str) == Some("object") && !args.is_object() {
        return Err(AgentError::InvalidInput(format!(
            "expected object input, got {}",
            type_name(args)
        )));
    }

    let empty = serde_json::Map::new();
    let args_obj = args.as_object().unwrap_or(&empty);

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args_obj.contains_key(name) {
                return Err(AgentError::InvalidInput(format!(
                    "missing required field: {name}"
                )));
            }
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (name, declared) in properties {
            let Some(value) = args_obj.get(name) else {
                continue;
            };
            if let Some(expected) = declared.get("type").and_then(Value::as_str) {
                if !type_matches(value, expected) {
                    return Err(AgentError::InvalidInput(format!(
                        "field {name}: expected {expected}, got {}",
                        type_name(value)
                    )));
                }
            }
        }
    }

    Ok(())
}

fn type_matches(value: &Value, expected: &str) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "city": {"type": "string"},
                "days": {"type": "integer"},
                "metric": {"type": "boolean"}
            },
            "required": ["city"]
        })
    }

    #[test]
    fn test_valid_input() {
        let args = json!({"city": "Oslo", "days": 3, "metric": true});
        assert!(validate_input(&args, &schema()).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let args = json!({"days": 3});
        let err = validate_input(&args, &schema()).unwrap_err();
        assert!(err.to_string().contains("city"));
    }

    #[test]
    fn test_wrong_type() {
        let args = json!({"city": 42});
        let err = validate_input(&args, &schema()).unwrap_err();
        assert!(matches!(err, AgentError::InvalidInput(_)));
    }

    #[test]
    fn test_integer_rejects_float() {
        let args = json!({"city": "Oslo", "days": 1.5});
        assert!(validate_input(&args, &schema()).is_err());
    }

    #[test]
    fn test_extra_fields_allowed() {
        let args = json!({"city": "Oslo", "unknown": "fine"});
        assert!(validate_input(&args, &schema()).is_ok());
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        assert!(validate_input(&json!("text"), &json!({})).is_ok());
        assert!(validate_input(&json!({"a": 1}), &Value::Null).is_ok());
    }

    #[test]
    fn test_non_object_input_rejected() {
        let err = validate_input(&json!([1, 2]), &schema()).unwrap_err();
        assert!(err.to_string().contains("expected object"));
    }
}
