//! Argument validation against a tool's declared schema.
//!
//! Runs at the dispatch boundary, before a call reaches its provider:
//! malformed calls come back as `InvalidArgument` failures the reasoning
//! backend can correct, instead of loosely-typed data propagating deeper
//! into the system.

use super::entities::{ToolCall, ToolDefinition};
use super::value_objects::ToolError;

/// Validate a call's arguments against the tool's parameter specifications.
///
/// Checks, in order: required parameters present, no undeclared parameters,
/// declared types match. An explicit JSON `null` counts as absent for an
/// optional parameter.
pub fn validate_arguments(definition: &ToolDefinition, call: &ToolCall) -> Result<(), ToolError> {
    for param in &definition.parameters {
        match call.arguments.get(&param.name) {
            None if param.required => {
                return Err(ToolError::invalid_argument(format!(
                    "Missing required argument `{}` for tool `{}`",
                    param.name, definition.name
                )));
            }
            None => {}
            Some(serde_json::Value::Null) if !param.required => {}
            Some(value) if !param.param_type.matches(value) => {
                return Err(ToolError::invalid_argument(format!(
                    "Argument `{}` of tool `{}` expects {}, got {}",
                    param.name,
                    definition.name,
                    param.param_type,
                    json_type_name(value)
                )));
            }
            Some(_) => {}
        }
    }

    for name in call.arguments.keys() {
        if definition.parameter(name).is_none() {
            return Err(ToolError::invalid_argument(format!(
                "Unknown argument `{}` for tool `{}`",
                name, definition.name
            )));
        }
    }

    Ok(())
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
