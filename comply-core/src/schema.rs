//! Output-schema checking for probing intentionally malformed tool results.
//!
//! The error-injection server declares an output schema and then returns
//! structured content that violates it; clients detect the mismatch rather
//! than receiving an error. Schemas are compiled as JSON Schema draft
//! 2020-12, the dialect MCP tool schemas default to.

use jsonschema::{draft202012, Validator};
use rmcp::model::JsonObject;
use serde_json::Value;

/// Compiles a tool output schema into a reusable validator.
pub fn compile_output_schema(schema: &JsonObject) -> Result<Validator, String> {
    let schema_value = Value::Object(schema.clone());
    draft202012::new(&schema_value).map_err(|error| error.to_string())
}

/// Checks structured tool output against its declared schema.
///
/// Returns the first validation error message, or `None` when the content
/// conforms.
pub fn structured_content_violation(schema: &JsonObject, content: &Value) -> Option<String> {
    let validator = match compile_output_schema(schema) {
        Ok(validator) => validator,
        Err(error) => return Some(format!("output schema failed to compile: {error}")),
    };
    let violation = validator
        .iter_errors(content)
        .next()
        .map(|error| error.to_string());
    violation
}
