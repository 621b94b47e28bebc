//! Tool invocation layer
//!
//! Every external capability the handlers use - query generation, query
//! execution, similarity search, report rendering - is a [`Tool`]:
//! structured input in, structured output or [`ToolError`] out. Input is
//! validated against the tool's declared JSON schema before invocation;
//! a mismatch is a schema validation error and the tool is never executed.
//! Downstream failures (network, 4xx/5xx, parse) are normalized into
//! `ToolError` here and never propagate as anything else past this layer.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod generate;
pub mod relational;
pub mod report;
pub mod search;
pub mod workorder;

pub use generate::QueryGenerationTool;
pub use relational::{RunQueryTool, ValidateQueryTool};
pub use report::RenderReportTool;
pub use search::SimilaritySearchTool;
pub use workorder::WorkOrderRequestTool;

/// Uniform tool contract
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name and input schema (JSON Schema)
    fn describe(&self) -> ToolDescription;

    /// Execute with parameters already validated against the schema
    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError>;
}

/// Tool name, description, and input schema
#[derive(Debug, Clone)]
pub struct ToolDescription {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Validate parameters against the tool's declared schema, then execute
///
/// This is the single entry point handlers use; calling `execute` directly
/// would bypass the schema gate.
pub async fn invoke(tool: &dyn Tool, parameters: &Value) -> Result<Value, ToolError> {
    let description = tool.describe();

    let validator = jsonschema::validator_for(&description.parameters)
        .map_err(|e| ToolError::Schema(format!("Schema compilation error: {e}")))?;

    validator.validate(parameters).map_err(|errors| {
        let error_messages: Vec<String> = errors
            .map(|e| format!("At '{}': {}", e.instance_path, e))
            .collect();
        ToolError::SchemaValidation(error_messages.join("; "))
    })?;

    tool.execute(parameters).await
}

/// Generate the JSON schema for a tool input type
pub fn input_schema<T: schemars::JsonSchema>() -> Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).expect("schema serializes")
}

/// Tool layer errors
#[derive(Debug, Error)]
pub enum ToolError {
    /// Structured input did not match the declared schema
    #[error("Parameter validation failed: {0}")]
    SchemaValidation(String),
    /// The declared schema itself could not be compiled
    #[error("Schema error: {0}")]
    Schema(String),
    #[error("Tool initialization failed: {0}")]
    Initialization(String),
    /// Any downstream failure: network, 4xx/5xx, parse
    #[error("Tool execution failed: {0}")]
    Execution(String),
}
