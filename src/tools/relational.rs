//! Relational store tools
//!
//! Two tools with a strict ordering contract enforced by the relational
//! handler: `validate_sql_query` must pass before `run_sql_query` is
//! invoked for the same query text.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::connectors::RelationalStore;
use crate::tools::{input_schema, Tool, ToolDescription, ToolError};

/// Input for running a query
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// The SQL query to run
    pub query: String,
    /// Optional positional parameters
    #[serde(default)]
    pub params: Option<Value>,
}

/// Input for validating query syntax
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidateQueryInput {
    pub query: String,
}

/// Runs a query against the relational store
pub struct RunQueryTool {
    store: Arc<dyn RelationalStore>,
}

impl RunQueryTool {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for RunQueryTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "run_sql_query".to_string(),
            description: "Run a validated SQL query against the relational store".to_string(),
            parameters: input_schema::<QueryInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: QueryInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        let output = self
            .store
            .run_query(&input.query, input.params.as_ref())
            .await?;

        serde_json::to_value(output).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

/// Checks query syntax without executing
pub struct ValidateQueryTool {
    store: Arc<dyn RelationalStore>,
}

impl ValidateQueryTool {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for ValidateQueryTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "validate_sql_query".to_string(),
            description: "Validate SQL query syntax without executing it".to_string(),
            parameters: input_schema::<ValidateQueryInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: ValidateQueryInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        let outcome = self.store.validate(&input.query).await?;
        serde_json::to_value(outcome).map_err(|e| ToolError::Execution(e.to_string()))
    }
}
