//! Query generation tool
//!
//! Wraps the text-generation oracle as a tool so that payload and SQL
//! generation sit behind the same invocation contract (schema validation,
//! uniform errors, bounded retries) as every other external capability.
//! One instance per generation role: the work-order payload generator and
//! the SQL generator differ only in name, instructions, and model.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::llm::provider::{GenerationRequest, TextGenerator};
use crate::tools::{input_schema, Tool, ToolDescription, ToolError};

/// Input for a generation tool invocation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GenerateQueryInput {
    /// The user's free-text request to translate
    pub user_input: String,
}

/// Oracle-backed structured-query generator
pub struct QueryGenerationTool {
    name: String,
    description: String,
    generator: Arc<dyn TextGenerator>,
    system_instructions: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl QueryGenerationTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        generator: Arc<dyn TextGenerator>,
        system_instructions: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            generator,
            system_instructions: system_instructions.into(),
            model: model.into(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Strip markdown code fences the oracle sometimes wraps queries in
    fn strip_fences(content: &str) -> &str {
        let trimmed = content.trim();
        let Some(inner) = trimmed.strip_prefix("```") else {
            return trimmed;
        };
        let inner = inner.strip_suffix("```").unwrap_or(inner);
        // Drop a language hint on the first line, e.g. ```sql
        match inner.split_once('\n') {
            Some((first_line, rest)) if !first_line.trim().contains(' ') => rest.trim(),
            _ => inner.trim(),
        }
    }
}

#[async_trait]
impl Tool for QueryGenerationTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: input_schema::<GenerateQueryInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: GenerateQueryInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        let mut request =
            GenerationRequest::new(&self.model, &self.system_instructions, &input.user_input);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let response = self
            .generator
            .generate(request)
            .await
            .map_err(|e| ToolError::Execution(format!("Query generation failed: {e}")))?;

        let query = Self::strip_fences(&response.content).to_string();
        if query.is_empty() {
            return Err(ToolError::Execution(
                "Query generation returned empty output".to_string(),
            ));
        }

        debug!(tool = %self.name, query = %query, "Generated query");
        Ok(json!({"query": query}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockTextGenerator;
    use crate::tools::invoke;

    fn sql_tool(generator: Arc<dyn TextGenerator>) -> QueryGenerationTool {
        QueryGenerationTool::new(
            "generate_sql_query",
            "Translate a question into SQL",
            generator,
            "You translate questions into SQL.",
            "mock-model",
        )
    }

    #[tokio::test]
    async fn test_generates_query() {
        let generator = Arc::new(MockTextGenerator::single_response(
            "SELECT COUNT(*) FROM jira_data",
        ));
        let tool = sql_tool(generator);

        let result = invoke(&tool, &json!({"user_input": "how many records?"}))
            .await
            .unwrap();

        assert_eq!(result["query"], "SELECT COUNT(*) FROM jira_data");
    }

    #[tokio::test]
    async fn test_strips_code_fences() {
        let generator = Arc::new(MockTextGenerator::single_response(
            "```sql\nSELECT 1\n```",
        ));
        let tool = sql_tool(generator);

        let result = invoke(&tool, &json!({"user_input": "anything"}))
            .await
            .unwrap();

        assert_eq!(result["query"], "SELECT 1");
    }

    #[tokio::test]
    async fn test_empty_output_is_execution_error() {
        let generator = Arc::new(MockTextGenerator::single_response("   "));
        let tool = sql_tool(generator);

        let result = invoke(&tool, &json!({"user_input": "anything"})).await;
        assert!(matches!(result, Err(ToolError::Execution(_))));
    }

    #[tokio::test]
    async fn test_oracle_failure_is_execution_error() {
        let generator = Arc::new(MockTextGenerator::with_failure());
        let tool = sql_tool(generator);

        let result = invoke(&tool, &json!({"user_input": "anything"})).await;
        assert!(matches!(result, Err(ToolError::Execution(_))));
    }

    #[tokio::test]
    async fn test_missing_user_input_fails_schema_validation() {
        let generator = Arc::new(MockTextGenerator::single_response("SELECT 1"));
        let tool = sql_tool(generator);

        let result = invoke(&tool, &json!({})).await;
        assert!(matches!(result, Err(ToolError::SchemaValidation(_))));
    }

    #[test]
    fn test_strip_fences_passthrough() {
        assert_eq!(QueryGenerationTool::strip_fences("SELECT 1"), "SELECT 1");
        assert_eq!(
            QueryGenerationTool::strip_fences("```\nSELECT 1\n```"),
            "SELECT 1"
        );
    }
}
