//! Report rendering tool

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::connectors::ReportRenderer;
use crate::tools::{input_schema, Tool, ToolDescription, ToolError};

/// Input for a report render invocation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportInput {
    /// The query whose result set the report is rendered over
    pub query: String,
    /// Chart type: bar, pie, or line
    pub chart_type: String,
}

/// Renders a report artifact and returns the renderer's status string
pub struct RenderReportTool {
    renderer: Arc<dyn ReportRenderer>,
}

impl RenderReportTool {
    pub fn new(renderer: Arc<dyn ReportRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Tool for RenderReportTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "generate_report".to_string(),
            description: "Render a report artifact for a query result".to_string(),
            parameters: input_schema::<ReportInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: ReportInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        let status = self
            .renderer
            .render(&input.query, &input.chart_type)
            .await?;

        Ok(json!({"status": status}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockReportRenderer;
    use crate::tools::invoke;

    #[tokio::test]
    async fn test_render_returns_status() {
        let renderer = Arc::new(MockReportRenderer::new());
        let tool = RenderReportTool::new(renderer);

        let result = invoke(
            &tool,
            &json!({"query": "SELECT severity, COUNT(*) FROM jira_data GROUP BY severity", "chart_type": "bar"}),
        )
        .await
        .unwrap();

        assert_eq!(result["status"], "Report Generated");
    }

    #[tokio::test]
    async fn test_render_failure_is_execution_error() {
        let renderer = Arc::new(MockReportRenderer::with_failure());
        let tool = RenderReportTool::new(renderer);

        let result = invoke(&tool, &json!({"query": "SELECT 1", "chart_type": "bar"})).await;
        assert!(matches!(result, Err(ToolError::Execution(_))));
    }

    #[tokio::test]
    async fn test_missing_chart_type_fails_schema_validation() {
        let renderer = Arc::new(MockReportRenderer::new());
        let tool = RenderReportTool::new(renderer);

        let result = invoke(&tool, &json!({"query": "SELECT 1"})).await;
        assert!(matches!(result, Err(ToolError::SchemaValidation(_))));
    }
}
