//! Work-order system tool

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::connectors::WorkOrderSystem;
use crate::tools::{input_schema, Tool, ToolDescription, ToolError};

/// Operation to perform against the work-order system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkOrderOperation {
    Get,
    Post,
}

/// Input for a work-order tool invocation
///
/// This is the payload shape the generation phase must produce: an
/// operation plus OSLC-style selector parameters, e.g.
/// `{"operation": "get", "params": {"oslc.where": "wonum=5012",
/// "oslc.select": "wonum,status,description,wopriority"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkOrderRequestInput {
    pub operation: WorkOrderOperation,
    pub params: serde_json::Map<String, Value>,
}

/// Executes get/post requests against the work-order system
pub struct WorkOrderRequestTool {
    system: Arc<dyn WorkOrderSystem>,
}

impl WorkOrderRequestTool {
    pub fn new(system: Arc<dyn WorkOrderSystem>) -> Self {
        Self { system }
    }
}

#[async_trait]
impl Tool for WorkOrderRequestTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "workorder_request".to_string(),
            description: "Perform a get or post operation against the work-order system"
                .to_string(),
            parameters: input_schema::<WorkOrderRequestInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: WorkOrderRequestInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        match input.operation {
            WorkOrderOperation::Get => {
                let records = self.system.get(&input.params).await?;
                Ok(json!({"records": records}))
            }
            WorkOrderOperation::Post => {
                let record = self.system.post(&input.params).await?;
                Ok(json!({"record": record}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::mocks::MockWorkOrderSystem;
    use crate::tools::invoke;

    #[tokio::test]
    async fn test_get_returns_records() {
        let system = Arc::new(MockWorkOrderSystem::with_records(vec![json!({
            "wonum": "5012",
            "status": "INPRG",
            "description": "Replace pump seal",
            "wopriority": "1"
        })]));
        let tool = WorkOrderRequestTool::new(system);

        let result = invoke(
            &tool,
            &json!({
                "operation": "get",
                "params": {"oslc.where": "wonum=5012"}
            }),
        )
        .await
        .unwrap();

        assert_eq!(result["records"][0]["wonum"], "5012");
    }

    #[tokio::test]
    async fn test_post_returns_created_record() {
        let system = Arc::new(MockWorkOrderSystem::with_records(vec![]));
        let tool = WorkOrderRequestTool::new(system);

        let result = invoke(
            &tool,
            &json!({
                "operation": "post",
                "params": {"description": "New work order"}
            }),
        )
        .await
        .unwrap();

        assert!(result["record"].is_object());
    }

    #[tokio::test]
    async fn test_unknown_operation_fails_schema_validation() {
        let system = Arc::new(MockWorkOrderSystem::with_records(vec![]));
        let tool = WorkOrderRequestTool::new(system);

        let result = invoke(
            &tool,
            &json!({"operation": "delete", "params": {}}),
        )
        .await;

        assert!(matches!(result, Err(ToolError::SchemaValidation(_))));
    }

    #[tokio::test]
    async fn test_downstream_failure_is_execution_error() {
        let system = Arc::new(MockWorkOrderSystem::with_failure());
        let tool = WorkOrderRequestTool::new(system);

        let result = invoke(
            &tool,
            &json!({"operation": "get", "params": {}}),
        )
        .await;

        assert!(matches!(result, Err(ToolError::Execution(_))));
    }

    #[test]
    fn test_payload_parses_from_generated_text() {
        let payload = r#"{
            "operation": "get",
            "params": {
                "oslc.where": "wonum=5012",
                "oslc.select": "wonum,description,wopriority,status"
            }
        }"#;

        let input: WorkOrderRequestInput = serde_json::from_str(payload).unwrap();
        assert_eq!(input.operation, WorkOrderOperation::Get);
        assert_eq!(input.params["oslc.where"], "wonum=5012");
    }
}
