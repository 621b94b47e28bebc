//! Work-order handler
//!
//! Two-phase capability: generate a structured request payload from the
//! user's text, then execute it against the work-order system. The payload
//! must be non-empty and parse into a known operation before execution is
//! attempted; a payload that never parses within the retry budget resolves
//! to an error response without touching the downstream system.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RoleParams;
use crate::connectors::WorkOrderSystem;
use crate::error::OrchestratorResult;
use crate::handlers::Handler;
use crate::llm::provider::TextGenerator;
use crate::retry::{with_retries, RetryBudget};
use crate::state::{error_payload, Domain, RequestState, StateUpdate};
use crate::tools::workorder::WorkOrderRequestInput;
use crate::tools::{self, QueryGenerationTool, ToolError, WorkOrderRequestTool};

const PAYLOAD_GENERATOR_INSTRUCTIONS: &str = "\
You translate requests about work orders into a JSON request payload for the \
work-order system. Respond with a single JSON object and nothing else:

{\"operation\": \"get\" | \"post\", \"params\": { ... }}

For retrieval, params carry OSLC selectors: \"oslc.where\" with the filter \
(e.g. \"wonum=5012\") and \"oslc.select\" with the comma-separated fields to \
return. Field names include wonum, description, status, wopriority, siteid, \
createdate, createdby, workorderid. Map the user's words onto these fields: \
\"priority\" is wopriority, \"work order number\" is wonum.

For creation, params carry the field values of the new work order.";

/// Handler for the work-order domain
pub struct WorkOrderHandler {
    payload_generator: QueryGenerationTool,
    request: WorkOrderRequestTool,
}

impl WorkOrderHandler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        system: Arc<dyn WorkOrderSystem>,
        generation: RoleParams,
    ) -> Self {
        let mut payload_generator = QueryGenerationTool::new(
            "generate_workorder_payload",
            "Translate a work-order request into a structured payload",
            generator,
            PAYLOAD_GENERATOR_INSTRUCTIONS,
            generation.model,
        );
        if let Some(temperature) = generation.temperature {
            payload_generator = payload_generator.with_temperature(temperature);
        }
        if let Some(max_tokens) = generation.max_tokens {
            payload_generator = payload_generator.with_max_tokens(max_tokens);
        }

        Self {
            payload_generator,
            request: WorkOrderRequestTool::new(system),
        }
    }

    /// Phase one: generate a payload and gate on it parsing
    async fn generate_payload(&self, user_input: &str) -> Result<(String, Value), ToolError> {
        let generated = tools::invoke(
            &self.payload_generator,
            &json!({"user_input": user_input}),
        )
        .await?;

        let payload_text = generated
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let parsed: WorkOrderRequestInput =
            serde_json::from_str(&payload_text).map_err(|e| {
                ToolError::Execution(format!("Generated payload is not a valid request: {e}"))
            })?;

        let request_value =
            serde_json::to_value(parsed).map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok((payload_text, request_value))
    }
}

#[async_trait]
impl Handler for WorkOrderHandler {
    fn domain(&self) -> Domain {
        Domain::WorkOrder
    }

    async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let mut budget = RetryBudget::new(state.retry_count, state.max_retries);

        let generated =
            with_retries(&mut budget, || self.generate_payload(&state.user_input)).await;

        let (payload_text, request_value) = match generated {
            Ok(generated) => generated,
            Err(error) => {
                warn!(error = %error, "Work-order payload generation failed");
                return Ok(StateUpdate::for_step(
                    "work_order",
                    &state.user_input,
                    "payload generation failed",
                )
                .with_domain_response(Domain::WorkOrder, error_payload(&error.to_string()))
                .with_retry_count(budget.used));
            }
        };

        let executed =
            with_retries(&mut budget, || tools::invoke(&self.request, &request_value)).await;

        let update = match executed {
            Ok(result) => {
                info!("Work-order operation completed");
                StateUpdate::for_step("work_order", &payload_text, "work-order response recorded")
                    .with_domain_response(Domain::WorkOrder, result)
            }
            Err(error) => {
                warn!(error = %error, "Work-order operation failed");
                StateUpdate::for_step("work_order", &payload_text, "work-order operation failed")
                    .with_domain_response(Domain::WorkOrder, error_payload(&error.to_string()))
            }
        };

        Ok(update
            .with_generated_query(payload_text.clone())
            .with_retry_count(budget.used))
    }
}
