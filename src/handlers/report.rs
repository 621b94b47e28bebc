//! Report handler
//!
//! Renders a report artifact over a query result. When an earlier
//! relational pass already produced a query, that query is reused; when the
//! request was routed here without one, a fresh query is generated first.
//! Completion is signalled by the renderer's status string, not a data
//! payload.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RoleParams;
use crate::connectors::ReportRenderer;
use crate::error::OrchestratorResult;
use crate::handlers::relational::sql_instructions;
use crate::handlers::Handler;
use crate::llm::provider::TextGenerator;
use crate::retry::{with_retries, RetryBudget};
use crate::state::{error_payload, Domain, RequestState, StateUpdate};
use crate::tools::{self, QueryGenerationTool, RenderReportTool, ToolError};

/// Handler for the report domain
pub struct ReportHandler {
    sql_generator: QueryGenerationTool,
    render: RenderReportTool,
    chart_type: String,
}

impl ReportHandler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        renderer: Arc<dyn ReportRenderer>,
        generation: RoleParams,
        schema_context: &str,
        chart_type: impl Into<String>,
    ) -> Self {
        let mut sql_generator = QueryGenerationTool::new(
            "generate_report_query",
            "Translate a report request into a SQL query",
            generator,
            sql_instructions(schema_context),
            generation.model,
        );
        if let Some(temperature) = generation.temperature {
            sql_generator = sql_generator.with_temperature(temperature);
        }
        if let Some(max_tokens) = generation.max_tokens {
            sql_generator = sql_generator.with_max_tokens(max_tokens);
        }

        Self {
            sql_generator,
            render: RenderReportTool::new(renderer),
            chart_type: chart_type.into(),
        }
    }

    async fn generate_sql(&self, user_input: &str) -> Result<String, ToolError> {
        let generated = tools::invoke(&self.sql_generator, &json!({"user_input": user_input}))
            .await?;

        Ok(generated
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

#[async_trait]
impl Handler for ReportHandler {
    fn domain(&self) -> Domain {
        Domain::Report
    }

    async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let mut budget = RetryBudget::new(state.retry_count, state.max_retries);

        // Reuse the query from an earlier relational pass when present
        let (query, freshly_generated) = match &state.generated_query {
            Some(query) => (query.clone(), false),
            None => {
                match with_retries(&mut budget, || self.generate_sql(&state.user_input)).await {
                    Ok(query) => (query, true),
                    Err(error) => {
                        warn!(error = %error, "Report query generation failed");
                        return Ok(StateUpdate::for_step(
                            "report",
                            &state.user_input,
                            "report query generation failed",
                        )
                        .with_domain_response(Domain::Report, error_payload(&error.to_string()))
                        .with_retry_count(budget.used));
                    }
                }
            }
        };

        let parameters = json!({"query": query, "chart_type": self.chart_type});

        let mut update = match tools::invoke(&self.render, &parameters).await {
            Ok(status) => {
                info!(chart_type = %self.chart_type, "Report rendered");
                StateUpdate::for_step("report", &query, "report artifact rendered")
                    .with_domain_response(Domain::Report, status)
            }
            Err(error) => {
                warn!(error = %error, "Report rendering failed");
                StateUpdate::for_step("report", &query, "report rendering failed")
                    .with_domain_response(Domain::Report, error_payload(&error.to_string()))
            }
        };

        if freshly_generated {
            update = update.with_generated_query(query);
        }

        Ok(update.with_retry_count(budget.used))
    }
}
