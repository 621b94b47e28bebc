//! Relational handler
//!
//! Three-phase capability: generate query text from the user's question and
//! the configured schema context, validate the syntax, then execute.
//! Validation is a mandatory gate: a query that fails it short-circuits to
//! an error response and execution is never attempted. The retry budget
//! covers tool failures on the generate and execute paths; a semantically
//! invalid query is not a tool failure and is not retried.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RoleParams;
use crate::connectors::{RelationalStore, ValidationOutcome};
use crate::error::OrchestratorResult;
use crate::handlers::Handler;
use crate::llm::provider::TextGenerator;
use crate::retry::{with_retries, RetryBudget};
use crate::state::{error_payload, Domain, RequestState, StateUpdate};
use crate::tools::{self, QueryGenerationTool, RunQueryTool, ToolError, ValidateQueryTool};

pub(crate) const SQL_GENERATOR_INSTRUCTIONS: &str = "\
You translate questions into a single SQL query for the database described \
below. Respond with the SQL statement only: no explanation, no markdown.

Rules:
- Select only the columns the question asks about.
- Use COUNT(*) for \"how many\" questions.
- Never modify data unless the question explicitly asks for it.";

/// Join the generator rules with the configured table schema description
pub(crate) fn sql_instructions(schema_context: &str) -> String {
    if schema_context.trim().is_empty() {
        SQL_GENERATOR_INSTRUCTIONS.to_string()
    } else {
        format!("{SQL_GENERATOR_INSTRUCTIONS}\n\nDatabase schema:\n{schema_context}")
    }
}

/// Handler for the relational domain
pub struct RelationalHandler {
    sql_generator: QueryGenerationTool,
    validate: ValidateQueryTool,
    run: RunQueryTool,
}

impl RelationalHandler {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn RelationalStore>,
        generation: RoleParams,
        schema_context: &str,
    ) -> Self {
        let mut sql_generator = QueryGenerationTool::new(
            "generate_sql_query",
            "Translate a question into a SQL query",
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
            validate: ValidateQueryTool::new(store.clone()),
            run: RunQueryTool::new(store),
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

    async fn validate_query(&self, query: &str) -> Result<ValidationOutcome, ToolError> {
        let outcome = tools::invoke(&self.validate, &json!({"query": query})).await?;
        serde_json::from_value(outcome).map_err(|e| ToolError::Execution(e.to_string()))
    }

    async fn run_query(&self, query: &str) -> Result<Value, ToolError> {
        tools::invoke(&self.run, &json!({"query": query, "params": null})).await
    }

    fn error_update(state: &RequestState, budget: &RetryBudget, message: &str) -> StateUpdate {
        StateUpdate::for_step("relational", &state.user_input, message)
            .with_domain_response(Domain::Relational, error_payload(message))
            .with_retry_count(budget.used)
    }
}

#[async_trait]
impl Handler for RelationalHandler {
    fn domain(&self) -> Domain {
        Domain::Relational
    }

    async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let mut budget = RetryBudget::new(state.retry_count, state.max_retries);

        // Phase 1: generate
        let query = match with_retries(&mut budget, || self.generate_sql(&state.user_input)).await
        {
            Ok(query) => query,
            Err(error) => {
                warn!(error = %error, "SQL generation failed");
                return Ok(Self::error_update(
                    state,
                    &budget,
                    "query generation failed",
                ));
            }
        };

        // Phase 2: mandatory validation gate
        let validation = match with_retries(&mut budget, || self.validate_query(&query)).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(error = %error, "Query validation failed");
                return Ok(
                    Self::error_update(state, &budget, "query validation failed")
                        .with_generated_query(query),
                );
            }
        };

        if !validation.valid {
            warn!(
                query = %query,
                error = validation.error.as_deref().unwrap_or("unknown"),
                "Generated query is not valid SQL, refusing to execute"
            );
            return Ok(
                Self::error_update(state, &budget, "generated query failed syntax validation")
                    .with_generated_query(query),
            );
        }

        // Phase 3: execute, only ever reached with a validated query
        let update = match with_retries(&mut budget, || self.run_query(&query)).await {
            Ok(output) => {
                info!(query = %query, "Relational query executed");
                StateUpdate::for_step("relational", &query, "query result recorded")
                    .with_domain_response(Domain::Relational, output)
            }
            Err(error) => {
                warn!(error = %error, "Relational query execution failed");
                StateUpdate::for_step("relational", &query, "query execution failed")
                    .with_domain_response(Domain::Relational, error_payload(&error.to_string()))
            }
        };

        Ok(update
            .with_generated_query(query.clone())
            .with_retry_count(budget.used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::is_error_payload;
    use crate::testing::mocks::{MockRelationalStore, MockTextGenerator};

    fn role() -> RoleParams {
        RoleParams {
            model: "mock-model".to_string(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn test_generate_validate_execute() {
        let generator = Arc::new(MockTextGenerator::single_response(
            "SELECT COUNT(*) FROM jira_data",
        ));
        let store = Arc::new(MockRelationalStore::with_rows(vec![json!({"count": 128})]));
        let handler = RelationalHandler::new(generator, store.clone(), role(), "");
        let state = RequestState::new("How many records are there in the jira table?", 1);

        let update = handler.handle(&state).await.unwrap();

        let (domain, payload) = update.domain_response.unwrap();
        assert_eq!(domain, Domain::Relational);
        assert_eq!(payload["rows"][0]["count"], 128);
        assert_eq!(
            update.generated_query.as_deref(),
            Some("SELECT COUNT(*) FROM jira_data")
        );
        assert_eq!(store.validate_call_count().await, 1);
        assert_eq!(store.run_call_count().await, 1);
    }

    #[tokio::test]
    async fn test_invalid_query_never_executes() {
        let generator = Arc::new(MockTextGenerator::single_response("SELEC broken FROM"));
        let store = Arc::new(MockRelationalStore::with_invalid_syntax(
            "syntax error at or near SELEC",
        ));
        let handler = RelationalHandler::new(generator, store.clone(), role(), "");
        let state = RequestState::new("count the records", 1);

        let update = handler.handle(&state).await.unwrap();

        let (_, payload) = update.domain_response.unwrap();
        assert!(is_error_payload(&payload));
        assert_eq!(store.run_call_count().await, 0);
        // The invalid query is still recorded for the operator
        assert_eq!(update.generated_query.as_deref(), Some("SELEC broken FROM"));
    }

    #[tokio::test]
    async fn test_invalid_query_is_not_retried() {
        let generator = Arc::new(MockTextGenerator::single_response("SELEC broken FROM"));
        let store = Arc::new(MockRelationalStore::with_invalid_syntax("syntax error"));
        let handler = RelationalHandler::new(generator.clone(), store, role(), "");
        let state = RequestState::new("count the records", 3);

        let update = handler.handle(&state).await.unwrap();

        // One generation, no regeneration: invalidity is not a tool failure
        assert_eq!(generator.call_count().await, 1);
        assert_eq!(update.retry_count, Some(0));
    }

    #[tokio::test]
    async fn test_execution_tool_failure_retries_then_gives_up() {
        let generator = Arc::new(MockTextGenerator::single_response("SELECT 1"));
        let store = Arc::new(MockRelationalStore::with_failure());
        let handler = RelationalHandler::new(generator, store.clone(), role(), "");
        let state = RequestState::new("count", 1);

        let update = handler.handle(&state).await.unwrap();

        let (_, payload) = update.domain_response.unwrap();
        assert!(is_error_payload(&payload));
        assert_eq!(update.retry_count, Some(1));
    }

    #[tokio::test]
    async fn test_gateway_error_status_passes_through() {
        // Query-level errors are data, not tool failures: no retry
        let generator = Arc::new(MockTextGenerator::single_response(
            "SELECT * FROM missing_table",
        ));
        let store = Arc::new(MockRelationalStore::with_query_error(
            "relation missing_table does not exist",
        ));
        let handler = RelationalHandler::new(generator, store.clone(), role(), "");
        let state = RequestState::new("show missing_table", 2);

        let update = handler.handle(&state).await.unwrap();

        let (_, payload) = update.domain_response.unwrap();
        assert!(is_error_payload(&payload));
        assert_eq!(store.run_call_count().await, 1);
        assert_eq!(update.retry_count, Some(0));
    }

    #[test]
    fn test_sql_instructions_append_schema_context() {
        let instructions = sql_instructions("jira_data(id, severity, created_at)");
        assert!(instructions.contains("Database schema:"));
        assert!(instructions.contains("jira_data"));

        let bare = sql_instructions("  ");
        assert!(!bare.contains("Database schema:"));
    }
}
