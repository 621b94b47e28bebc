//! Compose node
//!
//! The terminal response step. Given whichever domain response is
//! populated (or none), produce the final natural-language answer: a
//! text-generation pass over the question and the data for successful
//! payloads, a passthrough sentence for report completions, and fixed
//! templates for unknown classifications and error payloads. Internal
//! error detail never reaches the user; the trace carries it for
//! operators instead.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use crate::config::RoleParams;
use crate::error::OrchestratorResult;
use crate::llm::provider::{GenerationRequest, TextGenerator};
use crate::state::{is_error_payload, Domain, RequestState, StateUpdate};

const COMPOSER_INSTRUCTIONS: &str = "\
You are a friendly assistant for an operations team. You receive a user's \
question and data retrieved from a backend system. Answer the question in one \
or two plain sentences using only that data. If the data does not actually \
answer the question, say so and ask for the detail that would help.";

const CLARIFICATION_TEMPLATE: &str = "\
I'm not sure which system can answer that. Here is what I can help with:
- Work orders: status, details, and creation
- Database questions: counts, listings, and aggregations over stored tables
- Documentation search: troubleshooting and product questions
- Reports: charts and tables generated from stored data

Could you rephrase your question with one of these in mind?";

/// The terminal compose node
pub struct ComposeHandler {
    generator: Arc<dyn TextGenerator>,
    generation: RoleParams,
}

impl ComposeHandler {
    pub fn new(generator: Arc<dyn TextGenerator>, generation: RoleParams) -> Self {
        Self {
            generator,
            generation,
        }
    }

    pub async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let text = self.compose(state).await;

        info!("Final response composed");

        Ok(
            StateUpdate::for_step("compose", &state.user_input, "final response ready")
                .with_final_response(text),
        )
    }

    async fn compose(&self, state: &RequestState) -> String {
        let Some((domain, payload)) = primary_response(state) else {
            return CLARIFICATION_TEMPLATE.to_string();
        };

        if is_error_payload(payload) {
            return apology_for(domain);
        }

        if domain == Domain::Report {
            let status = payload
                .get("status")
                .and_then(Value::as_str)
                .unwrap_or("Report Generated");
            return format!("{status}. You can find the artifact in the reports location.");
        }

        let data = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        let user_text = format!("Question: {}\n\nData:\n{data}", state.user_input);

        let mut request =
            GenerationRequest::new(&self.generation.model, COMPOSER_INSTRUCTIONS, user_text);
        request.temperature = self.generation.temperature;
        request.max_tokens = self.generation.max_tokens;

        match self.generator.generate(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => fallback_rendering(domain, payload),
            Err(error) => {
                warn!(error = %error, "Compose generation failed, using plain rendering");
                fallback_rendering(domain, payload)
            }
        }
    }
}

/// The domain response the final answer is built from
///
/// Prefers the domain the routing decision resolved to; falls back to any
/// populated response so a partial chain still produces an answer.
fn primary_response(state: &RequestState) -> Option<(Domain, &Value)> {
    if let Some(domain) = state.routing_decision.and_then(|label| label.domain()) {
        if let Some(payload) = state.domain_response(domain) {
            return Some((domain, payload));
        }
    }

    state
        .domain_responses
        .iter()
        .next()
        .map(|(domain, payload)| (*domain, payload))
}

/// User-facing explanation for a failed domain; raw errors stay internal
fn apology_for(domain: Domain) -> String {
    let detail = match domain {
        Domain::WorkOrder => "I couldn't complete that work-order operation",
        Domain::Relational => "I couldn't run a database query for that question",
        Domain::Search => "I couldn't search the documentation just now",
        Domain::Report => "I couldn't generate that report",
    };
    format!(
        "I'm sorry, {detail}. Please try again in a moment, or rephrase the request; \
         if the problem persists, ask an operator to check the request trace."
    )
}

/// Plain rendering of a payload when the generation oracle is unavailable
fn fallback_rendering(domain: Domain, payload: &Value) -> String {
    let data = serde_json::to_string(payload).unwrap_or_else(|_| "no data".to_string());
    format!("Here is what the {domain} backend returned: {data}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{error_payload, RouteLabel};
    use crate::testing::mocks::MockTextGenerator;
    use serde_json::json;

    fn role() -> RoleParams {
        RoleParams {
            model: "mock-model".to_string(),
            temperature: Some(0.3),
            max_tokens: None,
        }
    }

    fn state_with(
        label: RouteLabel,
        domain: Domain,
        payload: Value,
    ) -> RequestState {
        let mut state = RequestState::new("test question", 1);
        state.routing_decision = Some(label);
        state.domain_responses.insert(domain, payload);
        state
    }

    #[tokio::test]
    async fn test_compose_phrases_domain_response() {
        let generator = Arc::new(MockTextGenerator::single_response(
            "Work order 5012 is in progress: Replace pump seal, priority 1.",
        ));
        let handler = ComposeHandler::new(generator, role());
        let state = state_with(
            RouteLabel::WorkOrder,
            Domain::WorkOrder,
            json!({"records": [{"wonum": "5012", "status": "INPRG"}]}),
        );

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(text.contains("5012"));
        assert!(text.contains("in progress"));
    }

    #[tokio::test]
    async fn test_compose_unknown_returns_clarification() {
        let generator = Arc::new(MockTextGenerator::single_response("unused"));
        let handler = ComposeHandler::new(generator.clone(), role());
        let mut state = RequestState::new("the environment is down", 1);
        state.routing_decision = Some(RouteLabel::Unknown);

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(text.contains("Work orders"));
        assert!(text.contains("Database questions"));
        assert!(text.contains("Documentation search"));
        assert!(text.contains("Reports"));
        // No generation call for the fixed template
        assert_eq!(generator.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_compose_error_payload_yields_apology() {
        let generator = Arc::new(MockTextGenerator::single_response("unused"));
        let handler = ComposeHandler::new(generator, role());
        let state = state_with(
            RouteLabel::Relational,
            Domain::Relational,
            error_payload("syntax error at or near SELEC in generated statement"),
        );

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(!text.is_empty());
        assert!(text.contains("couldn't run a database query"));
        // Raw error detail never surfaces
        assert!(!text.contains("SELEC"));
        assert!(!text.contains("syntax error"));
    }

    #[tokio::test]
    async fn test_compose_report_passthrough() {
        let generator = Arc::new(MockTextGenerator::single_response("unused"));
        let handler = ComposeHandler::new(generator.clone(), role());
        let state = state_with(
            RouteLabel::Report,
            Domain::Report,
            json!({"status": "Report Generated"}),
        );

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(text.starts_with("Report Generated"));
        assert_eq!(generator.call_count().await, 0);
    }

    #[tokio::test]
    async fn test_compose_falls_back_when_oracle_fails() {
        let generator = Arc::new(MockTextGenerator::with_failure());
        let handler = ComposeHandler::new(generator, role());
        let state = state_with(
            RouteLabel::Relational,
            Domain::Relational,
            json!({"status": "ok", "rows": [{"count": 128}]}),
        );

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(!text.is_empty());
        assert!(text.contains("128"));
    }

    #[tokio::test]
    async fn test_compose_report_chain_prefers_report_response() {
        let generator = Arc::new(MockTextGenerator::single_response("unused"));
        let handler = ComposeHandler::new(generator, role());
        let mut state = state_with(
            RouteLabel::Report,
            Domain::Report,
            json!({"status": "Report Generated"}),
        );
        state
            .domain_responses
            .insert(Domain::Relational, json!({"status": "ok", "rows": []}));

        let update = handler.handle(&state).await.unwrap();

        assert!(update.final_response.unwrap().starts_with("Report Generated"));
    }

    #[tokio::test]
    async fn test_compose_report_chain_falls_back_to_relational_error() {
        // The relational pass failed before the report node ever ran
        let generator = Arc::new(MockTextGenerator::single_response("unused"));
        let handler = ComposeHandler::new(generator, role());
        let mut state = RequestState::new("chart the issues", 1);
        state.routing_decision = Some(RouteLabel::Report);
        state
            .domain_responses
            .insert(Domain::Relational, error_payload("query failed"));

        let update = handler.handle(&state).await.unwrap();

        let text = update.final_response.unwrap();
        assert!(text.contains("couldn't run a database query"));
    }
}
