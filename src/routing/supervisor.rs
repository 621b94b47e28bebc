//! Routing node and edge selection
//!
//! The routing node consults the classification oracle exactly once per
//! visit and records the label. Edge selection enforces the idempotence
//! rule: a domain that already has a response is never dispatched again
//! for the same resolved classification; the walk goes straight to
//! compose. A `report` classification routes through the relational node
//! first, gated by the explicit `report_requested` flag.

use tracing::info;

use crate::error::OrchestratorResult;
use crate::graph::Node;
use crate::llm::classifier::RouteClassifier;
use crate::state::{is_error_payload, Domain, RequestState, RouteLabel, StateUpdate};

/// The routing node: classification plus decision bookkeeping
pub struct RoutingHandler {
    classifier: RouteClassifier,
}

impl RoutingHandler {
    pub fn new(classifier: RouteClassifier) -> Self {
        Self { classifier }
    }

    pub async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let label = self.classifier.classify(&state.user_input).await;

        info!(label = %label, "Routing decision made");

        Ok(
            StateUpdate::for_step("routing", &state.user_input, label.as_str())
                .with_routing_decision(label)
                .with_report_requested(label == RouteLabel::Report),
        )
    }
}

/// Select the edge out of the routing node
pub fn route_after_routing(state: &RequestState) -> Node {
    let Some(label) = state.routing_decision else {
        return Node::Compose;
    };

    let Some(domain) = label.domain() else {
        // Unknown goes straight to compose for the clarification fallback
        return Node::Compose;
    };

    // Idempotence: never dispatch a domain that already answered
    if state.has_domain_response(domain) {
        return Node::Compose;
    }

    match label {
        RouteLabel::WorkOrder => Node::WorkOrder,
        RouteLabel::Relational => Node::Relational,
        RouteLabel::Search => Node::Search,
        // A report needs its query run first; skip ahead only when a
        // relational pass already happened this request
        RouteLabel::Report => {
            if state.has_domain_response(Domain::Relational) {
                Node::Report
            } else {
                Node::Relational
            }
        }
        RouteLabel::Unknown => Node::Compose,
    }
}

/// Select the edge out of the relational node
///
/// The relational -> report chain fires only on the explicit flag set by
/// the routing node, never on keywords, and only when the relational pass
/// actually produced data to render.
pub fn route_after_relational(state: &RequestState) -> Node {
    let relational_ok = state
        .domain_response(Domain::Relational)
        .map(|payload| !is_error_payload(payload))
        .unwrap_or(false);

    if state.report_requested && relational_ok && !state.has_domain_response(Domain::Report) {
        Node::Report
    } else {
        Node::Compose
    }
}
