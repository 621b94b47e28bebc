//! Orchestration invariants
//!
//! Idempotent routing, single final write, trace completeness, error
//! containment, and the validate-before-execute gate, checked over whole
//! graph walks and over arbitrary merge sequences.

use proptest::prelude::*;
use querydesk::config::RoleParams;
use querydesk::graph::ExecutionGraph;
use querydesk::handlers::{RelationalHandler, ReportHandler, SearchHandler, WorkOrderHandler};
use querydesk::llm::classifier::RouteClassifier;
use querydesk::routing::{ComposeHandler, RoutingHandler};
use querydesk::state::{Domain, RequestState, StateUpdate};
use querydesk::testing::mocks::{
    MockRelationalStore, MockReportRenderer, MockSearchIndex, MockTextGenerator,
    MockWorkOrderSystem,
};
use querydesk::OrchestratorError;
use serde_json::json;
use std::sync::Arc;

fn role() -> RoleParams {
    RoleParams {
        model: "mock-model".to_string(),
        temperature: Some(0.0),
        max_tokens: None,
    }
}

fn graph_with(
    classification: &str,
    index: Arc<MockSearchIndex>,
    store: Arc<MockRelationalStore>,
) -> ExecutionGraph {
    let oracle = Arc::new(MockTextGenerator::single_response("SELECT 1"));
    ExecutionGraph::new(
        RoutingHandler::new(RouteClassifier::new(
            Arc::new(MockTextGenerator::single_response(classification)),
            "mock-model",
        )),
        WorkOrderHandler::new(
            oracle.clone(),
            Arc::new(MockWorkOrderSystem::with_records(vec![])),
            role(),
        ),
        RelationalHandler::new(oracle.clone(), store, role(), ""),
        SearchHandler::new(index, 3),
        ReportHandler::new(
            oracle.clone(),
            Arc::new(MockReportRenderer::new()),
            role(),
            "",
            "bar",
        ),
        ComposeHandler::new(
            Arc::new(MockTextGenerator::single_response("All done.")),
            role(),
        ),
    )
}

// P1: a populated domain response means the handler is never invoked again;
// the walk goes straight to compose.
#[tokio::test]
async fn p1_idempotent_routing_skips_answered_domain() {
    let index = Arc::new(MockSearchIndex::with_hits(vec![]));
    let graph = graph_with("search", index.clone(), Arc::new(MockRelationalStore::with_rows(vec![])));

    let mut state = RequestState::new("which version of jboss supports openjdk 11?", 1);
    state
        .domain_responses
        .insert(Domain::Search, json!({"results": [{"content": "cached", "score": 1.0}]}));

    let final_state = graph.run(state).await.unwrap();

    assert_eq!(index.query_count().await, 0);
    assert!(final_state.final_response.is_some());

    let steps: Vec<_> = final_state
        .trace
        .iter()
        .map(|r| r.step_name.as_str())
        .collect();
    assert_eq!(steps, vec!["routing", "compose"]);
}

// P2: final_response is set exactly once; a second set is an invariant
// violation.
#[tokio::test]
async fn p2_second_final_write_is_rejected() {
    let graph = graph_with(
        "unknown",
        Arc::new(MockSearchIndex::with_hits(vec![])),
        Arc::new(MockRelationalStore::with_rows(vec![])),
    );

    let mut final_state = graph.run(RequestState::new("anything", 1)).await.unwrap();
    assert!(final_state.final_response.is_some());

    let result = final_state.merge(
        StateUpdate::for_step("compose", "", "").with_final_response("a second answer"),
    );
    assert!(matches!(
        result,
        Err(OrchestratorError::InvalidStateTransition { .. })
    ));
}

// P3: the trace grows by exactly one record per node visited.
#[tokio::test]
async fn p3_trace_matches_nodes_visited() {
    let store = Arc::new(MockRelationalStore::with_rowcount(9));
    let graph = graph_with("relational", Arc::new(MockSearchIndex::with_hits(vec![])), store);

    let mut walk = graph.walk(RequestState::new("how many?", 1));
    let mut visited = 0;
    while let Some(state) = walk.advance().await.unwrap() {
        visited += 1;
        assert_eq!(state.trace.len(), visited);
    }
}

// P4: every tool failure still ends in a non-empty final response with no
// internal error text.
#[tokio::test]
async fn p4_error_containment_for_every_failing_domain() {
    let cases: Vec<(&str, ExecutionGraph)> = vec![
        (
            "search",
            graph_with(
                "search",
                Arc::new(MockSearchIndex::with_failure()),
                Arc::new(MockRelationalStore::with_rows(vec![])),
            ),
        ),
        (
            "relational",
            graph_with(
                "relational",
                Arc::new(MockSearchIndex::with_hits(vec![])),
                Arc::new(MockRelationalStore::with_failure()),
            ),
        ),
    ];

    for (label, graph) in cases {
        let state = graph.run(RequestState::new("trigger a failure", 1)).await.unwrap();
        let response = state.final_response.expect("a final response is always produced");

        assert!(!response.is_empty(), "{label}: empty final response");
        for leaked in ["Mock", "ToolError", "Execution", "stack", "panic"] {
            assert!(
                !response.contains(leaked),
                "{label}: final response leaks '{leaked}': {response}"
            );
        }
    }
}

// P5: execute is never called unless the immediately preceding validation
// passed.
#[tokio::test]
async fn p5_validate_gates_execute() {
    let store = Arc::new(MockRelationalStore::with_invalid_syntax("nope"));
    let graph = graph_with("relational", Arc::new(MockSearchIndex::with_hits(vec![])), store.clone());

    graph.run(RequestState::new("count things", 2)).await.unwrap();

    assert_eq!(store.validate_call_count().await, 1);
    assert_eq!(store.run_call_count().await, 0);
}

#[tokio::test]
async fn p5_validate_transport_failure_also_blocks_execute() {
    let store = Arc::new(MockRelationalStore::with_failure());
    let graph = graph_with("relational", Arc::new(MockSearchIndex::with_hits(vec![])), store.clone());

    graph.run(RequestState::new("count things", 1)).await.unwrap();

    // The store fails both calls; run_query must never have been reached
    assert_eq!(store.run_call_count().await, 0);
}

proptest! {
    // Merge keeps the trace append-only: one record per accepted update,
    // none for rejected ones, order preserved.
    #[test]
    fn merge_appends_exactly_one_trace_record(
        steps in proptest::collection::vec((any::<bool>(), "[a-z]{1,12}"), 0..24)
    ) {
        let mut state = RequestState::new("q", 1);
        let mut accepted = 0usize;
        let mut final_written = false;

        for (index, (set_final, text)) in steps.into_iter().enumerate() {
            let mut update = StateUpdate::for_step(format!("step_{index}"), "", "");
            if set_final {
                update = update.with_final_response(text);
            }

            match state.merge(update) {
                Ok(()) => {
                    accepted += 1;
                    if set_final {
                        final_written = true;
                    }
                }
                Err(_) => {
                    // The only rejection in this sequence is a second final write
                    prop_assert!(set_final && final_written);
                }
            }

            prop_assert_eq!(state.trace.len(), accepted);
        }

        // Execution order is preserved in the trace
        for (position, record) in state.trace.iter().enumerate() {
            let step_index: usize = record.step_name
                .strip_prefix("step_")
                .and_then(|s| s.parse().ok())
                .unwrap();
            prop_assert!(position <= step_index);
        }
    }

    // Scalar overwrite semantics: the last accepted generated_query wins.
    #[test]
    fn merge_last_query_wins(queries in proptest::collection::vec("[a-zA-Z0-9 ]{1,20}", 1..10)) {
        let mut state = RequestState::new("q", 1);

        for query in &queries {
            state
                .merge(StateUpdate::for_step("s", "", "").with_generated_query(query.clone()))
                .unwrap();
        }

        prop_assert_eq!(state.generated_query.as_deref(), Some(queries.last().unwrap().as_str()));
        prop_assert_eq!(state.trace.len(), queries.len());
    }
}
