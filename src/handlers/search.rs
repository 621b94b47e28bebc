//! Search handler
//!
//! Single-phase capability: similarity search over the vector store with a
//! configured result-count bound. No generation phase and no retry; a
//! search failure resolves directly to an error response.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::connectors::SearchIndex;
use crate::error::OrchestratorResult;
use crate::handlers::Handler;
use crate::state::{error_payload, Domain, RequestState, StateUpdate};
use crate::tools::{self, SimilaritySearchTool};

/// Handler for the search domain
pub struct SearchHandler {
    search: SimilaritySearchTool,
    top_k: usize,
}

impl SearchHandler {
    pub fn new(index: Arc<dyn SearchIndex>, top_k: usize) -> Self {
        Self {
            search: SimilaritySearchTool::new(index),
            top_k,
        }
    }
}

#[async_trait]
impl Handler for SearchHandler {
    fn domain(&self) -> Domain {
        Domain::Search
    }

    async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate> {
        let parameters = json!({
            "query": state.user_input,
            "top_k": self.top_k,
        });

        let update = match tools::invoke(&self.search, &parameters).await {
            Ok(results) => {
                let hit_count = results
                    .get("results")
                    .and_then(|r| r.as_array())
                    .map(|hits| hits.len())
                    .unwrap_or(0);
                info!(hit_count, "Similarity search completed");
                StateUpdate::for_step(
                    "search",
                    &state.user_input,
                    format!("{hit_count} passages retrieved"),
                )
                .with_domain_response(Domain::Search, results)
            }
            Err(error) => {
                warn!(error = %error, "Similarity search failed");
                StateUpdate::for_step("search", &state.user_input, "search failed")
                    .with_domain_response(Domain::Search, error_payload(&error.to_string()))
            }
        };

        Ok(update)
    }
}
