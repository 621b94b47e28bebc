//! Similarity search tool

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::connectors::SearchIndex;
use crate::tools::{input_schema, Tool, ToolDescription, ToolError};

/// Input for a similarity search invocation
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SearchInput {
    /// The search query
    pub query: String,
    /// Result-count bound
    pub top_k: usize,
}

/// Searches the vector store for the closest passages
pub struct SimilaritySearchTool {
    index: Arc<dyn SearchIndex>,
}

impl SimilaritySearchTool {
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SimilaritySearchTool {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "similarity_search".to_string(),
            description: "Retrieve the passages most similar to the query".to_string(),
            parameters: input_schema::<SearchInput>(),
        }
    }

    async fn execute(&self, parameters: &Value) -> Result<Value, ToolError> {
        let input: SearchInput = serde_json::from_value(parameters.clone())
            .map_err(|e| ToolError::SchemaValidation(e.to_string()))?;

        let hits = self.index.search(&input.query, input.top_k).await?;
        Ok(json!({"results": hits}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::SearchHit;
    use crate::testing::mocks::MockSearchIndex;
    use crate::tools::invoke;

    #[tokio::test]
    async fn test_search_returns_hits() {
        let index = Arc::new(MockSearchIndex::with_hits(vec![SearchHit {
            content: "JBoss EAP 7.3 supports OpenJDK 11".to_string(),
            score: 0.92,
        }]));
        let tool = SimilaritySearchTool::new(index);

        let result = invoke(
            &tool,
            &json!({"query": "which jboss supports openjdk 11", "top_k": 3}),
        )
        .await
        .unwrap();

        assert_eq!(result["results"][0]["content"], "JBoss EAP 7.3 supports OpenJDK 11");
    }

    #[tokio::test]
    async fn test_search_respects_top_k_bound() {
        let hits: Vec<SearchHit> = (0..10)
            .map(|i| SearchHit {
                content: format!("passage {i}"),
                score: 1.0 - i as f32 / 10.0,
            })
            .collect();
        let index = Arc::new(MockSearchIndex::with_hits(hits));
        let tool = SimilaritySearchTool::new(index);

        let result = invoke(&tool, &json!({"query": "q", "top_k": 3}))
            .await
            .unwrap();

        assert_eq!(result["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_missing_top_k_fails_schema_validation() {
        let index = Arc::new(MockSearchIndex::with_hits(vec![]));
        let tool = SimilaritySearchTool::new(index);

        let result = invoke(&tool, &json!({"query": "q"})).await;
        assert!(matches!(result, Err(ToolError::SchemaValidation(_))));
    }
}
