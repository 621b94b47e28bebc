//! HTTP client for the vector similarity search service

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::connectors::{SearchHit, SearchIndex};
use crate::tools::ToolError;

/// Search service client configuration
#[derive(Debug, Clone)]
pub struct VectorSearchConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// REST client for the similarity search service
pub struct VectorSearchClient {
    config: VectorSearchConfig,
    client: Client,
}

/// The service wraps hits in a `results` envelope
#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchHit>,
}

impl VectorSearchClient {
    pub fn new(config: VectorSearchConfig) -> Result<Self, ToolError> {
        Url::parse(&config.base_url)
            .map_err(|e| ToolError::Initialization(format!("Invalid search service URL: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Initialization(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl SearchIndex for VectorSearchClient {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, ToolError> {
        debug!(query = %query, top_k, "Similarity search");

        let mut request = self
            .client
            .post(format!("{}/search", self.config.base_url))
            .json(&json!({"query": query, "top_k": top_k}));

        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Search service returned {status}: {error_text}"
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Search response parse failed: {e}")))?;

        Ok(parsed.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = VectorSearchClient::new(VectorSearchConfig {
            base_url: "not-a-url".to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(ToolError::Initialization(_))));
    }

    #[test]
    fn test_search_response_deserialization() {
        let json = r#"{"results": [{"content": "passage", "score": 0.87}]}"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert_eq!(parsed.results[0].content, "passage");
    }
}
