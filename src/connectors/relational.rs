//! HTTP client for the relational store gateway
//!
//! The gateway exposes two endpoints: `/query` runs a statement and returns
//! the `{status, rows|rowcount|error}` shape, `/validate` checks syntax
//! without executing. The gateway reports query-level failures inside the
//! response body; only transport-level failures become errors here.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::connectors::{QueryOutput, RelationalStore, ValidationOutcome};
use crate::tools::ToolError;

/// Relational gateway client configuration
#[derive(Debug, Clone)]
pub struct SqlGatewayConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// REST client for the relational store gateway
pub struct SqlGatewayClient {
    config: SqlGatewayConfig,
    client: Client,
}

impl SqlGatewayClient {
    pub fn new(config: SqlGatewayConfig) -> Result<Self, ToolError> {
        Url::parse(&config.base_url).map_err(|e| {
            ToolError::Initialization(format!("Invalid relational gateway URL: {e}"))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Initialization(e.to_string()))?;

        Ok(Self { config, client })
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ToolError> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.config.base_url))
            .json(body);

        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Relational gateway request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Relational gateway returned {status}: {error_text}"
            )));
        }

        response.json().await.map_err(|e| {
            ToolError::Execution(format!("Relational gateway response parse failed: {e}"))
        })
    }
}

#[async_trait]
impl RelationalStore for SqlGatewayClient {
    async fn run_query(
        &self,
        query: &str,
        params: Option<&Value>,
    ) -> Result<QueryOutput, ToolError> {
        debug!(query = %query, "Running relational query");

        let body = json!({
            "query": query,
            "params": params,
        });

        self.post_json("/query", &body).await
    }

    async fn validate(&self, query: &str) -> Result<ValidationOutcome, ToolError> {
        debug!(query = %query, "Validating relational query");

        let body = json!({"query": query});
        self.post_json("/validate", &body).await
    }
}
