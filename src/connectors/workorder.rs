//! HTTP client for the work-order management system
//!
//! Talks to an OSLC-style REST endpoint: GET with selector query parameters
//! (`oslc.where`, `oslc.select`, ...) for retrieval, POST with a JSON body
//! for creation. Credentials travel in an `apikey` header resolved from the
//! environment at construction time.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::connectors::WorkOrderSystem;
use crate::tools::ToolError;

/// Work-order client configuration
#[derive(Debug, Clone)]
pub struct WorkOrderClientConfig {
    /// Base URL of the object-structure endpoint, e.g.
    /// `https://maximo.example.com/maximo/oslc/os/mxwo`
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// REST client for the work-order system
pub struct HttpWorkOrderClient {
    config: WorkOrderClientConfig,
    client: Client,
}

impl HttpWorkOrderClient {
    pub fn new(config: WorkOrderClientConfig) -> Result<Self, ToolError> {
        Url::parse(&config.base_url).map_err(|e| {
            ToolError::Initialization(format!("Invalid work-order base URL: {e}"))
        })?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Initialization(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key),
            None => request,
        }
    }

    /// Flatten selector params into string query pairs
    fn query_pairs(params: &serde_json::Map<String, Value>) -> Vec<(String, String)> {
        params
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    /// Record arrays arrive either bare or under a `member` envelope
    fn extract_records(body: Value) -> Vec<Value> {
        match body {
            Value::Array(records) => records,
            Value::Object(mut envelope) => match envelope.remove("member") {
                Some(Value::Array(records)) => records,
                _ => vec![Value::Object(envelope)],
            },
            other => vec![other],
        }
    }
}

#[async_trait]
impl WorkOrderSystem for HttpWorkOrderClient {
    async fn get(&self, params: &serde_json::Map<String, Value>) -> Result<Vec<Value>, ToolError> {
        let pairs = Self::query_pairs(params);
        debug!(params = ?pairs, "Work-order GET");

        let request = self
            .authorized(self.client.get(&self.config.base_url))
            .header("Accept", "application/json")
            .query(&pairs);

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Work-order request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Work-order system returned {status}: {error_text}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Work-order response parse failed: {e}")))?;

        Ok(Self::extract_records(body))
    }

    async fn post(&self, params: &serde_json::Map<String, Value>) -> Result<Value, ToolError> {
        debug!("Work-order POST");

        let request = self
            .authorized(self.client.post(&self.config.base_url))
            .header("Accept", "application/json")
            .json(&Value::Object(params.clone()));

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Work-order request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Work-order system returned {status}: {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Work-order response parse failed: {e}")))
    }
}
