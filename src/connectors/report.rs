//! HTTP client for the report rendering service
//!
//! Rendering is a side effect: the service writes the artifact to a durable
//! location the caller reads later, and answers with a status string only.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::connectors::ReportRenderer;
use crate::tools::ToolError;

/// Report service client configuration
#[derive(Debug, Clone)]
pub struct ReportServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

/// REST client for the report renderer
pub struct ReportServiceClient {
    config: ReportServiceConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct RenderResponse {
    status: String,
}

impl ReportServiceClient {
    pub fn new(config: ReportServiceConfig) -> Result<Self, ToolError> {
        Url::parse(&config.base_url)
            .map_err(|e| ToolError::Initialization(format!("Invalid report service URL: {e}")))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ToolError::Initialization(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl ReportRenderer for ReportServiceClient {
    async fn render(&self, query: &str, chart_type: &str) -> Result<String, ToolError> {
        debug!(chart_type, "Requesting report render");

        let mut request = self
            .client
            .post(format!("{}/render", self.config.base_url))
            .json(&json!({"query": query, "chart_type": chart_type}));

        if let Some(key) = &self.config.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ToolError::Execution(format!("Report request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ToolError::Execution(format!(
                "Report service returned {status}: {error_text}"
            )));
        }

        let parsed: RenderResponse = response
            .json()
            .await
            .map_err(|e| ToolError::Execution(format!("Report response parse failed: {e}")))?;

        Ok(parsed.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = ReportServiceClient::new(ReportServiceConfig {
            base_url: String::new(),
            api_key: None,
            timeout: Duration::from_secs(5),
        });
        assert!(matches!(result, Err(ToolError::Initialization(_))));
    }

    #[test]
    fn test_render_response_deserialization() {
        let parsed: RenderResponse =
            serde_json::from_str(r#"{"status": "Report Generated"}"#).unwrap();
        assert_eq!(parsed.status, "Report Generated");
    }
}
