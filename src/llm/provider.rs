//! Text-generation oracle abstraction
//!
//! Defines the trait and request/response types for text-generation
//! backends, enabling multiple provider implementations behind a unified
//! interface. Handlers and the compose node depend only on this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::ToolDescription;

/// A text-generation request: system instructions plus one user turn
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub system_instructions: String,
    pub user_text: String,
    /// Tool schemas offered to the oracle, if the caller wants tool calls
    pub tool_schemas: Option<Vec<ToolDescription>>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationRequest {
    pub fn new(
        model: impl Into<String>,
        system_instructions: impl Into<String>,
        user_text: impl Into<String>,
    ) -> Self {
        Self {
            model: model.into(),
            system_instructions: system_instructions.into(),
            user_text: user_text.into(),
            tool_schemas: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A tool call requested by the oracle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Oracle output: generated text plus any requested tool calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

/// Text-generation provider trait for dependency injection and testing
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider name (e.g. "openai", "anthropic")
    fn name(&self) -> &str;

    /// Generate a completion for the given request
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;

    /// Check that the provider is configured and reachable
    async fn health_check(&self) -> Result<(), LlmError>;
}

/// Text-generation provider errors
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("API error: {0}")]
    ApiError(String),
}
