//! Error types for the orchestration core
//!
//! Handler-level failures (tool errors, schema mismatches) are recoverable:
//! they are recorded into the request state as error payloads and the graph
//! walk continues to the compose node. `InvalidStateTransition` is the one
//! fatal variant: it signals a programming-level invariant violation and
//! aborts the request with a diagnostic.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Main error type for orchestration operations
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invariant violation: double-write of the final response, selection of
    /// an undeclared edge, or a second response for an already-handled domain.
    #[error("Invalid state transition: {message}")]
    InvalidStateTransition { message: String },

    #[error("Routing error: {message}")]
    RoutingError { message: String },

    #[error("Tool error: {0}")]
    Tool(#[from] crate::tools::ToolError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] crate::llm::LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl OrchestratorError {
    /// Create an invalid state transition error
    pub fn invalid_transition<S: Into<String>>(message: S) -> Self {
        Self::InvalidStateTransition {
            message: message.into(),
        }
    }

    /// Create a routing error
    pub fn routing_error<S: Into<String>>(message: S) -> Self {
        Self::RoutingError {
            message: message.into(),
        }
    }

    /// Whether the error aborts the request instead of degrading to an
    /// error payload.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidStateTransition { .. })
    }
}

static SECRET_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(password|token|key|secret)[=:]\s*\S+").expect("secret pattern compiles")
});

static SENSITIVE_PATH_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/[a-zA-Z0-9._/-]+/(secrets?|\.ssh|\.aws|\.config)/[a-zA-Z0-9._/-]+")
        .expect("path pattern compiles")
});

/// Sanitize error messages before they reach any user-visible boundary
pub fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = SECRET_PATTERN.replace_all(message, "${1}=***").to_string();

    sanitized = SENSITIVE_PATH_PATTERN
        .replace_all(&sanitized, "/***REDACTED***/")
        .to_string();

    // Cap at 500 characters total
    if sanitized.len() > 500 {
        let truncate_suffix = "...[truncated]";
        let max_content_len = 500 - truncate_suffix.len();
        sanitized = format!("{}{}", &sanitized[..max_content_len], truncate_suffix);
    }

    sanitized
}

/// Result type for orchestration operations
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
