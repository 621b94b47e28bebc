//! Configuration system
//!
//! Loaded from a TOML file (`querydesk.toml` by default). Credentials are
//! never stored in the file: each section names the environment variable
//! holding its secret, resolved at use time.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

/// Top-level application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub workorder: WorkOrderSection,
    pub relational: RelationalSection,
    pub search: SearchSection,
    pub report: ReportSection,
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
}

/// Oracle configuration: one provider, per-role generation parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmSection {
    /// Provider name ("openai" or "anthropic")
    pub provider: String,
    /// Environment variable containing the API key
    pub api_key_env: String,
    /// Classification role
    pub classifier: RoleParams,
    /// Payload/SQL generation role
    pub query_generator: RoleParams,
    /// Final response composition role
    pub composer: RoleParams,
}

/// Generation parameters for one oracle role
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoleParams {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Work-order system endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkOrderSection {
    /// Object-structure endpoint URL
    pub base_url: String,
    /// Environment variable containing the API key, if any
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Relational store gateway endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationalSection {
    pub base_url: String,
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Free-text description of the queryable tables, injected into the
    /// SQL generator's instructions
    #[serde(default)]
    pub schema_context: String,
}

/// Similarity search service endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchSection {
    pub base_url: String,
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

/// Report rendering service endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportSection {
    pub base_url: String,
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_chart_type")]
    pub chart_type: String,
}

/// Orchestration core settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrchestratorSection {
    /// Per-request retry budget for the generate/execute tool path
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_top_k() -> usize {
    3
}

fn default_chart_type() -> String {
    "bar".to_string()
}

fn default_max_retries() -> u32 {
    1
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AppConfig {
    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate endpoint URLs and provider selection
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.llm.provider.as_str() {
            "openai" | "anthropic" => {}
            provider => {
                return Err(ConfigError::InvalidConfig(format!(
                    "Unsupported LLM provider: {provider}"
                )))
            }
        }

        for (section, base_url) in [
            ("workorder", &self.workorder.base_url),
            ("relational", &self.relational.base_url),
            ("search", &self.search.base_url),
            ("report", &self.report.base_url),
        ] {
            Url::parse(base_url).map_err(|e| {
                ConfigError::InvalidConfig(format!("[{section}] base_url is not a valid URL: {e}"))
            })?;
        }

        if self.search.top_k == 0 {
            return Err(ConfigError::InvalidConfig(
                "[search] top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the oracle API key from the environment
    pub fn get_llm_api_key(&self) -> Result<String, ConfigError> {
        std::env::var(&self.llm.api_key_env)
            .map_err(|_| ConfigError::EnvVarNotFound(self.llm.api_key_env.clone()))
    }

    /// Resolve an optional credential environment variable
    pub fn resolve_optional_key(env_name: Option<&String>) -> Option<String> {
        env_name.and_then(|name| std::env::var(name).ok())
    }

    /// Create a test configuration for unit testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let toml_content = r#"
[llm]
provider = "openai"
api_key_env = "OPENAI_API_KEY"

[llm.classifier]
model = "gpt-4o-mini"
temperature = 0.0

[llm.query_generator]
model = "gpt-4o"
temperature = 0.0

[llm.composer]
model = "gpt-4o-mini"
temperature = 0.3

[workorder]
base_url = "https://maximo.example.com/maximo/oslc/os/mxwo"
api_key_env = "WORKORDER_API_KEY"

[relational]
base_url = "http://localhost:8090"
schema_context = "jira_data(id, severity, summary, created_at)"

[search]
base_url = "http://localhost:8091"
top_k = 3

[report]
base_url = "http://localhost:8092"
chart_type = "bar"
"#;
        toml::from_str(toml_content).expect("Test config should parse")
    }
}
