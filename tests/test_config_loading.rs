//! Configuration file loading tests

use querydesk::config::{AppConfig, ConfigError};
use std::io::Write;
use tempfile::NamedTempFile;

const VALID_CONFIG: &str = r#"
[llm]
provider = "anthropic"
api_key_env = "ANTHROPIC_API_KEY"

[llm.classifier]
model = "claude-3-5-haiku-20241022"
temperature = 0.0

[llm.query_generator]
model = "claude-3-5-sonnet-20241022"
temperature = 0.0

[llm.composer]
model = "claude-3-5-haiku-20241022"
temperature = 0.3
max_tokens = 500

[workorder]
base_url = "https://maximo.example.com/maximo/oslc/os/mxwo"
api_key_env = "WORKORDER_API_KEY"
timeout_secs = 20

[relational]
base_url = "http://sql-gateway.internal:8090"
schema_context = """
jira_data(id, severity, summary, assignee, created_at)
incidents(id, opened_at, closed_at, priority)
"""

[search]
base_url = "http://vector-search.internal:8091"
top_k = 5

[report]
base_url = "http://reports.internal:8092"
chart_type = "pie"

[orchestrator]
max_retries = 2
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_full_config_from_file() {
    let file = write_config(VALID_CONFIG);

    let config = AppConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.llm.provider, "anthropic");
    assert_eq!(config.llm.composer.max_tokens, Some(500));
    assert_eq!(config.workorder.timeout_secs, 20);
    assert!(config.relational.schema_context.contains("incidents"));
    assert_eq!(config.search.top_k, 5);
    assert_eq!(config.report.chart_type, "pie");
    assert_eq!(config.orchestrator.max_retries, 2);
}

#[test]
fn defaults_fill_omitted_fields() {
    let minimal = VALID_CONFIG
        .replace("timeout_secs = 20\n", "")
        .replace("top_k = 5\n", "")
        .replace("chart_type = \"pie\"\n", "")
        .replace("[orchestrator]\nmax_retries = 2\n", "");

    let file = write_config(&minimal);
    let config = AppConfig::load_from_file(file.path()).unwrap();

    assert_eq!(config.workorder.timeout_secs, 30);
    assert_eq!(config.search.top_k, 3);
    assert_eq!(config.report.chart_type, "bar");
    assert_eq!(config.orchestrator.max_retries, 1);
}

#[test]
fn missing_file_is_read_error() {
    let result = AppConfig::load_from_file(std::path::Path::new("/nonexistent/querydesk.toml"));
    assert!(matches!(result, Err(ConfigError::FileRead(_))));
}

#[test]
fn malformed_toml_is_parse_error() {
    let file = write_config("this is not toml [[[");
    let result = AppConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::TomlParse(_))));
}

#[test]
fn invalid_endpoint_url_is_rejected() {
    let broken = VALID_CONFIG.replace(
        "base_url = \"http://vector-search.internal:8091\"",
        "base_url = \"vector-search.internal\"",
    );
    let file = write_config(&broken);

    let result = AppConfig::load_from_file(file.path());
    assert!(matches!(result, Err(ConfigError::InvalidConfig(_))));
}

#[test]
fn unsupported_provider_is_rejected() {
    let broken = VALID_CONFIG.replace("provider = \"anthropic\"", "provider = \"watsonx\"");
    let file = write_config(&broken);

    let result = AppConfig::load_from_file(file.path());
    match result {
        Err(ConfigError::InvalidConfig(message)) => assert!(message.contains("watsonx")),
        other => panic!("expected invalid config, got {other:?}"),
    }
}
