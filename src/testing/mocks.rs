//! Mock implementations for testing
//!
//! Provides mock TextGenerator, WorkOrderSystem, RelationalStore,
//! SearchIndex, and ReportRenderer implementations to enable comprehensive
//! testing without external dependencies. Mocks record the calls they
//! receive so tests can assert on invocation order and counts.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::connectors::{
    QueryOutput, RelationalStore, ReportRenderer, SearchHit, SearchIndex, ValidationOutcome,
    WorkOrderSystem,
};
use crate::llm::provider::{GenerationRequest, GenerationResponse, LlmError, TextGenerator};
use crate::tools::ToolError;

/// Mock text-generation oracle
///
/// Cycles through scripted responses; records every request it receives.
#[derive(Debug)]
pub struct MockTextGenerator {
    pub responses: Vec<String>,
    pub current_response: Arc<Mutex<usize>>,
    pub should_fail: bool,
    pub requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockTextGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            current_response: Arc::new(Mutex::new(0)),
            should_fail: false,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn single_response(response: impl Into<String>) -> Self {
        Self::new(vec![response.into()])
    }

    pub fn with_failure() -> Self {
        Self {
            responses: vec![],
            current_response: Arc::new(Mutex::new(0)),
            should_fail: true,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    pub async fn recorded_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl TextGenerator for MockTextGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.requests.lock().await.push(request);

        if self.should_fail {
            return Err(LlmError::RequestFailed("Mock oracle failure".to_string()));
        }

        let mut current = self.current_response.lock().await;
        let response_idx = *current % self.responses.len().max(1);
        *current += 1;

        let content = if self.responses.is_empty() {
            "Mock response".to_string()
        } else {
            self.responses[response_idx].clone()
        };

        Ok(GenerationResponse {
            content,
            tool_calls: vec![],
        })
    }

    async fn health_check(&self) -> Result<(), LlmError> {
        if self.should_fail {
            Err(LlmError::RequestFailed("Mock oracle failure".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Mock work-order system
#[derive(Debug, Default)]
pub struct MockWorkOrderSystem {
    pub records: Vec<Value>,
    pub should_fail: bool,
    pub get_calls: Arc<Mutex<Vec<serde_json::Map<String, Value>>>>,
    pub post_calls: Arc<Mutex<Vec<serde_json::Map<String, Value>>>>,
}

impl MockWorkOrderSystem {
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn get_call_count(&self) -> usize {
        self.get_calls.lock().await.len()
    }

    pub async fn post_call_count(&self) -> usize {
        self.post_calls.lock().await.len()
    }
}

#[async_trait]
impl WorkOrderSystem for MockWorkOrderSystem {
    async fn get(&self, params: &serde_json::Map<String, Value>) -> Result<Vec<Value>, ToolError> {
        self.get_calls.lock().await.push(params.clone());

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock work-order system failure".to_string(),
            ));
        }

        Ok(self.records.clone())
    }

    async fn post(&self, params: &serde_json::Map<String, Value>) -> Result<Value, ToolError> {
        self.post_calls.lock().await.push(params.clone());

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock work-order system failure".to_string(),
            ));
        }

        let mut record = params.clone();
        record.insert("workorderid".to_string(), json!(10001));
        Ok(Value::Object(record))
    }
}

/// Mock relational store
///
/// Scripted validation outcome and query output; records every query run
/// and validated so tests can assert the validate-before-execute gate.
#[derive(Debug)]
pub struct MockRelationalStore {
    pub validation: ValidationOutcome,
    pub output: QueryOutput,
    pub should_fail: bool,
    pub run_calls: Arc<Mutex<Vec<String>>>,
    pub validate_calls: Arc<Mutex<Vec<String>>>,
}

impl MockRelationalStore {
    pub fn with_rows(rows: Vec<Value>) -> Self {
        Self {
            validation: ValidationOutcome {
                valid: true,
                error: None,
            },
            output: QueryOutput {
                status: "ok".to_string(),
                rows: Some(rows),
                rowcount: None,
                error: None,
            },
            should_fail: false,
            run_calls: Arc::new(Mutex::new(Vec::new())),
            validate_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_rowcount(rowcount: i64) -> Self {
        let mut mock = Self::with_rows(vec![]);
        mock.output = QueryOutput {
            status: "ok".to_string(),
            rows: None,
            rowcount: Some(rowcount),
            error: None,
        };
        mock
    }

    pub fn with_invalid_syntax(error: impl Into<String>) -> Self {
        let mut mock = Self::with_rows(vec![]);
        mock.validation = ValidationOutcome {
            valid: false,
            error: Some(error.into()),
        };
        mock
    }

    pub fn with_query_error(error: impl Into<String>) -> Self {
        let mut mock = Self::with_rows(vec![]);
        mock.output = QueryOutput {
            status: "error".to_string(),
            rows: None,
            rowcount: None,
            error: Some(error.into()),
        };
        mock
    }

    pub fn with_failure() -> Self {
        let mut mock = Self::with_rows(vec![]);
        mock.should_fail = true;
        mock
    }

    pub async fn run_call_count(&self) -> usize {
        self.run_calls.lock().await.len()
    }

    pub async fn validate_call_count(&self) -> usize {
        self.validate_calls.lock().await.len()
    }
}

#[async_trait]
impl RelationalStore for MockRelationalStore {
    async fn run_query(
        &self,
        query: &str,
        _params: Option<&Value>,
    ) -> Result<QueryOutput, ToolError> {
        self.run_calls.lock().await.push(query.to_string());

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock relational store failure".to_string(),
            ));
        }

        Ok(self.output.clone())
    }

    async fn validate(&self, query: &str) -> Result<ValidationOutcome, ToolError> {
        self.validate_calls.lock().await.push(query.to_string());

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock relational store failure".to_string(),
            ));
        }

        Ok(self.validation.clone())
    }
}

/// Mock search index
#[derive(Debug, Default)]
pub struct MockSearchIndex {
    pub hits: Vec<SearchHit>,
    pub should_fail: bool,
    pub queries: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockSearchIndex {
    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            ..Default::default()
        }
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn query_count(&self) -> usize {
        self.queries.lock().await.len()
    }
}

#[async_trait]
impl SearchIndex for MockSearchIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, ToolError> {
        self.queries.lock().await.push((query.to_string(), top_k));

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock search index failure".to_string(),
            ));
        }

        Ok(self.hits.iter().take(top_k).cloned().collect())
    }
}

/// Mock report renderer
#[derive(Debug, Default)]
pub struct MockReportRenderer {
    pub should_fail: bool,
    pub renders: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockReportRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failure() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub async fn render_count(&self) -> usize {
        self.renders.lock().await.len()
    }

    pub async fn recorded_renders(&self) -> Vec<(String, String)> {
        self.renders.lock().await.clone()
    }
}

#[async_trait]
impl ReportRenderer for MockReportRenderer {
    async fn render(&self, query: &str, chart_type: &str) -> Result<String, ToolError> {
        self.renders
            .lock()
            .await
            .push((query.to_string(), chart_type.to_string()));

        if self.should_fail {
            return Err(ToolError::Execution(
                "Mock report renderer failure".to_string(),
            ));
        }

        Ok("Report Generated".to_string())
    }
}
