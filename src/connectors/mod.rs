//! Downstream system interfaces
//!
//! The work-order system, relational store, search index, and report
//! renderer are external collaborators. The orchestration core depends only
//! on the traits here; the HTTP clients are one implementation each.
//! All downstream failures are normalized into [`ToolError`] at this seam -
//! nothing below ever panics or leaks a transport error type upward.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::ToolError;

pub mod relational;
pub mod report;
pub mod search;
pub mod workorder;

pub use relational::SqlGatewayClient;
pub use report::ReportServiceClient;
pub use search::VectorSearchClient;
pub use workorder::HttpWorkOrderClient;

/// Work-order management system: record retrieval and creation
#[async_trait]
pub trait WorkOrderSystem: Send + Sync {
    async fn get(&self, params: &serde_json::Map<String, Value>) -> Result<Vec<Value>, ToolError>;
    async fn post(&self, params: &serde_json::Map<String, Value>) -> Result<Value, ToolError>;
}

/// Relational store gateway: query execution and syntax validation
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn run_query(
        &self,
        query: &str,
        params: Option<&Value>,
    ) -> Result<QueryOutput, ToolError>;

    async fn validate(&self, query: &str) -> Result<ValidationOutcome, ToolError>;
}

/// Vector similarity search service
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>, ToolError>;
}

/// Report rendering service; returns a status string, not data
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, query: &str, chart_type: &str) -> Result<String, ToolError>;
}

/// Result of running a query against the relational store
///
/// Mirrors the gateway wire shape: `{status: "ok", rows}` for selects,
/// `{status: "ok", rowcount}` for statements, `{status: "error", error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutput {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowcount: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutput {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Result of validating query syntax
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// One similarity search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub score: f32,
}
