//! Shared per-request state threaded through the execution graph
//!
//! One [`RequestState`] exists per user request. Every node receives the
//! current state, performs its work, and returns a [`StateUpdate`] - a
//! partial output that the scheduler merges back into the aggregate. Merge
//! semantics: scalar fields overwrite (later writes win), the trace
//! concatenates, and `final_response` may be written exactly once.
//!
//! The trace is append-only and records one entry per node visited, in
//! execution order. It is the only durability/observability mechanism the
//! orchestration core offers: operators debug a request by reading its
//! trace, never by re-running it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Backend domains a request can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    WorkOrder,
    Relational,
    Search,
    Report,
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::WorkOrder => "work_order",
            Domain::Relational => "relational",
            Domain::Search => "search",
            Domain::Report => "report",
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of labels the classification oracle may resolve to
///
/// Raw oracle output is normalized through [`RouteLabel::parse`]; anything
/// that does not match a recognized label exactly after normalization is
/// `Unknown`. An ambiguous classification is policy, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteLabel {
    WorkOrder,
    Relational,
    Search,
    Report,
    Unknown,
}

impl RouteLabel {
    /// Normalize a raw oracle label: trim, lowercase, strip one trailing
    /// period, then exact-match against the closed label set.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        let normalized = normalized.strip_suffix('.').unwrap_or(&normalized);

        match normalized {
            "work_order" => RouteLabel::WorkOrder,
            "relational" => RouteLabel::Relational,
            "search" => RouteLabel::Search,
            "report" => RouteLabel::Report,
            _ => RouteLabel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteLabel::WorkOrder => "work_order",
            RouteLabel::Relational => "relational",
            RouteLabel::Search => "search",
            RouteLabel::Report => "report",
            RouteLabel::Unknown => "unknown",
        }
    }

    /// The domain this label resolves to, if any
    pub fn domain(&self) -> Option<Domain> {
        match self {
            RouteLabel::WorkOrder => Some(Domain::WorkOrder),
            RouteLabel::Relational => Some(Domain::Relational),
            RouteLabel::Search => Some(Domain::Search),
            RouteLabel::Report => Some(Domain::Report),
            RouteLabel::Unknown => None,
        }
    }
}

impl std::fmt::Display for RouteLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record per node visited
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    pub step_name: String,
    pub input_summary: String,
    pub output_summary: String,
    pub recorded_at: DateTime<Utc>,
}

impl TraceRecord {
    pub fn new(
        step_name: impl Into<String>,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            input_summary: summarize(&input_summary.into()),
            output_summary: summarize(&output_summary.into()),
            recorded_at: Utc::now(),
        }
    }
}

/// Trace summaries are capped so the audit log stays readable
fn summarize(text: &str) -> String {
    const MAX_SUMMARY_LEN: usize = 200;
    if text.chars().count() <= MAX_SUMMARY_LEN {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(MAX_SUMMARY_LEN).collect();
        format!("{truncated}...")
    }
}

/// Build the uniform error payload tools and handlers record on failure
pub fn error_payload(message: &str) -> Value {
    json!({
        "status": "error",
        "error": crate::error::sanitize_error_message(message),
    })
}

/// Whether a domain response payload is the uniform error shape
pub fn is_error_payload(payload: &Value) -> bool {
    payload.get("status").and_then(Value::as_str) == Some("error")
}

/// Partial output returned by one node, merged into the aggregate state
///
/// Every update carries exactly one trace record; the builder methods add
/// the fields the node actually produced.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub routing_decision: Option<RouteLabel>,
    pub generated_query: Option<String>,
    pub domain_response: Option<(Domain, Value)>,
    pub report_requested: Option<bool>,
    pub retry_count: Option<u32>,
    pub final_response: Option<String>,
    pub trace: TraceRecord,
}

impl StateUpdate {
    /// Start an update for one node visit
    pub fn for_step(
        step_name: impl Into<String>,
        input_summary: impl Into<String>,
        output_summary: impl Into<String>,
    ) -> Self {
        Self {
            routing_decision: None,
            generated_query: None,
            domain_response: None,
            report_requested: None,
            retry_count: None,
            final_response: None,
            trace: TraceRecord::new(step_name, input_summary, output_summary),
        }
    }

    pub fn with_routing_decision(mut self, label: RouteLabel) -> Self {
        self.routing_decision = Some(label);
        self
    }

    pub fn with_generated_query(mut self, query: impl Into<String>) -> Self {
        self.generated_query = Some(query.into());
        self
    }

    pub fn with_domain_response(mut self, domain: Domain, payload: Value) -> Self {
        self.domain_response = Some((domain, payload));
        self
    }

    pub fn with_report_requested(mut self, requested: bool) -> Self {
        self.report_requested = Some(requested);
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn with_final_response(mut self, text: impl Into<String>) -> Self {
        self.final_response = Some(text.into());
        self
    }
}

/// The single mutable record for one user request
///
/// Created at request entry with all fields at default, threaded through
/// every node visited, and discarded after the final response is delivered.
/// No cross-request persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestState {
    pub request_id: Uuid,
    /// Set once at entry, immutable thereafter
    pub user_input: String,
    /// Overwritten (not appended) each time re-routing occurs
    pub routing_decision: Option<RouteLabel>,
    /// Structured query text produced by a handler's generation phase
    pub generated_query: Option<String>,
    /// Namespaced response per domain; set once per domain per request
    pub domain_responses: BTreeMap<Domain, Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    /// Gates the relational -> report branch in the graph
    pub report_requested: bool,
    /// Append-only; insertion order is execution order
    pub trace: Vec<TraceRecord>,
    /// Set exactly once, by the terminal compose node
    pub final_response: Option<String>,
}

impl RequestState {
    pub fn new(user_input: impl Into<String>, max_retries: u32) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_input: user_input.into(),
            routing_decision: None,
            generated_query: None,
            domain_responses: BTreeMap::new(),
            retry_count: 0,
            max_retries,
            report_requested: false,
            trace: Vec::new(),
            final_response: None,
        }
    }

    pub fn domain_response(&self, domain: Domain) -> Option<&Value> {
        self.domain_responses.get(&domain)
    }

    pub fn has_domain_response(&self, domain: Domain) -> bool {
        self.domain_responses.contains_key(&domain)
    }

    /// Merge a node's partial output into the aggregate state
    ///
    /// Scalar fields overwrite, the trace record is appended, and two
    /// invariants are enforced: a domain response is set once per domain,
    /// and `final_response` is written exactly once. Violating either is an
    /// [`OrchestratorError::InvalidStateTransition`].
    pub fn merge(&mut self, update: StateUpdate) -> OrchestratorResult<()> {
        if let Some((domain, _)) = &update.domain_response {
            if self.domain_responses.contains_key(domain) {
                return Err(OrchestratorError::invalid_transition(format!(
                    "domain response for '{domain}' already recorded"
                )));
            }
        }
        if update.final_response.is_some() && self.final_response.is_some() {
            return Err(OrchestratorError::invalid_transition(
                "final_response already set",
            ));
        }

        if let Some(label) = update.routing_decision {
            self.routing_decision = Some(label);
        }
        if let Some(query) = update.generated_query {
            self.generated_query = Some(query);
        }
        if let Some((domain, payload)) = update.domain_response {
            self.domain_responses.insert(domain, payload);
        }
        if let Some(requested) = update.report_requested {
            self.report_requested = requested;
        }
        if let Some(count) = update.retry_count {
            self.retry_count = count;
        }
        if let Some(text) = update.final_response {
            self.final_response = Some(text);
        }
        self.trace.push(update.trace);

        Ok(())
    }
}
