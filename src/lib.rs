//! Querydesk - Multi-Agent Query Router
//!
//! A natural-language front end that classifies a user's question, dispatches
//! it to one of several specialized backends, and composes a final answer.
//!
//! # Overview
//!
//! This crate provides the orchestration core of the router:
//! - Shared per-request state threaded through every step
//! - A supervisor that classifies input and selects the next handler
//! - Domain handlers for work orders, relational queries, similarity search,
//!   and report generation
//! - An execution graph with statically declared edges and a step-by-step walk
//! - A tool invocation layer with JSON schema validation and bounded retries
//!
//! # Quick Start
//!
//! ```rust
//! use querydesk::state::{RequestState, RouteLabel};
//!
//! // State is created once per user request and threaded through the graph.
//! let state = RequestState::new("How many records are there in the jira table?", 1);
//! assert!(state.final_response.is_none());
//! assert!(state.trace.is_empty());
//!
//! // Oracle labels are normalized against a closed set.
//! assert_eq!(RouteLabel::parse(" Relational."), RouteLabel::Relational);
//! assert_eq!(RouteLabel::parse("the environment is down"), RouteLabel::Unknown);
//! ```

pub mod config;
pub mod connectors;
pub mod error;
pub mod graph;
pub mod handlers;
pub mod llm;
pub mod logging;
pub mod retry;
pub mod routing;
pub mod state;
pub mod testing;
pub mod tools;

pub use error::{OrchestratorError, OrchestratorResult};
pub use graph::{ExecutionGraph, GraphWalk, Node};
pub use state::{Domain, RequestState, RouteLabel, StateUpdate, TraceRecord};
pub use tools::{Tool, ToolDescription, ToolError};
