//! Oracle interfaces: text classification and text generation
//!
//! Both oracles are opaque external collaborators. The orchestration core
//! sees `classify(text) -> label` and `generate(system, user) -> content`,
//! nothing else.

pub mod classifier;
pub mod provider;
pub mod providers;

pub use classifier::RouteClassifier;
pub use provider::{
    GenerationRequest, GenerationResponse, LlmError, TextGenerator, ToolCallRequest,
};
