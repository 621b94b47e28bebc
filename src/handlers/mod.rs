//! Agent handlers
//!
//! One handler per backend domain. Each handler owns a narrow, statically
//! typed set of tools, reads only the state fields relevant to it, and
//! returns a [`StateUpdate`] carrying its namespaced domain response (or
//! the uniform error payload) plus exactly one trace record. Side effects
//! are confined to the tool layer the handlers call into; a tool failure
//! never aborts the graph walk.

use async_trait::async_trait;

use crate::error::OrchestratorResult;
use crate::state::{Domain, RequestState, StateUpdate};

pub mod relational;
pub mod report;
pub mod search;
pub mod workorder;

pub use relational::RelationalHandler;
pub use report::ReportHandler;
pub use search::SearchHandler;
pub use workorder::WorkOrderHandler;

/// Domain handler contract
#[async_trait]
pub trait Handler: Send + Sync {
    /// The domain this handler writes its response under
    fn domain(&self) -> Domain;

    /// Perform the handler's capability and return the partial state output
    ///
    /// Tool failures are converted into an error-payload domain response;
    /// an `Err` here means an orchestration-level invariant broke.
    async fn handle(&self, state: &RequestState) -> OrchestratorResult<StateUpdate>;
}
