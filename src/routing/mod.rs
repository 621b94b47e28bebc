//! Router / supervisor
//!
//! The routing node classifies the user's input and records the decision;
//! the edge-selection functions here turn that decision (and the rest of
//! the state) into the next node. Agent handlers are domain experts, not
//! workflow coordinators: all sequencing knowledge lives in this module.

pub mod compose;
pub mod supervisor;

pub use compose::ComposeHandler;
pub use supervisor::{route_after_relational, route_after_routing, RoutingHandler};
