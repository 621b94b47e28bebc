//! Execution graph and scheduler
//!
//! A directed graph of named nodes with statically declared edges. Node
//! identity is a closed enum, so exhaustiveness is checked at compile time
//! and an undeclared edge can only arise from a routing-function bug; when
//! it does, the walk aborts with a fatal diagnostic instead of recovering.
//!
//! The walk is strictly sequential: invoke the node's handler, merge its
//! partial output into the state, select the next node, repeat until the
//! finish node. [`GraphWalk::advance`] yields the intermediate state after
//! every node for step-by-step consumers; [`ExecutionGraph::run`] drives
//! the walk to completion.

use tracing::debug;

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::handlers::{
    Handler, RelationalHandler, ReportHandler, SearchHandler, WorkOrderHandler,
};
use crate::routing::{route_after_relational, route_after_routing, ComposeHandler, RoutingHandler};
use crate::state::{RequestState, StateUpdate};

/// Node identity: the closed set of steps in the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    Routing,
    WorkOrder,
    Relational,
    Search,
    Report,
    Compose,
    Done,
}

impl Node {
    pub fn name(&self) -> &'static str {
        match self {
            Node::Routing => "routing",
            Node::WorkOrder => "work_order",
            Node::Relational => "relational",
            Node::Search => "search",
            Node::Report => "report",
            Node::Compose => "compose",
            Node::Done => "done",
        }
    }

    /// The edges a node is allowed to select from
    pub fn declared_edges(&self) -> &'static [Node] {
        match self {
            Node::Routing => &[
                Node::WorkOrder,
                Node::Relational,
                Node::Search,
                Node::Report,
                Node::Compose,
            ],
            Node::WorkOrder => &[Node::Compose],
            Node::Relational => &[Node::Report, Node::Compose],
            Node::Search => &[Node::Compose],
            Node::Report => &[Node::Compose],
            Node::Compose => &[Node::Done],
            Node::Done => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Node::Done)
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The compiled graph: entry node, handlers, and edge selection
pub struct ExecutionGraph {
    routing: RoutingHandler,
    work_order: WorkOrderHandler,
    relational: RelationalHandler,
    search: SearchHandler,
    report: ReportHandler,
    compose: ComposeHandler,
}

impl ExecutionGraph {
    pub fn new(
        routing: RoutingHandler,
        work_order: WorkOrderHandler,
        relational: RelationalHandler,
        search: SearchHandler,
        report: ReportHandler,
        compose: ComposeHandler,
    ) -> Self {
        Self {
            routing,
            work_order,
            relational,
            search,
            report,
            compose,
        }
    }

    pub const ENTRY: Node = Node::Routing;

    /// Start a step-by-step walk over the graph
    pub fn walk(&self, state: RequestState) -> GraphWalk<'_> {
        GraphWalk {
            graph: self,
            state,
            current: Self::ENTRY,
        }
    }

    /// Walk the graph to completion and return the final state
    pub async fn run(&self, state: RequestState) -> OrchestratorResult<RequestState> {
        let mut walk = self.walk(state);
        while walk.advance().await?.is_some() {}
        Ok(walk.into_state())
    }

    async fn invoke_node(
        &self,
        node: Node,
        state: &RequestState,
    ) -> OrchestratorResult<StateUpdate> {
        match node {
            Node::Routing => self.routing.handle(state).await,
            Node::WorkOrder => self.work_order.handle(state).await,
            Node::Relational => self.relational.handle(state).await,
            Node::Search => self.search.handle(state).await,
            Node::Report => self.report.handle(state).await,
            Node::Compose => self.compose.handle(state).await,
            Node::Done => Err(OrchestratorError::invalid_transition(
                "the finish node has no handler",
            )),
        }
    }

    /// Select the next node and check it against the declared edges
    fn select_edge(&self, node: Node, state: &RequestState) -> OrchestratorResult<Node> {
        let next = match node {
            Node::Routing => route_after_routing(state),
            Node::Relational => route_after_relational(state),
            Node::WorkOrder | Node::Search | Node::Report => Node::Compose,
            Node::Compose => Node::Done,
            Node::Done => {
                return Err(OrchestratorError::invalid_transition(
                    "no transition out of the finish node",
                ))
            }
        };

        if !node.declared_edges().contains(&next) {
            return Err(OrchestratorError::invalid_transition(format!(
                "edge {node} -> {next} is not declared"
            )));
        }

        Ok(next)
    }
}

/// An in-progress walk over the graph for one request
pub struct GraphWalk<'g> {
    graph: &'g ExecutionGraph,
    state: RequestState,
    current: Node,
}

impl GraphWalk<'_> {
    /// Execute the current node, merge its output, and move along the
    /// selected edge
    ///
    /// Returns the intermediate state after the node, or `None` once the
    /// finish node has been reached.
    pub async fn advance(&mut self) -> OrchestratorResult<Option<&RequestState>> {
        if self.current.is_terminal() {
            return Ok(None);
        }

        let node = self.current;
        debug!(node = %node, "Executing graph node");

        let update = self.graph.invoke_node(node, &self.state).await?;
        self.state.merge(update)?;
        self.current = self.graph.select_edge(node, &self.state)?;

        debug!(next = %self.current, "Node transition selected");

        Ok(Some(&self.state))
    }

    pub fn current_node(&self) -> Node {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn state(&self) -> &RequestState {
        &self.state
    }

    pub fn into_state(self) -> RequestState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert_eq!(Node::Routing.name(), "routing");
        assert_eq!(Node::WorkOrder.name(), "work_order");
        assert_eq!(Node::Done.name(), "done");
    }

    #[test]
    fn test_declared_edges_shape() {
        assert_eq!(Node::Routing.declared_edges().len(), 5);
        assert_eq!(Node::WorkOrder.declared_edges(), &[Node::Compose]);
        assert_eq!(
            Node::Relational.declared_edges(),
            &[Node::Report, Node::Compose]
        );
        assert_eq!(Node::Compose.declared_edges(), &[Node::Done]);
        assert!(Node::Done.declared_edges().is_empty());
    }

    #[test]
    fn test_routing_cannot_reach_done_directly() {
        assert!(!Node::Routing.declared_edges().contains(&Node::Done));
    }

    #[test]
    fn test_only_done_is_terminal() {
        assert!(Node::Done.is_terminal());
        assert!(!Node::Compose.is_terminal());
        assert!(!Node::Routing.is_terminal());
    }

    #[test]
    fn test_every_non_terminal_node_declares_an_edge() {
        for node in [
            Node::Routing,
            Node::WorkOrder,
            Node::Relational,
            Node::Search,
            Node::Report,
            Node::Compose,
        ] {
            assert!(
                !node.declared_edges().is_empty(),
                "{node} declares no edges"
            );
        }
    }
}
