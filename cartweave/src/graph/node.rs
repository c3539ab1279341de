//! Graph node trait: one orchestration step, state in, state out.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::SessionError;

/// What to do after a node runs.
///
/// Nodes on a conditional edge have their `Next` overridden by the router;
/// nodes on a fixed edge use it directly.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    /// Follow the node's outgoing edge (or END if it is the last in a chain).
    Continue,
    /// Jump to the node with the given id.
    Node(String),
    /// Stop and return the current state to the caller.
    End,
}

/// One step in a session graph: receives the session state, returns the
/// updated state plus routing advice.
///
/// Implementors hold their collaborators (gateways, config) behind `Arc`s;
/// the state record is the only thing that flows between steps.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id, unique within a graph (e.g. `"collect"`, `"assemble"`).
    fn id(&self) -> &str;

    /// Executes the step. The returned state fully replaces the previous one.
    async fn run(&self, state: S) -> Result<(S, Next), SessionError>;
}
