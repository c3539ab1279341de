//! Compiled graph: immutable run loop over nodes and routing entries.
//!
//! Built by `StateGraph::compile`. Each invoke executes nodes one at a time,
//! replaces the state with each node's output, and resolves the next node
//! from the conditional router (when the node has one) or the fixed edge.
//! When a checkpoint log is attached and the run config carries a session id,
//! the final state of the run is appended to the log — every run of the
//! shopping graph ends immediately after cart assembly, a feedback mutation,
//! or checkout, so this is exactly where checkpoints belong.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::SessionError;
use crate::memory::{Checkpoint, CheckpointLog, RunConfig};

use super::node::{Next, Node};
use super::state_graph::{NextEntry, END};

/// Immutable, executable session graph.
#[derive(Clone)]
pub struct CompiledGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    first_node_id: String,
    next_map: HashMap<String, NextEntry<S>>,
    checkpoint_log: Option<Arc<dyn CheckpointLog<S>>>,
}

impl<S> CompiledGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub(super) fn new(
        nodes: HashMap<String, Arc<dyn Node<S>>>,
        first_node_id: String,
        next_map: HashMap<String, NextEntry<S>>,
        checkpoint_log: Option<Arc<dyn CheckpointLog<S>>>,
    ) -> Self {
        Self {
            nodes,
            first_node_id,
            next_map,
            checkpoint_log,
        }
    }

    /// Runs the graph from its first node (or `config.start_node_id` when
    /// resuming mid-graph) until a router or node ends the run, then returns
    /// the final state.
    ///
    /// With a checkpoint log attached and `config.session_id` set, the final
    /// state is appended before returning.
    pub async fn invoke(&self, state: S, config: Option<RunConfig>) -> Result<S, SessionError> {
        if !self.nodes.contains_key(&self.first_node_id) {
            return Err(SessionError::StepFailed("empty graph".into()));
        }
        let config = config.unwrap_or_default();
        let mut state = state;
        let mut current_id = config
            .start_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone());

        tracing::info!(first = %current_id, "session run starting");
        loop {
            let node = self
                .nodes
                .get(&current_id)
                .ok_or_else(|| {
                    SessionError::Invariant(format!("routed to unknown node {current_id}"))
                })?
                .clone();

            tracing::debug!(node_id = %current_id, "running node");
            let (new_state, next) = match node.run(state.clone()).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::error!(node_id = %current_id, error = %e, "node failed");
                    return Err(e);
                }
            };
            state = new_state;

            let next_id = match self.next_map.get(&current_id) {
                Some(NextEntry::Conditional(router)) => {
                    let target = router.resolve_next(&state);
                    tracing::debug!(from = %current_id, to = %target, "conditional routing");
                    Some(target)
                }
                Some(NextEntry::Fixed(to)) => match next {
                    Next::End => None,
                    Next::Node(id) => Some(id),
                    Next::Continue => Some(to.clone()),
                },
                None => match next {
                    Next::Node(id) => Some(id),
                    _ => None,
                },
            };

            match next_id {
                Some(id) if id != END => current_id = id,
                _ => {
                    self.checkpoint(&state, &config).await?;
                    tracing::info!("session run complete");
                    return Ok(state);
                }
            }
        }
    }

    async fn checkpoint(&self, state: &S, config: &RunConfig) -> Result<(), SessionError> {
        if let (Some(log), Some(session_id)) = (&self.checkpoint_log, &config.session_id) {
            let checkpoint = Checkpoint::from_state(state.clone());
            let id = log.append(session_id, &checkpoint).await?;
            tracing::debug!(session_id = %session_id, checkpoint_id = %id, "checkpoint written");
        }
        Ok(())
    }
}
