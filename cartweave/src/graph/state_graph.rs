//! State graph builder: nodes, fixed edges, conditional edges, compile-time
//! validation.
//!
//! A node has either one fixed outgoing edge or conditional edges, never
//! both. Conditional edges call a routing function `(state) -> key` after the
//! source node runs; the key is the next node id, or is looked up in an
//! optional path map.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use thiserror::Error;

use crate::memory::CheckpointLog;

use super::compiled::CompiledGraph;
use super::node::Node;

/// Sentinel for graph entry: `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: `add_edge(last_node_id, END)` or a router
/// returning END.
pub const END: &str = "__end__";

/// Routing function: reads the state, returns a routing key.
pub type RouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Conditional edge: routing function plus optional key → node-id map.
///
/// Without a path map the key is used directly as the next node id (or END).
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    path: RouterFn<S>,
    path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: RouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    pub fn resolve_next(&self, state: &S) -> String {
        let key = (self.path)(state);
        self.path_map
            .as_ref()
            .and_then(|m| m.get(&key))
            .cloned()
            .unwrap_or(key)
    }

    pub(super) fn path_map(&self) -> Option<&HashMap<String, String>> {
        self.path_map.as_ref()
    }
}

/// Error when compiling a state graph.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// An edge or path map references a node never registered via `add_node`.
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge leaves START.
    #[error("graph must have exactly one edge from START")]
    MissingStart,

    /// Nothing can reach END (no fixed edge to END and no router that may
    /// return it).
    #[error("graph must have a path to END")]
    MissingEnd,

    /// Fixed edges branch or cycle without a conditional router.
    #[error("fixed edges must form a single chain: {0}")]
    InvalidChain(String),

    /// A node has both a fixed outgoing edge and conditional edges.
    #[error("node has both a fixed edge and conditional edges: {0}")]
    EdgeConflict(String),
}

/// How the next node is found after a given node runs.
#[derive(Clone)]
pub(super) enum NextEntry<S> {
    /// Single fixed successor (or END); the node's `Next` is still honored.
    Fixed(String),
    /// Decided by the router from state; the node's `Next` is ignored.
    Conditional(ConditionalRouter<S>),
}

/// Builder for a session graph.
///
/// Accepts `Arc<dyn Node<S>>`; produces a [`CompiledGraph`] via `compile` or
/// `compile_with_checkpoint_log`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
        }
    }

    /// Adds a node; same id replaces. Chainable.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds a fixed edge. Use `START` / `END` for entry and exit.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`: after it runs, `path(state)`
    /// yields the routing key, resolved through `path_map` when given.
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: RouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Validates and builds the executable graph.
    pub fn compile(self) -> Result<CompiledGraph<S>, CompilationError> {
        self.compile_internal(None)
    }

    /// Validates and builds, attaching an append-only checkpoint log. When
    /// `invoke` runs with a session id, the final state of each run is
    /// appended to the log.
    pub fn compile_with_checkpoint_log(
        self,
        log: Arc<dyn CheckpointLog<S>>,
    ) -> Result<CompiledGraph<S>, CompilationError> {
        self.compile_internal(Some(log))
    }

    fn compile_internal(
        self,
        checkpoint_log: Option<Arc<dyn CheckpointLog<S>>>,
    ) -> Result<CompiledGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !self.nodes.contains_key(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(path_map) = router.path_map() {
                for target in path_map.values() {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::NodeNotFound(target.clone()));
                    }
                }
            }
        }

        let mut start_targets = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone());
        let first = start_targets.next().ok_or(CompilationError::MissingStart)?;
        if start_targets.next().is_some() {
            return Err(CompilationError::InvalidChain(
                "multiple edges from START".into(),
            ));
        }

        let can_end = self.edges.iter().any(|(_, t)| t == END)
            || self.conditional_edges.values().any(|r| {
                r.path_map()
                    .map_or(true, |m| m.values().any(|v| v == END))
            });
        if !can_end {
            return Err(CompilationError::MissingEnd);
        }

        let non_start_froms: Vec<&String> = self
            .edges
            .iter()
            .filter(|(f, _)| f != START)
            .map(|(f, _)| f)
            .collect();
        let unique_froms: HashSet<&String> = non_start_froms.iter().copied().collect();
        if unique_froms.len() != non_start_froms.len() {
            return Err(CompilationError::InvalidChain(
                "a node has more than one fixed outgoing edge".into(),
            ));
        }
        for source in self.conditional_edges.keys() {
            if unique_froms.contains(source) {
                return Err(CompilationError::EdgeConflict(source.clone()));
            }
        }

        let mut next_map: HashMap<String, NextEntry<S>> = self
            .edges
            .iter()
            .filter(|(f, _)| f != START)
            .map(|(f, t)| (f.clone(), NextEntry::Fixed(t.clone())))
            .collect();
        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }

        Ok(CompiledGraph::new(
            self.nodes,
            first,
            next_map,
            checkpoint_log,
        ))
    }
}
