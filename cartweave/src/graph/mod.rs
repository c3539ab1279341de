//! State graph engine: state-in, state-out nodes with runtime routing.
//!
//! A session is advanced by a single run loop that executes one node at a
//! time, replaces the state with the node's output, and consults the routing
//! function after every step — the next node is chosen from session data at
//! runtime, not from a fixed predecessor graph. Build with
//! [`StateGraph::add_node`] / [`StateGraph::add_edge`] (using [`START`] and
//! [`END`]) plus [`StateGraph::add_conditional_edges`], then [`StateGraph::compile`]
//! or [`StateGraph::compile_with_checkpoint_log`].

mod compiled;
mod node;
mod state_graph;

pub use compiled::CompiledGraph;
pub use node::{Next, Node};
pub use state_graph::{
    CompilationError, ConditionalRouter, RouterFn, StateGraph, END, START,
};
