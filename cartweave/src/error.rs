//! Session execution error types.
//!
//! Used by `Node::run` and the compiled graph run loop. Failures local to one
//! plan step or one feedback mutation are not errors at this level; they are
//! recorded on the step or reported as a user message. `SessionError` is for
//! conditions that stop the run itself.

use thiserror::Error;

use crate::memory::CheckpointError;

/// Session execution error.
///
/// Returned by `Node::run` when a step cannot produce a usable state, and by
/// `CompiledGraph::invoke` when the run loop itself fails.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A step failed with a message (e.g. a gateway call that no step-local
    /// recovery path could absorb).
    #[error("step failed: {0}")]
    StepFailed(String),

    /// A consistency invariant did not hold (e.g. cart totals diverged from
    /// the entry sum, or the router reached its defensive terminal case).
    /// Fatal to the session; never silently continued.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Writing or reading a session checkpoint failed.
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),
}
