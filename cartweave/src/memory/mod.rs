//! Session persistence: append-only checkpoint log.
//!
//! A checkpoint is a full snapshot of the session state, keyed by session id.
//! The log is append-only — entries are never rewritten — and is the only
//! resource shared across session restarts: the core appends a checkpoint at
//! the end of every run (after cart assembly, after each feedback mutation,
//! at checkout) and reads the latest entry on resume.
//!
//! Implementations: [`InMemoryLog`] (dev and tests) and [`SqliteLog`]
//! (persistent, single-node).

mod checkpoint;
mod memory_log;
mod sqlite_log;

pub use checkpoint::{Checkpoint, CheckpointListItem};
pub use memory_log::InMemoryLog;
pub use sqlite_log::SqliteLog;

use async_trait::async_trait;

/// Run configuration passed to `CompiledGraph::invoke`.
///
/// `session_id` keys the checkpoint log; without it, a run is not persisted.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Identifies the session whose checkpoints this run appends to.
    pub session_id: Option<String>,
    /// Start from this node instead of the graph's first node (resume paths).
    pub start_node_id: Option<String>,
}

/// Error type for checkpoint-log operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
}

/// Append-only checkpoint store keyed by session id.
///
/// `append` never overwrites; `latest` returns the newest entry for a
/// session. No two sessions ever read-modify-write the same key concurrently
/// because a session id is owned by one controlling task at a time.
#[async_trait]
pub trait CheckpointLog<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Appends a checkpoint for the session. Returns the checkpoint id.
    async fn append(
        &self,
        session_id: &str,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Loads the most recent checkpoint for the session, if any.
    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError>;

    /// Lists checkpoint ids for the session, oldest first.
    async fn list(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: RunConfig::default() carries no session id.
    #[test]
    fn run_config_default_is_unpersisted() {
        let c = RunConfig::default();
        assert!(c.session_id.is_none());
        assert!(c.start_node_id.is_none());
    }

    /// **Scenario**: Display of each CheckpointError variant names its kind.
    #[test]
    fn checkpoint_error_display() {
        assert!(CheckpointError::Serialization("x".into())
            .to_string()
            .contains("serialization"));
        assert!(CheckpointError::Storage("y".into())
            .to_string()
            .contains("storage"));
    }
}
