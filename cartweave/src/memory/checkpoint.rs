//! Checkpoint type: one appended snapshot of session state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One checkpoint: a full state snapshot plus id and timestamp.
///
/// Produced at the end of each graph run; consumed by `CheckpointLog::append`
/// and returned by `latest` on session resume.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    /// Unique id for this entry.
    pub id: String,
    /// When the snapshot was taken.
    pub ts: DateTime<Utc>,
    /// The session state at the checkpoint.
    pub state: S,
}

impl<S> Checkpoint<S> {
    /// Wraps the current state into a fresh checkpoint.
    pub fn from_state(state: S) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            ts: Utc::now(),
            state,
        }
    }
}

/// Listing entry: id and timestamp without the payload.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub ts: DateTime<Utc>,
}
