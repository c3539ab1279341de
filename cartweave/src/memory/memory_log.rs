//! In-memory checkpoint log. Not persistent; for dev and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::checkpoint::{Checkpoint, CheckpointListItem};
use super::{CheckpointError, CheckpointLog};

/// In-memory append-only log: each session id maps to its checkpoints,
/// newest last.
pub struct InMemoryLog<S> {
    inner: Arc<RwLock<HashMap<String, Vec<Checkpoint<S>>>>>,
}

impl<S> InMemoryLog<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<S> Default for InMemoryLog<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> CheckpointLog<S> for InMemoryLog<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn append(
        &self,
        session_id: &str,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let mut guard = self.inner.write().await;
        guard
            .entry(session_id.to_string())
            .or_default()
            .push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let guard = self.inner.read().await;
        Ok(guard.get(session_id).and_then(|l| l.last().cloned()))
    }

    async fn list(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let guard = self.inner.read().await;
        let mut items: Vec<CheckpointListItem> = guard
            .get(session_id)
            .map(|l| {
                l.iter()
                    .map(|cp| CheckpointListItem {
                        checkpoint_id: cp.id.clone(),
                        ts: cp.ts,
                    })
                    .collect()
            })
            .unwrap_or_default();
        if let Some(n) = limit {
            let len = items.len();
            if len > n {
                items = items.split_off(len - n);
            }
        }
        Ok(items)
    }
}
