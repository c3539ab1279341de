//! SQLite-backed checkpoint log. Persistent across process restarts.
//!
//! Rows are only ever inserted; the table is the append-only log. State is
//! stored as a JSON payload. Connections run inside `spawn_blocking` so the
//! issuing task blocks without stalling the runtime.

use std::marker::PhantomData;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::checkpoint::{Checkpoint, CheckpointListItem};
use super::{CheckpointError, CheckpointLog};

/// SQLite checkpoint log keyed by (session_id, checkpoint_id).
pub struct SqliteLog<S> {
    db_path: std::path::PathBuf,
    _state: PhantomData<fn() -> S>,
}

impl<S> SqliteLog<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path)
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS session_checkpoints (
                session_id TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                payload TEXT NOT NULL,
                PRIMARY KEY (session_id, checkpoint_id)
            )
            "#,
            [],
        )
        .map_err(|e| CheckpointError::Storage(e.to_string()))?;
        Ok(Self {
            db_path,
            _state: PhantomData,
        })
    }
}

fn parse_ts(ts: &str) -> DateTime<Utc> {
    ts.parse().unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl<S> CheckpointLog<S> for SqliteLog<S>
where
    S: Clone + Send + Sync + Serialize + DeserializeOwned + 'static,
{
    async fn append(
        &self,
        session_id: &str,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let payload = serde_json::to_string(&checkpoint.state)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        let session_id = session_id.to_string();
        let id = checkpoint.id.clone();
        let ts = checkpoint.ts.to_rfc3339();
        let db_path = self.db_path.clone();

        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path)
                .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            conn.execute(
                "INSERT INTO session_checkpoints (session_id, checkpoint_id, ts, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![session_id, id.clone(), ts, payload],
            )
            .map_err(|e| CheckpointError::Storage(e.to_string()))?;
            Ok::<String, CheckpointError>(id)
        })
        .await
        .map_err(|e| CheckpointError::Storage(e.to_string()))?
    }

    async fn latest(&self, session_id: &str) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();

        let row: Option<(String, String, String)> =
            tokio::task::spawn_blocking(move || -> Result<_, CheckpointError> {
                let conn = rusqlite::Connection::open(&db_path)
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let mut stmt = conn
                    .prepare(
                        "SELECT checkpoint_id, ts, payload FROM session_checkpoints
                         WHERE session_id = ?1 ORDER BY rowid DESC LIMIT 1",
                    )
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let mut rows = stmt
                    .query(params![session_id])
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                match rows.next().map_err(|e| CheckpointError::Storage(e.to_string()))? {
                    Some(row) => {
                        let id: String =
                            row.get(0).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                        let ts: String =
                            row.get(1).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                        let payload: String =
                            row.get(2).map_err(|e| CheckpointError::Storage(e.to_string()))?;
                        Ok(Some((id, ts, payload)))
                    }
                    None => Ok(None),
                }
            })
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        match row {
            Some((id, ts, payload)) => {
                let state: S = serde_json::from_str(&payload)
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                Ok(Some(Checkpoint {
                    id,
                    ts: parse_ts(&ts),
                    state,
                }))
            }
            None => Ok(None),
        }
    }

    async fn list(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let session_id = session_id.to_string();
        let db_path = self.db_path.clone();

        let rows: Vec<(String, String)> =
            tokio::task::spawn_blocking(move || -> Result<_, CheckpointError> {
                let conn = rusqlite::Connection::open(&db_path)
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let mut stmt = conn
                    .prepare(
                        "SELECT checkpoint_id, ts FROM session_checkpoints
                         WHERE session_id = ?1 ORDER BY rowid ASC",
                    )
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let mapped = stmt
                    .query_map(params![session_id], |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                    })
                    .map_err(|e| CheckpointError::Storage(e.to_string()))?;
                let mut out = Vec::new();
                for item in mapped {
                    out.push(item.map_err(|e| CheckpointError::Storage(e.to_string()))?);
                }
                Ok(out)
            })
            .await
            .map_err(|e| CheckpointError::Storage(e.to_string()))??;

        let mut items: Vec<CheckpointListItem> = rows
            .into_iter()
            .map(|(id, ts)| CheckpointListItem {
                checkpoint_id: id,
                ts: parse_ts(&ts),
            })
            .collect();
        if let Some(n) = limit {
            let len = items.len();
            if len > n {
                items = items.split_off(len - n);
            }
        }
        Ok(items)
    }
}
