//! Checkpoint persistence tests: the append-only SQLite log written at every
//! park point and read back on session resume.


#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use cartweave::{
    CheckpointLog, MockReasoning, RequestItem, SessionState, ShoppingSession, SqliteLog,
};

use common::{fast_config, stocked_catalog};

fn sqlite_session(log: Arc<SqliteLog<SessionState>>) -> ShoppingSession {
    ShoppingSession::with_checkpoint_log(
        Arc::new(stocked_catalog()),
        Arc::new(MockReasoning::new()),
        fast_config(),
        log,
    )
    .expect("graph compiles")
}

/// **Scenario**: Each park point appends one checkpoint — after assembly and
/// confirmation, after a feedback mutation, and at checkout.
#[tokio::test]
async fn checkpoints_are_appended_at_each_park_point() {
    let dir = tempfile::tempdir().unwrap();
    let log: Arc<SqliteLog<SessionState>> =
        Arc::new(SqliteLog::new(dir.path().join("sessions.db")).unwrap());
    let session = sqlite_session(log.clone());

    let state = session
        .start_with_items(vec![
            RequestItem::new("basmati rice", 5.0, "kg"),
            RequestItem::new("sugar", 1.0, "kg"),
        ])
        .await
        .unwrap();
    let session_id = state.session_id.clone();
    assert_eq!(log.list(&session_id, None).await.unwrap().len(), 1);

    let state = session.submit(state, "remove sugar").await.unwrap();
    assert_eq!(log.list(&session_id, None).await.unwrap().len(), 2);

    let state = session.submit(state, "confirm").await.unwrap();
    assert!(state.is_terminal());
    assert_eq!(log.list(&session_id, None).await.unwrap().len(), 3);
}

/// **Scenario**: A parked session resumed from the latest checkpoint — even
/// by a fresh runner over the same database — continues through feedback to
/// checkout with its cart intact.
#[tokio::test]
async fn parked_session_resumes_from_latest_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("sessions.db");

    let session_id = {
        let log: Arc<SqliteLog<SessionState>> = Arc::new(SqliteLog::new(&db_path).unwrap());
        let session = sqlite_session(log);
        let state = session
            .start_with_items(vec![RequestItem::new("basmati rice", 5.0, "kg")])
            .await
            .unwrap();
        state.session_id
    };

    // A new runner on the same file: simulates a process restart.
    let log: Arc<SqliteLog<SessionState>> = Arc::new(SqliteLog::new(&db_path).unwrap());
    let session = sqlite_session(log);

    let resumed = session
        .resume(&session_id)
        .await
        .unwrap()
        .expect("checkpoint present");
    assert_eq!(resumed.session_id, session_id);
    assert!(resumed.awaiting_input);
    assert_eq!(resumed.cart.entries.len(), 1);

    let state = session.submit(resumed, "confirm").await.unwrap();
    assert!(state.is_terminal());
    assert_eq!(state.order.as_ref().unwrap().lines.len(), 1);
}

/// **Scenario**: Resuming an unknown session id yields None rather than an
/// empty state.
#[tokio::test]
async fn resuming_unknown_session_returns_none() {
    let dir = tempfile::tempdir().unwrap();
    let log: Arc<SqliteLog<SessionState>> =
        Arc::new(SqliteLog::new(dir.path().join("sessions.db")).unwrap());
    let session = sqlite_session(log);

    assert!(session.resume("no-such-session").await.unwrap().is_none());
}
