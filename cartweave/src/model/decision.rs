//! Audit log entries for past decisions and mutations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded decision (reasoning result, validation verdict, assembly,
/// feedback mutation, checkout). Appended to the session's ordered decision
/// log; read back for audit and recompare context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Kind tag, e.g. "reasoning", "validation", "assembly", "feedback",
    /// "removal", "checkout".
    pub kind: String,
    /// Product the decision concerns, when it concerns one.
    pub product: Option<String>,
    /// Structured payload for audit tooling.
    pub payload: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

impl DecisionRecord {
    pub fn new(
        kind: impl Into<String>,
        product: Option<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind: kind.into(),
            product,
            payload,
            recorded_at: Utc::now(),
        }
    }
}
