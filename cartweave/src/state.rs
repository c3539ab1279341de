//! Session state: the single mutable record threaded through every step.
//!
//! One session owns one `SessionState` exclusively; no two sessions share
//! cart, plan, or variant data. Every graph node receives it and returns the
//! (possibly mutated) record — no ambient or global fields anywhere.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Cart, DecisionRecord, Judgment, OrderSummary, ParsedRequest, Plan, Variant};

/// Where the session currently is in its lifecycle.
///
/// Every non-terminal phase can be revisited arbitrarily many times via the
/// feedback loop; `CheckedOut` is the only terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Planning,
    Collecting,
    Reasoning,
    Validating,
    Assembling,
    AwaitingConfirmation,
    ProcessingFeedback,
    CheckedOut,
}

/// The orchestration state for one shopping session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub phase: SessionPhase,
    /// The parsed request this session is serving.
    pub request: ParsedRequest,
    /// The active plan; superseded plans are dropped, not kept.
    pub plan: Option<Plan>,
    /// Collected variants, ranked, grouped by product name.
    pub variants: HashMap<String, Vec<Variant>>,
    /// Vendors that answered the search for each product; the validator
    /// checks judgments against this, not against the configured list.
    pub queried_vendors: HashMap<String, Vec<String>>,
    /// Latest judgment per product, awaiting validation.
    pub judgments: HashMap<String, Judgment>,
    /// Products whose latest judgment passed validation but is not yet in
    /// the cart.
    pub accepted: Vec<String>,
    /// Re-reasoning attempts consumed per product after rejections.
    pub rereason_attempts: HashMap<String, usize>,
    /// Rejection context appended to the next reasoning call per product.
    pub rejection_context: HashMap<String, String>,
    pub cart: Cart,
    /// True while the session is parked waiting for the requester.
    pub awaiting_input: bool,
    /// The last utterance received and not yet consumed.
    pub pending_input: Option<String>,
    /// True once the confirmation prompt has been issued for the current cart.
    pub confirmation_requested: bool,
    /// Ordered log of messages intended for the requester.
    pub messages: Vec<String>,
    /// Ordered audit log of past decisions.
    pub decisions: Vec<DecisionRecord>,
    /// Set at checkout; the session is terminal once present.
    pub order: Option<OrderSummary>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl SessionState {
    /// Creates a fresh session around a parsed request.
    pub fn new(request: ParsedRequest) -> Self {
        Self::with_session_id(Uuid::new_v4().to_string(), request)
    }

    /// Creates a fresh session with a caller-chosen id (e.g. for resume keys).
    pub fn with_session_id(session_id: String, request: ParsedRequest) -> Self {
        let now = Utc::now();
        Self {
            session_id,
            phase: SessionPhase::Planning,
            request,
            plan: None,
            variants: HashMap::new(),
            queried_vendors: HashMap::new(),
            judgments: HashMap::new(),
            accepted: Vec::new(),
            rereason_attempts: HashMap::new(),
            rejection_context: HashMap::new(),
            cart: Cart::new(),
            awaiting_input: false,
            pending_input: None,
            confirmation_requested: false,
            messages: Vec::new(),
            decisions: Vec::new(),
            order: None,
            created_at: now,
            last_updated: now,
        }
    }

    /// True once checkout completed.
    pub fn is_terminal(&self) -> bool {
        self.phase == SessionPhase::CheckedOut
    }

    /// Appends a user-facing message.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    /// Appends an audit record.
    pub fn record(&mut self, record: DecisionRecord) {
        self.decisions.push(record);
    }

    /// Hands an utterance to the session. The router consumes it on the next
    /// invoke; feedback utterances are applied strictly in arrival order
    /// because each one is consumed before the session parks again.
    pub fn submit_input(&mut self, input: impl Into<String>) {
        self.pending_input = Some(input.into());
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
