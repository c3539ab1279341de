//! # Cartweave
//!
//! A state-graph orchestrator that turns a free-form shopping request into a
//! priced, vendor-assigned cart and then revises that cart through
//! natural-language feedback without restarting the pipeline.
//!
//! The core pieces:
//!
//! - [`graph`] — the state-in/state-out engine: nodes, conditional edges and
//!   the run loop. The next step is always chosen from session data at
//!   runtime.
//! - [`router`] — the pure decision table the graph consults after every step.
//! - [`retry`] — classification-aware retry with exponential backoff around
//!   every external call.
//! - [`gateway`] — the opaque catalog and reasoning capabilities (traits plus
//!   offline mocks).
//! - [`collect`], [`validate`], [`assemble`] — the per-item pipeline: fetch
//!   and rank variants, gate the judgment, build the cart entry.
//! - [`feedback`] — the closed-action feedback loop: modify, remove,
//!   recompare, add, checkout.
//! - [`memory`] — the append-only session checkpoint log (in-memory and
//!   SQLite).
//! - [`session`] — graph wiring and the caller-facing [`ShoppingSession`]
//!   handle.
//!
//! A minimal session:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cartweave::{MockCatalog, MockReasoning, OrchestratorConfig, ShoppingSession};
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let catalog = Arc::new(
//!     MockCatalog::new().with_offer("zepto", "basmati rice", "Daawat", 1.0, "kg", 310.0),
//! );
//! let session = ShoppingSession::new(
//!     catalog,
//!     Arc::new(MockReasoning::new()),
//!     OrchestratorConfig::default(),
//! )?;
//!
//! let mut state = session.start("5kg basmati rice").await?;
//! while !state.is_terminal() {
//!     for message in state.messages.drain(..) {
//!         println!("{message}");
//!     }
//!     // collect an utterance from the requester...
//!     state = session.submit(state, "confirm").await?;
//! }
//! # Ok(()) }
//! ```

pub mod assemble;
pub mod collect;
pub mod config;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod graph;
pub mod memory;
pub mod model;
pub mod retry;
pub mod router;
pub mod session;
pub mod state;
pub mod validate;

pub use config::{ConfigError, OrchestratorConfig};
pub use error::SessionError;
pub use gateway::{
    CatalogGateway, FailureKind, GatewayError, MockCatalog, MockReasoning, ReasoningGateway,
};
pub use graph::{CompilationError, CompiledGraph, Next, Node, StateGraph, END, START};
pub use memory::{Checkpoint, CheckpointError, CheckpointLog, InMemoryLog, RunConfig, SqliteLog};
pub use model::{
    Cart, CartEntry, DecisionRecord, FeedbackActionKind, FeedbackDirective, Judgment, OrderSummary,
    ParsedRequest, Plan, PlanStep, RequestItem, StepStatus, Variant,
};
pub use retry::{RetryError, RetryPolicy};
pub use router::Step;
pub use session::ShoppingSession;
pub use state::{SessionPhase, SessionState};
pub use validate::{Rejection, Validator};
