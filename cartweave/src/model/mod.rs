//! Domain model: requests, plans, catalog variants, judgments, cart.
//!
//! All types are serde-serializable so session state can be checkpointed as
//! JSON. The cart owns the aggregate-total invariant; everything else here is
//! plain data.

mod cart;
mod decision;
mod feedback;
mod judgment;
mod plan;
mod product;
mod request;

pub use cart::{Cart, CartEntry, OrderLine, OrderSummary};
pub use decision::DecisionRecord;
pub use feedback::{FeedbackActionKind, FeedbackDirective, FeedbackParams, VendorComparison};
pub use judgment::Judgment;
pub use plan::{Plan, PlanStep, StepStatus};
pub use product::Variant;
pub use request::{normalize_name, ParsedRequest, RequestItem};
