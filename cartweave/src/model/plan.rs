//! Execution plan: one step per requested item.
//!
//! Steps carry status only; which pipeline stage runs next for a step is
//! decided by the router from session data, not stored here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request::RequestItem;

/// Lifecycle of one plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepStatus {
    /// Not started; variants not yet collected.
    Pending,
    /// Variants collected; reasoning/validation/assembly still in flight.
    InProgress,
    /// Entry assembled into the cart.
    Done,
    /// Abandoned (no variants from any vendor, or validation budget spent).
    Failed,
}

/// One step of the active plan, referencing one requested item.
///
/// Owned exclusively by the active plan; destroyed with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStep {
    pub item: RequestItem,
    pub status: StepStatus,
    /// Why the step failed, when it did.
    pub error: Option<String>,
}

impl PlanStep {
    pub fn new(item: RequestItem) -> Self {
        Self {
            item,
            status: StepStatus::Pending,
            error: None,
        }
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(reason.into());
    }
}

/// Ordered set of per-item steps derived from a parsed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub goal: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Builds a plan with one step per item, in request order.
    ///
    /// Carries no control-flow logic; the router decides what runs next.
    pub fn for_items(items: &[RequestItem]) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            goal: "assemble a priced, vendor-assigned cart".to_string(),
            steps: items.iter().cloned().map(PlanStep::new).collect(),
        }
    }

    /// First step that is neither Done nor Failed, if any.
    pub fn next_open_step(&self) -> Option<&PlanStep> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Pending | StepStatus::InProgress))
    }

    /// Mutable access to the step for `product`, if present.
    pub fn step_mut(&mut self, product: &str) -> Option<&mut PlanStep> {
        self.steps.iter_mut().find(|s| s.item.name == product)
    }

    /// True when every step reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.next_open_step().is_none()
    }
}
