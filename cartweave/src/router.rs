//! Router: pure decision table from session state to the next step.
//!
//! Consulted after every node; the same function decides whether the session
//! loops back into the pipeline, branches into the feedback loop, parks for
//! input, or terminates. Being a pure function over the state record, it is
//! property-testable in isolation: identical state always yields the same
//! step.

use crate::graph::END;
use crate::model::StepStatus;
use crate::state::SessionState;

/// Next step of a session, as decided by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Fetch and rank variants for the next pending item.
    Collect,
    /// Ask the reasoning gateway to choose a variant for the current item.
    Reason,
    /// Gate the latest judgment for the current item.
    Validate,
    /// Turn the accepted judgment for the current item into a cart entry.
    Assemble,
    /// Present the cart and park for requester input.
    AwaitConfirmation,
    /// Apply one feedback utterance to the cart.
    ProcessFeedback,
    /// Finalize the cart into an immutable order.
    Checkout,
    /// Yield control to the caller (parked or terminal).
    Stop,
}

impl Step {
    /// Graph node id for this step (END for Stop).
    pub fn node_id(&self) -> &'static str {
        match self {
            Step::Collect => "collect",
            Step::Reason => "reason",
            Step::Validate => "validate",
            Step::Assemble => "assemble",
            Step::AwaitConfirmation => "ask_confirmation",
            Step::ProcessFeedback => "process_feedback",
            Step::Checkout => "checkout",
            Step::Stop => END,
        }
    }
}

/// Phrases that mean "finalize the cart" when the session is parked.
const AFFIRMATIVE_CHECKOUT: [&str; 4] = ["confirm", "yes", "checkout", "proceed"];

/// True when `input` normalizes to an affirmative checkout phrase.
pub fn is_affirmative_checkout(input: &str) -> bool {
    let normalized = input.trim().to_lowercase();
    AFFIRMATIVE_CHECKOUT.iter().any(|p| *p == normalized)
}

/// The decision table. Evaluated in order; first match wins.
pub fn next_step(state: &SessionState) -> Step {
    // 1. Checkout completed: nothing runs after the terminal state.
    if state.is_terminal() {
        return Step::Stop;
    }

    // 2-3. Parked for the requester.
    if state.awaiting_input {
        return match &state.pending_input {
            None => Step::Stop,
            Some(input) if is_affirmative_checkout(input) => Step::Checkout,
            Some(_) => Step::ProcessFeedback,
        };
    }

    // 4. Active plan with open steps: continue the per-item pipeline.
    if let Some(plan) = &state.plan {
        if let Some(step) = plan.next_open_step() {
            let product = &step.item.name;
            return match step.status {
                StepStatus::Pending => Step::Collect,
                StepStatus::InProgress => {
                    if state.accepted.iter().any(|p| p == product) {
                        Step::Assemble
                    } else if state.judgments.contains_key(product) {
                        Step::Validate
                    } else {
                        Step::Reason
                    }
                }
                // next_open_step never returns terminal steps.
                StepStatus::Done | StepStatus::Failed => Step::Stop,
            };
        }

        // 5. Plan fully processed, confirmation not yet requested.
        if !state.confirmation_requested {
            return Step::AwaitConfirmation;
        }
    }

    // 6. Defensive terminal case; unreachable under 1-5.
    tracing::error!(
        session_id = %state.session_id,
        phase = ?state.phase,
        "router reached its defensive terminal case"
    );
    Step::Stop
}

/// Routing-key adapter for the graph's conditional edges.
pub fn route(state: &SessionState) -> String {
    next_step(state).node_id().to_string()
}
