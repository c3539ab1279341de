//! Session graph wiring and the caller-facing handle.
//!
//! Each pipeline step is one graph node holding its collaborators behind
//! `Arc`s; the router is installed as the conditional edge from every node,
//! so the next step is always chosen from session data at runtime. A run
//! ends whenever the router parks or terminates the session; with a
//! checkpoint log attached, that is exactly when the state is persisted
//! (after cart assembly and confirmation, after each feedback mutation, and
//! at checkout).

use std::sync::Arc;

use async_trait::async_trait;

use crate::assemble::assemble_into_cart;
use crate::collect::collect_for_product;
use crate::config::OrchestratorConfig;
use crate::error::SessionError;
use crate::feedback;
use crate::gateway::{CatalogGateway, ReasoningGateway};
use crate::graph::{CompilationError, CompiledGraph, Next, Node, StateGraph, END, START};
use crate::memory::{CheckpointLog, RunConfig};
use crate::model::{DecisionRecord, ParsedRequest, Plan, RequestItem, StepStatus};
use crate::retry;
use crate::router;
use crate::state::{SessionPhase, SessionState};
use crate::validate::Validator;

/// Builds the plan: parses the request if needed, then one step per item.
struct PlanNode {
    reasoning: Arc<dyn ReasoningGateway>,
    config: Arc<OrchestratorConfig>,
}

#[async_trait]
impl Node<SessionState> for PlanNode {
    fn id(&self) -> &str {
        "plan"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        if state.plan.is_some() {
            // Re-entry on a later run; the router decides what happens next.
            return Ok((state, Next::Continue));
        }
        state.phase = SessionPhase::Planning;

        if state.request.items.is_empty() {
            if let Some(input) = state.pending_input.take() {
                match retry::execute(&self.config.retry, || self.reasoning.parse_request(&input))
                    .await
                {
                    Ok(items) => {
                        let listing = items
                            .iter()
                            .map(|i| format!("- {}{} {}", i.quantity, i.unit, i.name))
                            .collect::<Vec<_>>()
                            .join("\n");
                        state.notify(format!("Parsed your request:\n{listing}"));
                        state.request = ParsedRequest {
                            raw_input: input,
                            items,
                        };
                    }
                    Err(err) => {
                        tracing::error!(error = %err, "request parsing failed");
                        state.notify(format!(
                            "Could not parse the request ({err}). You can add items once the empty cart is shown."
                        ));
                    }
                }
            }
        }

        let plan = Plan::for_items(&state.request.items);
        tracing::info!(steps = plan.steps.len(), plan_id = %plan.id, "plan created");
        state.plan = Some(plan);
        state.phase = SessionPhase::Collecting;
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Collects and ranks variants for the next pending item.
struct CollectNode {
    catalog: Arc<dyn CatalogGateway>,
    config: Arc<OrchestratorConfig>,
}

#[async_trait]
impl Node<SessionState> for CollectNode {
    fn id(&self) -> &str {
        "collect"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        let product = match state.plan.as_ref().and_then(|p| p.next_open_step()) {
            Some(step) if step.status == StepStatus::Pending => step.item.name.clone(),
            _ => return Ok((state, Next::Continue)),
        };
        state.phase = SessionPhase::Collecting;

        let outcome = collect_for_product(
            self.catalog.as_ref(),
            &self.config.vendors,
            &self.config.retry,
            &product,
        )
        .await;

        if let Some(step) = state.plan.as_mut().and_then(|p| p.step_mut(&product)) {
            if outcome.is_empty() {
                step.fail("no variants from any vendor");
                state.notify(format!(
                    "Could not find '{product}' at any vendor; skipping it."
                ));
            } else {
                step.status = StepStatus::InProgress;
                state.notify(format!(
                    "Found {} option(s) for '{}' across {} vendor(s).",
                    outcome.variants.len(),
                    product,
                    outcome.queried_vendors.len()
                ));
                state.variants.insert(product.clone(), outcome.variants);
                state
                    .queried_vendors
                    .insert(product.clone(), outcome.queried_vendors);
            }
        }
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Asks the reasoning gateway to choose a variant for the current item.
struct ReasonNode {
    reasoning: Arc<dyn ReasoningGateway>,
    config: Arc<OrchestratorConfig>,
}

#[async_trait]
impl Node<SessionState> for ReasonNode {
    fn id(&self) -> &str {
        "reason"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        let product = match state.plan.as_ref().and_then(|p| p.next_open_step()) {
            Some(step) => step.item.name.clone(),
            None => return Ok((state, Next::Continue)),
        };
        state.phase = SessionPhase::Reasoning;

        let variants = state.variants.get(&product).cloned().unwrap_or_default();
        let context = state.rejection_context.get(&product).cloned();
        let result = retry::execute(&self.config.retry, || {
            self.reasoning
                .reason(&product, &variants, context.as_deref())
        })
        .await;

        match result {
            Ok(judgment) => {
                state.record(DecisionRecord::new(
                    "reasoning",
                    Some(product.clone()),
                    serde_json::json!({
                        "vendor": judgment.vendor,
                        "confidence": judgment.confidence,
                        "rationale": judgment.rationale,
                    }),
                ));
                state.judgments.insert(product, judgment);
            }
            Err(err) => {
                tracing::error!(product = %product, error = %err, "reasoning failed");
                if let Some(step) = state.plan.as_mut().and_then(|p| p.step_mut(&product)) {
                    step.fail(format!("reasoning failed: {err}"));
                }
                state.notify(format!("Could not choose an option for '{product}': {err}"));
            }
        }
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Gates the latest judgment for the current item.
struct ValidateNode {
    config: Arc<OrchestratorConfig>,
}

#[async_trait]
impl Node<SessionState> for ValidateNode {
    fn id(&self) -> &str {
        "validate"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        let product = match state.plan.as_ref().and_then(|p| p.next_open_step()) {
            Some(step) => step.item.name.clone(),
            None => return Ok((state, Next::Continue)),
        };
        let judgment = match state.judgments.get(&product) {
            Some(judgment) => judgment.clone(),
            None => return Ok((state, Next::Continue)),
        };
        state.phase = SessionPhase::Validating;

        let queried = state
            .queried_vendors
            .get(&product)
            .cloned()
            .unwrap_or_default();
        let validator = Validator::new(self.config.confidence_floor);

        match validator.validate(&judgment, &queried) {
            Ok(()) => {
                state.record(DecisionRecord::new(
                    "validation",
                    Some(product.clone()),
                    serde_json::json!({ "accepted": true }),
                ));
                state.rejection_context.remove(&product);
                state.accepted.push(product);
            }
            Err(rejection) => {
                let attempts = state
                    .rereason_attempts
                    .entry(product.clone())
                    .and_modify(|n| *n += 1)
                    .or_insert(1);
                let attempts = *attempts;
                state.record(DecisionRecord::new(
                    "validation",
                    Some(product.clone()),
                    serde_json::json!({ "accepted": false, "reason": rejection.to_string() }),
                ));
                state.judgments.remove(&product);
                if attempts > self.config.max_revalidations {
                    tracing::warn!(product = %product, attempts, "re-reasoning budget spent");
                    state.rejection_context.remove(&product);
                    if let Some(step) = state.plan.as_mut().and_then(|p| p.step_mut(&product)) {
                        step.fail(format!("no valid decision: {rejection}"));
                    }
                    state.notify(format!(
                        "Could not settle on a valid option for '{product}': {rejection}"
                    ));
                } else {
                    tracing::info!(product = %product, attempts, rejection = %rejection, "re-reasoning");
                    state
                        .rejection_context
                        .insert(product, format!("previous choice rejected: {rejection}"));
                }
            }
        }
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Turns the accepted judgment for the current item into a cart entry.
struct AssembleNode;

#[async_trait]
impl Node<SessionState> for AssembleNode {
    fn id(&self) -> &str {
        "assemble"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        let product = match state.plan.as_ref().and_then(|p| p.next_open_step()) {
            Some(step) => step.item.name.clone(),
            None => return Ok((state, Next::Continue)),
        };
        state.phase = SessionPhase::Assembling;

        let judgment = match state.judgments.remove(&product) {
            Some(judgment) => judgment,
            None => {
                return Err(SessionError::Invariant(format!(
                    "assemble routed for '{product}' without an accepted judgment"
                )))
            }
        };
        let requested = state
            .request
            .items
            .iter()
            .find(|i| i.name == product)
            .cloned()
            .unwrap_or_else(|| RequestItem::new(&product, 1.0, "packs"));

        assemble_into_cart(&mut state.cart, &judgment, &requested);
        state
            .cart
            .check_invariant()
            .map_err(SessionError::Invariant)?;

        state.accepted.retain(|p| p != &product);
        if let Some(step) = state.plan.as_mut().and_then(|p| p.step_mut(&product)) {
            step.status = StepStatus::Done;
        }
        state.record(DecisionRecord::new(
            "assembly",
            Some(product),
            serde_json::json!({
                "vendor": judgment.vendor,
                "unit_price": judgment.variant.price,
                "cart_total_after": state.cart.total_price,
            }),
        ));
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Presents the cart and parks the session for requester input.
struct AskConfirmationNode;

#[async_trait]
impl Node<SessionState> for AskConfirmationNode {
    fn id(&self) -> &str {
        "ask_confirmation"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        state.phase = SessionPhase::AwaitingConfirmation;

        let mut summary = format!(
            "Your cart: {} item(s), total {:.2}\n",
            state.cart.entries.len(),
            state.cart.total_price
        );
        for entry in &state.cart.entries {
            summary.push_str(&format!(
                "- {} ({} x {}) from {}: {:.2}\n",
                entry.brand, entry.quantity, entry.unit, entry.vendor, entry.line_total
            ));
        }
        state.notify(summary);
        state.notify(
            "Reply 'confirm' to checkout, or tell me what to change \
             (modify, remove, compare, or add items).",
        );

        state.awaiting_input = true;
        state.confirmation_requested = true;
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Applies one feedback utterance, then parks the session again.
struct ProcessFeedbackNode {
    catalog: Arc<dyn CatalogGateway>,
    reasoning: Arc<dyn ReasoningGateway>,
    config: Arc<OrchestratorConfig>,
}

#[async_trait]
impl Node<SessionState> for ProcessFeedbackNode {
    fn id(&self) -> &str {
        "process_feedback"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        let input = match state.pending_input.take() {
            Some(input) => input,
            None => return Ok((state, Next::Continue)),
        };

        feedback::process(
            &mut state,
            &input,
            self.catalog.as_ref(),
            self.reasoning.as_ref(),
            self.config.as_ref(),
        )
        .await;

        if !state.is_terminal() {
            state.awaiting_input = true;
            state.phase = SessionPhase::AwaitingConfirmation;
        }
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Finalizes the session on an affirmative checkout phrase.
struct CheckoutNode;

#[async_trait]
impl Node<SessionState> for CheckoutNode {
    fn id(&self) -> &str {
        "checkout"
    }

    async fn run(&self, mut state: SessionState) -> Result<(SessionState, Next), SessionError> {
        state.pending_input = None;
        feedback::finalize_checkout(&mut state);
        state.touch();
        Ok((state, Next::Continue))
    }
}

/// Builds the session graph: every pipeline node routes through the router's
/// decision table; only checkout has a fixed exit edge.
fn build_graph(
    catalog: Arc<dyn CatalogGateway>,
    reasoning: Arc<dyn ReasoningGateway>,
    config: Arc<OrchestratorConfig>,
    checkpoint_log: Option<Arc<dyn CheckpointLog<SessionState>>>,
) -> Result<CompiledGraph<SessionState>, CompilationError> {
    let mut graph = StateGraph::<SessionState>::new();
    graph
        .add_node(
            "plan",
            Arc::new(PlanNode {
                reasoning: reasoning.clone(),
                config: config.clone(),
            }),
        )
        .add_node(
            "collect",
            Arc::new(CollectNode {
                catalog: catalog.clone(),
                config: config.clone(),
            }),
        )
        .add_node(
            "reason",
            Arc::new(ReasonNode {
                reasoning: reasoning.clone(),
                config: config.clone(),
            }),
        )
        .add_node(
            "validate",
            Arc::new(ValidateNode {
                config: config.clone(),
            }),
        )
        .add_node("assemble", Arc::new(AssembleNode))
        .add_node("ask_confirmation", Arc::new(AskConfirmationNode))
        .add_node(
            "process_feedback",
            Arc::new(ProcessFeedbackNode {
                catalog,
                reasoning,
                config,
            }),
        )
        .add_node("checkout", Arc::new(CheckoutNode))
        .add_edge(START, "plan")
        .add_edge("checkout", END);

    for source in [
        "plan",
        "collect",
        "reason",
        "validate",
        "assemble",
        "ask_confirmation",
        "process_feedback",
    ] {
        graph.add_conditional_edges(source, Arc::new(router::route), None);
    }

    match checkpoint_log {
        Some(log) => graph.compile_with_checkpoint_log(log),
        None => graph.compile(),
    }
}

/// Caller-facing handle for shopping sessions.
///
/// The caller drives the loop: run until the state parks
/// (`awaiting_input == true`), show `messages`, collect an utterance, submit
/// it, repeat until the session is terminal.
pub struct ShoppingSession {
    graph: CompiledGraph<SessionState>,
    checkpoint_log: Option<Arc<dyn CheckpointLog<SessionState>>>,
}

impl ShoppingSession {
    /// Builds a session runner without persistence.
    pub fn new(
        catalog: Arc<dyn CatalogGateway>,
        reasoning: Arc<dyn ReasoningGateway>,
        config: OrchestratorConfig,
    ) -> Result<Self, CompilationError> {
        let graph = build_graph(catalog, reasoning, Arc::new(config), None)?;
        Ok(Self {
            graph,
            checkpoint_log: None,
        })
    }

    /// Builds a session runner that checkpoints every run into `log`.
    pub fn with_checkpoint_log(
        catalog: Arc<dyn CatalogGateway>,
        reasoning: Arc<dyn ReasoningGateway>,
        config: OrchestratorConfig,
        log: Arc<dyn CheckpointLog<SessionState>>,
    ) -> Result<Self, CompilationError> {
        let graph = build_graph(catalog, reasoning, Arc::new(config), Some(log.clone()))?;
        Ok(Self {
            graph,
            checkpoint_log: Some(log),
        })
    }

    /// Starts a session from a free-text request and runs it until it parks.
    pub async fn start(&self, request_text: impl Into<String>) -> Result<SessionState, SessionError> {
        let mut state = SessionState::new(ParsedRequest::default());
        state.pending_input = Some(request_text.into());
        self.run(state).await
    }

    /// Starts a session from already-parsed items.
    pub async fn start_with_items(
        &self,
        items: Vec<RequestItem>,
    ) -> Result<SessionState, SessionError> {
        let request = ParsedRequest {
            raw_input: String::new(),
            items,
        };
        self.run(SessionState::new(request)).await
    }

    /// Advances a session until the router parks or terminates it.
    pub async fn run(&self, state: SessionState) -> Result<SessionState, SessionError> {
        let config = RunConfig {
            session_id: Some(state.session_id.clone()),
            start_node_id: None,
        };
        self.graph.invoke(state, Some(config)).await
    }

    /// Hands one requester utterance to a parked session and advances it.
    pub async fn submit(
        &self,
        mut state: SessionState,
        input: impl Into<String>,
    ) -> Result<SessionState, SessionError> {
        state.submit_input(input.into());
        self.run(state).await
    }

    /// Reloads the latest checkpoint for a session id, if persistence is
    /// attached and the session was ever checkpointed.
    pub async fn resume(&self, session_id: &str) -> Result<Option<SessionState>, SessionError> {
        match &self.checkpoint_log {
            Some(log) => Ok(log.latest(session_id).await?.map(|cp| cp.state)),
            None => Ok(None),
        }
    }
}
