//! Feedback processing: classify one utterance, apply one isolated mutation.
//!
//! The classifier output is a closed action set; target items are matched
//! against the actual cart keys, never a fixed vocabulary. Mutations are
//! all-or-nothing: handlers work on a scratch cart and commit only on
//! success, so a failed mutation leaves the cart in its last-known-good
//! state and no intermediate state is ever observable.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::assemble::assemble_into_cart;
use crate::collect::collect_for_product;
use crate::config::OrchestratorConfig;
use crate::gateway::{CatalogGateway, ReasoningGateway};
use crate::model::{
    normalize_name, DecisionRecord, FeedbackActionKind, Judgment, RequestItem, Variant,
    VendorComparison,
};
use crate::retry;
use crate::state::{SessionPhase, SessionState};
use crate::validate::Validator;

/// Failure of one feedback mutation. Reported to the requester as a message;
/// the cart is unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MutationError {
    /// Feedback referenced a product not present in the cart.
    #[error("product '{0}' is not in the cart")]
    ItemNotFound(String),

    /// No known action or no identifiable cart item.
    #[error("could not understand the request: {0}")]
    Ambiguous(String),

    /// The mutation itself failed (gateway exhaustion, no fresh variants...).
    #[error("{0}")]
    Failed(String),
}

/// Identifies which cart products an utterance refers to.
///
/// Matches the normalized form of each real cart key (underscores as spaces)
/// against the utterance: full-phrase match first, then per-word — a
/// multi-word product matches when all but at most one of its words appear.
pub fn identify_targets(input: &str, cart_products: &[String]) -> Vec<String> {
    let lower = input.to_lowercase();
    let input_words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect();

    let mut targets = Vec::new();
    for product in cart_products {
        let normalized = product.replace('_', " ").to_lowercase();
        if lower.contains(&normalized) {
            targets.push(product.clone());
            continue;
        }
        let name_words: Vec<&str> = normalized.split_whitespace().collect();
        let matched = name_words
            .iter()
            .filter(|w| input_words.contains(w))
            .count();
        if matched >= 1 && (name_words.len() == 1 || matched >= name_words.len() - 1) {
            targets.push(product.clone());
        }
    }
    targets
}

static QUANTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*(kg|g|l|ml)\b").expect("valid regex"));

/// Extracts a quantity and unit from feedback text ("1kg", "500 g", "0.5kg").
///
/// Grams normalize to kilograms and millilitres to litres.
pub fn extract_quantity(text: &str) -> Option<(f64, String)> {
    let lower = text.to_lowercase();
    let caps = QUANTITY.captures(&lower)?;
    let mut quantity: f64 = caps[1].parse().ok()?;
    let mut unit = caps[2].to_string();
    if unit == "g" {
        quantity /= 1000.0;
        unit = "kg".to_string();
    } else if unit == "ml" {
        quantity /= 1000.0;
        unit = "l".to_string();
    }
    Some((quantity, unit))
}

/// Strips a leading action verb so a missed target can still be named in the
/// item-not-found report (e.g. "remove basmati rice" when the cart no longer
/// holds it).
fn guess_product(input: &str) -> Option<String> {
    let lower = input.trim().to_lowercase();
    for verb in ["remove", "delete", "drop", "modify", "change"] {
        if let Some(rest) = lower.strip_prefix(verb) {
            let rest = rest.trim().trim_start_matches("the ").trim();
            if !rest.is_empty() {
                return Some(normalize_name(rest));
            }
        }
    }
    None
}

/// Applies one feedback utterance to the session.
///
/// Classification goes through the reasoning gateway (retry-wrapped); the
/// resulting action is dispatched to its handler. Every outcome — success or
/// failure — appends a message; failures leave the cart untouched.
pub async fn process(
    state: &mut SessionState,
    input: &str,
    catalog: &dyn CatalogGateway,
    reasoning: &dyn ReasoningGateway,
    config: &OrchestratorConfig,
) {
    state.phase = SessionPhase::ProcessingFeedback;
    let cart_products = state.cart.product_names();

    let directive = match retry::execute(&config.retry, || {
        reasoning.classify_feedback(input, &cart_products)
    })
    .await
    {
        Ok(directive) => directive,
        Err(err) => {
            tracing::error!(error = %err, "feedback classification failed");
            state.notify("Sorry, I couldn't understand your request. Please try again.");
            return;
        }
    };

    let local_targets = identify_targets(input, &cart_products);
    let target = local_targets
        .first()
        .cloned()
        .or_else(|| {
            directive
                .target_products
                .iter()
                .find(|p| cart_products.contains(p))
                .cloned()
        });

    tracing::info!(
        action = ?directive.action,
        target = target.as_deref().unwrap_or("-"),
        "feedback classified"
    );
    state.record(DecisionRecord::new(
        "feedback",
        target.clone(),
        serde_json::json!({
            "input": input,
            "action": directive.action,
            "identified_targets": local_targets,
        }),
    ));

    let outcome = match directive.action {
        FeedbackActionKind::Modify => match target {
            Some(product) => apply_modify(state, &product, input, catalog, reasoning, config).await,
            None => Err(missing_target(input)),
        },
        FeedbackActionKind::Remove => {
            let product = target
                .or_else(|| guess_product(input))
                .ok_or_else(|| MutationError::Ambiguous("no product named".to_string()));
            match product {
                Ok(product) => apply_remove(state, &product),
                Err(e) => Err(e),
            }
        }
        FeedbackActionKind::Recompare => {
            // A vendor question against a single-entry cart can only mean
            // that entry, even when the product is not named.
            let product = target.or_else(|| match state.cart.entries.as_slice() {
                [only] => Some(only.product_name.clone()),
                _ => None,
            });
            match product {
                Some(product) => apply_recompare(state, &product, catalog, config).await,
                None => Err(missing_target(input)),
            }
        }
        FeedbackActionKind::Add => {
            let text = directive
                .parameters
                .new_items_text
                .clone()
                .unwrap_or_else(|| input.to_string());
            apply_add(state, &text, catalog, reasoning, config).await
        }
        FeedbackActionKind::Checkout => {
            finalize_checkout(state);
            Ok(())
        }
        FeedbackActionKind::Unrecognized => Err(MutationError::Ambiguous(
            "feedback matched no known action".to_string(),
        )),
    };

    if let Err(err) = outcome {
        tracing::warn!(error = %err, "feedback mutation not applied");
        state.notify(err.to_string());
    }
}

fn missing_target(input: &str) -> MutationError {
    match guess_product(input) {
        Some(product) => MutationError::ItemNotFound(product),
        None => MutationError::Ambiguous("no cart item identified".to_string()),
    }
}

/// Reasons and validates with the configured re-reasoning budget.
///
/// On rejection, the rejection reason is appended to the requirement context
/// for the next reasoning call; after the budget is spent the last rejection
/// is surfaced instead of silently defaulting.
pub async fn judge_with_revalidation(
    reasoning: &dyn ReasoningGateway,
    config: &OrchestratorConfig,
    product: &str,
    variants: &[Variant],
    queried_vendors: &[String],
    requirement: Option<&str>,
) -> Result<Judgment, String> {
    let validator = Validator::new(config.confidence_floor);
    let mut context = requirement.map(str::to_string);
    let mut attempt = 0usize;

    loop {
        let judgment = retry::execute(&config.retry, || {
            reasoning.reason(product, variants, context.as_deref())
        })
        .await
        .map_err(|e| format!("reasoning failed for '{product}': {e}"))?;

        match validator.validate(&judgment, queried_vendors) {
            Ok(()) => return Ok(judgment),
            Err(rejection) => {
                tracing::warn!(
                    product = %product,
                    attempt,
                    rejection = %rejection,
                    "judgment rejected"
                );
                if attempt >= config.max_revalidations {
                    return Err(format!(
                        "no acceptable judgment for '{product}' after {} attempts: {rejection}",
                        attempt + 1
                    ));
                }
                attempt += 1;
                context = Some(match context {
                    Some(prev) => format!("{prev}; previous choice rejected: {rejection}"),
                    None => format!("previous choice rejected: {rejection}"),
                });
            }
        }
    }
}

/// Replans one cart entry against a new requirement. Only that entry changes;
/// aggregates are recomputed from scratch.
async fn apply_modify(
    state: &mut SessionState,
    product: &str,
    input: &str,
    catalog: &dyn CatalogGateway,
    reasoning: &dyn ReasoningGateway,
    config: &OrchestratorConfig,
) -> Result<(), MutationError> {
    let current = state
        .cart
        .entry(product)
        .cloned()
        .ok_or_else(|| MutationError::ItemNotFound(product.to_string()))?;

    let outcome = collect_for_product(catalog, &config.vendors, &config.retry, product).await;
    if outcome.is_empty() {
        return Err(MutationError::Failed(format!(
            "could not find fresh options for '{product}'; keeping the current selection"
        )));
    }
    state
        .variants
        .insert(product.to_string(), outcome.variants.clone());
    state
        .queried_vendors
        .insert(product.to_string(), outcome.queried_vendors.clone());

    let judgment = judge_with_revalidation(
        reasoning,
        config,
        product,
        &outcome.variants,
        &outcome.queried_vendors,
        Some(input),
    )
    .await
    .map_err(MutationError::Failed)?;

    // Requested amount: an explicit quantity in the feedback wins; otherwise
    // the original request (or the current entry's pack count) stands.
    let mut requested = state
        .request
        .items
        .iter()
        .find(|i| i.name == product)
        .cloned()
        .unwrap_or_else(|| RequestItem::new(product, current.quantity, "packs"));
    if let Some((quantity, unit)) = extract_quantity(input) {
        requested.quantity = quantity;
        requested.unit = unit;
    }
    if let Some(item) = state.request.items.iter_mut().find(|i| i.name == product) {
        *item = requested.clone();
    }

    let mut scratch = state.cart.clone();
    assemble_into_cart(&mut scratch, &judgment, &requested);
    scratch
        .check_invariant()
        .map_err(MutationError::Failed)?;
    state.cart = scratch;

    let updated = state.cart.entry(product).cloned();
    state.record(DecisionRecord::new(
        "modification",
        Some(product.to_string()),
        serde_json::json!({
            "requirement": input,
            "old": { "brand": current.brand, "vendor": current.vendor, "unit_price": current.unit_price },
            "new": { "brand": judgment.variant.brand, "vendor": judgment.vendor, "unit_price": judgment.variant.price },
            "cart_total_after": state.cart.total_price,
        }),
    ));
    if let Some(entry) = updated {
        state.notify(format!(
            "Updated '{}': {} ({} x {}) from {} at {:.2}. {}\nUpdated cart total: {:.2}",
            product,
            entry.brand,
            entry.quantity,
            entry.unit,
            entry.vendor,
            entry.unit_price,
            judgment.rationale,
            state.cart.total_price,
        ));
    }
    Ok(())
}

/// Deletes one entry by key; an absent key is an item-not-found outcome, not
/// a silent no-op.
fn apply_remove(state: &mut SessionState, product: &str) -> Result<(), MutationError> {
    let removed = state
        .cart
        .remove(product)
        .ok_or_else(|| MutationError::ItemNotFound(product.to_string()))?;

    state.record(DecisionRecord::new(
        "removal",
        Some(product.to_string()),
        serde_json::json!({
            "removed_line_total": removed.line_total,
            "cart_total_after": state.cart.total_price,
            "items_remaining": state.cart.entries.len(),
        }),
    ));
    state.notify(format!(
        "Removed '{}' from the cart. Updated cart total: {:.2}",
        product, state.cart.total_price
    ));
    Ok(())
}

/// Pure read: fresh variants, price delta per vendor against the current
/// choice, structured comparison in the message log. The cart is untouched.
async fn apply_recompare(
    state: &mut SessionState,
    product: &str,
    catalog: &dyn CatalogGateway,
    config: &OrchestratorConfig,
) -> Result<(), MutationError> {
    let current = state
        .cart
        .entry(product)
        .cloned()
        .ok_or_else(|| MutationError::ItemNotFound(product.to_string()))?;

    let outcome = collect_for_product(catalog, &config.vendors, &config.retry, product).await;
    if outcome.is_empty() {
        return Err(MutationError::Failed(format!(
            "no variants available to compare for '{product}'"
        )));
    }

    // Best fresh offering per vendor.
    let mut best: BTreeMap<&str, &Variant> = BTreeMap::new();
    for variant in &outcome.variants {
        let slot = best.entry(variant.vendor.as_str()).or_insert(variant);
        if variant.unit_price() < slot.unit_price() {
            *slot = variant;
        }
    }
    let baseline = best
        .get(current.vendor.as_str())
        .map(|v| v.unit_price())
        .unwrap_or(current.unit_price);

    let mut comparisons: Vec<VendorComparison> = best
        .values()
        .map(|v| VendorComparison {
            vendor: v.vendor.clone(),
            brand: v.brand.clone(),
            unit_price: v.unit_price(),
            delta: v.unit_price() - baseline,
        })
        .collect();
    comparisons.sort_by(|a, b| {
        a.unit_price
            .partial_cmp(&b.unit_price)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut report = format!(
        "Comparison for '{}' (current: {} from {} at {:.2} per unit):\n",
        product,
        current.brand,
        current.vendor,
        baseline
    );
    for c in &comparisons {
        report.push_str(&format!(
            "- {}: {} at {:.2} per unit ({}{:.2} vs current)\n",
            c.vendor,
            c.brand,
            c.unit_price,
            if c.delta >= 0.0 { "+" } else { "" },
            c.delta
        ));
    }
    state.notify(report);

    state.record(DecisionRecord::new(
        "recomparison",
        Some(product.to_string()),
        serde_json::to_value(&comparisons)
            .unwrap_or(serde_json::Value::Null),
    ));
    Ok(())
}

/// Parses new items and runs the full pipeline for only those, merging into
/// the existing cart under the uniqueness invariant. Items already in the
/// cart are skipped.
async fn apply_add(
    state: &mut SessionState,
    text: &str,
    catalog: &dyn CatalogGateway,
    reasoning: &dyn ReasoningGateway,
    config: &OrchestratorConfig,
) -> Result<(), MutationError> {
    let items = retry::execute(&config.retry, || reasoning.parse_request(text))
        .await
        .map_err(|_| {
            MutationError::Failed(
                "could not parse the new items; try something like '1kg sugar, 500g tea'"
                    .to_string(),
            )
        })?;

    let mut scratch = state.cart.clone();
    let mut added = 0usize;
    for item in items {
        if scratch.entry(&item.name).is_some() {
            state.notify(format!("'{}' is already in the cart; skipping.", item.name));
            continue;
        }
        let outcome = collect_for_product(catalog, &config.vendors, &config.retry, &item.name).await;
        if outcome.is_empty() {
            state.notify(format!("Could not find '{}' at any vendor.", item.name));
            continue;
        }
        let judgment = match judge_with_revalidation(
            reasoning,
            config,
            &item.name,
            &outcome.variants,
            &outcome.queried_vendors,
            None,
        )
        .await
        {
            Ok(judgment) => judgment,
            Err(reason) => {
                state.notify(format!("Could not add '{}': {}", item.name, reason));
                continue;
            }
        };

        state
            .variants
            .insert(item.name.clone(), outcome.variants.clone());
        state
            .queried_vendors
            .insert(item.name.clone(), outcome.queried_vendors.clone());
        assemble_into_cart(&mut scratch, &judgment, &item);
        state.record(DecisionRecord::new(
            "addition",
            Some(item.name.clone()),
            serde_json::json!({
                "vendor": judgment.vendor,
                "unit_price": judgment.variant.price,
            }),
        ));
        if !state.request.items.iter().any(|i| i.name == item.name) {
            state.request.items.push(item);
        }
        added += 1;
    }

    if added == 0 {
        return Err(MutationError::Failed(
            "could not add any new items; please try different products".to_string(),
        ));
    }
    scratch.check_invariant().map_err(MutationError::Failed)?;
    state.cart = scratch;
    state.notify(format!(
        "Added {} new item(s). Updated cart total: {:.2}",
        added, state.cart.total_price
    ));
    Ok(())
}

/// Finalizes the cart into an immutable order summary and moves the session
/// to its terminal state. A checkout against an empty cart is refused and the
/// session stays parked.
pub fn finalize_checkout(state: &mut SessionState) -> bool {
    if state.cart.entries.is_empty() {
        state.notify("The cart is empty. Please add items before checkout.");
        state.awaiting_input = true;
        return false;
    }

    let order = state.cart.to_order_summary();
    let mut summary = format!(
        "Order summary: {} line(s), total {:.2}\n",
        order.lines.len(),
        order.total_price
    );
    for line in &order.lines {
        summary.push_str(&format!(
            "- {} {} x {} from {}: {:.2}\n",
            line.brand, line.quantity, line.unit, line.vendor, line.line_total
        ));
    }
    summary.push_str("Ready for checkout.");
    state.notify(summary);

    state.record(DecisionRecord::new(
        "checkout",
        None,
        serde_json::json!({
            "lines": order.lines.len(),
            "total_price": order.total_price,
        }),
    ));
    state.order = Some(order);
    state.phase = SessionPhase::CheckedOut;
    state.awaiting_input = false;
    state.pending_input = None;
    true
}
