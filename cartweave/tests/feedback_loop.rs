//! Feedback loop tests: modify, remove, recompare, add, checkout and the
//! unrecognized path, each as one isolated mutation against a parked session.


#[path = "common/mod.rs"]
mod common;

use std::sync::Arc;

use cartweave::{
    MockCatalog, MockReasoning, RequestItem, SessionPhase, SessionState, ShoppingSession,
};

use common::{fast_config, stocked_catalog};

fn session(catalog: MockCatalog) -> ShoppingSession {
    ShoppingSession::new(
        Arc::new(catalog),
        Arc::new(MockReasoning::new()),
        fast_config(),
    )
    .expect("graph compiles")
}

async fn parked_two_item_session(session: &ShoppingSession) -> SessionState {
    session
        .start_with_items(vec![
            RequestItem::new("basmati rice", 5.0, "kg"),
            RequestItem::new("fabric conditioner", 1.0, "l"),
        ])
        .await
        .unwrap()
}

/// **Scenario**: "remove basmati rice" removes only that entry; the new total
/// is exactly the untouched fabric-conditioner line total.
#[tokio::test]
async fn remove_targets_only_the_named_product() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;
    let conditioner_total = state.cart.entry("fabric_conditioner").unwrap().line_total;

    let state = session.submit(state, "remove basmati rice").await.unwrap();

    assert!(state.cart.entry("basmati_rice").is_none());
    let conditioner = state.cart.entry("fabric_conditioner").unwrap();
    assert_eq!(conditioner.line_total, conditioner_total);
    assert_eq!(state.cart.total_price, conditioner_total);
    state.cart.check_invariant().unwrap();
    assert!(state.awaiting_input);
}

/// **Scenario**: Removing the same product twice reports item-not-found the
/// second time and leaves the cart unchanged.
#[tokio::test]
async fn second_remove_is_item_not_found() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;

    let state = session.submit(state, "remove basmati rice").await.unwrap();
    let cart_after_first = state.cart.clone();

    let state = session.submit(state, "remove basmati rice").await.unwrap();
    assert_eq!(state.cart.entries, cart_after_first.entries);
    assert_eq!(state.cart.total_price, cart_after_first.total_price);
    assert!(state
        .messages
        .iter()
        .any(|m| m.contains("basmati_rice") && m.contains("not in the cart")));
}

/// **Scenario**: "why not zepto" returns a structured comparison and leaves
/// the cart entry byte-for-byte unchanged.
#[tokio::test]
async fn recompare_is_a_pure_read() {
    let session = session(stocked_catalog());
    let state = session
        .start_with_items(vec![RequestItem::new("basmati rice", 5.0, "kg")])
        .await
        .unwrap();
    // Current entry comes from bigbasket (310/kg); zepto is pricier (330/kg).
    let entry_before = state.cart.entry("basmati_rice").unwrap().clone();
    let updated_before = state.cart.last_updated;

    let state = session.submit(state, "why not zepto").await.unwrap();

    assert_eq!(state.cart.entry("basmati_rice").unwrap(), &entry_before);
    assert_eq!(state.cart.last_updated, updated_before);
    let report = state
        .messages
        .iter()
        .find(|m| m.contains("Comparison for 'basmati_rice'"))
        .expect("comparison message");
    assert!(report.contains("zepto"));
    assert!(report.contains("+20.00"));
    assert!(state
        .decisions
        .iter()
        .any(|d| d.kind == "recomparison"));
}

/// **Scenario**: A quantity modification replans only the named item; the
/// sibling entry is untouched and totals are recomputed.
#[tokio::test]
async fn modify_changes_only_the_named_item() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;
    let conditioner_before = state.cart.entry("fabric_conditioner").unwrap().clone();

    let state = session
        .submit(state, "make the basmati rice 2kg")
        .await
        .unwrap();

    let rice = state.cart.entry("basmati_rice").unwrap();
    assert_eq!(rice.quantity, 2.0);
    assert_eq!(rice.line_total, 620.0);
    assert_eq!(
        state.cart.entry("fabric_conditioner").unwrap(),
        &conditioner_before
    );
    assert_eq!(state.cart.total_price, 620.0 + conditioner_before.line_total);
    state.cart.check_invariant().unwrap();
}

/// **Scenario**: "add 1kg sugar" pipelines only the new item and merges it
/// under the uniqueness invariant; adding it again does not duplicate.
#[tokio::test]
async fn add_merges_new_items_without_duplicates() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;

    let state = session.submit(state, "add 1kg sugar").await.unwrap();
    assert_eq!(state.cart.entries.len(), 3);
    // bigbasket at 44/kg ranks ahead of zepto at 45.
    assert_eq!(state.cart.entry("sugar").unwrap().vendor, "bigbasket");

    let total_before = state.cart.total_price;
    let state = session.submit(state, "add 1kg sugar").await.unwrap();
    assert_eq!(state.cart.entries.len(), 3);
    assert_eq!(state.cart.total_price, total_before);
    assert!(state
        .messages
        .iter()
        .any(|m| m.contains("already in the cart")));
}

/// **Scenario**: An affirmative phrase checks out a non-empty cart into an
/// immutable order summary and the session becomes terminal.
#[tokio::test]
async fn confirm_checks_out_and_terminates() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;
    let expected_total = state.cart.total_price;

    let state = session.submit(state, "confirm").await.unwrap();

    assert!(state.is_terminal());
    assert_eq!(state.phase, SessionPhase::CheckedOut);
    assert!(!state.awaiting_input);
    let order = state.order.as_ref().expect("order summary");
    assert_eq!(order.total_price, expected_total);
    assert_eq!(order.lines.len(), 2);
    assert!(state.messages.iter().any(|m| m.contains("Order summary")));
}

/// **Scenario**: Checkout against an empty cart is refused and the session
/// stays parked.
#[tokio::test]
async fn checkout_requires_a_non_empty_cart() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;

    let state = session.submit(state, "remove basmati rice").await.unwrap();
    let state = session
        .submit(state, "remove fabric conditioner")
        .await
        .unwrap();
    assert!(state.cart.entries.is_empty());

    let state = session.submit(state, "checkout").await.unwrap();
    assert!(!state.is_terminal());
    assert!(state.awaiting_input);
    assert!(state
        .messages
        .iter()
        .any(|m| m.contains("cart is empty")));
}

/// **Scenario**: Feedback that maps to no action and no cart item changes
/// nothing and reports the ambiguity.
#[tokio::test]
async fn unrecognized_feedback_changes_nothing() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;
    let cart_before = state.cart.clone();

    let state = session
        .submit(state, "what's the weather like")
        .await
        .unwrap();

    assert_eq!(state.cart.entries, cart_before.entries);
    assert_eq!(state.cart.total_price, cart_before.total_price);
    assert!(state.awaiting_input);
    assert!(state
        .messages
        .iter()
        .any(|m| m.contains("could not understand") || m.contains("no known action")));
}

/// **Scenario**: Mutations apply strictly in the order feedback arrives —
/// a modify after a remove operates on the already-reduced cart.
#[tokio::test]
async fn mutations_apply_in_arrival_order() {
    let session = session(stocked_catalog());
    let state = parked_two_item_session(&session).await;

    let state = session.submit(state, "remove fabric conditioner").await.unwrap();
    let state = session
        .submit(state, "make the basmati rice 2kg")
        .await
        .unwrap();

    assert_eq!(state.cart.entries.len(), 1);
    assert_eq!(state.cart.total_price, 620.0);
    state.cart.check_invariant().unwrap();
}
