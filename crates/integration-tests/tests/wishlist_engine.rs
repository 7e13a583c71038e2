//! Integration tests for the optimistic wishlist mutation engine.
//!
//! Covers the optimistic round-trip, exact rollback on failure, per-product
//! serialization, cross-product independence, and reconciliation against the
//! server.

use std::sync::Arc;

use copperbay_core::ProductId;
use copperbay_integration_tests::{
    MockGateway, RecordingNotifier, WishlistCall, init_tracing, next_wishlist_settle, product,
    test_config,
};
use copperbay_storefront::api::{GatewayError, StoreApi};
use copperbay_storefront::notify::Notifier;
use copperbay_storefront::error::StoreError;
use copperbay_storefront::events::{WishlistAction, WishlistEvent};
use copperbay_storefront::notify::NoticeLevel;
use copperbay_storefront::state::StoreState;

fn network_error() -> GatewayError {
    GatewayError::Network("connection reset".to_string())
}

fn store_with(
    mock: &Arc<MockGateway>,
    notifier: &Arc<RecordingNotifier>,
) -> StoreState {
    StoreState::with_gateway(
        test_config(),
        Arc::clone(mock) as Arc<dyn StoreApi>,
        Arc::clone(notifier) as Arc<dyn Notifier>,
    )
}

// =============================================================================
// Optimistic round-trip
// =============================================================================

/// A toggle is visible to subscribers before the remote call settles.
#[tokio::test]
async fn test_toggle_applies_immediately() {
    init_tracing();
    let mock = MockGateway::new();
    let gate = mock.gate_mutations();
    let store = store_with(&mock, &RecordingNotifier::new());
    let mut events = store.subscribe();
    let item = product(42);

    store.wishlist().toggle(&item).expect("toggle accepted");

    // Optimistic state, while the remote call is still held open.
    let state = store.wishlist().state();
    assert!(state.contains(ProductId::new(42)));
    assert_eq!(state.count, 1);
    assert_eq!(state.items.len(), 1);
    assert!(store.wishlist().is_pending(ProductId::new(42)));

    gate.open();
    let settle = next_wishlist_settle(&mut events).await;
    assert!(matches!(
        settle,
        WishlistEvent::Confirmed {
            action: WishlistAction::Add,
            ..
        }
    ));

    // Confirmation changes nothing locally; the optimistic state was right.
    let state = store.wishlist().state();
    assert!(state.contains(ProductId::new(42)));
    assert_eq!(state.count, 1);
    assert!(!store.wishlist().is_pending(ProductId::new(42)));
    assert_eq!(
        mock.wishlist_calls(),
        vec![WishlistCall::Add(ProductId::new(42))]
    );
}

/// A failed add restores exactly the pre-toggle snapshot.
#[tokio::test]
async fn test_failed_add_rolls_back_to_snapshot() {
    let mock = MockGateway::new();
    mock.push_wishlist_result(Err(network_error()));
    let notifier = RecordingNotifier::new();
    let store = store_with(&mock, &notifier);
    let mut events = store.subscribe();

    let before = store.wishlist().state();
    store.wishlist().toggle(&product(42)).expect("toggle accepted");

    let settle = next_wishlist_settle(&mut events).await;
    assert!(matches!(settle, WishlistEvent::RolledBack { .. }));

    assert_eq!(store.wishlist().state(), before);
    assert!(!store.wishlist().is_pending(ProductId::new(42)));

    let notices = notifier.notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
}

/// A failed removal re-adds the item at its original position.
#[tokio::test]
async fn test_failed_remove_restores_item_position() {
    let mock = MockGateway::new();
    let store = store_with(&mock, &RecordingNotifier::new());
    let mut events = store.subscribe();

    // Build a three-item wishlist.
    for id in [1, 2, 3] {
        store.wishlist().toggle(&product(id)).expect("toggle accepted");
        next_wishlist_settle(&mut events).await;
    }
    let before = store.wishlist().state();

    // Removal of the middle item fails.
    mock.push_wishlist_result(Err(network_error()));
    store.wishlist().toggle(&product(2)).expect("toggle accepted");

    // Optimistically gone...
    assert!(!store.wishlist().is_wishlisted(ProductId::new(2)));

    let settle = next_wishlist_settle(&mut events).await;
    assert!(matches!(
        settle,
        WishlistEvent::RolledBack {
            action: WishlistAction::Remove,
            ..
        }
    ));

    // ...and back, in the same slot.
    assert_eq!(store.wishlist().state(), before);
}

// =============================================================================
// Per-product serialization and independence
// =============================================================================

/// A second toggle while the first is in flight is rejected with Busy and
/// leaves the optimistic state alone.
#[tokio::test]
async fn test_second_toggle_is_rejected_while_in_flight() {
    let mock = MockGateway::new();
    let gate = mock.gate_mutations();
    let store = store_with(&mock, &RecordingNotifier::new());
    let mut events = store.subscribe();
    let item = product(42);

    store.wishlist().toggle(&item).expect("first toggle accepted");
    mock.wait_for_mutations(1).await;

    let err = store.wishlist().toggle(&item).expect_err("second toggle busy");
    assert!(matches!(err, StoreError::Busy(id) if id == ProductId::new(42)));

    // The rejection did not disturb the optimistic state.
    assert!(store.wishlist().is_wishlisted(ProductId::new(42)));
    assert_eq!(store.wishlist().state().count, 1);

    gate.open();
    next_wishlist_settle(&mut events).await;

    // Once settled the product can be toggled again.
    store.wishlist().toggle(&item).expect("toggle after settle");
    next_wishlist_settle(&mut events).await;
    assert!(!store.wishlist().is_wishlisted(ProductId::new(42)));
}

/// Operations on different products run in parallel and settle
/// independently.
#[tokio::test]
async fn test_different_products_are_independent() {
    let mock = MockGateway::new();
    let gate = mock.gate_mutations();
    // First mutation to settle fails, second succeeds.
    mock.push_wishlist_result(Err(network_error()));
    mock.push_wishlist_result(Ok(()));
    let store = store_with(&mock, &RecordingNotifier::new());
    let mut events = store.subscribe();

    store.wishlist().toggle(&product(1)).expect("toggle 1");
    store.wishlist().toggle(&product(2)).expect("toggle 2");
    mock.wait_for_mutations(2).await;

    assert_eq!(store.wishlist().state().count, 2);
    gate.open();

    let first = next_wishlist_settle(&mut events).await;
    let second = next_wishlist_settle(&mut events).await;
    let rolled_back = [first, second]
        .iter()
        .filter(|event| matches!(event, WishlistEvent::RolledBack { .. }))
        .count();
    assert_eq!(rolled_back, 1);

    // Exactly one product survived; the rollback touched only its own.
    let state = store.wishlist().state();
    assert_eq!(state.count, 1);
    assert_eq!(state.items.len(), 1);
}

// =============================================================================
// End-to-end scenario
// =============================================================================

/// Wishlist starts empty; toggle(42) confirms; a second toggle(42) fails and
/// rolls back to the confirmed state, with a notification shown.
#[tokio::test]
async fn test_confirm_then_failed_untoggle_scenario() {
    let mock = MockGateway::new();
    let notifier = RecordingNotifier::new();
    let store = store_with(&mock, &notifier);
    let mut events = store.subscribe();
    let item = product(42);

    // toggle(42): optimistic {42}, count=1; gateway succeeds.
    store.wishlist().toggle(&item).expect("first toggle");
    assert!(store.wishlist().is_wishlisted(ProductId::new(42)));
    assert_eq!(store.wishlist().state().count, 1);
    assert!(matches!(
        next_wishlist_settle(&mut events).await,
        WishlistEvent::Confirmed { .. }
    ));

    // toggle(42) again: optimistic {}, count=0; gateway fails.
    mock.push_wishlist_result(Err(network_error()));
    store.wishlist().toggle(&item).expect("second toggle");
    assert!(!store.wishlist().is_wishlisted(ProductId::new(42)));
    assert_eq!(store.wishlist().state().count, 0);

    assert!(matches!(
        next_wishlist_settle(&mut events).await,
        WishlistEvent::RolledBack { .. }
    ));

    // Rollback re-added 42.
    let state = store.wishlist().state();
    assert!(state.contains(ProductId::new(42)));
    assert_eq!(state.count, 1);

    let notices = notifier.notices();
    assert_eq!(notices.len(), 2);
    assert_eq!(notices[0].level, NoticeLevel::Success);
    assert_eq!(notices[1].level, NoticeLevel::Error);
}

// =============================================================================
// Reconciliation and reset
// =============================================================================

#[tokio::test]
async fn test_membership_probe_reconciles_local_mirror() {
    let mock = MockGateway::new();
    mock.set_membership(ProductId::new(7), true);
    let store = store_with(&mock, &RecordingNotifier::new());
    let item = product(7);

    assert!(!store.wishlist().is_wishlisted(ProductId::new(7)));
    let wishlisted = store
        .wishlist()
        .check_membership(&item)
        .await
        .expect("membership probe");
    assert!(wishlisted);

    let state = store.wishlist().state();
    assert!(state.contains(ProductId::new(7)));
    assert_eq!(state.count, 1);
    assert_eq!(state.items.len(), 1);
}

#[tokio::test]
async fn test_refresh_count_adopts_server_value() {
    let mock = MockGateway::new();
    mock.set_remote_count(4);
    let store = store_with(&mock, &RecordingNotifier::new());

    let count = store.wishlist().refresh_count().await.expect("count fetch");
    assert_eq!(count, 4);
    assert_eq!(store.wishlist().state().count, 4);
}

#[tokio::test]
async fn test_reset_clears_session_state() {
    let mock = MockGateway::new();
    let store = store_with(&mock, &RecordingNotifier::new());
    let mut events = store.subscribe();

    store.wishlist().toggle(&product(1)).expect("toggle");
    next_wishlist_settle(&mut events).await;

    store.wishlist().reset();
    let state = store.wishlist().state();
    assert!(state.items.is_empty());
    assert_eq!(state.count, 0);
    assert!(state.wishlisted.is_empty());
}
