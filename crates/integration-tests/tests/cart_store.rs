//! Integration tests for the local cart store.
//!
//! Covers transactional validation, the no-duplicate-lines rule, and the
//! watch-based subscription surface.

use std::sync::Arc;

use copperbay_core::ProductId;
use copperbay_integration_tests::{
    MockGateway, RecordingNotifier, product, test_config, variant_product,
};
use copperbay_storefront::error::StoreError;
use copperbay_storefront::events::{CartEvent, StoreEvent};
use copperbay_storefront::state::StoreState;
use rust_decimal::Decimal;

fn store() -> StoreState {
    StoreState::with_gateway(test_config(), MockGateway::new(), RecordingNotifier::new())
}

// =============================================================================
// Validation
// =============================================================================

#[tokio::test]
async fn test_zero_quantity_is_rejected() {
    let store = store();
    let err = store
        .cart()
        .add(&product(1), 0, None, None)
        .expect_err("zero quantity");
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(store.cart().state().lines.is_empty());
}

#[tokio::test]
async fn test_variant_product_requires_selection() {
    let store = store();
    let item = variant_product(1);

    let err = store
        .cart()
        .add(&item, 1, None, None)
        .expect_err("missing selections");
    assert!(matches!(err, StoreError::Validation(_)));

    let err = store
        .cart()
        .add(&item, 1, Some("Red".to_string()), None)
        .expect_err("missing size");
    assert!(matches!(err, StoreError::Validation(_)));

    let err = store
        .cart()
        .add(&item, 1, Some("Green".to_string()), Some("M".to_string()))
        .expect_err("color not offered");
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(store.cart().state().lines.is_empty());

    store
        .cart()
        .add(&item, 1, Some("Red".to_string()), Some("M".to_string()))
        .expect("valid selection");
    assert!(store.cart().is_in_cart(ProductId::new(1)));
}

// =============================================================================
// Duplicate lines
// =============================================================================

/// A repeated add with the same (product, color, size) fails with
/// DuplicateItem and leaves the cart byte-for-byte unchanged.
#[tokio::test]
async fn test_duplicate_line_is_rejected_without_mutation() {
    let store = store();
    let item = variant_product(1);

    store
        .cart()
        .add(&item, 2, Some("Red".to_string()), Some("M".to_string()))
        .expect("first add");
    let before = store.cart().state();

    let err = store
        .cart()
        .add(&item, 1, Some("Red".to_string()), Some("M".to_string()))
        .expect_err("duplicate line");
    assert!(matches!(
        err,
        StoreError::DuplicateItem { product_id } if product_id == ProductId::new(1)
    ));
    assert_eq!(store.cart().state(), before);
}

/// The same product with a different variant selection is a different line.
#[tokio::test]
async fn test_distinct_selections_make_distinct_lines() {
    let store = store();
    let item = variant_product(1);

    store
        .cart()
        .add(&item, 1, Some("Red".to_string()), Some("M".to_string()))
        .expect("red/m");
    store
        .cart()
        .add(&item, 1, Some("Blue".to_string()), Some("M".to_string()))
        .expect("blue/m");

    let state = store.cart().state();
    assert_eq!(state.lines.len(), 2);
    assert_eq!(state.total_quantity(), 2);
}

// =============================================================================
// Line management
// =============================================================================

#[tokio::test]
async fn test_remove_and_set_quantity() {
    let store = store();
    store.cart().add(&product(1), 1, None, None).expect("add 1");
    store.cart().add(&product(2), 1, None, None).expect("add 2");

    let found = store
        .cart()
        .set_quantity(ProductId::new(1), None, None, 3)
        .expect("set quantity");
    assert!(found);
    assert_eq!(store.cart().state().total_quantity(), 4);

    let found = store
        .cart()
        .set_quantity(ProductId::new(9), None, None, 2)
        .expect("set quantity on missing line");
    assert!(!found);

    let err = store
        .cart()
        .set_quantity(ProductId::new(1), None, None, 0)
        .expect_err("zero quantity");
    assert!(matches!(err, StoreError::Validation(_)));

    assert!(store.cart().remove(ProductId::new(1), None, None));
    assert!(!store.cart().remove(ProductId::new(1), None, None));
    assert!(!store.cart().is_in_cart(ProductId::new(1)));
    assert!(store.cart().is_in_cart(ProductId::new(2)));

    store.cart().clear();
    assert!(store.cart().state().lines.is_empty());
}

#[tokio::test]
async fn test_subtotal_tracks_lines() {
    let store = store();
    store.cart().add(&product(1), 2, None, None).expect("add");
    // product() prices everything at $19.99.
    assert_eq!(store.cart().state().subtotal().amount, Decimal::new(3998, 2));
}

// =============================================================================
// Subscription surface
// =============================================================================

/// Successful mutations notify watchers exactly once; rejected mutations
/// notify nobody.
#[tokio::test]
async fn test_watchers_see_mutations_not_rejections() {
    let store = store();
    let mut watcher = store.cart().watch();
    let mut events = store.subscribe();
    watcher.mark_unchanged();

    store.cart().add(&product(1), 1, None, None).expect("add");
    assert!(watcher.has_changed().expect("sender alive"));
    watcher.mark_unchanged();
    assert_eq!(
        events.recv().await.expect("cart event"),
        StoreEvent::Cart(CartEvent::LineAdded {
            product_id: ProductId::new(1)
        })
    );

    let _ = store
        .cart()
        .add(&product(1), 1, None, None)
        .expect_err("duplicate");
    assert!(!watcher.has_changed().expect("sender alive"));
    assert!(events.try_recv().is_err());
}

/// Multiple independent watchers all observe the same change.
#[tokio::test]
async fn test_multiple_watchers_observe_the_same_state() {
    let store = store();
    let mut first = store.cart().watch();
    let mut second = store.cart().watch();

    store.cart().add(&product(3), 1, None, None).expect("add");

    assert!(first.has_changed().expect("sender alive"));
    assert!(second.has_changed().expect("sender alive"));
    assert_eq!(
        first.borrow_and_update().lines.len(),
        second.borrow_and_update().lines.len()
    );
}
