//! Optimistic wishlist mutation engine.
//!
//! A toggle applies the projected end-state to the local mirror
//! synchronously, then reconciles against the server in the background. On
//! success the local state already matches and nothing else happens; on
//! failure the exact inverse of the optimistic change is applied. Each
//! operation carries its own identity, and only the operation that owns a
//! product's pending slot may roll it back - a settle that lost its slot
//! never touches state.
//!
//! Per-product operations are serialized: a toggle for a product with an
//! operation still in flight is rejected with [`StoreError::Busy`].
//! Operations on different products are fully independent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use copperbay_core::{Price, ProductId};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::types::Product;
use crate::api::{GatewayError, StoreApi};
use crate::error::{Result, StoreError};
use crate::events::{EventBus, StoreEvent, WishlistAction, WishlistEvent};
use crate::notify::{Notice, Notifier};

/// A product saved to the wishlist.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistItem {
    pub product_id: ProductId,
    pub title: String,
    pub price: Price,
    pub image: Option<String>,
}

impl From<&Product> for WishlistItem {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            price: product.price,
            image: product.images.first().cloned(),
        }
    }
}

/// The local wishlist mirror.
///
/// `wishlisted` and `items` always agree with each other; `count` matches
/// `wishlisted.len()` once fully synced, and reflects the optimistic state
/// while an operation is in flight.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WishlistState {
    pub wishlisted: HashSet<ProductId>,
    pub count: u32,
    pub items: Vec<WishlistItem>,
}

impl WishlistState {
    /// Whether the product is currently wishlisted in the local mirror.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.wishlisted.contains(&product_id)
    }
}

/// An outstanding optimistic operation, keyed by product in the engine's
/// pending map. Destroyed when the remote call settles.
#[derive(Debug, Clone, Copy)]
struct PendingOperation {
    id: Uuid,
    action: WishlistAction,
    started_at: DateTime<Utc>,
}

/// What the settle task needs to undo an optimistic apply exactly.
enum Applied {
    /// An item was added; rollback removes it again.
    Added,
    /// An item was removed from this position; rollback reinserts it there.
    Removed { index: usize, item: WishlistItem },
}

/// Wishlist store with optimistic mutations.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    api: Arc<dyn StoreApi>,
    state: watch::Sender<WishlistState>,
    pending: Mutex<HashMap<ProductId, PendingOperation>>,
    events: EventBus,
    notifier: Arc<dyn Notifier>,
}

impl WishlistStore {
    /// Create a new wishlist store.
    #[must_use]
    pub fn new(api: Arc<dyn StoreApi>, events: EventBus, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(WishlistState::default());
        Self {
            inner: Arc::new(WishlistInner {
                api,
                state,
                pending: Mutex::new(HashMap::new()),
                events,
                notifier,
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes. Every successful mutation notifies each
    /// receiver once.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<WishlistState> {
        self.inner.state.subscribe()
    }

    /// Whether the product is wishlisted in the local mirror.
    #[must_use]
    pub fn is_wishlisted(&self, product_id: ProductId) -> bool {
        self.inner.state.borrow().contains(product_id)
    }

    /// Whether an optimistic operation for the product is still in flight.
    #[must_use]
    pub fn is_pending(&self, product_id: ProductId) -> bool {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .contains_key(&product_id)
    }

    /// Toggle the product's wishlist membership.
    ///
    /// The projected end-state is applied synchronously and is visible to
    /// every subscriber before this returns; the remote write settles in the
    /// background. Completion is reported through the event bus
    /// ([`WishlistEvent::Confirmed`] / [`WishlistEvent::RolledBack`]) and the
    /// notifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Busy`] when an operation for this product is
    /// already in flight; no state is touched in that case.
    pub fn toggle(&self, product: &Product) -> Result<Uuid> {
        let product_id = product.id;
        let op = PendingOperation {
            id: Uuid::new_v4(),
            action: WishlistAction::Add, // decided under the lock below
            started_at: Utc::now(),
        };

        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if pending.contains_key(&product_id) {
            debug!(product_id = %product_id, "Toggle rejected, operation in flight");
            return Err(StoreError::Busy(product_id));
        }

        // Apply the projected end-state while holding the pending lock so
        // the busy check and the optimistic apply are one atomic step.
        let mut action = WishlistAction::Add;
        let mut applied = Applied::Added;
        self.inner.state.send_modify(|state| {
            if state.contains(product_id) {
                action = WishlistAction::Remove;
                state.wishlisted.remove(&product_id);
                state.count = state.count.saturating_sub(1);
                if let Some(index) = state
                    .items
                    .iter()
                    .position(|item| item.product_id == product_id)
                {
                    applied = Applied::Removed {
                        index,
                        item: state.items.remove(index),
                    };
                }
            } else {
                state.wishlisted.insert(product_id);
                state.count += 1;
                state.items.push(WishlistItem::from(product));
            }
        });

        let op = PendingOperation { action, ..op };
        pending.insert(product_id, op);
        drop(pending);

        info!(product_id = %product_id, op = %op.id, action = ?action, "Wishlist toggle applied");
        self.inner.events.emit(StoreEvent::Wishlist(WishlistEvent::Applied {
            op: op.id,
            product_id,
            action,
        }));

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let result = match action {
                WishlistAction::Add => inner.api.add_to_wishlist(product_id).await,
                WishlistAction::Remove => inner.api.remove_from_wishlist(product_id).await,
            };
            inner.settle(op, product_id, applied, result);
        });

        Ok(op.id)
    }

    /// Probe the server for the product's wishlist membership and reconcile
    /// the local mirror.
    ///
    /// The mirror is left alone while an optimistic operation for this
    /// product is in flight - the in-flight operation's settle is the
    /// authority then.
    ///
    /// # Errors
    ///
    /// Returns the gateway's classified error.
    pub async fn check_membership(&self, product: &Product) -> Result<bool> {
        let product_id = product.id;
        let wishlisted = self.inner.api.check_wishlist_membership(product_id).await?;

        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if pending.contains_key(&product_id) {
            return Ok(wishlisted);
        }

        let changed = self.inner.state.send_if_modified(|state| {
            if wishlisted == state.contains(product_id) {
                return false;
            }
            if wishlisted {
                state.wishlisted.insert(product_id);
                state.count += 1;
                state.items.push(WishlistItem::from(product));
            } else {
                state.wishlisted.remove(&product_id);
                state.count = state.count.saturating_sub(1);
                state.items.retain(|item| item.product_id != product_id);
            }
            true
        });
        drop(pending);

        if changed {
            debug!(product_id = %product_id, wishlisted, "Reconciled membership from server");
            self.inner
                .events
                .emit(StoreEvent::Wishlist(WishlistEvent::Synced));
        }

        Ok(wishlisted)
    }

    /// Fetch the server-side wishlist count and reconcile the local counter.
    ///
    /// Skipped while any operation is in flight - the server value is about
    /// to change under us.
    ///
    /// # Errors
    ///
    /// Returns the gateway's classified error.
    pub async fn refresh_count(&self) -> Result<u32> {
        let count = self.inner.api.wishlist_count().await?;

        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if !pending.is_empty() {
            return Ok(count);
        }

        let changed = self.inner.state.send_if_modified(|state| {
            if state.count == count {
                return false;
            }
            state.count = count;
            true
        });
        drop(pending);

        if changed {
            self.inner
                .events
                .emit(StoreEvent::Wishlist(WishlistEvent::Synced));
        }

        Ok(count)
    }

    /// Tear down session-scoped state on logout.
    ///
    /// Pending records are dropped too, so a settle from before the reset
    /// finds its slot gone and leaves the fresh state alone.
    pub fn reset(&self) {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        self.inner.state.send_if_modified(|state| {
            if *state == WishlistState::default() {
                return false;
            }
            *state = WishlistState::default();
            true
        });
        info!("Wishlist state reset");
    }
}

impl WishlistInner {
    /// Apply the outcome of a settled remote call.
    ///
    /// Only the operation that still owns the product's pending slot may
    /// mutate state; anything else returns without touching it.
    fn settle(
        &self,
        op: PendingOperation,
        product_id: ProductId,
        applied: Applied,
        result: std::result::Result<(), GatewayError>,
    ) {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match pending.get(&product_id) {
            Some(current) if current.id == op.id => {
                pending.remove(&product_id);
            }
            _ => {
                // Superseded (or reset); a newer operation owns this product.
                warn!(product_id = %product_id, op = %op.id, "Stale settle ignored");
                return;
            }
        }

        let elapsed_ms = (Utc::now() - op.started_at).num_milliseconds();
        match result {
            Ok(()) => {
                drop(pending);
                info!(product_id = %product_id, op = %op.id, elapsed_ms, "Wishlist toggle confirmed");
                self.events.emit(StoreEvent::Wishlist(WishlistEvent::Confirmed {
                    op: op.id,
                    product_id,
                    action: op.action,
                }));
                self.notifier.notify(match op.action {
                    WishlistAction::Add => Notice::success("Added to wishlist"),
                    WishlistAction::Remove => Notice::success("Removed from wishlist"),
                });
            }
            Err(err) => {
                // Roll back the optimistic apply exactly, while still
                // holding the pending lock so no new toggle interleaves.
                self.state.send_modify(|state| match &applied {
                    Applied::Added => {
                        state.wishlisted.remove(&product_id);
                        state.count = state.count.saturating_sub(1);
                        state.items.retain(|item| item.product_id != product_id);
                    }
                    Applied::Removed { index, item } => {
                        state.wishlisted.insert(product_id);
                        state.count += 1;
                        let index = (*index).min(state.items.len());
                        state.items.insert(index, item.clone());
                    }
                });
                drop(pending);

                warn!(
                    product_id = %product_id,
                    op = %op.id,
                    elapsed_ms,
                    error = %err,
                    "Wishlist toggle failed, rolled back"
                );
                self.events.emit(StoreEvent::Wishlist(WishlistEvent::RolledBack {
                    op: op.id,
                    product_id,
                    action: op.action,
                }));
                self.notifier.notify(match op.action {
                    WishlistAction::Add => Notice::error("Could not add to wishlist"),
                    WishlistAction::Remove => Notice::error("Could not remove from wishlist"),
                });
            }
        }
    }
}
