//! Subscription surface for store-wide change notifications.
//!
//! Independently mounted consumers subscribe once and observe cache fills and
//! mutation outcomes without polling or re-fetching. Each successful mutation
//! produces exactly one event per subscriber; rejected mutations produce
//! none. No ordering is guaranteed across independent resources or products.

use copperbay_core::ProductId;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::catalog::ResourceKey;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// Direction of a wishlist toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistAction {
    Add,
    Remove,
}

impl WishlistAction {
    /// The action that undoes this one.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }
}

/// Lifecycle events of an optimistic wishlist operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistEvent {
    /// The projected end-state was applied locally; the remote call is in
    /// flight.
    Applied {
        op: Uuid,
        product_id: ProductId,
        action: WishlistAction,
    },
    /// The remote call succeeded; local state already matches.
    Confirmed {
        op: Uuid,
        product_id: ProductId,
        action: WishlistAction,
    },
    /// The remote call failed; the exact inverse was applied.
    RolledBack {
        op: Uuid,
        product_id: ProductId,
        action: WishlistAction,
    },
    /// The local mirror was reconciled against the server (membership probe
    /// or count refresh).
    Synced,
}

/// Cart change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartEvent {
    LineAdded { product_id: ProductId },
    LineRemoved { product_id: ProductId },
    QuantityChanged { product_id: ProductId },
    Cleared,
}

/// A store-wide change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    /// A catalog resource was fetched and stored. Emitted once per actual
    /// fetch, not once per waiting caller.
    ResourceLoaded(ResourceKey),
    Wishlist(WishlistEvent),
    Cart(CartEvent),
}

/// Broadcast channel the stores publish on.
///
/// Cheap to clone; all clones share the same channel. Emitting with no
/// subscribers is fine - events are simply dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Create a new event bus.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Subscribe to store events. Each receiver observes every event emitted
    /// after the subscription.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub(crate) fn emit(&self, event: StoreEvent) {
        // A send error only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_inverse() {
        assert_eq!(WishlistAction::Add.inverse(), WishlistAction::Remove);
        assert_eq!(WishlistAction::Remove.inverse(), WishlistAction::Add);
    }

    #[tokio::test]
    async fn test_each_subscriber_sees_the_event() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.emit(StoreEvent::ResourceLoaded(ResourceKey::Brands));

        assert_eq!(
            first.recv().await.expect("first subscriber"),
            StoreEvent::ResourceLoaded(ResourceKey::Brands)
        );
        assert_eq!(
            second.recv().await.expect("second subscriber"),
            StoreEvent::ResourceLoaded(ResourceKey::Brands)
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.emit(StoreEvent::Cart(CartEvent::Cleared));
    }
}
