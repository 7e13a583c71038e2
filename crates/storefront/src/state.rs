//! Application state shared across the view tree.

use std::sync::Arc;

use crate::api::{HttpGateway, StoreApi};
use crate::cart::CartStore;
use crate::catalog::CatalogCache;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::events::{EventBus, StoreEvent};
use crate::notify::{LogNotifier, Notifier};
use crate::wishlist::WishlistStore;
use tokio::sync::broadcast;

/// Handle to the whole state layer.
///
/// This struct is cheaply cloneable via `Arc` and is what view components
/// hold: the catalog cache, the wishlist and cart stores, and the shared
/// event bus all hang off it.
#[derive(Clone)]
pub struct StoreState {
    inner: Arc<StoreStateInner>,
}

struct StoreStateInner {
    config: StoreConfig,
    catalog: CatalogCache,
    wishlist: WishlistStore,
    cart: CartStore,
    events: EventBus,
}

impl StoreState {
    /// Create the state layer against the real HTTP gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built from the
    /// configuration.
    pub fn new(config: StoreConfig) -> Result<Self> {
        let gateway: Arc<dyn StoreApi> = Arc::new(HttpGateway::new(&config)?);
        Ok(Self::with_gateway(config, gateway, Arc::new(LogNotifier)))
    }

    /// Create the state layer with an injected gateway and notifier.
    ///
    /// This is the seam tests use to substitute a scripted gateway and a
    /// recording notifier.
    #[must_use]
    pub fn with_gateway(
        config: StoreConfig,
        gateway: Arc<dyn StoreApi>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let events = EventBus::new();
        let catalog = CatalogCache::new(Arc::clone(&gateway), events.clone());
        let wishlist = WishlistStore::new(Arc::clone(&gateway), events.clone(), notifier);
        let cart = CartStore::new(events.clone());

        Self {
            inner: Arc::new(StoreStateInner {
                config,
                catalog,
                wishlist,
                cart,
                events,
            }),
        }
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }

    /// Get a reference to the wishlist store.
    #[must_use]
    pub fn wishlist(&self) -> &WishlistStore {
        &self.inner.wishlist
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore {
        &self.inner.cart
    }

    /// Subscribe to store-wide change events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.events.subscribe()
    }
}
