//! Read-through cache for catalog collections.
//!
//! One entry per [`ResourceKey`]. A cached value is served without touching
//! the network; a miss triggers exactly one gateway fetch no matter how many
//! callers ask concurrently - later callers join the in-flight load and
//! observe its resolution. Failures are not stored, so a later call retries.
//! Entries live for the session; there is no TTL and no eviction, only the
//! explicit invalidation calls.

mod keys;

pub use keys::{CatalogData, ResourceKey};

use std::sync::Arc;

use moka::future::Cache;
use tracing::debug;

use crate::api::{GatewayError, StoreApi};
use crate::error::{Result, StoreError};
use crate::events::{EventBus, StoreEvent};

/// Session-scoped cache over the catalog endpoints.
#[derive(Clone)]
pub struct CatalogCache {
    api: Arc<dyn StoreApi>,
    cache: Cache<ResourceKey, CatalogData>,
    events: EventBus,
}

impl CatalogCache {
    /// Create a cache backed by the given gateway.
    #[must_use]
    pub fn new(api: Arc<dyn StoreApi>, events: EventBus) -> Self {
        // No TTL, no capacity bound: the catalog changes infrequently
        // relative to a browsing session and entries are invalidated
        // explicitly.
        let cache = Cache::builder().build();
        Self { api, cache, events }
    }

    /// Get a catalog collection, fetching it at most once per session.
    ///
    /// Concurrent callers of an uncached key share one gateway call and all
    /// observe the same value or the same classified failure.
    ///
    /// # Errors
    ///
    /// Returns the gateway's classified error. The entry stays absent, so a
    /// later call retries.
    pub async fn get(&self, key: ResourceKey) -> Result<CatalogData> {
        let api = Arc::clone(&self.api);
        let events = self.events.clone();

        let data = self
            .cache
            .try_get_with(key, async move {
                let data = api.fetch_resource(key).await?;
                if data.key() != key {
                    return Err(GatewayError::Decode(format!(
                        "gateway returned {} payload for key {key}",
                        data.key()
                    )));
                }
                events.emit(StoreEvent::ResourceLoaded(key));
                Ok(data)
            })
            .await
            .map_err(|e: Arc<GatewayError>| StoreError::Gateway((*e).clone()))?;

        Ok(data)
    }

    /// Whether the key currently has a stored value.
    ///
    /// An in-flight load does not count; only a completed fill does.
    #[must_use]
    pub fn is_cached(&self, key: ResourceKey) -> bool {
        self.cache.contains_key(&key)
    }

    /// Invalidate one cached collection.
    pub async fn invalidate(&self, key: ResourceKey) {
        debug!(key = %key, "Invalidating catalog entry");
        self.cache.invalidate(&key).await;
    }

    /// Invalidate every cached collection.
    pub async fn invalidate_all(&self) {
        debug!("Invalidating all catalog entries");
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

/// Typed accessor per resource key; a payload under the wrong key surfaces
/// as a decode error.
macro_rules! typed_accessor {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        ///
        /// # Errors
        ///
        /// Returns the gateway's classified error if the fetch fails.
        pub async fn $name(&self) -> Result<$ty> {
            match self.get(ResourceKey::$variant).await? {
                CatalogData::$variant(value) => Ok(value),
                other => Err(StoreError::Gateway(GatewayError::Decode(format!(
                    "unexpected {} payload under key {}",
                    other.key(),
                    ResourceKey::$variant
                )))),
            }
        }
    };
}

impl CatalogCache {
    typed_accessor!(
        /// Top-level catalog categories.
        categories,
        Categories,
        Vec<crate::api::types::Category>
    );
    typed_accessor!(
        /// Sub-categories across all categories.
        sub_categories,
        SubCategories,
        Vec<crate::api::types::SubCategory>
    );
    typed_accessor!(
        /// Product brands.
        brands,
        Brands,
        Vec<crate::api::types::Brand>
    );
    typed_accessor!(
        /// The full product listing.
        products,
        Products,
        Vec<crate::api::types::Product>
    );
    typed_accessor!(
        /// Products curated for the front page.
        featured_products,
        FeaturedProducts,
        Vec<crate::api::types::Product>
    );
    typed_accessor!(
        /// Currently running hot deals.
        hot_deals,
        HotDeals,
        Vec<crate::api::types::Deal>
    );
    typed_accessor!(
        /// Currently running special deals.
        special_deals,
        SpecialDeals,
        Vec<crate::api::types::Deal>
    );
    typed_accessor!(
        /// Home-page hero slides.
        sliders,
        Sliders,
        Vec<crate::api::types::Slider>
    );
    typed_accessor!(
        /// The home-page pair of highlighted products.
        two_products,
        TwoProducts,
        Vec<crate::api::types::Product>
    );
}
