//! Shared fixtures for Copperbay integration tests.
//!
//! The centerpiece is [`MockGateway`], a scripted [`StoreApi`] implementation
//! with call counters and gates that hold requests open so tests can create
//! real concurrency deterministically.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::sync::{broadcast, watch};
use tokio::time::timeout;

use copperbay_core::{BrandId, CategoryId, CurrencyCode, Price, ProductId};
use copperbay_storefront::api::types::{Brand, Category, Product};
use copperbay_storefront::api::{GatewayError, StoreApi};
use copperbay_storefront::catalog::{CatalogData, ResourceKey};
use copperbay_storefront::config::StoreConfig;
use copperbay_storefront::events::{StoreEvent, WishlistEvent};
use copperbay_storefront::notify::{Notice, Notifier};

/// How long a test waits for an async settle before failing.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Initialize test logging once; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "copperbay_storefront=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// A handle that keeps gated mock requests blocked until opened.
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    /// Release every request waiting on this gate, and all future ones.
    pub fn open(&self) {
        let _ = self.tx.send(true);
    }
}

/// A recorded wishlist mutation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WishlistCall {
    Add(ProductId),
    Remove(ProductId),
}

/// Scripted in-memory gateway.
///
/// Catalog responses and wishlist results are configured up front; fetches
/// and mutations can be held open behind gates to model network latency.
pub struct MockGateway {
    resources: Mutex<HashMap<ResourceKey, Result<CatalogData, GatewayError>>>,
    fetch_counts: Mutex<HashMap<ResourceKey, usize>>,
    fetch_started: watch::Sender<usize>,
    fetch_gate: Mutex<Option<watch::Receiver<bool>>>,
    wishlist_results: Mutex<VecDeque<Result<(), GatewayError>>>,
    wishlist_calls: Mutex<Vec<WishlistCall>>,
    mutation_started: watch::Sender<usize>,
    mutation_gate: Mutex<Option<watch::Receiver<bool>>>,
    membership: Mutex<HashMap<ProductId, bool>>,
    remote_count: Mutex<u32>,
}

impl Default for MockGateway {
    fn default() -> Self {
        let (fetch_started, _) = watch::channel(0);
        let (mutation_started, _) = watch::channel(0);
        Self {
            resources: Mutex::new(HashMap::new()),
            fetch_counts: Mutex::new(HashMap::new()),
            fetch_started,
            fetch_gate: Mutex::new(None),
            wishlist_results: Mutex::new(VecDeque::new()),
            wishlist_calls: Mutex::new(Vec::new()),
            mutation_started,
            mutation_gate: Mutex::new(None),
            membership: Mutex::new(HashMap::new()),
            remote_count: Mutex::new(0),
        }
    }
}

impl MockGateway {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Script a successful response for a resource key.
    pub fn set_resource(&self, data: CatalogData) {
        Self::lock(&self.resources).insert(data.key(), Ok(data));
    }

    /// Script a failure for a resource key.
    pub fn fail_resource(&self, key: ResourceKey, error: GatewayError) {
        Self::lock(&self.resources).insert(key, Err(error));
    }

    /// Number of `fetch_resource` calls completed or in flight for the key.
    #[must_use]
    pub fn fetch_count(&self, key: ResourceKey) -> usize {
        Self::lock(&self.fetch_counts).get(&key).copied().unwrap_or(0)
    }

    /// Hold every subsequent `fetch_resource` call until the gate opens.
    #[must_use]
    pub fn gate_fetches(&self) -> Gate {
        let (gate, rx) = Gate::new();
        *Self::lock(&self.fetch_gate) = Some(rx);
        gate
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_fetches(&self, n: usize) {
        let mut rx = self.fetch_started.subscribe();
        let waited = timeout(SETTLE_TIMEOUT, rx.wait_for(|count| *count >= n)).await;
        assert!(waited.is_ok(), "timed out waiting for {n} fetches to start");
    }

    /// Queue the result of the next wishlist mutation. Unqueued mutations
    /// succeed.
    pub fn push_wishlist_result(&self, result: Result<(), GatewayError>) {
        Self::lock(&self.wishlist_results).push_back(result);
    }

    /// Every wishlist mutation recorded so far, in call order.
    #[must_use]
    pub fn wishlist_calls(&self) -> Vec<WishlistCall> {
        Self::lock(&self.wishlist_calls).clone()
    }

    /// Hold every subsequent wishlist mutation until the gate opens.
    #[must_use]
    pub fn gate_mutations(&self) -> Gate {
        let (gate, rx) = Gate::new();
        *Self::lock(&self.mutation_gate) = Some(rx);
        gate
    }

    /// Wait until at least `n` wishlist mutations have started.
    pub async fn wait_for_mutations(&self, n: usize) {
        let mut rx = self.mutation_started.subscribe();
        let waited = timeout(SETTLE_TIMEOUT, rx.wait_for(|count| *count >= n)).await;
        assert!(
            waited.is_ok(),
            "timed out waiting for {n} mutations to start"
        );
    }

    /// Script the server-side membership of a product.
    pub fn set_membership(&self, product_id: ProductId, wishlisted: bool) {
        Self::lock(&self.membership).insert(product_id, wishlisted);
    }

    /// Script the server-side wishlist count.
    pub fn set_remote_count(&self, count: u32) {
        *Self::lock(&self.remote_count) = count;
    }

    async fn wait_on(gate: &Mutex<Option<watch::Receiver<bool>>>) {
        let rx = Self::lock(gate).clone();
        if let Some(mut rx) = rx {
            // A dropped gate counts as open.
            let _ = rx.wait_for(|open| *open).await;
        }
    }

    fn pop_wishlist_result(&self) -> Result<(), GatewayError> {
        Self::lock(&self.wishlist_results)
            .pop_front()
            .unwrap_or(Ok(()))
    }
}

#[async_trait]
impl StoreApi for MockGateway {
    async fn fetch_resource(&self, key: ResourceKey) -> Result<CatalogData, GatewayError> {
        *Self::lock(&self.fetch_counts).entry(key).or_insert(0) += 1;
        self.fetch_started.send_modify(|n| *n += 1);
        Self::wait_on(&self.fetch_gate).await;

        Self::lock(&self.resources)
            .get(&key)
            .cloned()
            .unwrap_or_else(|| {
                Err(GatewayError::Server {
                    status: 404,
                    message: format!("no scripted response for {key}"),
                })
            })
    }

    async fn add_to_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError> {
        Self::lock(&self.wishlist_calls).push(WishlistCall::Add(product_id));
        self.mutation_started.send_modify(|n| *n += 1);
        Self::wait_on(&self.mutation_gate).await;
        self.pop_wishlist_result()
    }

    async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError> {
        Self::lock(&self.wishlist_calls).push(WishlistCall::Remove(product_id));
        self.mutation_started.send_modify(|n| *n += 1);
        Self::wait_on(&self.mutation_gate).await;
        self.pop_wishlist_result()
    }

    async fn check_wishlist_membership(
        &self,
        product_id: ProductId,
    ) -> Result<bool, GatewayError> {
        Ok(Self::lock(&self.membership)
            .get(&product_id)
            .copied()
            .unwrap_or(false))
    }

    async fn wishlist_count(&self) -> Result<u32, GatewayError> {
        Ok(*Self::lock(&self.remote_count))
    }
}

/// Notifier that records every notice for later assertions.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Every notice surfaced so far, in order.
    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(notice);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Configuration pointing at a non-routable test host.
#[must_use]
pub fn test_config() -> StoreConfig {
    StoreConfig {
        api_base_url: "https://api.copperbay.test/v1/"
            .parse()
            .expect("static test url"),
        api_token: SecretString::from("integration-test-token-0000".to_string()),
        request_timeout: Duration::from_secs(5),
    }
}

/// A plain product without variant axes.
#[must_use]
pub fn product(id: i32) -> Product {
    Product {
        id: ProductId::new(id),
        title: format!("Product {id}"),
        slug: format!("product-{id}"),
        description: None,
        price: Price::from_cents(1999, CurrencyCode::USD),
        compare_at_price: None,
        images: vec![format!("https://img.copperbay.test/{id}.jpg")],
        colors: Vec::new(),
        sizes: Vec::new(),
        brand_id: None,
        category_id: None,
        in_stock: true,
    }
}

/// A product with color and size variant axes.
#[must_use]
pub fn variant_product(id: i32) -> Product {
    Product {
        colors: vec!["Red".to_string(), "Blue".to_string()],
        sizes: vec!["S".to_string(), "M".to_string(), "L".to_string()],
        ..product(id)
    }
}

/// A small brand list.
#[must_use]
pub fn sample_brands() -> Vec<Brand> {
    vec![
        Brand {
            id: BrandId::new(1),
            name: "Driftwood".to_string(),
            slug: "driftwood".to_string(),
            logo: None,
        },
        Brand {
            id: BrandId::new(2),
            name: "Northlane".to_string(),
            slug: "northlane".to_string(),
            logo: Some("https://img.copperbay.test/northlane.svg".to_string()),
        },
    ]
}

/// A small category list.
#[must_use]
pub fn sample_categories() -> Vec<Category> {
    vec![
        Category {
            id: CategoryId::new(1),
            name: "Apparel".to_string(),
            slug: "apparel".to_string(),
            image: None,
        },
        Category {
            id: CategoryId::new(2),
            name: "Home".to_string(),
            slug: "home".to_string(),
            image: None,
        },
    ]
}

// =============================================================================
// Event helpers
// =============================================================================

/// Receive events until a wishlist settle (confirm or rollback) arrives.
///
/// # Panics
///
/// Panics if no settle arrives within [`SETTLE_TIMEOUT`].
pub async fn next_wishlist_settle(rx: &mut broadcast::Receiver<StoreEvent>) -> WishlistEvent {
    let settle = timeout(SETTLE_TIMEOUT, async {
        loop {
            match rx.recv().await {
                Ok(StoreEvent::Wishlist(
                    event @ (WishlistEvent::Confirmed { .. } | WishlistEvent::RolledBack { .. }),
                )) => return event,
                Ok(_) => {}
                Err(err) => panic!("event stream closed while waiting for settle: {err}"),
            }
        }
    })
    .await;
    settle.unwrap_or_else(|_| panic!("timed out waiting for a wishlist settle"))
}
