//! Remote data gateway for the shop REST API.
//!
//! # Architecture
//!
//! - The backend is the source of truth - the state layer only mirrors it
//! - All network I/O goes through the [`StoreApi`] trait; the rest of the
//!   crate never sees a socket
//! - [`HttpGateway`] is the production implementation; tests substitute a
//!   scripted mock behind the same trait
//!
//! Errors carry their classification: transport failures are `Network`,
//! non-2xx responses are `Server`, malformed payloads are `Decode`. The
//! error type is `Clone` so a single failed fetch can resolve every caller
//! waiting on it.

mod http;
pub mod types;

pub use http::HttpGateway;
pub use types::*;

use async_trait::async_trait;
use copperbay_core::ProductId;
use thiserror::Error;

use crate::catalog::{CatalogData, ResourceKey};

/// Errors that can occur when talking to the shop API.
///
/// `Clone` on purpose: one in-flight fetch may have many waiters, and each
/// gets the same classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// Transport failure: the request never produced a response.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("Server error: HTTP {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Narrow interface to the shop REST backend.
///
/// One method per remote operation the state layer needs; nothing else
/// crosses this boundary.
#[async_trait]
pub trait StoreApi: Send + Sync {
    /// Fetch one catalog collection.
    async fn fetch_resource(&self, key: ResourceKey) -> Result<CatalogData, GatewayError>;

    /// Persist a wishlist addition.
    async fn add_to_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError>;

    /// Persist a wishlist removal.
    async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError>;

    /// Ask whether the product is currently wishlisted server-side.
    async fn check_wishlist_membership(&self, product_id: ProductId)
    -> Result<bool, GatewayError>;

    /// Fetch the server-side wishlist count.
    async fn wishlist_count(&self) -> Result<u32, GatewayError>;
}
