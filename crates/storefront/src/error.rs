//! Unified error handling for the storefront state layer.
//!
//! Gateway failures keep their classification (`Network`, `Server`,
//! `Decode`) from [`crate::api::GatewayError`]; the variants here cover
//! mutations rejected before any state change. All store operations return
//! `Result<T, StoreError>`.

use copperbay_core::ProductId;
use thiserror::Error;

use crate::api::GatewayError;

/// Application-level error type for the state layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote gateway call failed.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Caller passed an invalid mutation request. Rejected before any
    /// state mutation.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// A cart line already exists for this product/color/size combination.
    #[error("Product {product_id} is already in the cart with this selection")]
    DuplicateItem {
        /// The colliding product.
        product_id: ProductId,
    },

    /// An optimistic operation for this product is still in flight.
    #[error("An operation for product {0} is already in flight")]
    Busy(ProductId),
}

impl StoreError {
    /// Whether the error was rejected before any state mutation took place.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::DuplicateItem { .. } | Self::Busy(_)
        )
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
