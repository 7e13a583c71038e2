//! Wire types for the shop REST API.
//!
//! These mirror the JSON payloads the backend serves. Collection payloads are
//! plain arrays of the element type; the gateway decodes them per resource
//! key.

use chrono::{DateTime, Utc};
use copperbay_core::{BrandId, CategoryId, DealId, Price, ProductId, SliderId, SubCategoryId};
use serde::{Deserialize, Serialize};

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Price,
    /// Strike-through price when the product is discounted.
    #[serde(default)]
    pub compare_at_price: Option<Price>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Color variant axis; empty when the product has no color variants.
    #[serde(default)]
    pub colors: Vec<String>,
    /// Size variant axis; empty when the product has no size variants.
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub brand_id: Option<BrandId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

const fn default_in_stock() -> bool {
    true
}

impl Product {
    /// Whether the product declares any variant axis that requires a
    /// selection before it can be added to the cart.
    #[must_use]
    pub fn has_variants(&self) -> bool {
        !self.colors.is_empty() || !self.sizes.is_empty()
    }
}

/// A top-level catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
}

/// A sub-category nested under a [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    pub name: String,
    pub slug: String,
    pub category_id: CategoryId,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub logo: Option<String>,
}

/// A time-boxed promotion on a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub product: Product,
    /// Percentage off the listed price, 0-100.
    pub discount_percent: u8,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

/// A home-page hero slide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slider {
    pub id: SliderId,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
}

/// Response body of the wishlist membership probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipResponse {
    pub wishlisted: bool,
}

/// Response body of the wishlist count endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: u32,
}
