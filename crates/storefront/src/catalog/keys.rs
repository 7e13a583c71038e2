//! Resource keys and cached payload types for the catalog cache.

use crate::api::types::{Brand, Category, Deal, Product, Slider, SubCategory};

/// Identifier for one catalog collection, cached independently of the others.
///
/// The set is fixed and keys are disjoint; no key aliases another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Categories,
    SubCategories,
    Brands,
    Products,
    FeaturedProducts,
    HotDeals,
    SpecialDeals,
    Sliders,
    /// The home-page pair of highlighted products.
    TwoProducts,
}

impl ResourceKey {
    /// Every resource key, in a stable order.
    pub const ALL: [Self; 9] = [
        Self::Categories,
        Self::SubCategories,
        Self::Brands,
        Self::Products,
        Self::FeaturedProducts,
        Self::HotDeals,
        Self::SpecialDeals,
        Self::Sliders,
        Self::TwoProducts,
    ];

    /// Stable name used in logs and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::SubCategories => "sub_categories",
            Self::Brands => "brands",
            Self::Products => "products",
            Self::FeaturedProducts => "featured_products",
            Self::HotDeals => "hot_deals",
            Self::SpecialDeals => "special_deals",
            Self::Sliders => "sliders",
            Self::TwoProducts => "two_products",
        }
    }

    /// REST path of the collection, relative to the API base URL.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Categories => "catalog/categories",
            Self::SubCategories => "catalog/subcategories",
            Self::Brands => "catalog/brands",
            Self::Products => "catalog/products",
            Self::FeaturedProducts => "catalog/products/featured",
            Self::HotDeals => "catalog/deals/hot",
            Self::SpecialDeals => "catalog/deals/special",
            Self::Sliders => "catalog/sliders",
            Self::TwoProducts => "catalog/products/pair",
        }
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached payload, one variant per [`ResourceKey`].
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogData {
    Categories(Vec<Category>),
    SubCategories(Vec<SubCategory>),
    Brands(Vec<Brand>),
    Products(Vec<Product>),
    FeaturedProducts(Vec<Product>),
    HotDeals(Vec<Deal>),
    SpecialDeals(Vec<Deal>),
    Sliders(Vec<Slider>),
    TwoProducts(Vec<Product>),
}

impl CatalogData {
    /// The key this payload belongs under.
    #[must_use]
    pub const fn key(&self) -> ResourceKey {
        match self {
            Self::Categories(_) => ResourceKey::Categories,
            Self::SubCategories(_) => ResourceKey::SubCategories,
            Self::Brands(_) => ResourceKey::Brands,
            Self::Products(_) => ResourceKey::Products,
            Self::FeaturedProducts(_) => ResourceKey::FeaturedProducts,
            Self::HotDeals(_) => ResourceKey::HotDeals,
            Self::SpecialDeals(_) => ResourceKey::SpecialDeals,
            Self::Sliders(_) => ResourceKey::Sliders,
            Self::TwoProducts(_) => ResourceKey::TwoProducts,
        }
    }
}
