//! Local cart store.
//!
//! Cart mutations are local-only in the current design - there is no remote
//! cart persistence call to reconcile against. Validation is transactional:
//! a rejected mutation leaves the state untouched and notifies nobody.

use std::sync::Arc;

use copperbay_core::{CurrencyCode, Price, ProductId};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::types::Product;
use crate::error::{Result, StoreError};
use crate::events::{CartEvent, EventBus, StoreEvent};

/// One line in the cart: a product plus its selected variant axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub color: Option<String>,
    pub size: Option<String>,
}

impl CartLine {
    fn matches(&self, product_id: ProductId, color: Option<&str>, size: Option<&str>) -> bool {
        self.product.id == product_id
            && self.color.as_deref() == color
            && self.size.as_deref() == size
    }
}

/// The cart contents. At most one line exists per distinct
/// (product, color, size) combination and every quantity is at least 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartState {
    pub lines: Vec<CartLine>,
}

impl CartState {
    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line prices. Uses the first line's currency; an empty cart
    /// totals zero USD.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        let currency = self
            .lines
            .first()
            .map_or(CurrencyCode::default(), |line| {
                line.product.price.currency_code
            });
        let amount = self
            .lines
            .iter()
            .map(|line| line.product.price.amount * Decimal::from(line.quantity))
            .sum();
        Price::new(amount, currency)
    }
}

/// Cart store shared across the view tree.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    state: watch::Sender<CartState>,
    events: EventBus,
}

impl CartStore {
    /// Create an empty cart store.
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        let (state, _) = watch::channel(CartState::default());
        Self {
            inner: Arc::new(CartInner { state, events }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes. Every successful mutation notifies each
    /// receiver once; rejected mutations notify nobody.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<CartState> {
        self.inner.state.subscribe()
    }

    /// Whether any line holds the product, regardless of variant selection.
    #[must_use]
    pub fn is_in_cart(&self, product_id: ProductId) -> bool {
        self.inner
            .state
            .borrow()
            .lines
            .iter()
            .any(|line| line.product.id == product_id)
    }

    /// Add a product to the cart.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] when `quantity` is zero, when the product
    ///   declares a variant axis and no selection was made for it, or when a
    ///   selection is not one the product offers.
    /// - [`StoreError::DuplicateItem`] when a line for the same
    ///   (product, color, size) combination already exists.
    ///
    /// All rejections happen before any state mutation.
    pub fn add(
        &self,
        product: &Product,
        quantity: u32,
        color: Option<String>,
        size: Option<String>,
    ) -> Result<()> {
        if quantity == 0 {
            return Err(StoreError::Validation(
                "cart quantity must be at least 1".to_string(),
            ));
        }
        validate_selection(&product.colors, color.as_deref(), "color")?;
        validate_selection(&product.sizes, size.as_deref(), "size")?;

        let product_id = product.id;
        let mut duplicate = false;
        let changed = self.inner.state.send_if_modified(|state| {
            if state
                .lines
                .iter()
                .any(|line| line.matches(product_id, color.as_deref(), size.as_deref()))
            {
                duplicate = true;
                return false;
            }
            state.lines.push(CartLine {
                product: product.clone(),
                quantity,
                color: color.clone(),
                size: size.clone(),
            });
            true
        });

        if duplicate {
            debug!(product_id = %product_id, "Duplicate cart line rejected");
            return Err(StoreError::DuplicateItem { product_id });
        }
        debug_assert!(changed);

        info!(product_id = %product_id, quantity, "Cart line added");
        self.inner
            .events
            .emit(StoreEvent::Cart(CartEvent::LineAdded { product_id }));
        Ok(())
    }

    /// Remove the line matching the (product, color, size) combination.
    ///
    /// Returns whether a line was removed.
    pub fn remove(
        &self,
        product_id: ProductId,
        color: Option<&str>,
        size: Option<&str>,
    ) -> bool {
        let removed = self.inner.state.send_if_modified(|state| {
            let before = state.lines.len();
            state
                .lines
                .retain(|line| !line.matches(product_id, color, size));
            state.lines.len() != before
        });

        if removed {
            info!(product_id = %product_id, "Cart line removed");
            self.inner
                .events
                .emit(StoreEvent::Cart(CartEvent::LineRemoved { product_id }));
        }
        removed
    }

    /// Change the quantity of the line matching the combination.
    ///
    /// Returns whether a line was found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] when `quantity` is zero; use
    /// [`Self::remove`] to drop a line.
    pub fn set_quantity(
        &self,
        product_id: ProductId,
        color: Option<&str>,
        size: Option<&str>,
        quantity: u32,
    ) -> Result<bool> {
        if quantity == 0 {
            return Err(StoreError::Validation(
                "cart quantity must be at least 1".to_string(),
            ));
        }

        let changed = self.inner.state.send_if_modified(|state| {
            let Some(line) = state
                .lines
                .iter_mut()
                .find(|line| line.matches(product_id, color, size))
            else {
                return false;
            };
            if line.quantity == quantity {
                return false;
            }
            line.quantity = quantity;
            true
        });

        if changed {
            self.inner
                .events
                .emit(StoreEvent::Cart(CartEvent::QuantityChanged { product_id }));
            return Ok(true);
        }

        // Unchanged can mean "no such line" or "same quantity"; only the
        // former matters to callers.
        Ok(self
            .inner
            .state
            .borrow()
            .lines
            .iter()
            .any(|line| line.matches(product_id, color, size)))
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let changed = self.inner.state.send_if_modified(|state| {
            if state.lines.is_empty() {
                return false;
            }
            state.lines.clear();
            true
        });

        if changed {
            info!("Cart cleared");
            self.inner.events.emit(StoreEvent::Cart(CartEvent::Cleared));
        }
    }
}

/// Require a selection for a declared variant axis, and require it to be one
/// the product offers.
fn validate_selection(
    offered: &[String],
    selected: Option<&str>,
    axis: &str,
) -> Result<()> {
    match selected {
        None if offered.is_empty() => Ok(()),
        None => Err(StoreError::Validation(format!(
            "a {axis} must be selected for this product"
        ))),
        Some(_) if offered.is_empty() => Err(StoreError::Validation(format!(
            "this product has no {axis} options"
        ))),
        Some(value) if offered.iter().any(|option| option == value) => Ok(()),
        Some(value) => Err(StoreError::Validation(format!(
            "{axis} '{value}' is not offered for this product"
        ))),
    }
}
