//! Copperbay Storefront - client-side state layer.
//!
//! This crate keeps an in-memory mirror of the shop's remote state with
//! minimal latency and user-visible correctness:
//!
//! - [`catalog`] - read-through cache for catalog collections. Concurrent
//!   readers of an uncached resource share a single remote fetch; entries
//!   live for the session and never expire on their own.
//! - [`wishlist`] - optimistic mutation engine. Toggles apply locally before
//!   the remote write resolves and are rolled back exactly if it fails.
//! - [`cart`] - local cart store with transactional validation.
//! - [`events`] - broadcast surface letting any number of independently
//!   mounted consumers observe state changes without re-fetching.
//! - [`api`] - the remote data gateway, the only place network I/O happens.
//!
//! [`state::StoreState`] bundles the pieces and is the handle the view layer
//! holds.
//!
//! # Example
//!
//! ```rust,ignore
//! use copperbay_storefront::config::StoreConfig;
//! use copperbay_storefront::state::StoreState;
//!
//! let store = StoreState::new(StoreConfig::from_env()?)?;
//!
//! // Any number of components can do this; only one fetch goes out.
//! let brands = store.catalog().brands().await?;
//!
//! // Applies immediately, reconciles in the background.
//! store.wishlist().toggle(&product)?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod notify;
pub mod state;
pub mod wishlist;
