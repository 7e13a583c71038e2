//! HTTP implementation of the remote data gateway.
//!
//! Uses `reqwest` with a default-headers client built once at startup.
//! Responses are read as text first so decode failures can be logged with
//! the offending body.

use std::sync::Arc;

use async_trait::async_trait;
use copperbay_core::ProductId;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::api::types::{
    Brand, Category, CountResponse, Deal, MembershipResponse, Product, Slider, SubCategory,
};
use crate::api::{GatewayError, StoreApi};
use crate::catalog::{CatalogData, ResourceKey};
use crate::config::StoreConfig;

/// Maximum response-body length carried in error messages.
const ERROR_BODY_LIMIT: usize = 200;

/// Maximum response-body length written to error logs.
const LOG_BODY_LIMIT: usize = 500;

/// Gateway to the shop REST API.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<HttpGatewayInner>,
}

struct HttpGatewayInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpGateway {
    /// Create a new gateway from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build or the API token
    /// is not a valid header value.
    pub fn new(config: &StoreConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        let mut auth_header = HeaderValue::from_str(&auth_value)
            .map_err(|e| GatewayError::Decode(format!("Invalid API token format: {e}")))?;
        auth_header.set_sensitive(true);
        headers.insert("Authorization", auth_header);
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(HttpGatewayInner {
                client,
                base_url: config.api_base_url.clone(),
            }),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| GatewayError::Decode(format!("Invalid endpoint path {path}: {e}")))
    }

    /// GET a JSON payload, classifying transport, status, and decode errors.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let url = self.endpoint(path)?;

        let response = self
            .inner
            .client
            .get(url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(server_error(status, &body, path));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                path = %path,
                error = %e,
                body = %truncate(&body, LOG_BODY_LIMIT),
                "Failed to decode API response"
            );
            GatewayError::Decode(e.to_string())
        })
    }

    /// Issue a bodyless request and discard any response payload.
    async fn send_empty(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(path)?;

        let response = self
            .inner
            .client
            .request(method, url)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(server_error(status, &body, path));
        }

        Ok(())
    }
}

#[async_trait]
impl StoreApi for HttpGateway {
    #[instrument(skip(self), fields(key = %key.as_str()))]
    async fn fetch_resource(&self, key: ResourceKey) -> Result<CatalogData, GatewayError> {
        let path = key.path();
        match key {
            ResourceKey::Categories => self
                .get_json::<Vec<Category>>(path)
                .await
                .map(CatalogData::Categories),
            ResourceKey::SubCategories => self
                .get_json::<Vec<SubCategory>>(path)
                .await
                .map(CatalogData::SubCategories),
            ResourceKey::Brands => self
                .get_json::<Vec<Brand>>(path)
                .await
                .map(CatalogData::Brands),
            ResourceKey::Products => self
                .get_json::<Vec<Product>>(path)
                .await
                .map(CatalogData::Products),
            ResourceKey::FeaturedProducts => self
                .get_json::<Vec<Product>>(path)
                .await
                .map(CatalogData::FeaturedProducts),
            ResourceKey::HotDeals => self
                .get_json::<Vec<Deal>>(path)
                .await
                .map(CatalogData::HotDeals),
            ResourceKey::SpecialDeals => self
                .get_json::<Vec<Deal>>(path)
                .await
                .map(CatalogData::SpecialDeals),
            ResourceKey::Sliders => self
                .get_json::<Vec<Slider>>(path)
                .await
                .map(CatalogData::Sliders),
            ResourceKey::TwoProducts => self
                .get_json::<Vec<Product>>(path)
                .await
                .map(CatalogData::TwoProducts),
        }
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError> {
        self.send_empty(
            reqwest::Method::POST,
            &format!("wishlist/items/{product_id}"),
        )
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_from_wishlist(&self, product_id: ProductId) -> Result<(), GatewayError> {
        self.send_empty(
            reqwest::Method::DELETE,
            &format!("wishlist/items/{product_id}"),
        )
        .await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn check_wishlist_membership(
        &self,
        product_id: ProductId,
    ) -> Result<bool, GatewayError> {
        let response: MembershipResponse = self
            .get_json(&format!("wishlist/items/{product_id}"))
            .await?;
        Ok(response.wishlisted)
    }

    #[instrument(skip(self))]
    async fn wishlist_count(&self) -> Result<u32, GatewayError> {
        let response: CountResponse = self.get_json("wishlist/count").await?;
        Ok(response.count)
    }
}

/// Classify a reqwest transport error.
///
/// Body-decode failures from reqwest itself count as decode errors; anything
/// that kept a response from arriving is a network error.
fn classify_transport(err: reqwest::Error) -> GatewayError {
    if err.is_decode() {
        GatewayError::Decode(err.to_string())
    } else {
        GatewayError::Network(err.to_string())
    }
}

fn server_error(status: StatusCode, body: &str, path: &str) -> GatewayError {
    tracing::error!(
        path = %path,
        status = %status,
        body = %truncate(body, LOG_BODY_LIMIT),
        "API returned non-success status"
    );
    GatewayError::Server {
        status: status.as_u16(),
        message: truncate(body, ERROR_BODY_LIMIT),
    }
}

fn truncate(body: &str, limit: usize) -> String {
    body.chars().take(limit).collect()
}
