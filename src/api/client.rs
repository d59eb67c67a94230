//! Production [`RemoteGateway`] implementation over reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::models::{FavoriteFlag, Restaurant, Review};

use super::{ApiError, RemoteGateway};

/// HTTP request timeout in seconds.
/// Generous enough for a cold mobile radio while still failing fast enough
/// that the caller can fall back to cached data.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// REST client for the restaurant directory API.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against the given API origin,
    /// e.g. `http://localhost:1337`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { client, base_url })
    }

    /// Check if a response is successful, converting non-2xx statuses into
    /// `ApiError::Network` with status and status text.
    fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ApiError::from_status(response.status()))
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let url = response.url().clone();
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", url, e)))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        Self::decode(Self::check_response(response)?).await
    }

    async fn put<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        debug!(url, "PUT");
        let response = self.client.put(url).send().await?;
        Self::decode(Self::check_response(response)?).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(url, "POST");
        let response = self.client.post(url).json(body).send().await?;
        Self::decode(Self::check_response(response)?).await
    }
}

#[async_trait]
impl RemoteGateway for ApiClient {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let url = format!("{}/restaurants", self.base_url);
        self.get(&url).await
    }

    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError> {
        let url = format!("{}/restaurants/{}", self.base_url, id);
        self.get(&url).await
    }

    async fn set_favorite(
        &self,
        id: i64,
        favorite: FavoriteFlag,
    ) -> Result<Restaurant, ApiError> {
        let url = format!(
            "{}/restaurants/{}/?is_favorite={}",
            self.base_url, id, favorite
        );
        self.put(&url).await
    }

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError> {
        let url = format!("{}/reviews/?restaurant_id={}", self.base_url, restaurant_id);
        self.get(&url).await
    }

    async fn post_review(&self, review: &Review) -> Result<Review, ApiError> {
        let url = format!("{}/reviews/", self.base_url);
        self.post(&url, review).await
    }
}
