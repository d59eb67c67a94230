//! REST client module for the restaurant directory API.
//!
//! The sync core talks to the server exclusively through the
//! [`RemoteGateway`] trait so that replay and caching logic can be exercised
//! against a simulated server. `ApiClient` is the production implementation
//! over reqwest.

use async_trait::async_trait;

use crate::models::{FavoriteFlag, Restaurant, Review};

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

/// Thin wrapper over the directory's HTTP endpoints.
///
/// Implementations must not cache: read-through and write-through policy is
/// owned by the sync core.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// `GET /restaurants`
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, ApiError>;

    /// `GET /restaurants/{id}`
    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError>;

    /// `PUT /restaurants/{id}/?is_favorite={true|false}`, returns the
    /// updated restaurant.
    async fn set_favorite(&self, id: i64, favorite: FavoriteFlag)
        -> Result<Restaurant, ApiError>;

    /// `GET /reviews/?restaurant_id={id}`
    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError>;

    /// `POST /reviews/` with the review as JSON body, returns the created
    /// review including its server-assigned id.
    async fn post_review(&self, review: &Review) -> Result<Review, ApiError>;
}
