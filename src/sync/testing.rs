//! Simulated server and scheduler used across the sync-core tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::api::{ApiError, RemoteGateway};
use crate::models::{FavoriteFlag, LatLng, Restaurant, Review};

use super::{ReplayScheduler, ScheduleError, SyncTag};

const NEIGHBORHOODS: [&str; 3] = ["Brooklyn", "Manhattan", "Queens"];
const CUISINES: [&str; 3] = ["Pizza", "Asian", "Mexican"];

/// A deterministic set of restaurant fixtures with ids `1..=count`.
pub(crate) fn seed_restaurants(count: usize) -> Vec<Restaurant> {
    (1..=count as i64)
        .map(|id| Restaurant {
            id,
            name: format!("Restaurant {}", id),
            neighborhood: NEIGHBORHOODS[(id as usize) % NEIGHBORHOODS.len()].to_string(),
            cuisine_type: CUISINES[(id as usize) % CUISINES.len()].to_string(),
            address: format!("{} Fulton St", 100 + id),
            latlng: LatLng {
                lat: 40.68,
                lng: -73.96,
            },
            photograph: Some(id.to_string()),
            operating_hours: None,
            is_favorite: FavoriteFlag(false),
        })
        .collect()
}

/// Install a fmt subscriber once so failing tests print their traces.
/// `RUST_LOG` controls the filter; repeated calls are no-ops.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Poll `cond` until it holds, giving spawned background tasks a chance to
/// run. Panics if it never does.
pub(crate) async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not met within timeout");
}

#[derive(Default)]
struct MockState {
    restaurants: Vec<Restaurant>,
    reviews: Vec<Review>,
    posted: Vec<Review>,
    next_review_id: i64,
    fail_all: bool,
    fail_reviews: bool,
    fail_favorite_ids: HashSet<i64>,
    list_calls: usize,
    get_calls: usize,
    favorite_calls: usize,
    review_fetch_calls: usize,
}

/// In-memory stand-in for the REST API, with switchable failures and call
/// counters.
pub(crate) struct MockGateway {
    state: Mutex<MockState>,
}

impl MockGateway {
    pub fn with_restaurants(restaurants: Vec<Restaurant>) -> Self {
        Self {
            state: Mutex::new(MockState {
                restaurants,
                next_review_id: 1000,
                ..MockState::default()
            }),
        }
    }

    pub fn seed_review(&self, restaurant_id: i64, name: &str, rating: u8, comments: &str) {
        let mut state = self.state.lock().unwrap();
        state.next_review_id += 1;
        let now = Utc::now();
        let review = Review {
            id: Some(state.next_review_id),
            restaurant_id,
            name: name.to_string(),
            rating,
            comments: comments.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.reviews.push(review);
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.state.lock().unwrap().fail_all = fail;
    }

    pub fn set_fail_reviews(&self, fail: bool) {
        self.state.lock().unwrap().fail_reviews = fail;
    }

    pub fn fail_favorite(&self, id: i64) {
        self.state.lock().unwrap().fail_favorite_ids.insert(id);
    }

    pub fn clear_favorite_failures(&self) {
        self.state.lock().unwrap().fail_favorite_ids.clear();
    }

    pub fn restaurant(&self, id: i64) -> Option<Restaurant> {
        let state = self.state.lock().unwrap();
        state.restaurants.iter().find(|r| r.id == id).cloned()
    }

    pub fn posted_reviews(&self) -> Vec<Review> {
        self.state.lock().unwrap().posted.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn get_calls(&self) -> usize {
        self.state.lock().unwrap().get_calls
    }

    pub fn favorite_calls(&self) -> usize {
        self.state.lock().unwrap().favorite_calls
    }

    pub fn review_fetch_calls(&self) -> usize {
        self.state.lock().unwrap().review_fetch_calls
    }
}

fn unavailable() -> ApiError {
    ApiError::Network {
        status: 503,
        status_text: "Service Unavailable".to_string(),
    }
}

fn not_found() -> ApiError {
    ApiError::Network {
        status: 404,
        status_text: "Not Found".to_string(),
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.fail_all {
            return Err(unavailable());
        }
        Ok(state.restaurants.clone())
    }

    async fn fetch_restaurant(&self, id: i64) -> Result<Restaurant, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.get_calls += 1;
        if state.fail_all {
            return Err(unavailable());
        }
        state
            .restaurants
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn set_favorite(
        &self,
        id: i64,
        favorite: FavoriteFlag,
    ) -> Result<Restaurant, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.favorite_calls += 1;
        if state.fail_all || state.fail_favorite_ids.contains(&id) {
            return Err(unavailable());
        }
        let restaurant = state
            .restaurants
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(not_found)?;
        restaurant.is_favorite = favorite;
        Ok(restaurant.clone())
    }

    async fn fetch_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.review_fetch_calls += 1;
        if state.fail_all {
            return Err(unavailable());
        }
        Ok(state
            .reviews
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id)
            .cloned()
            .collect())
    }

    async fn post_review(&self, review: &Review) -> Result<Review, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_all || state.fail_reviews {
            return Err(unavailable());
        }
        state.next_review_id += 1;
        let mut created = review.clone();
        created.id = Some(state.next_review_id);
        state.reviews.push(created.clone());
        state.posted.push(created.clone());
        Ok(created)
    }
}

/// Scheduler that records registrations and can simulate unavailability or
/// registration failure.
pub(crate) struct RecordingScheduler {
    available: bool,
    fail: Mutex<bool>,
    registered: Mutex<Vec<SyncTag>>,
}

impl RecordingScheduler {
    pub fn available() -> Self {
        Self {
            available: true,
            fail: Mutex::new(false),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            fail: Mutex::new(false),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            available: true,
            fail: Mutex::new(true),
            registered: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn registered(&self) -> Vec<SyncTag> {
        self.registered.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplayScheduler for RecordingScheduler {
    fn is_available(&self) -> bool {
        self.available
    }

    async fn register(&self, tag: SyncTag) -> Result<(), ScheduleError> {
        if *self.fail.lock().unwrap() {
            return Err(ScheduleError {
                tag,
                reason: "simulated registration failure".to_string(),
            });
        }
        self.registered.lock().unwrap().push(tag);
        Ok(())
    }
}
