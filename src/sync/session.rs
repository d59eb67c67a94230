//! Read-through caching session.
//!
//! `SyncSession` is the explicit context object every sync operation hangs
//! off: the remote gateway, the replay scheduler, a lazily-opened local
//! store handle, and the broadcast channel replay notifications go out on.
//! The store is opened once and memoized; if opening fails the session
//! degrades to network-only mode instead of erroring.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::api::RemoteGateway;
use crate::models::{FavoriteFlag, FavoriteOutboxEntry, Restaurant, Review, ReviewOutboxEntry};
use crate::store::{LocalStore, Partition, StoreIndex};

use super::{ReplayScheduler, ReplayWorker, SyncError, SyncMessage};

/// Minimum cached restaurant count considered a usable list. Below this the
/// cache is treated as a partial population and the list is fetched fresh.
const FRESH_LIST_MIN: usize = 10;

/// Capacity of the sync-notification broadcast channel.
const EVENT_CAPACITY: usize = 32;

/// Wildcard filter value meaning "any cuisine" / "any neighborhood".
pub const FILTER_ALL: &str = "all";

struct SessionInner {
    gateway: Arc<dyn RemoteGateway>,
    scheduler: Arc<dyn ReplayScheduler>,
    store_root: PathBuf,
    store: OnceLock<Option<LocalStore>>,
    events: broadcast::Sender<SyncMessage>,
}

/// Shared handle to the sync core. Clone is cheap (Arc internally) and all
/// clones observe the same store handle and broadcast channel.
#[derive(Clone)]
pub struct SyncSession {
    inner: Arc<SessionInner>,
}

impl SyncSession {
    pub fn new(
        store_root: impl Into<PathBuf>,
        gateway: Arc<dyn RemoteGateway>,
        scheduler: Arc<dyn ReplayScheduler>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                gateway,
                scheduler,
                store_root: store_root.into(),
                store: OnceLock::new(),
                events,
            }),
        }
    }

    /// Subscribe to replay notifications. Every subscriber sees every
    /// message sent after it subscribed.
    pub fn events(&self) -> broadcast::Receiver<SyncMessage> {
        self.inner.events.subscribe()
    }

    /// A replay worker bound to this session's store and gateway.
    pub fn replay(&self) -> ReplayWorker {
        ReplayWorker::new(self.clone())
    }

    /// The local store handle, for callers that need raw partition access.
    pub fn local_store(&self) -> Result<&LocalStore, SyncError> {
        self.store_opt().ok_or(SyncError::StoreUnavailable)
    }

    /// Open-once-memoized store handle. `None` means the store failed to
    /// open and this session runs network-only.
    pub(super) fn store_opt(&self) -> Option<&LocalStore> {
        self.inner
            .store
            .get_or_init(|| match LocalStore::open(&self.inner.store_root) {
                Ok(store) => Some(store),
                Err(e) => {
                    warn!(error = %e, "Local store unavailable, degrading to network-only mode");
                    None
                }
            })
            .as_ref()
    }

    pub(super) fn gateway(&self) -> &dyn RemoteGateway {
        self.inner.gateway.as_ref()
    }

    pub(super) fn scheduler(&self) -> &dyn ReplayScheduler {
        self.inner.scheduler.as_ref()
    }

    pub(super) fn publish(&self, message: SyncMessage) {
        // Nobody listening is fine.
        let _ = self.inner.events.send(message);
    }

    // ===== Read paths =====

    /// All restaurants: cached when the cache looks complete (with a silent
    /// background refresh), otherwise fetched fresh.
    pub async fn fetch_restaurants(&self) -> Result<Vec<Restaurant>, SyncError> {
        let Some(store) = self.store_opt() else {
            return self.refresh_restaurants().await;
        };
        let cached: Vec<Restaurant> = store.get_all(Partition::Restaurants)?;
        if cached.len() >= FRESH_LIST_MIN {
            // Stale-while-revalidate: serve the cache, repopulate behind it.
            let session = self.clone();
            tokio::spawn(async move {
                if let Err(e) = session.refresh_restaurants().await {
                    debug!(error = %e, "Background restaurant refresh failed");
                }
            });
            return Ok(self.overlay_favorites(cached));
        }
        self.refresh_restaurants().await
    }

    /// One restaurant by id: a cache hit is returned without touching the
    /// network at all.
    pub async fn fetch_restaurant_by_id(&self, id: i64) -> Result<Restaurant, SyncError> {
        if let Some(store) = self.store_opt() {
            if let Some(cached) = store.get::<Restaurant>(Partition::Restaurants, id)? {
                return Ok(self.overlay_favorite(cached));
            }
        }
        self.refresh_restaurant(id).await
    }

    /// Server-acknowledged reviews for a restaurant, cache-first with a
    /// background refresh. Pending submissions are listed separately via
    /// [`Self::pending_reviews`].
    pub async fn fetch_reviews_for_restaurant(
        &self,
        restaurant_id: i64,
    ) -> Result<Vec<Review>, SyncError> {
        if let Some(store) = self.store_opt() {
            let cached: Vec<Review> =
                store.get_by_index(StoreIndex::ReviewsByRestaurant, restaurant_id)?;
            if !cached.is_empty() {
                let session = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = session.refresh_reviews(restaurant_id).await {
                        debug!(error = %e, restaurant_id, "Background review refresh failed");
                    }
                });
                return Ok(cached);
            }
        }
        self.refresh_reviews(restaurant_id).await
    }

    /// Reviews still waiting in the outbox for this restaurant, so the UI
    /// can render them as outbound.
    pub fn pending_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, SyncError> {
        let Some(store) = self.store_opt() else {
            return Ok(Vec::new());
        };
        let entry: Option<ReviewOutboxEntry> =
            store.get(Partition::ReviewsOutbox, restaurant_id)?;
        Ok(entry.map(|e| vec![e.review]).unwrap_or_default())
    }

    /// The pending favorite value for a restaurant, if a toggle is still
    /// queued. Doubles as the UI's "favorite is updating" check.
    pub fn pending_favorite(&self, id: i64) -> Option<FavoriteFlag> {
        let store = self.store_opt()?;
        match store.get::<FavoriteOutboxEntry>(Partition::FavoritesOutbox, id) {
            Ok(entry) => entry.map(|e| e.is_favorite),
            Err(e) => {
                debug!(error = %e, id, "Failed to read favorites outbox");
                None
            }
        }
    }

    // ===== Derived reads =====

    /// Restaurants filtered by cuisine and neighborhood; either filter may
    /// be [`FILTER_ALL`].
    pub async fn restaurants_by_cuisine_and_neighborhood(
        &self,
        cuisine: &str,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, SyncError> {
        let mut restaurants = self.fetch_restaurants().await?;
        if cuisine != FILTER_ALL {
            restaurants.retain(|r| r.cuisine_type == cuisine);
        }
        if neighborhood != FILTER_ALL {
            restaurants.retain(|r| r.neighborhood == neighborhood);
        }
        Ok(restaurants)
    }

    pub async fn restaurants_by_cuisine(
        &self,
        cuisine: &str,
    ) -> Result<Vec<Restaurant>, SyncError> {
        self.restaurants_by_cuisine_and_neighborhood(cuisine, FILTER_ALL)
            .await
    }

    pub async fn restaurants_by_neighborhood(
        &self,
        neighborhood: &str,
    ) -> Result<Vec<Restaurant>, SyncError> {
        self.restaurants_by_cuisine_and_neighborhood(FILTER_ALL, neighborhood)
            .await
    }

    /// Distinct neighborhoods, in first-seen order.
    pub async fn neighborhoods(&self) -> Result<Vec<String>, SyncError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(distinct(restaurants.iter().map(|r| r.neighborhood.clone())))
    }

    /// Distinct cuisines, in first-seen order.
    pub async fn cuisines(&self) -> Result<Vec<String>, SyncError> {
        let restaurants = self.fetch_restaurants().await?;
        Ok(distinct(restaurants.iter().map(|r| r.cuisine_type.clone())))
    }

    // ===== Network refresh =====

    async fn refresh_restaurants(&self) -> Result<Vec<Restaurant>, SyncError> {
        let restaurants = self.gateway().fetch_restaurants().await?;
        if let Some(store) = self.store_opt() {
            for restaurant in &restaurants {
                store.put(Partition::Restaurants, restaurant.id, restaurant)?;
            }
        }
        Ok(self.overlay_favorites(restaurants))
    }

    async fn refresh_restaurant(&self, id: i64) -> Result<Restaurant, SyncError> {
        let restaurant = self.gateway().fetch_restaurant(id).await?;
        if let Some(store) = self.store_opt() {
            store.put(Partition::Restaurants, restaurant.id, &restaurant)?;
        }
        Ok(self.overlay_favorite(restaurant))
    }

    async fn refresh_reviews(&self, restaurant_id: i64) -> Result<Vec<Review>, SyncError> {
        let reviews = self.gateway().fetch_reviews(restaurant_id).await?;
        if let Some(store) = self.store_opt() {
            for review in &reviews {
                if let Some(id) = review.id {
                    store.put(Partition::Reviews, id, review)?;
                }
            }
        }
        Ok(reviews)
    }

    // A displayed favorite flag must reflect outbox state when a toggle is
    // still pending, else the stored/server state.

    fn overlay_favorite(&self, mut restaurant: Restaurant) -> Restaurant {
        if let Some(flag) = self.pending_favorite(restaurant.id) {
            restaurant.is_favorite = flag;
        }
        restaurant
    }

    fn overlay_favorites(&self, restaurants: Vec<Restaurant>) -> Vec<Restaurant> {
        restaurants
            .into_iter()
            .map(|r| self.overlay_favorite(r))
            .collect()
    }
}

fn distinct(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for value in values {
        if !seen.contains(&value) {
            seen.push(value);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::super::testing::{
        init_tracing, seed_restaurants, wait_until, MockGateway, RecordingScheduler,
    };
    use super::*;
    use crate::api::ApiError;

    fn session(dir: &tempfile::TempDir, gateway: &Arc<MockGateway>) -> SyncSession {
        init_tracing();
        SyncSession::new(
            dir.path().join("store"),
            gateway.clone(),
            Arc::new(RecordingScheduler::available()),
        )
    }

    #[tokio::test]
    async fn small_cache_triggers_one_synchronous_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(12)));
        let session = session(&dir, &gateway);

        let restaurants = session.fetch_restaurants().await.unwrap();
        assert_eq!(restaurants.len(), 12);
        assert_eq!(gateway.list_calls(), 1);

        // The store is now populated.
        let store = session.local_store().unwrap();
        let cached: Vec<Restaurant> = store.get_all(Partition::Restaurants).unwrap();
        assert_eq!(cached.len(), 12);
    }

    #[tokio::test]
    async fn full_cache_serves_stale_and_revalidates_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(12)));
        let session = session(&dir, &gateway);

        session.fetch_restaurants().await.unwrap();
        assert_eq!(gateway.list_calls(), 1);

        // Second fetch: served from cache, refresh happens behind it.
        let restaurants = session.fetch_restaurants().await.unwrap();
        assert_eq!(restaurants.len(), 12);
        wait_until(|| gateway.list_calls() == 2).await;
    }

    #[tokio::test]
    async fn cached_restaurant_by_id_makes_no_network_call() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(12)));
        let session = session(&dir, &gateway);

        session.fetch_restaurants().await.unwrap();
        let before = gateway.get_calls();

        let restaurant = session.fetch_restaurant_by_id(3).await.unwrap();
        assert_eq!(restaurant.id, 3);
        assert_eq!(gateway.get_calls(), before);
    }

    #[tokio::test]
    async fn uncached_restaurant_by_id_fetches_and_populates() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(3)));
        let session = session(&dir, &gateway);

        let restaurant = session.fetch_restaurant_by_id(2).await.unwrap();
        assert_eq!(restaurant.id, 2);
        assert_eq!(gateway.get_calls(), 1);

        // Cached now: a second call stays local.
        session.fetch_restaurant_by_id(2).await.unwrap();
        assert_eq!(gateway.get_calls(), 1);
    }

    #[tokio::test]
    async fn background_refresh_failure_does_not_fail_cached_read() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(12)));
        let session = session(&dir, &gateway);

        session.fetch_restaurants().await.unwrap();
        gateway.set_fail_all(true);

        let restaurants = session.fetch_restaurants().await.unwrap();
        assert_eq!(restaurants.len(), 12);
        wait_until(|| gateway.list_calls() == 2).await;
    }

    #[tokio::test]
    async fn read_without_cache_surfaces_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(12)));
        gateway.set_fail_all(true);
        let session = session(&dir, &gateway);

        let err = session.fetch_restaurants().await.unwrap_err();
        match err {
            SyncError::Network(ApiError::Network { status, .. }) => assert_eq!(status, 503),
            other => panic!("expected network error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn reviews_are_cached_by_restaurant_index() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(MockGateway::with_restaurants(seed_restaurants(3)));
        gateway.seed_review(2, "Ada", 5, "Excellent.");
        gateway.seed_review(2, "Grace", 4, "Good.");
        gateway.seed_review(1, "Edsger", 3, "Fine.");
        let session = session(&dir, &gateway);

        let reviews = session.fetch_reviews_for_restaurant(2).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(gateway.review_fetch_calls(), 1);

        // Cached: second read is index-served, with a background refresh.
        let reviews = session.fetch_reviews_for_restaurant(2).await.unwrap();
        assert_eq!(reviews.len(), 2);
        wait_until(|| gateway.review_fetch_calls() == 2).await;
    }

    #[tokio::test]
    async fn filters_and_distinct_lists() {
        let dir = tempfile::tempdir().unwrap();
        let mut restaurants = seed_restaurants(12);
        restaurants[0].cuisine_type = "Thai".to_string();
        restaurants[0].neighborhood = "Queens".to_string();
        let gateway = Arc::new(MockGateway::with_restaurants(restaurants));
        let session = session(&dir, &gateway);

        let thai = session.restaurants_by_cuisine("Thai").await.unwrap();
        assert_eq!(thai.len(), 1);

        let both = session
            .restaurants_by_cuisine_and_neighborhood("Thai", "Queens")
            .await
            .unwrap();
        assert_eq!(both.len(), 1);

        let none = session
            .restaurants_by_cuisine_and_neighborhood("Thai", "Brooklyn")
            .await
            .unwrap();
        assert!(none.is_empty());

        let cuisines = session.cuisines().await.unwrap();
        assert!(cuisines.contains(&"Thai".to_string()));
        let unique: std::collections::HashSet<_> = cuisines.iter().collect();
        assert_eq!(unique.len(), cuisines.len());
    }
}
