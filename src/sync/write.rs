//! Deferred-write paths: favorite toggles and review submissions.
//!
//! Both writes apply an optimistic local update first, then either park the
//! mutation in its outbox for host-scheduled replay or, when no scheduler
//! exists, write through immediately. A failed write-through rolls the
//! optimistic state back so the UI reverts visibly.
//!
//! Neither write surfaces progress on its own; a UI wanting an "updating"
//! indicator wraps the call with
//! [`pending_after`](super::pending::pending_after), which flips only once
//! the write outlives [`PENDING_THRESHOLD`](super::pending::PENDING_THRESHOLD).

use chrono::Utc;
use tracing::warn;

use crate::models::{FavoriteOutboxEntry, Restaurant, Review, ReviewDraft, ReviewOutboxEntry, RATING_RANGE};
use crate::store::Partition;

use super::{SyncError, SyncSession, SyncTag, WriteOutcome};

impl SyncSession {
    /// Flip a restaurant's favorite flag.
    ///
    /// The flip is applied to the local record immediately. With a scheduler
    /// available the new value is parked in the favorites outbox (one entry
    /// per restaurant - a newer toggle overwrites an older pending one) and
    /// registered for replay; otherwise it is written through, rolling back
    /// on failure.
    pub async fn toggle_favorite(&self, id: i64) -> Result<WriteOutcome<Restaurant>, SyncError> {
        // Overlay included: toggling twice offline flips the pending value.
        let current = self.fetch_restaurant_by_id(id).await?;
        let target = current.is_favorite.toggled();

        let Some(store) = self.store_opt() else {
            // Network-only mode: nothing local to keep in sync.
            let updated = self.gateway().set_favorite(id, target).await?;
            return Ok(WriteOutcome::Completed(updated));
        };

        let previous: Option<Restaurant> = store.get(Partition::Restaurants, id)?;
        let queued: Option<FavoriteOutboxEntry> = store.get(Partition::FavoritesOutbox, id)?;
        let mut optimistic = current;
        optimistic.is_favorite = target;
        store.put(Partition::Restaurants, id, &optimistic)?;

        if self.scheduler().is_available() {
            let entry = FavoriteOutboxEntry {
                id,
                is_favorite: target,
            };
            store.put(Partition::FavoritesOutbox, id, &entry)?;
            match self.scheduler().register(SyncTag::Favorites).await {
                Ok(()) => return Ok(WriteOutcome::Enqueued(optimistic)),
                Err(e) => {
                    warn!(error = %e, "Replay registration failed, writing through");
                }
            }
        }

        match self.gateway().set_favorite(id, target).await {
            Ok(updated) => {
                store.put(Partition::Restaurants, id, &updated)?;
                store.delete(Partition::FavoritesOutbox, id)?;
                Ok(WriteOutcome::Completed(updated))
            }
            Err(e) => {
                // Roll back to the pre-toggle state. A toggle that was
                // already queued before this one stays queued: its remote
                // write never happened.
                match previous {
                    Some(ref prev) => store.put(Partition::Restaurants, id, prev)?,
                    None => store.delete(Partition::Restaurants, id)?,
                }
                match queued {
                    Some(ref entry) => store.put(Partition::FavoritesOutbox, id, entry)?,
                    None => store.delete(Partition::FavoritesOutbox, id)?,
                }
                Err(e.into())
            }
        }
    }

    /// Submit a review.
    ///
    /// The stamped review is parked in the reviews outbox (keyed by
    /// restaurant id, so a second submission for the same restaurant before
    /// the first syncs replaces it) and registered for replay; without a
    /// scheduler it is posted directly, rolling back on failure.
    pub async fn post_review(&self, draft: ReviewDraft) -> Result<WriteOutcome<Review>, SyncError> {
        if !RATING_RANGE.contains(&draft.rating) {
            return Err(SyncError::InvalidRating(draft.rating));
        }
        let review = draft.into_review(Utc::now());

        let Some(store) = self.store_opt() else {
            let created = self.gateway().post_review(&review).await?;
            return Ok(WriteOutcome::Completed(created));
        };

        let restaurant_id = review.restaurant_id;
        let previous: Option<ReviewOutboxEntry> = store.get(Partition::ReviewsOutbox, restaurant_id)?;
        let entry = ReviewOutboxEntry {
            restaurant_id,
            review: review.clone(),
        };
        store.put(Partition::ReviewsOutbox, restaurant_id, &entry)?;

        if self.scheduler().is_available() {
            match self.scheduler().register(SyncTag::Reviews).await {
                Ok(()) => return Ok(WriteOutcome::Enqueued(review)),
                Err(e) => {
                    warn!(error = %e, "Replay registration failed, posting directly");
                }
            }
        }

        match self.gateway().post_review(&review).await {
            Ok(created) => {
                if let Some(id) = created.id {
                    store.put(Partition::Reviews, id, &created)?;
                }
                store.delete(Partition::ReviewsOutbox, restaurant_id)?;
                Ok(WriteOutcome::Completed(created))
            }
            Err(e) => {
                match previous {
                    Some(ref prev) => store.put(Partition::ReviewsOutbox, restaurant_id, prev)?,
                    None => store.delete(Partition::ReviewsOutbox, restaurant_id)?,
                }
                Err(e.into())
            }
        }
    }
}
