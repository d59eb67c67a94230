//! Outbox replay: drains pending mutations against the server, one entry at
//! a time, once connectivity returns.
//!
//! Each sweep processes entries in ascending key order. An entry is deleted
//! from its outbox only after the remote call succeeds, and a notification
//! is broadcast after the deletion so every open context can reconcile. A
//! remote failure aborts the sweep with the failed and later entries still
//! queued - the host trigger decides when to try again; there are no
//! internal retries.

use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::models::{FavoriteOutboxEntry, ReviewOutboxEntry};
use crate::store::Partition;

use super::{SyncError, SyncMessage, SyncSession, SyncTag};

/// A queued mutation failed remotely. The entry stays in its outbox for the
/// next replay trigger.
#[derive(Debug, Error)]
#[error("{tag} replay aborted: {source}")]
pub struct ReplayError {
    pub tag: SyncTag,
    /// Outbox key of the entry that failed, when one was being processed.
    pub key: Option<i64>,
    #[source]
    pub source: SyncError,
}

/// Drains the outboxes of the session it was created from.
pub struct ReplayWorker {
    session: SyncSession,
}

impl ReplayWorker {
    pub(super) fn new(session: SyncSession) -> Self {
        Self { session }
    }

    /// Drain both outboxes. Each outbox is attempted even if the other
    /// fails; the first error is reported. Returns the number of entries
    /// synced.
    pub async fn drain_all(&self) -> Result<usize, ReplayError> {
        let favorites = self.drain_favorites().await;
        let reviews = self.drain_reviews().await;
        match (favorites, reviews) {
            (Ok(a), Ok(b)) => Ok(a + b),
            (Err(e), _) => Err(e),
            (_, Err(e)) => Err(e),
        }
    }

    /// Replay pending favorite toggles, lowest restaurant id first.
    pub async fn drain_favorites(&self) -> Result<usize, ReplayError> {
        let Some(store) = self.session.store_opt() else {
            // Nothing can be queued without a store.
            return Ok(0);
        };
        let mut synced = 0;
        while let Some((key, entry)) = store
            .first::<FavoriteOutboxEntry>(Partition::FavoritesOutbox)
            .map_err(|e| self.abort(SyncTag::Favorites, None, e.into()))?
        {
            let updated = self
                .session
                .gateway()
                .set_favorite(entry.id, entry.is_favorite)
                .await
                .map_err(|e| self.abort(SyncTag::Favorites, Some(key), e.into()))?;
            store
                .put(Partition::Restaurants, updated.id, &updated)
                .map_err(|e| self.abort(SyncTag::Favorites, Some(key), e.into()))?;
            store
                .delete(Partition::FavoritesOutbox, key)
                .map_err(|e| self.abort(SyncTag::Favorites, Some(key), e.into()))?;
            self.session
                .publish(SyncMessage::FavoritesSynced { id: entry.id });
            synced += 1;
        }
        Ok(synced)
    }

    /// Replay pending review submissions, lowest restaurant id first.
    pub async fn drain_reviews(&self) -> Result<usize, ReplayError> {
        let Some(store) = self.session.store_opt() else {
            return Ok(0);
        };
        let mut synced = 0;
        while let Some((key, entry)) = store
            .first::<ReviewOutboxEntry>(Partition::ReviewsOutbox)
            .map_err(|e| self.abort(SyncTag::Reviews, None, e.into()))?
        {
            let created = self
                .session
                .gateway()
                .post_review(&entry.review)
                .await
                .map_err(|e| self.abort(SyncTag::Reviews, Some(key), e.into()))?;
            if let Some(id) = created.id {
                store
                    .put(Partition::Reviews, id, &created)
                    .map_err(|e| self.abort(SyncTag::Reviews, Some(key), e.into()))?;
            }
            store
                .delete(Partition::ReviewsOutbox, key)
                .map_err(|e| self.abort(SyncTag::Reviews, Some(key), e.into()))?;
            self.session.publish(SyncMessage::ReviewsSynced {
                restaurant_id: entry.restaurant_id,
                id: created.id,
            });
            synced += 1;
        }
        Ok(synced)
    }

    fn abort(&self, tag: SyncTag, key: Option<i64>, source: SyncError) -> ReplayError {
        error!(%tag, ?key, error = %source, "Replay sweep aborted");
        ReplayError { tag, key, source }
    }

    /// Drive replay from a connectivity signal: one drain attempt per
    /// transition to online, plus one on startup if already online. Runs
    /// until the sender side of the signal is dropped.
    pub async fn run(self, mut online: watch::Receiver<bool>) {
        loop {
            if *online.borrow_and_update() {
                match self.drain_all().await {
                    Ok(0) => {}
                    Ok(n) => info!(synced = n, "Replay drained outboxes"),
                    Err(e) => warn!(error = %e, "Replay failed; entries remain queued"),
                }
            }
            if online.changed().await.is_err() {
                break;
            }
        }
    }
}
