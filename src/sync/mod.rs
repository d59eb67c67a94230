//! Offline synchronization core.
//!
//! This module decides whether reads are served from the local store or the
//! network, and whether writes go through immediately or are parked in an
//! outbox for replay once connectivity returns:
//!
//! - [`SyncSession`]: read-through caching with stale-while-revalidate
//! - write paths: optimistic favorite toggles and review submissions
//! - [`ReplayWorker`]: sequential outbox drains with broadcast notifications
//! - [`ReplayScheduler`]: port to the host's deferred-retry facility
//! - [`pending_after`]: the timeout-scheduled "updating" indicator

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiError;

pub mod pending;
pub mod replay;
pub mod schedule;
pub mod session;
mod write;

#[cfg(test)]
pub(crate) mod testing;

pub use pending::{pending_after, PendingGuard, PENDING_THRESHOLD};
pub use replay::{ReplayError, ReplayWorker};
pub use schedule::{ChannelScheduler, NoScheduler, ReplayScheduler, ScheduleError, SyncTag};
pub use session::SyncSession;

/// Errors surfaced by sync-core operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The server answered with a failure, or could not be reached, and no
    /// cached fallback existed.
    #[error(transparent)]
    Network(#[from] ApiError),

    /// The local store failed to open. Read and write paths degrade to
    /// network-only mode instead of raising this; it is only returned when
    /// a caller explicitly asks for the store handle.
    #[error("local store unavailable")]
    StoreUnavailable,

    /// A store operation failed after the store opened (I/O, corruption).
    #[error("store operation failed: {0}")]
    Store(#[from] anyhow::Error),

    /// Review rating outside the 1..=5 range accepted by the API.
    #[error("rating {0} outside allowed range 1-5")]
    InvalidRating(u8),
}

/// Notification broadcast to every open client context after a queued
/// mutation has been confirmed by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum SyncMessage {
    /// A pending favorite toggle for restaurant `id` reached the server.
    #[serde(rename = "favorites-synced")]
    FavoritesSynced { id: i64 },

    /// A pending review for `restaurant_id` reached the server; `id` is the
    /// server-assigned review id.
    #[serde(rename = "reviews-synced")]
    ReviewsSynced { restaurant_id: i64, id: Option<i64> },
}

/// How a write request was resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome<T> {
    /// Parked in the outbox; the host scheduler owns when it is replayed.
    /// The carried value is the optimistic local state.
    Enqueued(T),

    /// Confirmed by the server within this call. The carried value is the
    /// server's response.
    Completed(T),
}

impl<T> WriteOutcome<T> {
    pub fn value(&self) -> &T {
        match self {
            WriteOutcome::Enqueued(v) | WriteOutcome::Completed(v) => v,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            WriteOutcome::Enqueued(v) | WriteOutcome::Completed(v) => v,
        }
    }

    pub fn is_enqueued(&self) -> bool {
        matches!(self, WriteOutcome::Enqueued(_))
    }
}
