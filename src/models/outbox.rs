//! Records parked in the outbox partitions while a write awaits replay.

use serde::{Deserialize, Serialize};

use super::{FavoriteFlag, Review};

/// A favorite toggle waiting to be replayed against the server.
///
/// Keyed by restaurant id: toggling again before the first replay simply
/// overwrites the pending entry, so only the latest intent is ever sent
/// (local last-write-wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteOutboxEntry {
    pub id: i64,
    #[serde(rename = "isFavorite")]
    pub is_favorite: FavoriteFlag,
}

/// A review submission waiting to be replayed against the server.
///
/// Keyed by `restaurant_id` in schema v1, which means at most one unsent
/// review per restaurant can be queued; a second submission before the first
/// syncs replaces it.
// TODO: key by a local draft id once the schema grows a v2 migration, so
// multiple unsent reviews per restaurant can queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutboxEntry {
    pub restaurant_id: i64,
    pub review: Review,
}
