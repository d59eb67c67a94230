//! Data models for the restaurant directory.
//!
//! This module contains the data structures mirrored between the REST API
//! and the local store:
//!
//! - `Restaurant`, `LatLng`, `FavoriteFlag`: directory records
//! - `Review`, `ReviewDraft`: user reviews, optimistic until acknowledged
//! - `FavoriteOutboxEntry`, `ReviewOutboxEntry`: deferred mutations

pub mod outbox;
pub mod restaurant;
pub mod review;

pub use outbox::{FavoriteOutboxEntry, ReviewOutboxEntry};
pub use restaurant::{FavoriteFlag, LatLng, Restaurant};
pub use review::{Review, ReviewDraft, RATING_RANGE};
