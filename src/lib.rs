//! Platecache - the offline data core of a restaurant directory app.
//!
//! This crate keeps a local, versioned copy of restaurant and review data,
//! serves reads cache-first with background refresh, queues writes made
//! while offline, and replays them when connectivity returns. A separate
//! asset layer caches the application shell and restaurant photos, falling
//! back to bundled placeholder images when a photo cannot be fetched.
//!
//! The main entry points are [`SyncSession`] for data access and
//! [`AssetCache`] for shell and image serving.

pub mod api;
pub mod assets;
pub mod config;
pub mod models;
pub mod store;
pub mod sync;

pub use api::{ApiClient, ApiError, RemoteGateway};
pub use assets::{AssetCache, AssetFetcher, AssetRequest, AssetResponse, AssetSource};
pub use config::Config;
pub use models::{FavoriteFlag, Restaurant, Review, ReviewDraft};
pub use store::{LocalStore, Partition};
pub use sync::{
    ChannelScheduler, NoScheduler, ReplayScheduler, ReplayWorker, SyncError, SyncMessage,
    SyncSession, SyncTag, WriteOutcome,
};
