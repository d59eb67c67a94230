//! Static-asset and image caching module.
//!
//! This module provides the [`AssetCache`] serving shell files and photos
//! from a local byte cache with network fallback, plus the install-time
//! [`manifest`] of shell assets and placeholder images.

pub mod cache;
pub mod manifest;

pub use cache::{
    AssetCache, AssetFetcher, AssetRequest, AssetResponse, AssetSource, FetchedAsset,
    HttpAssetFetcher,
};
