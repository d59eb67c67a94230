//! Byte cache for shell assets and restaurant images.
//!
//! Responses are cached on disk under named partitions. Images are keyed by
//! logical filename - the `.{size}.{format}` suffix is stripped - so one
//! cached photo serves every responsive variant. When a photo cannot be
//! fetched, the placeholder matching the requested size and format is
//! substituted from the static partition.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::ApiError;

use super::manifest;

/// HTTP request timeout for asset fetches, in seconds.
const FETCH_TIMEOUT_SECS: u64 = 30;

/// Sidecar file suffix holding an asset's content type.
const TYPE_SUFFIX: &str = ".ctype";

/// A fetched asset body with its content type.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub content_type: String,
    pub body: Vec<u8>,
}

/// Network access for asset population, behind a trait so the cache logic
/// can be exercised against a simulated origin.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    /// Fetch an origin-relative path. Non-2xx responses are errors.
    async fn fetch(&self, path: &str) -> Result<FetchedAsset, ApiError>;
}

/// Production fetcher over reqwest, bound to the app origin.
#[derive(Clone)]
pub struct HttpAssetFetcher {
    client: Client,
    origin: String,
}

impl HttpAssetFetcher {
    pub fn new(origin: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        let mut origin = origin.into();
        while origin.ends_with('/') {
            origin.pop();
        }
        Ok(Self { client, origin })
    }
}

#[async_trait]
impl AssetFetcher for HttpAssetFetcher {
    async fn fetch(&self, path: &str) -> Result<FetchedAsset, ApiError> {
        let url = format!("{}{}", self.origin, path);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::from_status(response.status()));
        }
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = response.bytes().await?.to_vec();
        Ok(FetchedAsset { content_type, body })
    }
}

/// An intercepted request, reduced to what routing needs.
#[derive(Debug, Clone, Copy)]
pub struct AssetRequest<'a> {
    pub method: &'a str,
    /// Origin-relative path, query string included if any.
    pub path: &'a str,
    pub same_origin: bool,
}

/// Where a served asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    Network,
    Placeholder,
}

#[derive(Debug, Clone)]
pub struct AssetResponse {
    pub content_type: String,
    pub body: Vec<u8>,
    pub source: AssetSource,
}

/// Disk-backed asset cache with versioned partitions.
pub struct AssetCache {
    root: PathBuf,
}

impl AssetCache {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create asset cache root {}", root.display()))?;
        Ok(Self { root })
    }

    /// Pre-populate the current static partition with the install manifest.
    /// Any fetch failure aborts the install, matching all-or-nothing
    /// install semantics.
    pub async fn install(&self, fetcher: &dyn AssetFetcher) -> Result<()> {
        let partition = manifest::static_cache_name();
        for path in manifest::install_manifest() {
            let asset = fetcher
                .fetch(&path)
                .await
                .with_context(|| format!("Failed to pre-cache {}", path))?;
            self.write_asset(&partition, &path, &asset)?;
        }
        info!(partition, "Static asset cache installed");
        Ok(())
    }

    /// Remove every partition carrying the app prefix that the current
    /// version no longer uses. Returns the removed partition names.
    pub fn activate(&self) -> Result<Vec<String>> {
        let allowed = manifest::allowed_caches();
        let mut removed = Vec::new();
        for entry in fs::read_dir(&self.root).context("Failed to list asset cache root")? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.path().is_dir() {
                continue;
            }
            if name.starts_with(manifest::APP_PREFIX) && !allowed.contains(&name) {
                fs::remove_dir_all(entry.path())
                    .with_context(|| format!("Failed to remove stale partition {}", name))?;
                debug!(partition = %name, "Removed stale asset partition");
                removed.push(name);
            }
        }
        Ok(removed)
    }

    /// Route an intercepted request. `None` means the request is not ours
    /// to answer (non-GET or cross-origin) and should go to the network
    /// untouched.
    pub async fn handle(
        &self,
        request: &AssetRequest<'_>,
        fetcher: &dyn AssetFetcher,
    ) -> Result<Option<AssetResponse>> {
        if request.method != "GET" || !request.same_origin {
            return Ok(None);
        }

        let path = request.path;
        if path.starts_with("/img/") {
            return self.serve_photo(path, fetcher).await.map(Some);
        }
        if path.starts_with("/restaurant.html") {
            // Single-page-style routing: the shell answers regardless of
            // query string.
            return Ok(self
                .read_asset(&manifest::static_cache_name(), "/restaurant.html")?
                .map(|asset| cached(asset)));
        }

        // Everything else same-origin: cache-first, network fallback, no
        // write-back.
        let key = strip_query(path);
        if let Some(asset) = self.read_asset(&manifest::static_cache_name(), key)? {
            return Ok(Some(cached(asset)));
        }
        let asset = fetcher
            .fetch(path)
            .await
            .with_context(|| format!("Failed to fetch {}", path))?;
        Ok(Some(AssetResponse {
            content_type: asset.content_type,
            body: asset.body,
            source: AssetSource::Network,
        }))
    }

    /// Photos: cache-first keyed by logical filename, write-back on network
    /// success, placeholder substitution on network failure.
    async fn serve_photo(
        &self,
        path: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<AssetResponse> {
        let photo = PhotoSpec::parse(path);
        let images = manifest::images_cache_name();

        if let Some(asset) = self.read_asset(&images, photo.filename)? {
            return Ok(cached(asset));
        }

        match fetcher.fetch(path).await {
            Ok(asset) => {
                self.write_asset(&images, photo.filename, &asset)?;
                Ok(AssetResponse {
                    content_type: asset.content_type,
                    body: asset.body,
                    source: AssetSource::Network,
                })
            }
            Err(e) => {
                warn!(path, error = %e, "Photo fetch failed, substituting placeholder");
                let (Some(size), Some(format)) = (photo.size, photo.format) else {
                    return Err(anyhow::Error::from(e)
                        .context(format!("No placeholder variant for {}", path)));
                };
                let placeholder = manifest::placeholder_path(size, format);
                let asset = self
                    .read_asset(&manifest::static_cache_name(), &placeholder)?
                    .with_context(|| format!("Placeholder {} not cached", placeholder))?;
                Ok(AssetResponse {
                    content_type: asset.content_type,
                    body: asset.body,
                    source: AssetSource::Placeholder,
                })
            }
        }
    }

    fn partition_dir(&self, partition: &str) -> PathBuf {
        self.root.join(partition)
    }

    fn asset_path(&self, partition: &str, key: &str) -> PathBuf {
        self.partition_dir(partition).join(encode_key(key))
    }

    fn read_asset(&self, partition: &str, key: &str) -> Result<Option<FetchedAsset>> {
        let path = self.asset_path(partition, key);
        if !path.exists() {
            return Ok(None);
        }
        let body =
            fs::read(&path).with_context(|| format!("Failed to read cached asset {}", key))?;
        let content_type = fs::read_to_string(path.with_file_name(format!(
            "{}{}",
            path.file_name().unwrap_or_default().to_string_lossy(),
            TYPE_SUFFIX
        )))
        .unwrap_or_else(|_| "application/octet-stream".to_string());
        Ok(Some(FetchedAsset { content_type, body }))
    }

    fn write_asset(&self, partition: &str, key: &str, asset: &FetchedAsset) -> Result<()> {
        let path = self.asset_path(partition, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &asset.body)
            .with_context(|| format!("Failed to write cached asset {}", key))?;
        fs::write(
            path.with_file_name(format!(
                "{}{}",
                path.file_name().unwrap_or_default().to_string_lossy(),
                TYPE_SUFFIX
            )),
            &asset.content_type,
        )?;
        Ok(())
    }
}

fn cached(asset: FetchedAsset) -> AssetResponse {
    AssetResponse {
        content_type: asset.content_type,
        body: asset.body,
        source: AssetSource::Cache,
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

/// Keys are origin-relative paths; flatten them into safe file names.
fn encode_key(key: &str) -> String {
    key.replace('/', "__")
}

/// `/img/{filename}.{size}.{format}` broken into its parts. Requests
/// without the responsive suffix keep the whole name as the cache key.
struct PhotoSpec<'a> {
    filename: &'a str,
    size: Option<&'a str>,
    format: Option<&'a str>,
}

impl<'a> PhotoSpec<'a> {
    fn parse(path: &'a str) -> Self {
        let rel = strip_query(path).trim_start_matches("/img/");
        let mut parts = rel.split('.');
        let filename = parts.next().unwrap_or(rel);
        Self {
            filename,
            size: parts.next(),
            format: parts.next(),
        }
    }
}
