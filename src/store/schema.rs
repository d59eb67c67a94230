//! Store partitions and the ordered schema migration list.
//!
//! Migrations are additive and keyed by target version; opening a store at
//! version N applies every migration with a higher target version, in order.
//! Already-synced data is never destroyed by a migration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Current schema version written to `schema.json` after migration.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the version marker file at the store root.
pub const META_FILE: &str = "schema.json";

/// The single version-0 partition that held restaurant records.
const LEGACY_PARTITION: &str = "restaurant-reviews";

/// A named partition of the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    /// Restaurant records keyed by restaurant id.
    Restaurants,
    /// Server-acknowledged reviews keyed by review id.
    Reviews,
    /// Pending favorite toggles keyed by restaurant id.
    FavoritesOutbox,
    /// Pending review submissions keyed by restaurant id.
    ReviewsOutbox,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::Restaurants,
        Partition::Reviews,
        Partition::FavoritesOutbox,
        Partition::ReviewsOutbox,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            Partition::Restaurants => "restaurants",
            Partition::Reviews => "reviews",
            Partition::FavoritesOutbox => "favorites-outbox",
            Partition::ReviewsOutbox => "reviews-outbox",
        }
    }
}

/// A secondary index over a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreIndex {
    /// Reviews grouped by their `restaurant_id` field.
    ReviewsByRestaurant,
}

#[derive(Debug, Serialize, Deserialize)]
struct SchemaMeta {
    version: u32,
}

struct Migration {
    to_version: u32,
    apply: fn(&Path) -> Result<()>,
}

/// All migrations, ascending by target version.
const MIGRATIONS: &[Migration] = &[Migration {
    to_version: 1,
    apply: migrate_to_v1,
}];

/// v0 -> v1: rename the single `restaurant-reviews` partition to
/// `restaurants` and add the reviews partition plus both outboxes.
fn migrate_to_v1(root: &Path) -> Result<()> {
    let legacy = root.join(LEGACY_PARTITION);
    let restaurants = root.join(Partition::Restaurants.dir_name());
    if legacy.is_dir() && !restaurants.exists() {
        fs::rename(&legacy, &restaurants)
            .with_context(|| format!("Failed to rename {} partition", LEGACY_PARTITION))?;
    }
    for partition in Partition::ALL {
        fs::create_dir_all(root.join(partition.dir_name()))
            .with_context(|| format!("Failed to create partition {}", partition.dir_name()))?;
    }
    Ok(())
}

/// Read the stored schema version, defaulting to 0 for a fresh or legacy
/// store root.
pub fn stored_version(root: &Path) -> Result<u32> {
    let path = root.join(META_FILE);
    if !path.exists() {
        return Ok(0);
    }
    let contents = fs::read_to_string(&path).context("Failed to read schema marker")?;
    let meta: SchemaMeta =
        serde_json::from_str(&contents).context("Failed to parse schema marker")?;
    Ok(meta.version)
}

/// Apply every migration past `from`, in order, and persist the new version.
/// Returns the resulting version.
pub fn migrate(root: &Path, from: u32) -> Result<u32> {
    let mut version = from;
    for migration in MIGRATIONS.iter().filter(|m| m.to_version > from) {
        (migration.apply)(root).with_context(|| {
            format!("Schema migration to version {} failed", migration.to_version)
        })?;
        info!(from = version, to = migration.to_version, "Migrated store schema");
        version = migration.to_version;
    }
    if version != from {
        let meta = SchemaMeta { version };
        fs::write(root.join(META_FILE), serde_json::to_string_pretty(&meta)?)
            .context("Failed to write schema marker")?;
    }
    Ok(version)
}
