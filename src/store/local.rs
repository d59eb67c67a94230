//! File-backed local store: one JSON document per record, grouped into
//! named partition directories under a single root.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::schema::{self, Partition, StoreIndex};

/// Durable, versioned local mirror of the server's resources plus the two
/// outboxes. All lookups return `None`/empty for absent records; errors are
/// reserved for real I/O or corruption problems.
#[derive(Debug)]
pub struct LocalStore {
    root: PathBuf,
    version: u32,
}

impl LocalStore {
    /// Open the store at `root`, creating it if needed and running any
    /// pending schema migrations. Idempotent: reopening an up-to-date store
    /// changes nothing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create store root {}", root.display()))?;
        let from = schema::stored_version(&root)?;
        let version = schema::migrate(&root, from)?;
        debug!(root = %root.display(), version, "Opened local store");
        Ok(Self { root, version })
    }

    /// The schema version this store was opened at.
    pub fn version(&self) -> u32 {
        self.version
    }

    fn record_path(&self, partition: Partition, key: i64) -> PathBuf {
        self.root
            .join(partition.dir_name())
            .join(format!("{}.json", key))
    }

    /// All keys present in a partition, ascending.
    pub fn keys(&self, partition: Partition) -> Result<Vec<i64>> {
        let dir = self.root.join(partition.dir_name());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in fs::read_dir(&dir)
            .with_context(|| format!("Failed to list partition {}", partition.dir_name()))?
        {
            let entry = entry?;
            if let Some(key) = parse_key(&entry.path()) {
                keys.push(key);
            }
        }
        keys.sort_unstable();
        Ok(keys)
    }

    /// Fetch a single record by primary key.
    pub fn get<T: DeserializeOwned>(&self, partition: Partition, key: i64) -> Result<Option<T>> {
        let path = self.record_path(partition, key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}/{}", partition.dir_name(), key))?;
        let record = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}/{}", partition.dir_name(), key))?;
        Ok(Some(record))
    }

    /// All records in a partition, in ascending key order.
    pub fn get_all<T: DeserializeOwned>(&self, partition: Partition) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for key in self.keys(partition)? {
            if let Some(record) = self.get(partition, key)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Records matching `key` under a secondary index, in ascending
    /// primary-key order.
    pub fn get_by_index<T: DeserializeOwned>(
        &self,
        index: StoreIndex,
        key: i64,
    ) -> Result<Vec<T>> {
        let (partition, field) = match index {
            StoreIndex::ReviewsByRestaurant => (Partition::Reviews, "restaurant_id"),
        };
        let mut records = Vec::new();
        for primary in self.keys(partition)? {
            let Some(value) = self.get::<serde_json::Value>(partition, primary)? else {
                continue;
            };
            if value.get(field).and_then(|v| v.as_i64()) == Some(key) {
                let record = serde_json::from_value(value).with_context(|| {
                    format!("Failed to parse {}/{}", partition.dir_name(), primary)
                })?;
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Upsert by primary key. Overwrites the whole record; there is no
    /// partial merge.
    pub fn put<T: Serialize>(&self, partition: Partition, key: i64, record: &T) -> Result<()> {
        let path = self.record_path(partition, key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(record)?;
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}/{}", partition.dir_name(), key))?;
        Ok(())
    }

    /// Remove a record. No-op when absent.
    pub fn delete(&self, partition: Partition, key: i64) -> Result<()> {
        let path = self.record_path(partition, key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| {
                format!("Failed to delete {}/{}", partition.dir_name(), key)
            }),
        }
    }

    /// The lowest-keyed record in a partition, or `None` when empty.
    /// Outbox drains consume entries in this order.
    pub fn first<T: DeserializeOwned>(&self, partition: Partition) -> Result<Option<(i64, T)>> {
        match self.keys(partition)?.first() {
            Some(&key) => Ok(self.get(partition, key)?.map(|record| (key, record))),
            None => Ok(None),
        }
    }
}

fn parse_key(path: &Path) -> Option<i64> {
    path.file_stem()?.to_str()?.parse().ok()
}
