use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage;

pub const CACHE_FILE_NAME: &str = "cost_cache.json";

/// Aggregated totals for one transcript file, valid while its size and
/// mtime are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheEntry {
    pub size: u64,
    /// Unix milliseconds.
    pub mtime: i64,
    /// Unix milliseconds.
    pub last_parsed: i64,
    /// Paid (assistant) entries found in the file.
    pub entries_count: u64,
    pub total_cost: f64,
    pub checksum: String,
    pub user_messages: u64,
}

impl CacheEntry {
    pub fn matches(&self, size: u64, mtime: i64) -> bool {
        self.size == size && self.mtime == mtime && self.checksum == checksum(size, mtime)
    }
}

pub fn checksum(size: u64, mtime: i64) -> String {
    format!("{:x}-{:x}", size, mtime)
}

/// Persistent file cache for the cost aggregator.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CostCache {
    pub entries: HashMap<String, CacheEntry>,
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(skip)]
    dirty: bool,
}

impl CostCache {
    /// Load the cache from `cache_dir`; a missing or corrupt file yields an
    /// empty cache.
    pub fn load(cache_dir: &Path) -> CostCache {
        let path = cache_dir.join(CACHE_FILE_NAME);
        let mut cache = match std::fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<CostCache>(&contents).unwrap_or_else(|e| {
                tracing::debug!("discarding corrupt cost cache: {}", e);
                CostCache::default()
            }),
            Err(_) => CostCache::default(),
        };
        cache.path = Some(path);
        cache
    }

    pub fn in_memory() -> CostCache {
        CostCache::default()
    }

    pub fn get(&self, file: &Path, size: u64, mtime: i64) -> Option<&CacheEntry> {
        self.entries
            .get(&key(file))
            .filter(|entry| entry.matches(size, mtime))
    }

    pub fn insert(&mut self, file: &Path, entry: CacheEntry) {
        self.entries.insert(key(file), entry);
        self.dirty = true;
    }

    /// Drop entries for files that no longer exist under the walked tree.
    pub fn retain_seen(&mut self, seen: &HashSet<String>) {
        let before = self.entries.len();
        self.entries.retain(|k, _| seen.contains(k));
        if self.entries.len() != before {
            self.dirty = true;
        }
    }

    /// Write the cache back if anything changed. In-memory caches are a no-op.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_vec(self).context("failed to serialize cost cache")?;
        storage::write_atomic(&path, &json)?;
        self.dirty = false;
        Ok(())
    }
}

pub fn key(file: &Path) -> String {
    file.to_string_lossy().into_owned()
}
