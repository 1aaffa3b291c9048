use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage;

/// Snapshots kept per session.
pub const MAX_ENTRIES: usize = 20;

/// Length of a rate-limit block.
pub const BLOCK_DURATION_MS: i64 = 5 * 60 * 60 * 1000;

const MAX_SESSION_ID_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// One metric snapshot taken by a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    /// Unix seconds. Zero means "stamp with now on add".
    pub timestamp: i64,
    pub context_pct: f64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub cache_hit_pct: f64,
    pub api_latency_ms: u64,
}

/// Ring of recent snapshots for one session plus the 5-hour block anchor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct History {
    pub session_id: String,
    pub entries: Vec<HistoryEntry>,
    /// Unix milliseconds; 0 when no block has started.
    pub block_start_time: i64,
    #[serde(skip)]
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

/// Make an untrusted session id safe to embed in a file name: anything
/// outside `[A-Za-z0-9_-]` becomes `_`, the result is capped at 64 chars,
/// and an empty id maps to `default`.
pub fn sanitize_session_id(id: &str) -> String {
    let cleaned: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SESSION_ID_LEN)
        .collect();

    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}

pub fn history_path(cache_dir: &Path, session_id: &str) -> PathBuf {
    cache_dir.join(format!("history_{}.json", sanitize_session_id(session_id)))
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

impl History {
    /// Load the ring for `session_id` from `cache_dir`. Missing or corrupt
    /// files produce an empty ring bound to the same path.
    pub fn load(cache_dir: &Path, session_id: &str) -> History {
        let mut history = Self::load_from(&history_path(cache_dir, session_id));
        if history.session_id.is_empty() {
            history.session_id = session_id.to_string();
        }
        history
    }

    pub fn load_from(path: &Path) -> History {
        let mut history = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<History>(&contents) {
                Ok(h) => h,
                Err(e) => {
                    tracing::debug!("discarding corrupt history {}: {}", path.display(), e);
                    History::default()
                }
            },
            Err(_) => History::default(),
        };
        history.entries.retain(|e| e.is_finite());
        history.trim();
        history.path = Some(path.to_path_buf());
        history
    }

    /// Persist the ring to the path it was loaded from.
    pub fn save(&mut self) -> Result<()> {
        let path = self
            .path
            .clone()
            .context("history has no backing file")?;
        self.trim();
        let json = serde_json::to_vec_pretty(self).context("failed to serialize history")?;
        storage::write_atomic(&path, &json)
    }

    // -----------------------------------------------------------------------
    // Ring operations
    // -----------------------------------------------------------------------

    pub fn add(&mut self, entry: HistoryEntry) {
        self.add_at(entry, now_secs());
    }

    fn add_at(&mut self, mut entry: HistoryEntry, now: i64) {
        if entry.timestamp == 0 {
            entry.timestamp = now;
        }
        entry.sanitize();
        self.entries.push(entry);
        self.trim();
    }

    fn trim(&mut self) {
        if self.entries.len() > MAX_ENTRIES {
            let excess = self.entries.len() - MAX_ENTRIES;
            self.entries.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The last `n` entries, oldest first.
    pub fn read_last(&self, n: usize) -> &[HistoryEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn context_history(&self, n: usize) -> Vec<f64> {
        self.read_last(n).iter().map(|e| e.context_pct).collect()
    }

    #[allow(dead_code)] // Query counterpart of context_history; no widget plots cost yet.
    pub fn cost_history(&self, n: usize) -> Vec<f64> {
        self.read_last(n).iter().map(|e| e.cost_usd).collect()
    }

    // -----------------------------------------------------------------------
    // 5-hour block tracking
    // -----------------------------------------------------------------------

    /// Start a new block if none is running, the current one has expired or
    /// its start lies in the future.
    pub fn update_block_start_time(&mut self) {
        self.update_block_start_time_at(now_millis());
    }

    pub fn update_block_start_time_at(&mut self, now_ms: i64) {
        let start = self.block_start_time;
        if start == 0 || start > now_ms || now_ms.saturating_sub(start) >= BLOCK_DURATION_MS {
            self.block_start_time = now_ms;
        }
    }

    fn block_elapsed_ms_at(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.block_start_time).max(0)
    }

    pub fn block_elapsed_pct_at(&self, now_ms: i64) -> f64 {
        if self.block_start_time == 0 {
            return 0.0;
        }
        let elapsed = self.block_elapsed_ms_at(now_ms);
        (elapsed as f64 / BLOCK_DURATION_MS as f64 * 100.0).min(100.0)
    }

    pub fn block_remaining_ms_at(&self, now_ms: i64) -> i64 {
        if self.block_start_time == 0 {
            return 0;
        }
        BLOCK_DURATION_MS
            .saturating_sub(self.block_elapsed_ms_at(now_ms))
            .max(0)
    }
}

impl HistoryEntry {
    fn is_finite(&self) -> bool {
        self.context_pct.is_finite() && self.cost_usd.is_finite() && self.cache_hit_pct.is_finite()
    }

    fn sanitize(&mut self) {
        for v in [
            &mut self.context_pct,
            &mut self.cost_usd,
            &mut self.cache_hit_pct,
        ] {
            if !v.is_finite() {
                *v = 0.0;
            }
        }
    }
}

pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
