//! Cross-session cost aggregation over every transcript under the projects
//! directory, bucketed into local day / week / month and the current 5-hour
//! block.

pub mod cache;
pub mod pricing;

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::time::UNIX_EPOCH;

use chrono::{DateTime, Datelike, Days, Local, NaiveDate, TimeZone};
use serde::Deserialize;
use serde_json::Value;
use walkdir::WalkDir;

pub use cache::CostCache;
use cache::CacheEntry;
use pricing::TokenUsage;

use crate::history::BLOCK_DURATION_MS;
use crate::transcript::parse_timestamp_ms;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Spend and user-turn counts per window. Rebuilt on every invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostData {
    pub today: f64,
    pub week: f64,
    pub month: f64,
    pub five_hour_block: f64,
    pub today_messages: u64,
    pub week_messages: u64,
    pub block_messages: u64,
    /// Unix milliseconds; 0 when no block is active.
    pub block_start_time: i64,
}

/// One costed or counted event. Cache hits produce a single synthetic
/// entry per file stamped with the file's mtime.
#[derive(Debug, Clone, Copy, PartialEq)]
struct CostEntry {
    timestamp_ms: i64,
    cost_usd: f64,
    user_turns: u64,
}

#[derive(Debug, Default)]
struct FileSummary {
    entries: Vec<CostEntry>,
    total_cost: f64,
    paid_entries: u64,
    user_messages: u64,
}

/// Window boundaries in unix milliseconds, local time.
#[derive(Debug, Clone, Copy)]
struct Windows {
    day_start: i64,
    week_start: i64,
    month_start: i64,
    block_start: i64,
}

impl Windows {
    fn at(now: DateTime<Local>, block_start: i64) -> Windows {
        Windows {
            day_start: start_of_day(now),
            week_start: start_of_week(now),
            month_start: start_of_month(now),
            block_start,
        }
    }

    /// Files last modified before this cannot contribute to any bucket.
    fn earliest(&self) -> i64 {
        let mut earliest = self.month_start.min(self.week_start);
        if self.block_start > 0 {
            earliest = earliest.min(self.block_start);
        }
        earliest
    }

    fn in_block(&self, ts: i64) -> bool {
        self.block_start > 0
            && ts >= self.block_start
            && ts < self.block_start.saturating_add(BLOCK_DURATION_MS)
    }
}

// ---------------------------------------------------------------------------
// Local-time boundaries
// ---------------------------------------------------------------------------

fn local_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .and_then(|dt| Local.from_local_datetime(&dt).earliest())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

pub fn start_of_day(now: DateTime<Local>) -> i64 {
    local_midnight(now.date_naive())
}

/// Monday 00:00 local; Sunday belongs to the week that started six days
/// earlier.
pub fn start_of_week(now: DateTime<Local>) -> i64 {
    let back = u64::from(now.weekday().num_days_from_monday());
    now.date_naive()
        .checked_sub_days(Days::new(back))
        .map(local_midnight)
        .unwrap_or(0)
}

pub fn start_of_month(now: DateTime<Local>) -> i64 {
    now.date_naive()
        .with_day(1)
        .map(local_midnight)
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Transcript line parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageLine {
    #[serde(rename = "type")]
    kind: String,
    timestamp: Value,
    #[serde(rename = "costUsd")]
    cost_usd: Option<f64>,
    #[serde(rename = "isMeta")]
    is_meta: Option<bool>,
    #[serde(rename = "requestId")]
    request_id: String,
    message: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageMessage {
    id: String,
    model: String,
    usage: Option<TokenUsage>,
}

/// Classify one JSONL line. Returns `None` for lines that neither cost
/// money nor count as a user turn. The second value is a dedup key for
/// streamed assistant messages that are logged more than once.
fn parse_line(line: &str) -> Option<(CostEntry, Option<String>)> {
    let parsed: UsageLine = serde_json::from_str(line).ok()?;
    let timestamp_ms = parse_timestamp_ms(&parsed.timestamp);

    match parsed.kind.as_str() {
        "assistant" => {
            let message = UsageMessage::deserialize(&parsed.message).ok()?;
            let usage = message.usage?;
            let cost_usd = match parsed.cost_usd {
                Some(c) if c > 0.0 && c.is_finite() => c,
                _ => usage.cost_usd(&message.model),
            };
            let dedup = if message.id.is_empty() || parsed.request_id.is_empty() {
                None
            } else {
                Some(format!("{}:{}", message.id, parsed.request_id))
            };
            Some((
                CostEntry {
                    timestamp_ms,
                    cost_usd,
                    user_turns: 0,
                },
                dedup,
            ))
        }
        "user" if parsed.is_meta != Some(true) => Some((
            CostEntry {
                timestamp_ms,
                cost_usd: 0.0,
                user_turns: 1,
            },
            None,
        )),
        _ => None,
    }
}

fn parse_file(path: &Path) -> io::Result<FileSummary> {
    let reader = BufReader::new(File::open(path)?);
    let mut summary = FileSummary::default();
    let mut seen: HashSet<String> = HashSet::new();

    for line in reader.lines() {
        let Ok(line) = line else {
            continue;
        };
        if line.trim().is_empty() {
            continue;
        }
        let Some((entry, dedup)) = parse_line(&line) else {
            continue;
        };
        if let Some(key) = dedup {
            if !seen.insert(key) {
                continue;
            }
        }
        if entry.user_turns > 0 {
            summary.user_messages += entry.user_turns;
        } else {
            summary.paid_entries += 1;
            summary.total_cost += entry.cost_usd;
        }
        summary.entries.push(entry);
    }
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

impl CostData {
    fn add(&mut self, entry: &CostEntry, windows: &Windows) {
        let ts = entry.timestamp_ms;
        if ts >= windows.month_start {
            self.month += entry.cost_usd;
        }
        if ts >= windows.week_start {
            self.week += entry.cost_usd;
            self.week_messages += entry.user_turns;
        }
        if ts >= windows.day_start {
            self.today += entry.cost_usd;
            self.today_messages += entry.user_turns;
        }
        if windows.in_block(ts) {
            self.five_hour_block += entry.cost_usd;
            self.block_messages += entry.user_turns;
        }
    }
}

/// Sum every `*.jsonl` under `projects_dir` into `CostData`. Unchanged files
/// are served from `cache`; unreadable files are skipped.
pub fn aggregate(
    projects_dir: &Path,
    cache: &mut CostCache,
    block_start_ms: i64,
    now: DateTime<Local>,
) -> CostData {
    let windows = Windows::at(now, block_start_ms);
    let mut data = CostData {
        block_start_time: block_start_ms,
        ..Default::default()
    };

    if !projects_dir.is_dir() {
        return data;
    }

    let mut seen: HashSet<String> = HashSet::new();
    let now_ms = now.timestamp_millis();

    for entry in WalkDir::new(projects_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("jsonl") {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let size = metadata.len();
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        seen.insert(cache::key(path));

        if mtime < windows.earliest() {
            continue;
        }

        if let Some(hit) = cache.get(path, size, mtime) {
            data.add(
                &CostEntry {
                    timestamp_ms: mtime,
                    cost_usd: hit.total_cost,
                    user_turns: hit.user_messages,
                },
                &windows,
            );
            continue;
        }

        let summary = match parse_file(path) {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        for e in &summary.entries {
            data.add(e, &windows);
        }
        cache.insert(
            path,
            CacheEntry {
                size,
                mtime,
                last_parsed: now_ms,
                entries_count: summary.paid_entries,
                total_cost: summary.total_cost,
                checksum: cache::checksum(size, mtime),
                user_messages: summary.user_messages,
            },
        );
    }

    cache.retain_seen(&seen);
    data
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
