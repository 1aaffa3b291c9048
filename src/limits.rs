//! Rate-limit estimation from aggregated message counts.

use chrono::{DateTime, Local};

use crate::cost::{self, CostData};
use crate::history::BLOCK_DURATION_MS;

const WEEK_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LimitWindow {
    /// 0..=100.
    pub utilization_pct: f64,
    /// Unix milliseconds; 0 when unknown.
    pub resets_at: i64,
    pub remaining: u64,
    pub total: u64,
}

impl LimitWindow {
    fn from_count(count: u64, limit: u64, resets_at: i64) -> LimitWindow {
        let utilization_pct = if limit == 0 {
            0.0
        } else {
            (count as f64 / limit as f64 * 100.0).min(100.0)
        };
        LimitWindow {
            utilization_pct,
            resets_at,
            remaining: limit.saturating_sub(count),
            total: limit,
        }
    }

    /// Milliseconds until reset, never negative. 0 when the reset is unknown.
    pub fn remaining_ms(&self, now_ms: i64) -> i64 {
        if self.resets_at == 0 {
            0
        } else {
            (self.resets_at - now_ms).max(0)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Limits {
    pub five_hour: LimitWindow,
    pub seven_day: LimitWindow,
}

/// Message limits (5h, 7d) for a subscription tier string.
pub fn default_limit_for_tier(tier: &str) -> (u64, u64) {
    let tier = tier.to_ascii_lowercase();
    if tier.contains("20x") {
        (900, 13_500)
    } else if tier.contains("5x") {
        (225, 3_375)
    } else {
        (45, 675)
    }
}

/// Estimate utilization of both windows from local message counts.
///
/// Explicit limits win; a zero limit is filled from the tier defaults when a
/// tier is known, otherwise the window reports 0% of an unknown total.
pub fn estimate(
    data: &CostData,
    block_start_ms: i64,
    tier: &str,
    five_hour_limit: u64,
    seven_day_limit: u64,
    now: DateTime<Local>,
) -> Limits {
    let (mut five, mut seven) = (five_hour_limit, seven_day_limit);
    if (five == 0 || seven == 0) && !tier.trim().is_empty() {
        let (tier_five, tier_seven) = default_limit_for_tier(tier);
        if five == 0 {
            five = tier_five;
        }
        if seven == 0 {
            seven = tier_seven;
        }
    }

    let five_reset = if block_start_ms == 0 {
        0
    } else {
        block_start_ms.saturating_add(BLOCK_DURATION_MS)
    };
    let seven_reset = cost::start_of_week(now) + WEEK_MS;

    Limits {
        five_hour: LimitWindow::from_count(data.block_messages, five, five_reset),
        seven_day: LimitWindow::from_count(data.week_messages, seven, seven_reset),
    }
}
