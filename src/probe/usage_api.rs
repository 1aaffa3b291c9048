use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;

use crate::error::StatuslineError;
use crate::limits::{LimitWindow, Limits};

pub const USAGE_URL: &str = "https://api.anthropic.com/api/oauth/usage";

const USAGE_TIMEOUT: Duration = Duration::from_secs(5);
const OAUTH_BETA: &str = "oauth-2025-04-20";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageResponse {
    five_hour: Option<UsageWindow>,
    seven_day: Option<UsageWindow>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UsageWindow {
    utilization: Option<f64>,
    resets_at: Option<String>,
}

impl UsageWindow {
    fn into_window(self) -> LimitWindow {
        let utilization_pct = self
            .utilization
            .filter(|u| u.is_finite())
            .unwrap_or(0.0)
            .clamp(0.0, 100.0);
        let resets_at = self
            .resets_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0);
        LimitWindow {
            utilization_pct,
            resets_at,
            ..Default::default()
        }
    }
}

/// Fetch live utilization for the OAuth account behind `access_token`.
pub fn fetch_limits(access_token: &str) -> Result<Limits, StatuslineError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(USAGE_TIMEOUT)
        .user_agent(concat!("claude-statusline/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client
        .get(USAGE_URL)
        .bearer_auth(access_token)
        .header("anthropic-beta", OAUTH_BETA)
        .send()?
        .error_for_status()?;

    let body = response.text()?;
    limits_from_json(&body)
}

/// Map a usage API response body to Limits. Missing windows read as 0%.
pub fn limits_from_json(body: &str) -> Result<Limits, StatuslineError> {
    let parsed: UsageResponse = serde_json::from_str(body)?;
    Ok(Limits {
        five_hour: parsed.five_hour.unwrap_or_default().into_window(),
        seven_day: parsed.seven_day.unwrap_or_default().into_window(),
    })
}
