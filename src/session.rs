use std::io::Read;

use serde::{Deserialize, Deserializer};

/// Upper bound on the stdin payload. The host writes one small JSON object,
/// so anything larger is treated as garbage rather than buffered.
const MAX_STDIN_BYTES: u64 = 4 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Session record piped by the agent host on every statusline refresh.
///
/// Every field defaults to zero/empty: the host may omit any of them or send
/// `null`. A record that fails to decode is replaced wholesale by
/// `Session::default()`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Session {
    #[serde(deserialize_with = "null_as_default")]
    pub session_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub transcript_path: String,
    #[serde(deserialize_with = "null_as_default")]
    pub cwd: String,
    #[serde(deserialize_with = "null_as_default")]
    pub model: ModelInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub cost: CostInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub context_window: ContextWindow,
    #[serde(deserialize_with = "null_as_default")]
    pub workspace: WorkspaceInfo,
    /// Legacy top-level usage block; newer hosts nest it in `context_window`.
    #[serde(rename = "current_usage")]
    pub legacy_usage: Option<CurrentUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModelInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub display_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CostInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub total_cost_usd: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_duration_ms: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_api_duration_ms: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_api_calls: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_input_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_output_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cache_read_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_cache_write_tokens: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContextWindow {
    #[serde(deserialize_with = "null_as_default")]
    pub used_percentage: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub used_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub max_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_input_tokens: u64,
    pub total_output_tokens: Option<u64>,
    pub current_usage: Option<CurrentUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkspaceInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub lines_added: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub lines_removed: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub files_changed: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub current_dir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurrentUsage {
    #[serde(deserialize_with = "null_as_default")]
    pub input_tokens: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub output_tokens: u64,
    pub cache_read_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    #[serde(deserialize_with = "null_as_default")]
    pub cache_creation_input_tokens: u64,
}

impl CurrentUsage {
    /// Cache reads, preferring the API's `cache_read_input_tokens` spelling.
    pub fn cache_read_tokens(&self) -> u64 {
        self.cache_read_input_tokens
            .or(self.cache_read_tokens)
            .unwrap_or(0)
    }
}

/// `null` reads the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Session {
    /// Decode one JSON record from `reader`. Empty, truncated, oversized or
    /// mis-shaped input yields an empty session instead of an error.
    pub fn parse<R: Read>(reader: R) -> Session {
        let mut buf = Vec::with_capacity(8192);
        if reader
            .take(MAX_STDIN_BYTES)
            .read_to_end(&mut buf)
            .is_err()
        {
            tracing::debug!("stdin read failed; using empty session");
            return Session::default();
        }

        if buf.iter().all(u8::is_ascii_whitespace) {
            return Session::default();
        }

        match serde_json::from_slice(&buf) {
            Ok(session) => session,
            Err(e) => {
                tracing::debug!("stdin is not a session record: {}", e);
                Session::default()
            }
        }
    }

    // -----------------------------------------------------------------------
    // Derived accessors
    // -----------------------------------------------------------------------

    /// Usage of the most recent API call. The nested block wins over the
    /// legacy top-level one.
    pub fn current_usage(&self) -> Option<&CurrentUsage> {
        self.context_window
            .current_usage
            .as_ref()
            .or(self.legacy_usage.as_ref())
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.context_window
            .total_output_tokens
            .unwrap_or(self.cost.total_output_tokens)
    }

    /// Context usage clamped to `[0, 100]`. Falls back to the token ratio
    /// when the host sends counts but no percentage.
    pub fn context_pct(&self) -> f64 {
        let pct = if self.context_window.used_percentage > 0.0 {
            self.context_window.used_percentage
        } else if self.context_window.max_tokens > 0 {
            self.context_window.used_tokens as f64 / self.context_window.max_tokens as f64 * 100.0
        } else {
            0.0
        };
        clamp_pct(pct)
    }

    /// Cache hit rate of the latest call, `None` when nothing was read.
    pub fn cache_hit_pct(&self) -> Option<f64> {
        let usage = self.current_usage()?;
        let read = usage.cache_read_tokens();
        let denom = read + usage.input_tokens;
        if denom == 0 {
            return None;
        }
        Some(read as f64 / denom as f64 * 100.0)
    }

    /// Model label, falling back to the raw id.
    pub fn model_name(&self) -> &str {
        if self.model.display_name.is_empty() {
            &self.model.id
        } else {
            &self.model.display_name
        }
    }

    /// Working directory, falling back to `workspace.current_dir`.
    pub fn working_dir(&self) -> &str {
        if self.cwd.is_empty() {
            &self.workspace.current_dir
        } else {
            &self.cwd
        }
    }

    /// Mean API time per call, or the raw total when the call count is
    /// unknown.
    pub fn api_latency_ms(&self) -> u64 {
        let total = self.cost.total_api_duration_ms;
        match self.cost.total_api_calls {
            0 => total,
            calls => total / calls,
        }
    }
}

fn clamp_pct(pct: f64) -> f64 {
    if pct.is_finite() {
        pct.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Session {
        Session::parse(input.as_bytes())
    }

    #[test]
    fn test_parse_full_record() {
        let session = parse(
            r#"{
                "session_id": "abc-123",
                "transcript_path": "/tmp/t.jsonl",
                "cwd": "/work",
                "model": {"display_name": "Opus", "id": "claude-opus-4"},
                "cost": {"total_cost_usd": 0.42, "total_duration_ms": 60000,
                         "total_api_duration_ms": 2500, "total_output_tokens": 900},
                "context_window": {"used_percentage": 37.5, "used_tokens": 75000,
                                   "max_tokens": 200000},
                "workspace": {"lines_added": 10, "lines_removed": 3, "files_changed": 2}
            }"#,
        );
        assert_eq!(session.session_id, "abc-123");
        assert_eq!(session.model_name(), "Opus");
        assert!((session.cost.total_cost_usd - 0.42).abs() < f64::EPSILON);
        assert_eq!(session.context_pct(), 37.5);
        assert_eq!(session.workspace.lines_added, 10);
        assert_eq!(session.total_output_tokens(), 900);
    }

    #[test]
    fn test_parse_empty_input() {
        assert_eq!(parse(""), Session::default());
        assert_eq!(parse("   \n"), Session::default());
    }

    #[test]
    fn test_parse_malformed_input() {
        assert_eq!(parse("not json"), Session::default());
        assert_eq!(parse(r#"{"model": "#), Session::default());
        assert_eq!(parse("[1, 2, 3]"), Session::default());
    }

    #[test]
    fn test_parse_wrong_field_type_yields_empty() {
        let session = parse(r#"{"session_id": "x", "cost": {"total_cost_usd": "lots"}}"#);
        assert_eq!(session, Session::default());
    }

    #[test]
    fn test_null_fields_read_as_zero() {
        let session = parse(
            r#"{
                "session_id": null,
                "model": {"display_name": "Sonnet", "id": null},
                "cost": {"total_cost_usd": 0.5, "total_duration_ms": null},
                "context_window": {"used_percentage": null, "used_tokens": 40, "max_tokens": 200},
                "workspace": null
            }"#,
        );
        assert_eq!(session.model_name(), "Sonnet");
        assert_eq!(session.cost.total_cost_usd, 0.5);
        assert_eq!(session.cost.total_duration_ms, 0);
        assert_eq!(session.session_id, "");
        assert_eq!(session.context_pct(), 20.0);
        assert_eq!(session.workspace, WorkspaceInfo::default());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let session = parse(r#"{"session_id": "x", "version": "2.0.1", "output_style": {}}"#);
        assert_eq!(session.session_id, "x");
    }

    #[test]
    fn test_model_name_falls_back_to_id() {
        let session = parse(r#"{"model": {"id": "claude-sonnet-4"}}"#);
        assert_eq!(session.model_name(), "claude-sonnet-4");
    }

    #[test]
    fn test_current_usage_prefers_context_window() {
        let session = parse(
            r#"{
                "current_usage": {"input_tokens": 1},
                "context_window": {"current_usage": {"input_tokens": 2}}
            }"#,
        );
        assert_eq!(session.current_usage().unwrap().input_tokens, 2);

        let legacy = parse(r#"{"current_usage": {"input_tokens": 1}}"#);
        assert_eq!(legacy.current_usage().unwrap().input_tokens, 1);
    }

    #[test]
    fn test_current_usage_null() {
        let session = parse(r#"{"current_usage": null, "context_window": {"current_usage": null}}"#);
        assert!(session.current_usage().is_none());
        assert!(session.cache_hit_pct().is_none());
    }

    #[test]
    fn test_total_output_tokens_prefers_context_window() {
        let session = parse(
            r#"{"cost": {"total_output_tokens": 5},
                "context_window": {"total_output_tokens": 7}}"#,
        );
        assert_eq!(session.total_output_tokens(), 7);
    }

    #[test]
    fn test_cache_read_prefers_input_spelling() {
        let usage = CurrentUsage {
            cache_read_tokens: Some(10),
            cache_read_input_tokens: Some(30),
            ..Default::default()
        };
        assert_eq!(usage.cache_read_tokens(), 30);

        let old = CurrentUsage {
            cache_read_tokens: Some(10),
            ..Default::default()
        };
        assert_eq!(old.cache_read_tokens(), 10);
    }

    #[test]
    fn test_cache_hit_pct() {
        let session = parse(
            r#"{"current_usage": {"input_tokens": 20, "cache_read_input_tokens": 80}}"#,
        );
        assert_eq!(session.cache_hit_pct(), Some(80.0));
    }

    #[test]
    fn test_context_pct_clamped_and_derived() {
        let over = parse(r#"{"context_window": {"used_percentage": 140}}"#);
        assert_eq!(over.context_pct(), 100.0);

        let derived = parse(r#"{"context_window": {"used_tokens": 50000, "max_tokens": 200000}}"#);
        assert_eq!(derived.context_pct(), 25.0);
    }

    #[test]
    fn test_working_dir_fallback() {
        let session = parse(r#"{"workspace": {"current_dir": "/repo"}}"#);
        assert_eq!(session.working_dir(), "/repo");
    }

    #[test]
    fn test_api_latency_per_call() {
        let session = parse(r#"{"cost": {"total_api_duration_ms": 9000, "total_api_calls": 3}}"#);
        assert_eq!(session.api_latency_ms(), 3000);

        let no_calls = parse(r#"{"cost": {"total_api_duration_ms": 1500}}"#);
        assert_eq!(no_calls.api_latency_ms(), 1500);
    }
}
