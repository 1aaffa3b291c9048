//! Widget contract, shared state injected before rendering, and the helpers
//! every widget uses for options, colour and number formatting.

pub mod activity;
pub mod context;
pub mod environment;
pub mod registry;
pub mod session;
pub mod usage;

use std::rc::Rc;

use colored::{Color, Colorize};

use crate::config::WidgetConfig;
use crate::cost::CostData;
use crate::history::History;
use crate::limits::Limits;
use crate::session::Session;
use crate::theme::{self, Theme};
use crate::transcript::TranscriptDigest;

pub use registry::Registry;

/// A named renderer. `render` may return an empty string, which the layout
/// treats the same as `should_render` returning false.
pub trait Widget {
    fn name(&self) -> &'static str;

    /// Cheap, side-effect-free precheck.
    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        true
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String;

    /// Receive cross-invocation data. Called once, before any `render`.
    fn wire(&mut self, _state: &SharedState) {}
}

/// Data the pipeline owns and lends to the widgets that need more than the
/// session record.
#[derive(Debug, Clone, Default)]
pub struct SharedState {
    pub history: Option<Rc<History>>,
    pub transcript: Option<Rc<TranscriptDigest>>,
    pub cost: Option<Rc<CostData>>,
    pub limits: Option<Rc<Limits>>,
    pub plan: Option<Rc<String>>,
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

impl WidgetConfig {
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(|v| v.trim())
    }

    /// `true`/`1`/`yes` and `false`/`0`/`no`, case-insensitive. Anything else
    /// is the default.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get_str(key).map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "1" | "yes") => true,
            Some("false" | "0" | "no") => false,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get_str(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Non-negative integer option, for widths and counts.
    pub fn get_usize(&self, key: &str, default: usize) -> usize {
        usize::try_from(self.get_int(key, default as i64)).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.get_str(key)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(default)
    }

    /// Substitute `value` for the first `{value}` in `format`, if one is set.
    pub fn apply_format(&self, value: &str) -> String {
        if self.format.is_empty() {
            value.to_string()
        } else {
            self.format.replacen("{value}", value, 1)
        }
    }

    /// `(warn, critical)` thresholds where higher values are worse.
    pub fn thresholds(&self, warn: f64, critical: f64) -> (f64, f64) {
        (
            self.get_float("warn_threshold", warn),
            self.get_float("critical_threshold", critical),
        )
    }

    /// `(good, warn)` thresholds where higher values are better.
    pub fn inverse_thresholds(&self, good: f64, warn: f64) -> (f64, f64) {
        (
            self.get_float("good_threshold", good),
            self.get_float("warn_threshold", warn),
        )
    }
}

// ---------------------------------------------------------------------------
// Colour
// ---------------------------------------------------------------------------

/// Higher is worse.
pub fn color_by_threshold(value: f64, warn: f64, critical: f64) -> Color {
    if value >= critical {
        Color::Red
    } else if value >= warn {
        Color::Yellow
    } else {
        Color::Green
    }
}

/// Higher is better.
pub fn color_by_threshold_inverse(value: f64, good: f64, warn: f64) -> Color {
    if value >= good {
        Color::Green
    } else if value >= warn {
        Color::Yellow
    } else {
        Color::Red
    }
}

/// Colour `text`, letting the widget's `style` override `color`.
pub fn paint(cfg: &WidgetConfig, text: &str, color: Color) -> String {
    let color = theme::parse_color(&cfg.style).unwrap_or(color);
    text.color(color).to_string()
}

/// Apply the format template, then colour the result.
pub fn finish(cfg: &WidgetConfig, value: &str, color: Color) -> String {
    paint(cfg, &cfg.apply_format(value), color)
}

// ---------------------------------------------------------------------------
// Glyph helpers
// ---------------------------------------------------------------------------

const SPARK_RAMP: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// `width` cells; the filled count is `floor(pct / 100 * width)`.
pub fn progress_bar(pct: f64, width: usize) -> String {
    let pct = if pct.is_finite() { pct.clamp(0.0, 100.0) } else { 0.0 };
    let filled = ((pct / 100.0 * width as f64).floor() as usize).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

pub fn spark_level(value: f64) -> usize {
    let v = if value.is_finite() { value } else { 0.0 };
    ((v / 100.0 * 7.0).floor().max(0.0) as usize).min(SPARK_RAMP.len() - 1)
}

/// One ramp glyph per percentage value.
pub fn sparkline(values: &[f64]) -> String {
    values.iter().map(|v| SPARK_RAMP[spark_level(*v)]).collect()
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// `$1.23` for a cent or more, `$0.004` below that.
pub fn format_usd(value: f64) -> String {
    if value >= 0.01 {
        format!("${:.2}", value)
    } else {
        format!("${:.3}", value.max(0.0))
    }
}

/// `950`, `45K`, `1.2M`.
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        let m = n as f64 / 1_000_000.0;
        if m >= 10.0 {
            format!("{:.0}M", m)
        } else {
            format!("{:.1}M", m)
        }
    } else if n >= 1_000 {
        format!("{}K", n / 1_000)
    } else {
        n.to_string()
    }
}

/// Session length: `42s`, `3m12s`, `17m`, `1h5m`, `2h`.
pub fn format_duration_ms(ms: u64) -> String {
    let secs = ms / 1000;
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if secs < 60 {
        format!("{}s", s)
    } else if secs < 5 * 60 {
        format!("{}m{}s", m, s)
    } else if h == 0 {
        format!("{}m", m)
    } else if m > 0 {
        format!("{}h{}m", h, m)
    } else {
        format!("{}h", h)
    }
}

/// Time until a reset: `2h 15m`, `45m`, `3d 4h`.
pub fn format_remaining(ms: i64) -> String {
    let mins = ms.max(0) / 60_000;
    let (d, h, m) = (mins / (24 * 60), (mins / 60) % 24, mins % 60);
    if d > 0 {
        format!("{}d {}h", d, h)
    } else if h > 0 {
        format!("{}h {}m", h, m)
    } else {
        format!("{}m", m)
    }
}

/// Take at most `max` characters, marking the cut with `…`.
pub fn clip_chars(s: &str, max: usize) -> String {
    if max == 0 || s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
