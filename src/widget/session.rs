//! Widgets computed purely from the session record.

use super::{
    color_by_threshold, color_by_threshold_inverse, finish, format_duration_ms, paint, Widget,
};
use crate::config::WidgetConfig;
use crate::session::Session;
use crate::theme::Theme;

pub struct ModelWidget;

impl Widget for ModelWidget {
    fn name(&self) -> &'static str {
        "model"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        !session.model_name().is_empty()
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        finish(cfg, session.model_name(), theme.palette.primary)
    }
}

pub struct SessionIdWidget;

impl Widget for SessionIdWidget {
    fn name(&self) -> &'static str {
        "session_id"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        !session.session_id.is_empty()
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let len = cfg.get_usize("length", 8);
        let short: String = session.session_id.chars().take(len).collect();
        finish(cfg, &short, theme.palette.muted)
    }
}

/// Wall-clock session length.
pub struct DurationWidget;

impl Widget for DurationWidget {
    fn name(&self) -> &'static str {
        "duration"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        session.cost.total_duration_ms > 0
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let ms = session.cost.total_duration_ms;
        let minutes = ms as f64 / 60_000.0;
        let (warn, critical) = cfg.thresholds(60.0, 120.0);
        let color = theme.status(color_by_threshold(minutes, warn, critical));
        finish(cfg, &format_duration_ms(ms), color)
    }
}

pub struct ApiLatencyWidget;

pub fn format_latency(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", ms as f64 / 1000.0)
    }
}

impl Widget for ApiLatencyWidget {
    fn name(&self) -> &'static str {
        "api_latency"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        session.cost.total_api_duration_ms > 0
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let ms = session.api_latency_ms();
        let (warn, critical) = cfg.thresholds(2000.0, 5000.0);
        let color = theme.status(color_by_threshold(ms as f64, warn, critical));
        finish(cfg, &format_latency(ms), color)
    }
}

/// Output tokens per second of API time.
pub struct TokenSpeedWidget;

impl Widget for TokenSpeedWidget {
    fn name(&self) -> &'static str {
        "token_speed"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        session.cost.total_api_duration_ms > 0 && session.total_output_tokens() > 0
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let secs = session.cost.total_api_duration_ms as f64 / 1000.0;
        if secs <= 0.0 {
            return String::new();
        }
        let speed = session.total_output_tokens() as f64 / secs;
        let (good, warn) = cfg.inverse_thresholds(20.0, 10.0);
        let color = theme.status(color_by_threshold_inverse(speed, good, warn));
        finish(cfg, &format!("{:.1} tok/s", speed), color)
    }
}

pub struct CacheHitWidget;

impl Widget for CacheHitWidget {
    fn name(&self) -> &'static str {
        "cache_hit"
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        match session.cache_hit_pct() {
            Some(pct) => {
                let (good, warn) = cfg.inverse_thresholds(80.0, 50.0);
                let color = theme.status(color_by_threshold_inverse(pct, good, warn));
                finish(cfg, &format!("Cache: {:.0}%", pct), color)
            }
            None => finish(cfg, "Cache: —", theme.palette.muted),
        }
    }
}

/// Lines added and removed in this session.
pub struct CodeChangesWidget;

impl Widget for CodeChangesWidget {
    fn name(&self) -> &'static str {
        "code_changes"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        session.workspace.lines_added > 0 || session.workspace.lines_removed > 0
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let added = paint(
            cfg,
            &format!("+{}", session.workspace.lines_added),
            theme.palette.good,
        );
        let removed = paint(
            cfg,
            &format!("-{}", session.workspace.lines_removed),
            theme.palette.critical,
        );
        cfg.apply_format(&format!("{}/{}", added, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::testing::{plain, session};
    use colored::Colorize;

    #[test]
    fn test_model() {
        let cfg = WidgetConfig::named("model");
        let s = session(r#"{"model":{"display_name":"Sonnet","id":"claude-sonnet-4"}}"#);
        assert_eq!(plain(&ModelWidget, &s, &cfg), "Sonnet");

        let id_only = session(r#"{"model":{"id":"claude-sonnet-4"}}"#);
        assert_eq!(plain(&ModelWidget, &id_only, &cfg), "claude-sonnet-4");
        assert!(!ModelWidget.should_render(&session("{}"), &cfg));
    }

    #[test]
    fn test_model_format_and_color() {
        colored::control::set_override(true);
        let mut cfg = WidgetConfig::named("model");
        cfg.format = "[{value}]".into();
        let s = session(r#"{"model":{"display_name":"Opus"}}"#);
        let out = ModelWidget.render(&s, &cfg, &Theme::default());
        assert_eq!(out, "[Opus]".cyan().to_string());
    }

    #[test]
    fn test_session_id_length() {
        let s = session(r#"{"session_id":"0123456789abcdef"}"#);
        let cfg = WidgetConfig::named("session_id");
        assert_eq!(plain(&SessionIdWidget, &s, &cfg), "01234567");
        let cfg = cfg.with("length", "4");
        assert_eq!(plain(&SessionIdWidget, &s, &cfg), "0123");
    }

    #[test]
    fn test_duration() {
        let cfg = WidgetConfig::named("duration");
        let s = session(r#"{"cost":{"total_duration_ms":192000}}"#);
        assert_eq!(plain(&DurationWidget, &s, &cfg), "3m12s");
        assert!(!DurationWidget.should_render(&session("{}"), &cfg));
    }

    #[test]
    fn test_api_latency() {
        let cfg = WidgetConfig::named("api_latency");
        let fast = session(r#"{"cost":{"total_api_duration_ms":850}}"#);
        assert_eq!(plain(&ApiLatencyWidget, &fast, &cfg), "850ms");
        let slow = session(r#"{"cost":{"total_api_duration_ms":12000,"total_api_calls":4}}"#);
        assert_eq!(plain(&ApiLatencyWidget, &slow, &cfg), "3.0s");
    }

    #[test]
    fn test_token_speed() {
        let cfg = WidgetConfig::named("token_speed");
        let s = session(r#"{"cost":{"total_api_duration_ms":10000,"total_output_tokens":250}}"#);
        assert!(TokenSpeedWidget.should_render(&s, &cfg));
        assert_eq!(plain(&TokenSpeedWidget, &s, &cfg), "25.0 tok/s");
        assert!(!TokenSpeedWidget.should_render(&session("{}"), &cfg));
    }

    #[test]
    fn test_cache_hit() {
        let cfg = WidgetConfig::named("cache_hit");
        let s = session(r#"{"current_usage":{"input_tokens":10,"cache_read_input_tokens":90}}"#);
        assert_eq!(plain(&CacheHitWidget, &s, &cfg), "Cache: 90%");
        assert_eq!(plain(&CacheHitWidget, &session("{}"), &cfg), "Cache: —");
    }

    #[test]
    fn test_code_changes() {
        let cfg = WidgetConfig::named("code_changes");
        let s = session(r#"{"workspace":{"lines_added":12,"lines_removed":3}}"#);
        assert_eq!(plain(&CodeChangesWidget, &s, &cfg), "+12/-3");
        assert!(!CodeChangesWidget.should_render(&session("{}"), &cfg));
    }
}
