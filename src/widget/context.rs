//! Context-window widgets.

use std::rc::Rc;

use super::{
    color_by_threshold, color_by_threshold_inverse, finish, format_tokens, paint, progress_bar, sparkline, SharedState,
    Widget,
};
use crate::config::WidgetConfig;
use crate::history::History;
use crate::session::Session;
use crate::theme::Theme;

/// Usage at which the host compacts the conversation.
const COMPACT_AT_PCT: f64 = 80.0;

pub struct ContextWidget;

impl Widget for ContextWidget {
    fn name(&self) -> &'static str {
        "context"
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let pct = session.context_pct();
        let (warn, critical) = cfg.thresholds(60.0, 80.0);
        let color = theme.status(color_by_threshold(pct, warn, critical));

        let mut value = format!("Ctx: {:.0}%", pct);
        if cfg.get_bool("show_tokens", false) && session.context_window.max_tokens > 0 {
            value.push_str(&format!(
                " ({}/{})",
                format_tokens(session.context_window.used_tokens),
                format_tokens(session.context_window.max_tokens)
            ));
        }
        let mut out = finish(cfg, &value, color);

        if cfg.get_bool("show_bar", true) {
            let width = cfg.get_usize("bar_width", 10);
            if width > 0 {
                out.push(' ');
                out.push_str(&paint(cfg, &progress_bar(pct, width), color));
            }
        }
        out
    }
}

/// Recent context usage as a sparkline, coloured by its trend.
#[derive(Default)]
pub struct ContextSparkWidget {
    history: Option<Rc<History>>,
}

impl ContextSparkWidget {
    pub fn set_history(&mut self, history: Rc<History>) {
        self.history = Some(history);
    }
}

impl Widget for ContextSparkWidget {
    fn name(&self) -> &'static str {
        "context_spark"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.history.as_ref().is_some_and(|h| h.len() >= 2)
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let Some(history) = &self.history else {
            return String::new();
        };
        let values = history.context_history(cfg.get_usize("width", 8));
        let Some((last, prior)) = values.split_last() else {
            return String::new();
        };
        if prior.is_empty() {
            return String::new();
        }

        let avg = prior.iter().sum::<f64>() / prior.len() as f64;
        let color = if *last > avg + 5.0 {
            theme.palette.critical
        } else if *last < avg - 5.0 {
            theme.palette.good
        } else {
            theme.palette.warn
        };
        finish(cfg, &sparkline(&values), color)
    }

    fn wire(&mut self, state: &SharedState) {
        if let Some(history) = &state.history {
            self.set_history(Rc::clone(history));
        }
    }
}

/// Linear estimate of the time left before the context hits the compaction
/// point.
pub struct CompactEtaWidget;

pub fn format_eta(minutes: f64) -> String {
    if minutes < 1.0 {
        return "<1m".to_string();
    }
    let total = minutes.floor() as u64;
    if total < 60 {
        format!("~{}m", total)
    } else {
        format!("~{}h{}m", total / 60, total % 60)
    }
}

impl Widget for CompactEtaWidget {
    fn name(&self) -> &'static str {
        "compact_eta"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        let pct = session.context_pct();
        pct >= COMPACT_AT_PCT || (pct > 0.0 && session.cost.total_duration_ms > 0)
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let pct = session.context_pct();
        if pct >= COMPACT_AT_PCT {
            return finish(cfg, "compact soon", theme.palette.critical);
        }
        let elapsed_min = session.cost.total_duration_ms as f64 / 60_000.0;
        if elapsed_min <= 0.0 || pct <= 0.0 {
            return String::new();
        }
        let rate = pct / elapsed_min;
        let minutes = (COMPACT_AT_PCT - pct) / rate;

        let (good, warn) = cfg.inverse_thresholds(10.0, 5.0);
        let color = theme.status(color_by_threshold_inverse(minutes, good, warn));
        finish(cfg, &format!("compact {}", format_eta(minutes)), color)
    }
}
