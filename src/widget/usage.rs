//! Spend, rate-limit and 5-hour block widgets.

use std::rc::Rc;

use super::{
    color_by_threshold, finish, format_remaining, format_usd, SharedState, Widget,
};
use crate::config::WidgetConfig;
use crate::cost::CostData;
use crate::history::{self, History};
use crate::limits::{LimitWindow, Limits};
use crate::session::Session;
use crate::theme::Theme;

pub struct CostWidget;

impl Widget for CostWidget {
    fn name(&self) -> &'static str {
        "cost"
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let usd = session.cost.total_cost_usd;
        let (warn, critical) = cfg.thresholds(0.5, 1.0);
        let color = theme.status(color_by_threshold(usd, warn, critical));
        finish(cfg, &format_usd(usd), color)
    }
}

/// Spend per minute of session time.
pub struct BurnRateWidget;

impl Widget for BurnRateWidget {
    fn name(&self) -> &'static str {
        "burn_rate"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        session.cost.total_duration_ms > 0 && session.cost.total_cost_usd > 0.0
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let minutes = session.cost.total_duration_ms as f64 / 60_000.0;
        if minutes <= 0.0 {
            return String::new();
        }
        let per_min = session.cost.total_cost_usd / minutes;
        let cents = per_min * 100.0;

        let (warn, critical) = cfg.thresholds(10.0, 25.0);
        let color = theme.status(color_by_threshold(cents, warn, critical));
        let value = if per_min > 1.0 {
            format!("${:.1}/min", per_min)
        } else {
            format!("{:.1}¢/min", cents)
        };
        finish(cfg, &value, color)
    }
}

// ---------------------------------------------------------------------------
// Aggregated spend
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Bucket {
    Today,
    Week,
    Block,
}

/// One of the local-time spend buckets from the cost aggregator.
pub struct SpendWidget {
    bucket: Bucket,
    cost: Option<Rc<CostData>>,
}

impl SpendWidget {
    pub fn daily() -> Self {
        Self::new(Bucket::Today)
    }

    pub fn weekly() -> Self {
        Self::new(Bucket::Week)
    }

    pub fn block() -> Self {
        Self::new(Bucket::Block)
    }

    fn new(bucket: Bucket) -> Self {
        Self { bucket, cost: None }
    }

    pub fn set_cost(&mut self, cost: Rc<CostData>) {
        self.cost = Some(cost);
    }
}

impl Widget for SpendWidget {
    fn name(&self) -> &'static str {
        match self.bucket {
            Bucket::Today => "daily_cost",
            Bucket::Week => "weekly_cost",
            Bucket::Block => "block_cost",
        }
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.cost.is_some()
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let Some(cost) = &self.cost else {
            return String::new();
        };
        let (label, usd, warn, critical) = match self.bucket {
            Bucket::Today => ("Today", cost.today, 5.0, 10.0),
            Bucket::Week => ("Week", cost.week, 25.0, 50.0),
            Bucket::Block => ("Block", cost.five_hour_block, 2.0, 5.0),
        };
        let (warn, critical) = cfg.thresholds(warn, critical);
        let color = theme.status(color_by_threshold(usd, warn, critical));
        finish(cfg, &format!("{}: {}", label, format_usd(usd)), color)
    }

    fn wire(&mut self, state: &SharedState) {
        if let Some(cost) = &state.cost {
            self.set_cost(Rc::clone(cost));
        }
    }
}

// ---------------------------------------------------------------------------
// Block timer
// ---------------------------------------------------------------------------

/// Time left in the current 5-hour block.
#[derive(Default)]
pub struct BlockTimerWidget {
    history: Option<Rc<History>>,
}

impl BlockTimerWidget {
    pub fn set_history(&mut self, history: Rc<History>) {
        self.history = Some(history);
    }

    fn render_at(&self, cfg: &WidgetConfig, theme: &Theme, now_ms: i64) -> String {
        let Some(history) = &self.history else {
            return String::new();
        };
        if history.block_start_time == 0 {
            return String::new();
        }
        let elapsed = history.block_elapsed_pct_at(now_ms);
        let (warn, critical) = cfg.thresholds(80.0, 95.0);
        let color = theme.status(color_by_threshold(elapsed, warn, critical));
        let remaining = format_remaining(history.block_remaining_ms_at(now_ms));
        finish(cfg, &format!("⏱ {}", remaining), color)
    }
}

impl Widget for BlockTimerWidget {
    fn name(&self) -> &'static str {
        "block_timer"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.history.as_ref().is_some_and(|h| h.block_start_time > 0)
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        self.render_at(cfg, theme, history::now_millis())
    }

    fn wire(&mut self, state: &SharedState) {
        if let Some(history) = &state.history {
            self.set_history(Rc::clone(history));
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limits
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Window {
    FiveHour,
    SevenDay,
}

/// Utilization of one rate-limit window.
pub struct LimitWidget {
    window: Window,
    limits: Option<Rc<Limits>>,
}

impl LimitWidget {
    pub fn block() -> Self {
        Self {
            window: Window::FiveHour,
            limits: None,
        }
    }

    pub fn week() -> Self {
        Self {
            window: Window::SevenDay,
            limits: None,
        }
    }

    pub fn set_limits(&mut self, limits: Rc<Limits>) {
        self.limits = Some(limits);
    }

    fn window<'a>(&self, limits: &'a Limits) -> (&'static str, &'a LimitWindow) {
        match self.window {
            Window::FiveHour => ("5h", &limits.five_hour),
            Window::SevenDay => ("7d", &limits.seven_day),
        }
    }

    fn render_at(&self, cfg: &WidgetConfig, theme: &Theme, now_ms: i64) -> String {
        let Some(limits) = &self.limits else {
            return String::new();
        };
        let (label, window) = self.window(limits);
        let pct = window.utilization_pct;
        let (warn, critical) = cfg.thresholds(70.0, 90.0);
        let color = theme.status(color_by_threshold(pct, warn, critical));

        let mut value = format!("{}: {:.0}%", label, pct);
        let left = window.remaining_ms(now_ms);
        if cfg.get_bool("show_reset", true) && left > 0 {
            value.push_str(&format!(" ({})", format_remaining(left)));
        }
        finish(cfg, &value, color)
    }
}

impl Widget for LimitWidget {
    fn name(&self) -> &'static str {
        match self.window {
            Window::FiveHour => "block_limit",
            Window::SevenDay => "week_limit",
        }
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.limits.is_some()
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        self.render_at(cfg, theme, history::now_millis())
    }

    fn wire(&mut self, state: &SharedState) {
        if let Some(limits) = &state.limits {
            self.set_limits(Rc::clone(limits));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::BLOCK_DURATION_MS;
    use crate::render::truncate::strip_ansi;
    use crate::widget::testing::{plain, session};

    const NOW: i64 = 1_750_000_000_000;

    #[test]
    fn test_cost_format_and_thresholds() {
        colored::control::set_override(true);
        let cfg = WidgetConfig::named("cost");
        let theme = Theme::default();
        let cheap = CostWidget.render(&session(r#"{"cost":{"total_cost_usd":0.15}}"#), &cfg, &theme);
        let pricey = CostWidget.render(&session(r#"{"cost":{"total_cost_usd":1.20}}"#), &cfg, &theme);
        assert_eq!(strip_ansi(&cheap), "$0.15");
        assert!(cheap.starts_with("\x1b[32m"));
        assert_eq!(strip_ansi(&pricey), "$1.20");
        assert!(pricey.starts_with("\x1b[31m"));

        let tiny = session(r#"{"cost":{"total_cost_usd":0.0042}}"#);
        assert_eq!(plain(&CostWidget, &tiny, &cfg), "$0.004");
    }

    #[test]
    fn test_burn_rate() {
        let cfg = WidgetConfig::named("burn_rate");
        // $0.60 over 10 minutes.
        let slow = session(r#"{"cost":{"total_cost_usd":0.6,"total_duration_ms":600000}}"#);
        assert_eq!(plain(&BurnRateWidget, &slow, &cfg), "6.0¢/min");
        // $30 over 10 minutes.
        let fast = session(r#"{"cost":{"total_cost_usd":30.0,"total_duration_ms":600000}}"#);
        assert_eq!(plain(&BurnRateWidget, &fast, &cfg), "$3.0/min");
        assert!(!BurnRateWidget.should_render(&session("{}"), &cfg));
    }

    #[test]
    fn test_spend_buckets() {
        let data = Rc::new(CostData {
            today: 4.5,
            week: 30.0,
            five_hour_block: 1.25,
            ..Default::default()
        });
        let state = SharedState {
            cost: Some(data),
            ..Default::default()
        };
        let s = Session::default();

        let mut daily = SpendWidget::daily();
        assert!(!daily.should_render(&s, &WidgetConfig::named("daily_cost")));
        daily.wire(&state);
        assert_eq!(plain(&daily, &s, &WidgetConfig::named("daily_cost")), "Today: $4.50");

        let mut weekly = SpendWidget::weekly();
        weekly.wire(&state);
        assert_eq!(plain(&weekly, &s, &WidgetConfig::named("weekly_cost")), "Week: $30.00");

        let mut block = SpendWidget::block();
        block.wire(&state);
        assert_eq!(block.name(), "block_cost");
        assert_eq!(plain(&block, &s, &WidgetConfig::named("block_cost")), "Block: $1.25");
    }

    #[test]
    fn test_block_timer() {
        let cfg = WidgetConfig::named("block_timer");
        let theme = Theme::default();
        let mut widget = BlockTimerWidget::default();
        assert_eq!(widget.render_at(&cfg, &theme, NOW), "");

        let mut h = History::default();
        h.update_block_start_time_at(NOW - (2 * 60 + 45) * 60_000);
        widget.set_history(Rc::new(h));
        assert!(widget.should_render(&Session::default(), &cfg));
        assert_eq!(strip_ansi(&widget.render_at(&cfg, &theme, NOW)), "⏱ 2h 15m");
    }

    #[test]
    fn test_block_timer_color_by_elapsed() {
        colored::control::set_override(true);
        let cfg = WidgetConfig::named("block_timer");
        let theme = Theme::default();
        let mut h = History::default();
        h.update_block_start_time_at(NOW - BLOCK_DURATION_MS + 10 * 60_000);
        let mut widget = BlockTimerWidget::default();
        widget.set_history(Rc::new(h));
        let out = widget.render_at(&cfg, &theme, NOW);
        assert!(out.starts_with("\x1b[31m"), "{:?}", out);
    }

    #[test]
    fn test_limits() {
        let limits = Rc::new(Limits {
            five_hour: LimitWindow {
                utilization_pct: 42.0,
                resets_at: NOW + (2 * 60 + 15) * 60_000,
                remaining: 10,
                total: 20,
            },
            seven_day: LimitWindow {
                utilization_pct: 95.0,
                resets_at: NOW + (3 * 24 + 4) * 3_600_000,
                remaining: 1,
                total: 20,
            },
        });
        let theme = Theme::default();

        let mut block = LimitWidget::block();
        block.set_limits(Rc::clone(&limits));
        let cfg = WidgetConfig::named("block_limit");
        assert_eq!(strip_ansi(&block.render_at(&cfg, &theme, NOW)), "5h: 42% (2h 15m)");
        let cfg = cfg.with("show_reset", "false");
        assert_eq!(strip_ansi(&block.render_at(&cfg, &theme, NOW)), "5h: 42%");

        let mut week = LimitWidget::week();
        week.set_limits(limits);
        let cfg = WidgetConfig::named("week_limit");
        assert_eq!(strip_ansi(&week.render_at(&cfg, &theme, NOW)), "7d: 95% (3d 4h)");
    }

    #[test]
    fn test_limits_unwired_hidden() {
        let widget = LimitWidget::week();
        assert!(!widget.should_render(&Session::default(), &WidgetConfig::named("week_limit")));
    }
}
