use std::collections::BTreeMap;

use super::activity::{AgentsWidget, TodosWidget, ToolsWidget};
use super::context::{CompactEtaWidget, ContextSparkWidget, ContextWidget};
use super::environment::{ConfigCountsWidget, CwdWidget, GitWidget, PlanWidget};
use super::session::{
    ApiLatencyWidget, CacheHitWidget, CodeChangesWidget, DurationWidget, ModelWidget,
    SessionIdWidget, TokenSpeedWidget,
};
use super::usage::{BlockTimerWidget, BurnRateWidget, CostWidget, LimitWidget, SpendWidget};
use super::{SharedState, Widget};
use crate::config::WidgetConfig;
use crate::session::Session;
use crate::theme::Theme;

/// Every widget name the default registry knows, in catalogue order.
pub const WIDGET_NAMES: &[&str] = &[
    "model",
    "context",
    "context_spark",
    "compact_eta",
    "block_timer",
    "cache_hit",
    "api_latency",
    "cost",
    "burn_rate",
    "code_changes",
    "git",
    "cwd",
    "tools",
    "agents",
    "todos",
    "daily_cost",
    "weekly_cost",
    "block_cost",
    "block_limit",
    "week_limit",
    "duration",
    "token_speed",
    "plan",
    "config_counts",
    "session_id",
];

/// Widgets that read the cost aggregate or the limits derived from it.
pub const COST_WIDGETS: &[&str] = &[
    "daily_cost",
    "weekly_cost",
    "block_cost",
    "block_limit",
    "week_limit",
];

/// Name to widget mapping, built once per process and wired before the
/// first render.
pub struct Registry {
    widgets: BTreeMap<&'static str, Box<dyn Widget>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn empty() -> Self {
        Self {
            widgets: BTreeMap::new(),
        }
    }

    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(ModelWidget));
        registry.register(Box::new(ContextWidget));
        registry.register(Box::<ContextSparkWidget>::default());
        registry.register(Box::new(CompactEtaWidget));
        registry.register(Box::<BlockTimerWidget>::default());
        registry.register(Box::new(CacheHitWidget));
        registry.register(Box::new(ApiLatencyWidget));
        registry.register(Box::new(CostWidget));
        registry.register(Box::new(BurnRateWidget));
        registry.register(Box::new(CodeChangesWidget));
        registry.register(Box::new(GitWidget));
        registry.register(Box::new(CwdWidget));
        registry.register(Box::<ToolsWidget>::default());
        registry.register(Box::<AgentsWidget>::default());
        registry.register(Box::<TodosWidget>::default());
        registry.register(Box::new(SpendWidget::daily()));
        registry.register(Box::new(SpendWidget::weekly()));
        registry.register(Box::new(SpendWidget::block()));
        registry.register(Box::new(LimitWidget::block()));
        registry.register(Box::new(LimitWidget::week()));
        registry.register(Box::new(DurationWidget));
        registry.register(Box::new(TokenSpeedWidget));
        registry.register(Box::<PlanWidget>::default());
        registry.register(Box::<ConfigCountsWidget>::default());
        registry.register(Box::new(SessionIdWidget));
        registry
    }

    /// Add or replace a widget under its own name.
    pub fn register(&mut self, widget: Box<dyn Widget>) {
        self.widgets.insert(widget.name(), widget);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Widget> {
        self.widgets.get(name).map(|w| w.as_ref())
    }

    /// Hand shared state to every widget. Must run before any render.
    pub fn wire(&mut self, state: &SharedState) {
        for widget in self.widgets.values_mut() {
            widget.wire(state);
        }
    }

    /// Render one configured widget. Unknown names, widgets that opt out and
    /// empty output all yield `None`.
    pub fn render_widget(
        &self,
        session: &Session,
        cfg: &WidgetConfig,
        theme: &Theme,
    ) -> Option<String> {
        let Some(widget) = self.get(&cfg.name) else {
            tracing::debug!(widget = %cfg.name, "unknown widget skipped");
            return None;
        };
        if !widget.should_render(session, cfg) {
            return None;
        }
        let out = widget.render(session, cfg, theme);
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}
