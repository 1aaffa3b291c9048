//! Widgets summarising the transcript tail: tools, sub-agents and todos.

use std::rc::Rc;

use super::{clip_chars, paint, SharedState, Widget};
use crate::config::WidgetConfig;
use crate::session::Session;
use crate::theme::Theme;
use crate::transcript::{AgentStatus, TodoStatus, ToolStatus, TranscriptDigest};

fn joiner(cfg: &WidgetConfig) -> &'static str {
    if cfg.get_bool("separator", false) {
        " | "
    } else {
        " "
    }
}

fn last_n<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Shared digest slot for the three transcript widgets.
#[derive(Default)]
struct DigestSlot(Option<Rc<TranscriptDigest>>);

impl DigestSlot {
    fn wire(&mut self, state: &SharedState) {
        if let Some(digest) = &state.transcript {
            self.0 = Some(Rc::clone(digest));
        }
    }
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ToolsWidget {
    digest: DigestSlot,
}

impl ToolsWidget {
    pub fn set_transcript(&mut self, digest: Rc<TranscriptDigest>) {
        self.digest.0 = Some(digest);
    }
}

impl Widget for ToolsWidget {
    fn name(&self) -> &'static str {
        "tools"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.digest.0.as_ref().is_some_and(|d| !d.tools.is_empty())
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let Some(digest) = &self.digest.0 else {
            return String::new();
        };
        let show_count = cfg.get_bool("show_count", true);
        let parts: Vec<String> = last_n(&digest.tools, cfg.get_usize("max_display", 3))
            .iter()
            .map(|tool| {
                let (icon, color) = match tool.status {
                    ToolStatus::Completed => ("✓", theme.palette.good),
                    ToolStatus::Error => ("✗", theme.palette.critical),
                    ToolStatus::Running => ("◐", theme.palette.warn),
                };
                let mut label = tool.name.clone();
                if show_count && tool.count > 1 {
                    label.push_str(&format!("×{}", tool.count));
                }
                format!("{} {}", paint(cfg, icon, color), label)
            })
            .collect();
        if parts.is_empty() {
            return String::new();
        }
        cfg.apply_format(&parts.join(joiner(cfg)))
    }

    fn wire(&mut self, state: &SharedState) {
        self.digest.wire(state);
    }
}

// ---------------------------------------------------------------------------
// Agents
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct AgentsWidget {
    digest: DigestSlot,
}

impl AgentsWidget {
    pub fn set_transcript(&mut self, digest: Rc<TranscriptDigest>) {
        self.digest.0 = Some(digest);
    }
}

impl Widget for AgentsWidget {
    fn name(&self) -> &'static str {
        "agents"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.digest.0.as_ref().is_some_and(|d| !d.agents.is_empty())
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let Some(digest) = &self.digest.0 else {
            return String::new();
        };
        let parts: Vec<String> = last_n(&digest.agents, cfg.get_usize("max_display", 3))
            .iter()
            .map(|agent| {
                let (icon, color) = match agent.status {
                    AgentStatus::Completed => ("✓", theme.palette.good),
                    AgentStatus::Running => ("◐", theme.palette.warn),
                };
                let mut label = if agent.agent_type.is_empty() {
                    "agent".to_string()
                } else {
                    agent.agent_type.clone()
                };
                if !agent.description.is_empty() {
                    label.push_str(&format!(": {}", clip_chars(&agent.description, 24)));
                }
                format!("{} {}", paint(cfg, icon, color), label)
            })
            .collect();
        if parts.is_empty() {
            return String::new();
        }

        let mut out = parts.join(joiner(cfg));
        let hidden = digest.agents.len().saturating_sub(parts.len());
        if cfg.get_bool("show_count", true) && hidden > 0 {
            out.push_str(&paint(cfg, &format!(" +{}", hidden), theme.palette.muted));
        }
        cfg.apply_format(&out)
    }

    fn wire(&mut self, state: &SharedState) {
        self.digest.wire(state);
    }
}

// ---------------------------------------------------------------------------
// Todos
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TodosWidget {
    digest: DigestSlot,
}

impl TodosWidget {
    pub fn set_transcript(&mut self, digest: Rc<TranscriptDigest>) {
        self.digest.0 = Some(digest);
    }
}

impl Widget for TodosWidget {
    fn name(&self) -> &'static str {
        "todos"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.digest.0.as_ref().is_some_and(|d| !d.todos.is_empty())
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let Some(digest) = &self.digest.0 else {
            return String::new();
        };
        let total = digest.todos.len();
        if total == 0 {
            return String::new();
        }
        let done = digest.completed_todos();
        let progress = format!("({}/{})", done, total);
        let max_subject = cfg.get_usize("max_subject", 40);

        let (text, color) = if done == total {
            (format!("✓ All done {}", progress), theme.palette.good)
        } else if let Some(current) = digest.in_progress_todo() {
            (
                format!("⊙ {} {}", clip_chars(&current.subject, max_subject), progress),
                theme.palette.warn,
            )
        } else {
            let next = digest
                .todos
                .iter()
                .find(|t| t.status == TodoStatus::Pending)
                .map(|t| t.subject.as_str())
                .unwrap_or_default();
            (
                format!("○ {} {}", clip_chars(next, max_subject), progress),
                theme.palette.muted,
            )
        };
        super::finish(cfg, &text, color)
    }

    fn wire(&mut self, state: &SharedState) {
        self.digest.wire(state);
    }
}
