//! Widgets that look at the machine around the session: git, the working
//! directory, the subscription plan and agent config files.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use super::{finish, paint, SharedState, Widget};
use crate::config::WidgetConfig;
use crate::probe::{config_counts, git};
use crate::session::Session;
use crate::storage;
use crate::theme::Theme;

// ---------------------------------------------------------------------------
// Git
// ---------------------------------------------------------------------------

pub struct GitWidget;

const BRANCH_GLYPH: &str = "\u{E0A0}";

pub fn format_git(status: &git::GitStatus, cfg: &WidgetConfig) -> (String, String) {
    let head = if status.detached {
        format!("@{}", status.branch)
    } else {
        format!("{} {}", BRANCH_GLYPH, status.branch)
    };

    let mut counters = Vec::new();
    if cfg.get_bool("show_status", true) {
        for (sigil, n) in [
            ("+", status.staged),
            ("!", status.modified),
            ("?", status.untracked),
        ] {
            if n > 0 {
                counters.push(format!("{}{}", sigil, n));
            }
        }
    }
    if cfg.get_bool("show_ahead_behind", true) {
        if status.ahead > 0 {
            counters.push(format!("↑{}", status.ahead));
        }
        if status.behind > 0 {
            counters.push(format!("↓{}", status.behind));
        }
    }
    if cfg.get_bool("show_stash", false) && status.stash > 0 {
        counters.push(format!("≡{}", status.stash));
    }
    (head, counters.join(" "))
}

impl Widget for GitWidget {
    fn name(&self) -> &'static str {
        "git"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        !session.working_dir().is_empty()
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let status = git::probe(
            Path::new(session.working_dir()),
            cfg.get_bool("show_stash", false),
        );
        if !status.is_repo {
            return String::new();
        }
        let (head, counters) = format_git(&status, cfg);
        let head_color = if status.is_dirty() {
            theme.palette.warn
        } else {
            theme.palette.good
        };
        let mut out = paint(cfg, &head, head_color);
        if !counters.is_empty() {
            out.push(' ');
            out.push_str(&paint(cfg, &counters, theme.palette.muted));
        }
        cfg.apply_format(&out)
    }
}

// ---------------------------------------------------------------------------
// Working directory
// ---------------------------------------------------------------------------

pub struct CwdWidget;

/// Replace a leading `home` with `~`.
pub fn collapse_home(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home.and_then(|h| h.to_str()).filter(|h| !h.is_empty()) else {
        return path.to_string();
    };
    let home = home.trim_end_matches('/');
    if path == home {
        "~".to_string()
    } else if let Some(rest) = path.strip_prefix(home).filter(|r| r.starts_with('/')) {
        format!("~{}", rest)
    } else {
        path.to_string()
    }
}

/// Shorten `path` to `max` characters by dropping leading components behind
/// `…/`. A single oversized component keeps its tail.
pub fn shorten_path(path: &str, max: usize) -> String {
    if max == 0 || path.chars().count() <= max {
        return path.to_string();
    }
    let parts: Vec<&str> = path.split('/').collect();
    for start in 1..parts.len() {
        let tail = parts[start..].join("/");
        if tail.chars().count() + 2 <= max {
            return format!("…/{}", tail);
        }
    }
    let chars: Vec<char> = path.chars().collect();
    let keep = max.saturating_sub(1);
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("…{}", tail)
}

fn basename(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|b| !b.is_empty())
        .unwrap_or(path)
}

impl Widget for CwdWidget {
    fn name(&self) -> &'static str {
        "cwd"
    }

    fn should_render(&self, session: &Session, _cfg: &WidgetConfig) -> bool {
        !session.working_dir().is_empty()
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let dir = session.working_dir();
        let shown = if cfg.get_bool("basename", false) {
            basename(dir).to_string()
        } else {
            collapse_home(dir, dirs::home_dir().as_deref())
        };
        let shown = shorten_path(&shown, cfg.get_usize("max_length", 0));
        finish(cfg, &shown, theme.palette.secondary)
    }
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct PlanWidget {
    label: Option<Rc<String>>,
}

impl PlanWidget {
    pub fn set_plan(&mut self, label: Rc<String>) {
        self.label = Some(label);
    }
}

impl Widget for PlanWidget {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn should_render(&self, _session: &Session, _cfg: &WidgetConfig) -> bool {
        self.label.as_ref().is_some_and(|l| !l.is_empty())
    }

    fn render(&self, _session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        match &self.label {
            Some(label) => finish(cfg, label, theme.palette.accent),
            None => String::new(),
        }
    }

    fn wire(&mut self, state: &SharedState) {
        if let Some(plan) = &state.plan {
            self.set_plan(Rc::clone(plan));
        }
    }
}

// ---------------------------------------------------------------------------
// Config counts
// ---------------------------------------------------------------------------

pub struct ConfigCountsWidget {
    claude_home: PathBuf,
}

impl ConfigCountsWidget {
    pub fn new(claude_home: PathBuf) -> Self {
        Self { claude_home }
    }
}

impl Default for ConfigCountsWidget {
    fn default() -> Self {
        Self::new(storage::claude_home())
    }
}

impl Widget for ConfigCountsWidget {
    fn name(&self) -> &'static str {
        "config_counts"
    }

    fn render(&self, session: &Session, cfg: &WidgetConfig, theme: &Theme) -> String {
        let counts = config_counts::collect(Path::new(session.working_dir()), &self.claude_home);
        if counts.is_empty() {
            return String::new();
        }
        let parts: Vec<String> = [
            (counts.claude_md, "CLAUDE.md"),
            (counts.permissions, "perms"),
            (counts.hooks, "hooks"),
            (counts.plugins, "plugins"),
        ]
        .iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, label)| format!("{} {}", n, label))
        .collect();
        finish(cfg, &parts.join(" · "), theme.palette.muted)
    }
}
