//! Layout: turn configured lines of widgets into terminal-width rows.

pub mod truncate;

use colored::Color;

use crate::config::{Config, LineConfig, WidgetConfig};
use crate::session::Session;
use crate::theme::Theme;
use crate::widget::Registry;

use truncate::{truncate, visible_length};

const DEFAULT_WIDTH: usize = 80;
const RESET: &str = "\u{1b}[0m";

// ---------------------------------------------------------------------------
// Width resolution
// ---------------------------------------------------------------------------

/// Terminal width from `$COLUMNS`, falling back to 80.
pub fn terminal_width() -> usize {
    parse_width(std::env::var("COLUMNS").ok().as_deref())
}

pub fn parse_width(columns: Option<&str>) -> usize {
    columns
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render every configured line and join the non-empty ones with `\n`.
pub fn render_session(
    session: &Session,
    config: &Config,
    registry: &Registry,
    theme: &Theme,
    width: usize,
) -> String {
    config
        .lines
        .iter()
        .map(|line| render_line(session, line, registry, theme, width))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_group(
    session: &Session,
    widgets: &[WidgetConfig],
    registry: &Registry,
    theme: &Theme,
) -> Vec<String> {
    widgets
        .iter()
        .filter_map(|cfg| registry.render_widget(session, cfg, theme))
        .collect()
}

pub fn render_line(
    session: &Session,
    line: &LineConfig,
    registry: &Registry,
    theme: &Theme,
    width: usize,
) -> String {
    if !line.is_split() {
        let segments = render_group(session, &line.widgets, registry, theme);
        return truncate(&join(&segments, theme, Side::Left), width);
    }

    let left = join(
        &render_group(session, &line.left, registry, theme),
        theme,
        Side::Left,
    );
    let right = join(
        &render_group(session, &line.right, registry, theme),
        theme,
        Side::Right,
    );
    align(&left, &right, &theme.separators.plain, width)
}

/// Place `right` flush against column `width`. Groups that cannot both fit
/// with a gap collapse to `left + sep + right` and are clipped.
pub fn align(left: &str, right: &str, separator: &str, width: usize) -> String {
    if right.is_empty() {
        return truncate(left, width);
    }
    let l = visible_length(left);
    let r = visible_length(right);
    if left.is_empty() {
        if r > width {
            return truncate(right, width);
        }
        return format!("{}{}", " ".repeat(width - r), right);
    }
    if l + r + 1 > width {
        return truncate(&format!("{}{}{}", left, separator, right), width);
    }
    format!("{}{}{}", left, " ".repeat(width - l - r), right)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

fn join(segments: &[String], theme: &Theme, side: Side) -> String {
    if segments.is_empty() {
        return String::new();
    }
    if theme.powerline {
        powerline(segments, theme, side)
    } else {
        segments.join(&theme.separators.plain)
    }
}

// ---------------------------------------------------------------------------
// Powerline
// ---------------------------------------------------------------------------

fn sgr(code: &str) -> String {
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        format!("\u{1b}[{}m", code)
    } else {
        String::new()
    }
}

fn fg(color: Color) -> String {
    sgr(&color.to_fg_str())
}

fn bg(color: Color) -> String {
    sgr(&color.to_bg_str())
}

/// Segments on a background ring. Left groups point right with U+E0B0; right
/// groups point left with U+E0B2. Neighbours sharing a background get the
/// thin variant in the muted colour instead.
fn powerline(segments: &[String], theme: &Theme, side: Side) -> String {
    let reset = sgr("0");
    let glyphs = &theme.separators;
    let mut out = String::new();

    for (i, segment) in segments.iter().enumerate() {
        let back = theme.background(i);
        let on = bg(back);
        // A widget's own reset would drop the segment background.
        let body = segment.replace(RESET, &format!("{}{}", RESET, on));

        if side == Side::Right {
            let prev = (i > 0).then(|| theme.background(i - 1));
            let sep = if prev == Some(back) {
                format!("{}{}{}", on, fg(theme.palette.muted), glyphs.powerline_left_thin)
            } else {
                let from = prev.map(bg).unwrap_or_else(|| reset.clone());
                format!("{}{}{}", from, fg(back), glyphs.powerline_left)
            };
            out.push_str(&sep);
        }

        out.push_str(&format!("{} {} ", on, body));

        if side == Side::Left {
            let next = (i + 1 < segments.len()).then(|| theme.background(i + 1));
            let sep = if next == Some(back) {
                format!("{}{}{}", on, fg(theme.palette.muted), glyphs.powerline_right_thin)
            } else {
                let to = next.map(bg).unwrap_or_else(|| reset.clone());
                format!("{}{}{}", to, fg(back), glyphs.powerline_right)
            };
            out.push_str(&sep);
        }
    }
    out.push_str(&reset);
    out
}
