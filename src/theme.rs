//! Colour tokens, built-in themes and palette overrides.

use std::sync::OnceLock;

use colored::Color;
use regex::Regex;

use crate::config::ColorOverrides;

pub const THEME_NAMES: &[&str] = &["default", "dracula", "nord", "gruvbox", "powerline", "mono"];

/// Terminal colour names accepted in config files.
const NAMED_COLORS: &[(&str, Color)] = &[
    ("black", Color::Black),
    ("red", Color::Red),
    ("green", Color::Green),
    ("yellow", Color::Yellow),
    ("blue", Color::Blue),
    ("magenta", Color::Magenta),
    ("cyan", Color::Cyan),
    ("white", Color::White),
    ("gray", Color::BrightBlack),
    ("grey", Color::BrightBlack),
    ("bright_black", Color::BrightBlack),
    ("bright_red", Color::BrightRed),
    ("bright_green", Color::BrightGreen),
    ("bright_yellow", Color::BrightYellow),
    ("bright_blue", Color::BrightBlue),
    ("bright_magenta", Color::BrightMagenta),
    ("bright_cyan", Color::BrightCyan),
    ("bright_white", Color::BrightWhite),
];

// ---------------------------------------------------------------------------
// Colour tokens
// ---------------------------------------------------------------------------

fn hex_pattern() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$").expect("valid hex regex")
    })
}

/// A token is valid when empty, a known terminal colour name, or `#` with
/// 3, 6 or 8 hex digits.
pub fn is_valid_color(token: &str) -> bool {
    let token = token.trim();
    token.is_empty()
        || NAMED_COLORS
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case(token))
        || hex_pattern().is_match(token)
}

/// Parse a colour token. Empty and invalid tokens yield `None`; the alpha
/// byte of `#RRGGBBAA` is dropped.
pub fn parse_color(token: &str) -> Option<Color> {
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    if let Some((_, color)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(token))
    {
        return Some(*color);
    }
    if !hex_pattern().is_match(token) {
        return None;
    }

    let digits = &token[1..];
    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits[..6].to_string()
    };
    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Color::TrueColor {
        r: channel(0)?,
        g: channel(2)?,
        b: channel(4)?,
    })
}

fn hex(token: &str) -> Color {
    parse_color(token).unwrap_or(Color::White)
}

// ---------------------------------------------------------------------------
// Theme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    pub good: Color,
    pub warn: Color,
    pub critical: Color,
    pub primary: Color,
    pub secondary: Color,
    pub muted: Color,
    pub accent: Color,
    /// Segment backgrounds for powerline mode, used round-robin.
    pub backgrounds: Vec<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Separators {
    pub plain: String,
    pub powerline_right: &'static str,
    pub powerline_right_thin: &'static str,
    pub powerline_left: &'static str,
    pub powerline_left_thin: &'static str,
}

impl Default for Separators {
    fn default() -> Self {
        Self {
            plain: " | ".to_string(),
            powerline_right: "\u{E0B0}",
            powerline_right_thin: "\u{E0B1}",
            powerline_left: "\u{E0B2}",
            powerline_left_thin: "\u{E0B3}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub palette: Palette,
    pub separators: Separators,
    pub powerline: bool,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            name: "default".to_string(),
            palette: Palette {
                good: Color::Green,
                warn: Color::Yellow,
                critical: Color::Red,
                primary: Color::Cyan,
                secondary: Color::Blue,
                muted: Color::BrightBlack,
                accent: Color::Magenta,
                backgrounds: vec![Color::Blue, Color::Magenta, Color::Cyan, Color::BrightBlack],
            },
            separators: Separators::default(),
            powerline: false,
        }
    }
}

impl Theme {
    /// A fresh copy of a built-in theme. Built-ins are constructed per call,
    /// so callers can mutate the result freely.
    pub fn builtin(name: &str) -> Option<Theme> {
        let base = Theme::default();
        let theme = match name.trim().to_ascii_lowercase().as_str() {
            "" | "default" => base,
            "dracula" => Theme {
                name: "dracula".into(),
                palette: Palette {
                    good: hex("#50fa7b"),
                    warn: hex("#f1fa8c"),
                    critical: hex("#ff5555"),
                    primary: hex("#8be9fd"),
                    secondary: hex("#bd93f9"),
                    muted: hex("#6272a4"),
                    accent: hex("#ff79c6"),
                    backgrounds: vec![hex("#44475a"), hex("#6272a4"), hex("#bd93f9")],
                },
                ..base
            },
            "nord" => Theme {
                name: "nord".into(),
                palette: Palette {
                    good: hex("#a3be8c"),
                    warn: hex("#ebcb8b"),
                    critical: hex("#bf616a"),
                    primary: hex("#88c0d0"),
                    secondary: hex("#81a1c1"),
                    muted: hex("#4c566a"),
                    accent: hex("#b48ead"),
                    backgrounds: vec![hex("#3b4252"), hex("#434c5e"), hex("#4c566a")],
                },
                ..base
            },
            "gruvbox" => Theme {
                name: "gruvbox".into(),
                palette: Palette {
                    good: hex("#b8bb26"),
                    warn: hex("#fabd2f"),
                    critical: hex("#fb4934"),
                    primary: hex("#83a598"),
                    secondary: hex("#d3869b"),
                    muted: hex("#928374"),
                    accent: hex("#fe8019"),
                    backgrounds: vec![hex("#3c3836"), hex("#504945"), hex("#665c54")],
                },
                ..base
            },
            "powerline" => Theme {
                name: "powerline".into(),
                palette: Palette {
                    backgrounds: vec![
                        hex("#005f87"),
                        hex("#5f5f87"),
                        hex("#875f87"),
                        hex("#3a3a3a"),
                    ],
                    ..base.palette.clone()
                },
                powerline: true,
                ..base
            },
            "mono" => Theme {
                name: "mono".into(),
                palette: Palette {
                    good: Color::White,
                    warn: Color::BrightWhite,
                    critical: Color::BrightWhite,
                    primary: Color::White,
                    secondary: Color::White,
                    muted: Color::BrightBlack,
                    accent: Color::White,
                    backgrounds: vec![Color::BrightBlack, Color::Black],
                },
                ..base
            },
            _ => return None,
        };
        Some(theme)
    }

    /// Resolve the configured theme: unknown names fall back to `default`,
    /// then palette overrides and the separator are applied to the copy.
    pub fn resolve(name: &str, separator: &str, overrides: &ColorOverrides) -> Theme {
        let mut theme = Theme::builtin(name).unwrap_or_else(|| {
            tracing::debug!("unknown theme '{}', using default", name);
            Theme::default()
        });

        let p = &mut theme.palette;
        for (slot, token) in [
            (&mut p.good, &overrides.good),
            (&mut p.warn, &overrides.warn),
            (&mut p.critical, &overrides.critical),
            (&mut p.primary, &overrides.primary),
            (&mut p.secondary, &overrides.secondary),
            (&mut p.muted, &overrides.muted),
            (&mut p.accent, &overrides.accent),
        ] {
            if let Some(c) = parse_color(token) {
                *slot = c;
            }
        }
        let backgrounds: Vec<Color> = overrides
            .backgrounds
            .iter()
            .filter_map(|t| parse_color(t))
            .collect();
        if !backgrounds.is_empty() {
            p.backgrounds = backgrounds;
        }

        if !separator.is_empty() {
            theme.separators.plain = separator.to_string();
        }
        theme
    }

    /// Map a threshold colour onto this palette.
    pub fn status(&self, color: Color) -> Color {
        match color {
            Color::Red => self.palette.critical,
            Color::Yellow => self.palette.warn,
            Color::Green => self.palette.good,
            other => other,
        }
    }

    pub fn background(&self, index: usize) -> Color {
        if self.palette.backgrounds.is_empty() {
            Color::BrightBlack
        } else {
            self.palette.backgrounds[index % self.palette.backgrounds.len()]
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
