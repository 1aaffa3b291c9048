use super::schema::{Config, GeneralConfig, LineConfig, WidgetConfig};
use crate::error::StatuslineError;

pub const PRESET_NAMES: &[&str] = &["minimal", "default", "efficiency", "developer", "pro", "full"];

fn w(name: &str) -> WidgetConfig {
    WidgetConfig::named(name)
}

fn flat(names: &[&str]) -> LineConfig {
    LineConfig::flat(names.iter().map(|n| w(n)).collect())
}

fn config(lines: Vec<LineConfig>) -> Config {
    Config {
        general: GeneralConfig::default(),
        colors: Default::default(),
        limits: Default::default(),
        lines,
    }
}

/// Lines of the built-in layout used when no config file exists.
pub fn default_lines() -> Vec<LineConfig> {
    vec![
        flat(&["model", "context", "cost", "code_changes", "git"]),
        flat(&["tools", "agents", "todos"]),
    ]
}

/// Build a named preset.
pub fn preset(name: &str) -> Result<Config, StatuslineError> {
    let lines = match name {
        "minimal" => vec![LineConfig::flat(vec![
            w("model"),
            w("context").with("show_bar", "false"),
            w("cost"),
        ])],
        "default" => default_lines(),
        "efficiency" => vec![
            flat(&["model", "context", "cache_hit", "token_speed", "api_latency"]),
            flat(&["context_spark", "compact_eta", "burn_rate"]),
        ],
        "developer" => vec![
            LineConfig::split(
                vec![w("model"), w("git"), w("cwd")],
                vec![w("cost"), w("duration")],
            ),
            flat(&["tools", "agents", "todos"]),
        ],
        "pro" => vec![
            flat(&["model", "context", "cost", "daily_cost", "block_timer"]),
            flat(&["block_limit", "week_limit", "plan"]),
        ],
        "full" => vec![
            flat(&[
                "model",
                "plan",
                "context",
                "context_spark",
                "compact_eta",
                "cache_hit",
                "token_speed",
                "api_latency",
            ]),
            flat(&[
                "cost",
                "burn_rate",
                "daily_cost",
                "weekly_cost",
                "block_cost",
                "block_timer",
                "block_limit",
                "week_limit",
            ]),
            LineConfig::split(
                vec![
                    w("git"),
                    w("cwd"),
                    w("code_changes"),
                    w("tools"),
                    w("agents"),
                    w("todos"),
                ],
                vec![w("config_counts"), w("duration"), w("session_id")],
            ),
        ],
        other => return Err(StatuslineError::UnknownPreset(other.to_string())),
    };
    Ok(config(lines))
}

impl Default for Config {
    fn default() -> Self {
        config(default_lines())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::registry::WIDGET_NAMES;
    use std::collections::HashSet;

    #[test]
    fn test_every_preset_builds() {
        for name in PRESET_NAMES {
            let cfg = preset(name).unwrap();
            assert!(!cfg.lines.is_empty(), "{}", name);
        }
    }

    #[test]
    fn test_unknown_preset() {
        assert!(matches!(
            preset("gigantic"),
            Err(StatuslineError::UnknownPreset(n)) if n == "gigantic"
        ));
    }

    #[test]
    fn test_default_config_is_default_preset() {
        assert_eq!(Config::default(), preset("default").unwrap());
    }

    #[test]
    fn test_full_uses_every_widget() {
        let cfg = preset("full").unwrap();
        let used: HashSet<&str> = cfg
            .lines
            .iter()
            .flat_map(|l| l.all_widgets())
            .map(|w| w.name.as_str())
            .collect();
        for name in WIDGET_NAMES {
            assert!(used.contains(name), "full preset is missing {}", name);
        }
        assert!(cfg.lines.last().unwrap().is_split());
    }

    #[test]
    fn test_presets_reference_known_widgets() {
        for name in PRESET_NAMES {
            let cfg = preset(name).unwrap();
            for widget in cfg.lines.iter().flat_map(|l| l.all_widgets()) {
                assert!(WIDGET_NAMES.contains(&widget.name.as_str()), "{}", widget.name);
            }
        }
    }
}
