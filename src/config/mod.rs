pub mod presets;
pub mod schema;

use std::path::Path;

pub use presets::{preset, PRESET_NAMES};
pub use schema::{ColorOverrides, Config, GeneralConfig, LimitsConfig, LineConfig, WidgetConfig};

use crate::error::StatuslineError;
use crate::theme::{self, THEME_NAMES};
use crate::widget::registry::WIDGET_NAMES;

/// Parse config text. Missing sections take their defaults; a config without
/// any `[[lines]]` keeps its settings but uses the built-in layout.
pub fn parse(contents: &str) -> Result<Config, StatuslineError> {
    let mut config: Config = toml::from_str(contents)?;
    if config.general.separator.is_empty() {
        config.general.separator = GeneralConfig::default().separator;
    }
    if config.lines.is_empty() {
        config.lines = presets::default_lines();
    }
    Ok(config)
}

/// Load the config at `path`. An absent file is the default config; only
/// unreadable or malformed files are errors.
pub fn load(path: &Path) -> Result<Config, StatuslineError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse(&contents),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}

/// Render-path loader: any failure falls back to the default config.
pub fn load_or_default(path: &Path) -> Config {
    load(path).unwrap_or_else(|e| {
        tracing::warn!("using default config, {} is unusable: {}", path.display(), e);
        Config::default()
    })
}

/// Problems that would make part of the statusline silently disappear.
pub fn validate(config: &Config) -> Vec<String> {
    let mut issues = Vec::new();

    if !THEME_NAMES.contains(&config.general.theme.as_str()) {
        issues.push(format!(
            "unknown theme '{}' (expected one of: {})",
            config.general.theme,
            THEME_NAMES.join(", ")
        ));
    }

    for (key, token) in config.colors.tokens() {
        if !theme::is_valid_color(token) {
            issues.push(format!("colors.{}: invalid colour '{}'", key, token));
        }
    }

    for (i, line) in config.lines.iter().enumerate() {
        let n = i + 1;
        match (line.widgets.is_empty(), line.is_split()) {
            (false, true) => issues.push(format!(
                "line {}: use either 'widgets' or 'left'/'right', not both",
                n
            )),
            (true, false) => issues.push(format!("line {}: no widgets", n)),
            _ => {}
        }
        for widget in line.all_widgets() {
            if !WIDGET_NAMES.contains(&widget.name.as_str()) {
                issues.push(format!("line {}: unknown widget '{}'", n, widget.name));
            }
            if !theme::is_valid_color(&widget.style) {
                issues.push(format!(
                    "line {}: widget '{}' has invalid style '{}'",
                    n, widget.name, widget.style
                ));
            }
        }
    }

    issues
}

/// Load and validate `path` for `--check`. An absent file counts as an error
/// here, since there is nothing to check.
pub fn check(path: &Path) -> Result<Config, StatuslineError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StatuslineError::Config(format!(
                "no config file at {} (create one with --init)",
                path.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };
    let config = parse(&contents)?;
    let issues = validate(&config);
    if issues.is_empty() {
        Ok(config)
    } else {
        Err(StatuslineError::Validation(issues))
    }
}
