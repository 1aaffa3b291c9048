use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default, skip_serializing_if = "ColorOverrides::is_empty")]
    pub colors: ColorOverrides,
    #[serde(default, skip_serializing_if = "LimitsConfig::is_default")]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub separator: String,
    pub theme: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            theme: "default".to_string(),
        }
    }
}

/// Palette overrides applied on top of the selected theme. Empty means "keep
/// the theme's colour".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorOverrides {
    pub good: String,
    pub warn: String,
    pub critical: String,
    pub primary: String,
    pub secondary: String,
    pub muted: String,
    pub accent: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backgrounds: Vec<String>,
}

impl ColorOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ColorOverrides::default()
    }

    /// `(key, token)` pairs for validation messages.
    pub fn tokens(&self) -> Vec<(String, &str)> {
        let mut out = vec![
            ("good".to_string(), self.good.as_str()),
            ("warn".to_string(), self.warn.as_str()),
            ("critical".to_string(), self.critical.as_str()),
            ("primary".to_string(), self.primary.as_str()),
            ("secondary".to_string(), self.secondary.as_str()),
            ("muted".to_string(), self.muted.as_str()),
            ("accent".to_string(), self.accent.as_str()),
        ];
        for (i, bg) in self.backgrounds.iter().enumerate() {
            out.push((format!("backgrounds[{}]", i), bg.as_str()));
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Subscription tier, e.g. `max_20x`. Empty uses the credential's tier.
    pub tier: String,
    /// Messages per 5-hour block; 0 uses the tier default.
    pub five_hour: u64,
    /// Messages per week; 0 uses the tier default.
    pub seven_day: u64,
    /// Ask the OAuth usage endpoint instead of estimating locally.
    pub usage_api: bool,
}

impl LimitsConfig {
    pub fn is_default(&self) -> bool {
        *self == LimitsConfig::default()
    }
}

/// One statusline row: either a flat `widgets` list or a `left`/`right` split.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub widgets: Vec<WidgetConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub left: Vec<WidgetConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub right: Vec<WidgetConfig>,
}

impl LineConfig {
    pub fn flat(widgets: Vec<WidgetConfig>) -> Self {
        Self {
            widgets,
            ..Default::default()
        }
    }

    pub fn split(left: Vec<WidgetConfig>, right: Vec<WidgetConfig>) -> Self {
        Self {
            left,
            right,
            ..Default::default()
        }
    }

    pub fn is_split(&self) -> bool {
        !self.left.is_empty() || !self.right.is_empty()
    }

    pub fn all_widgets(&self) -> impl Iterator<Item = &WidgetConfig> {
        self.widgets.iter().chain(&self.left).chain(&self.right)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub name: String,
    /// Template; the first `{value}` is replaced by the rendered value.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub format: String,
    /// Foreground colour token overriding the widget's own colour.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub style: String,
    #[serde(
        deserialize_with = "deserialize_extra",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub extra: BTreeMap<String, String>,
}

impl WidgetConfig {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }
}

/// Accept strings, booleans and numbers for option values, storing each as
/// its string form.
fn deserialize_extra<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, toml::Value>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                toml::Value::String(s) => s,
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                other => other.to_string(),
            };
            (k, v)
        })
        .collect())
}
