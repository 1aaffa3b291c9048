use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatuslineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration:\n  {}", .0.join("\n  "))]
    Validation(Vec<String>),

    #[error("unknown preset '{0}' (expected one of: minimal, default, efficiency, developer, pro, full)")]
    UnknownPreset(String),

    #[error("network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("toml serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
