use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::storage;

const KEYCHAIN_SERVICE: &str = "Claude Code-credentials";

/// OAuth credentials as stored by the agent host.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OAuthCredentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix milliseconds.
    pub expires_at: Option<i64>,
    pub subscription_type: String,
    pub rate_limit_tier: String,
}

/// Parse either the bare credential object or one wrapped in
/// `{"claudeAiOauth": {...}}`. Credentials without an access token are
/// treated as absent.
pub fn parse_credentials(json: &str) -> Option<OAuthCredentials> {
    let value: Value = serde_json::from_str(json.trim()).ok()?;
    let inner = match value.get("claudeAiOauth") {
        Some(wrapped) if wrapped.is_object() => wrapped.clone(),
        _ => value,
    };
    let creds: OAuthCredentials = serde_json::from_value(inner).ok()?;
    if creds.access_token.trim().is_empty() {
        None
    } else {
        Some(creds)
    }
}

// -------------------------------------------------------------------
// Sources
// -------------------------------------------------------------------

/// Somewhere credential JSON can be read from. Object-safe.
pub trait CredentialSource {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Raw credential JSON, or `None` when this source holds nothing.
    fn read(&self) -> Result<Option<String>>;
}

/// `<claude_home>/.credentials.json`.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for FileSource {
    fn default() -> Self {
        Self::new(storage::claude_home().join(".credentials.json"))
    }
}

impl CredentialSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }

    fn read(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e)
                .with_context(|| format!("failed to read {}", self.path.display())),
        }
    }
}

/// macOS login keychain via the `security` CLI.
pub struct KeychainSource;

impl CredentialSource for KeychainSource {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "macos") && which::which("security").is_ok()
    }

    fn read(&self) -> Result<Option<String>> {
        let user = std::env::var("USER").unwrap_or_default();
        let mut cmd = Command::new("security");
        cmd.args(["find-generic-password", "-s", KEYCHAIN_SERVICE]);
        if !user.is_empty() {
            cmd.args(["-a", &user]);
        }
        let output = cmd
            .arg("-w")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .context("failed to read from macOS Keychain")?;

        if output.status.success() {
            let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(Some(value).filter(|v| !v.is_empty()))
        } else {
            Ok(None)
        }
    }
}

pub fn default_sources() -> Vec<Box<dyn CredentialSource>> {
    vec![Box::new(FileSource::default()), Box::new(KeychainSource)]
}

/// First usable credential across `sources`, in order.
pub fn load_from(sources: &[Box<dyn CredentialSource>]) -> Option<OAuthCredentials> {
    for source in sources.iter().filter(|s| s.is_available()) {
        match source.read() {
            Ok(Some(raw)) => {
                if let Some(creds) = parse_credentials(&raw) {
                    return Some(creds);
                }
                tracing::debug!("{} credentials unusable", source.name());
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("{} credentials unreadable: {:#}", source.name(), e),
        }
    }
    None
}

pub fn load() -> Option<OAuthCredentials> {
    load_from(&default_sources())
}

// -------------------------------------------------------------------
// Plan detection
// -------------------------------------------------------------------

/// Human label for the subscription, or the API provider when no OAuth
/// credentials exist. `env` looks up environment variables.
pub fn plan_label<F>(creds: Option<&OAuthCredentials>, env: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(creds) = creds {
        let sub = creds.subscription_type.to_ascii_lowercase();
        let tier = creds.rate_limit_tier.to_ascii_lowercase();
        let label = if sub.contains("max") {
            if tier.contains("20x") {
                "Max 20x".to_string()
            } else if tier.contains("5x") {
                "Max 5x".to_string()
            } else {
                "Max".to_string()
            }
        } else if sub.contains("pro") {
            "Pro".to_string()
        } else if sub.contains("team") {
            "Team".to_string()
        } else if sub.contains("enterprise") {
            "Enterprise".to_string()
        } else {
            capitalize(creds.subscription_type.trim())
        };
        if !label.is_empty() {
            return Some(label);
        }
    }

    let set = |key: &str| env(key).is_some_and(|v| !v.trim().is_empty());
    if set("ANTHROPIC_API_KEY") {
        Some("API".to_string())
    } else if set("AWS_ACCESS_KEY_ID") || set("AWS_PROFILE") {
        Some("Bedrock".to_string())
    } else if set("GOOGLE_APPLICATION_CREDENTIALS") || set("CLOUDSDK_CORE_PROJECT") {
        Some("Vertex".to_string())
    } else {
        None
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
