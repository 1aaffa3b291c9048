use std::path::Path;

use serde_json::Value;

/// Instruction files and settings entries that shape the agent's behaviour
/// in a directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigCounts {
    pub claude_md: u32,
    pub permissions: u32,
    pub hooks: u32,
    pub plugins: u32,
}

impl ConfigCounts {
    pub fn is_empty(&self) -> bool {
        *self == ConfigCounts::default()
    }

    fn absorb_settings(&mut self, settings: &Value) {
        if let Some(allow) = settings.pointer("/permissions/allow").and_then(Value::as_array) {
            self.permissions += allow.len() as u32;
        }
        if let Some(plugins) = settings.get("enabledPlugins").and_then(Value::as_object) {
            self.plugins += plugins.values().filter(|v| v.as_bool() == Some(true)).count() as u32;
        }
        if let Some(events) = settings.get("hooks").and_then(Value::as_object) {
            for matchers in events.values().filter_map(Value::as_array) {
                for matcher in matchers {
                    if let Some(hooks) = matcher.get("hooks").and_then(Value::as_array) {
                        self.hooks += hooks.len() as u32;
                    }
                }
            }
        }
    }
}

const INSTRUCTION_FILES: &[&str] = &["CLAUDE.md", ".claude.md", ".claude/CLAUDE.md"];

/// Count instruction files from `cwd` up to the filesystem root, plus the
/// user-level ones under `claude_home`, and tally the two settings files.
pub fn collect(cwd: &Path, claude_home: &Path) -> ConfigCounts {
    let mut counts = ConfigCounts::default();

    if !cwd.as_os_str().is_empty() {
        for dir in cwd.ancestors() {
            counts.claude_md += INSTRUCTION_FILES
                .iter()
                .filter(|name| dir.join(name).is_file())
                .count() as u32;
        }
    }
    let user_md = claude_home.join("CLAUDE.md");
    if user_md.is_file() && !cwd.ancestors().any(|d| d.join(".claude") == claude_home) {
        counts.claude_md += 1;
    }

    let mut settings_files = vec![claude_home.join("settings.json")];
    if !cwd.as_os_str().is_empty() {
        let project = cwd.join(".claude").join("settings.json");
        if project != settings_files[0] {
            settings_files.push(project);
        }
    }
    for path in settings_files {
        let Ok(raw) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(settings) => counts.absorb_settings(&settings),
            Err(e) => tracing::debug!("skipping {}: {}", path.display(), e),
        }
    }

    counts
}
