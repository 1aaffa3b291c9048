//! On-disk locations and small file-writing helpers shared by the history
//! store, the cost cache and `--init`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Directory segment used under `~/.config` and `~/.cache`.
pub const APP_NAME: &str = "claude-statusline";

/// Config file location. `CLAUDE_STATUSLINE_CONFIG` overrides it (tests use
/// this to avoid touching the real home directory).
pub fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("CLAUDE_STATUSLINE_CONFIG") {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    home_dir()
        .join(".config")
        .join(APP_NAME)
        .join("config.toml")
}

/// Per-user cache directory holding history rings and the cost cache.
pub fn cache_dir() -> PathBuf {
    if let Ok(p) = std::env::var("CLAUDE_STATUSLINE_CACHE_DIR") {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    home_dir().join(".cache").join(APP_NAME)
}

/// The agent host's own state directory (`~/.claude`), which holds the
/// projects tree, settings and credentials.
pub fn claude_home() -> PathBuf {
    if let Ok(p) = std::env::var("CLAUDE_CONFIG_DIR") {
        if !p.is_empty() {
            return PathBuf::from(p);
        }
    }
    home_dir().join(".claude")
}

pub fn projects_dir() -> PathBuf {
    claude_home().join("projects")
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}

/// Create `dir` and its parents with mode 0755.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))
}

/// Write `contents` to a sibling temp file and rename it over `path`, so a
/// concurrent reader never observes a half-written file. Mode 0644.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state".to_string());
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    std::fs::write(&tmp, contents)
        .with_context(|| format!("failed to write {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&tmp)
            .with_context(|| format!("failed to read metadata of {}", tmp.display()))?
            .permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(&tmp, perms)
            .with_context(|| format!("failed to set permissions on {}", tmp.display()))?;
    }

    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}
