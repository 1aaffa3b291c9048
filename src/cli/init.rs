use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::cli::output;
use crate::config;
use crate::storage;

/// Write the named preset to the config path. An existing file is left
/// alone unless `force` is set.
pub fn run(preset: &str, force: bool) -> Result<()> {
    let path = storage::config_path();
    write_preset(&path, preset, force)?;
    output::success(&format!("Created {} from the '{}' preset", path.display(), preset));
    output::info("Run with --setup to print the host settings snippet.");
    Ok(())
}

pub fn write_preset(path: &Path, preset: &str, force: bool) -> Result<()> {
    let config = config::preset(preset)?;

    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    let body = toml::to_string_pretty(&config).context("failed to serialize config")?;
    let contents = format!("# claude-statusline config (preset: {})\n\n{}", preset, body);
    storage::write_atomic(path, contents.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))
}
