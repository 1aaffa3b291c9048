use anyhow::{Context, Result};
use serde_json::json;

use crate::storage;

/// Print the host `settings.json` fragment that runs this binary.
pub fn run() -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate the running binary")?;
    let exe = exe.canonicalize().unwrap_or(exe);
    let snippet = settings_snippet(&exe.to_string_lossy())?;

    println!(
        "Add this to {}:\n",
        storage::claude_home().join("settings.json").display()
    );
    println!("{}", snippet);
    println!(
        "\nThen run `{} --init` to create {}.",
        exe.display(),
        storage::config_path().display()
    );
    Ok(())
}

pub fn settings_snippet(command: &str) -> Result<String> {
    let value = json!({
        "statusLine": {
            "type": "command",
            "command": command,
            "padding": 0,
        }
    });
    serde_json::to_string_pretty(&value).context("failed to serialize settings snippet")
}
