use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::output;
use crate::config;
use crate::error::StatuslineError;
use crate::storage;

/// Validate the config file. Every issue is listed on stderr before the
/// error is returned.
pub fn run() -> Result<()> {
    check_path(&storage::config_path())
}

pub fn check_path(path: &Path) -> Result<()> {
    match config::check(path) {
        Ok(_) => {
            output::success(&format!("config OK: {}", path.display()));
            Ok(())
        }
        Err(StatuslineError::Validation(issues)) => {
            for issue in &issues {
                output::error(issue);
            }
            bail!("{}: {} issue(s)", path.display(), issues.len())
        }
        Err(e) => bail!("{}: {}", path.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_check_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        assert!(check_path(&path).is_err());

        std::fs::write(&path, "[[lines]]\nwidgets = [{ name = \"model\" }]\n").unwrap();
        assert!(check_path(&path).is_ok());

        std::fs::write(&path, "[[lines]]\nwidgets = [{ name = \"nope\" }]\n").unwrap();
        let err = check_path(&path).unwrap_err();
        assert!(err.to_string().contains("1 issue(s)"), "{}", err);
    }
}
