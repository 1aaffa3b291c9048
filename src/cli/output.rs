//! Human-facing messages for the maintenance flags. Everything goes to
//! stderr; stdout belongs to the statusline and to `--setup`.

use colored::Colorize;

/// Print a success message with a green checkmark prefix.
pub fn success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

/// Print an error message with a red cross prefix.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print an informational message with a blue info prefix.
pub fn info(msg: &str) {
    eprintln!("{} {}", "ℹ".blue(), msg);
}

/// Diagnostic line shown only under `--debug`.
pub fn debug(enabled: bool, msg: &str) {
    if enabled {
        eprintln!("[debug] {}", msg);
    }
}
