pub mod check;
pub mod init;
pub mod output;
pub mod render;
pub mod setup;

use clap::Parser;

/// Multi-line statusline for AI coding-agent sessions.
///
/// With no flags, reads the session JSON the host pipes on stdin and prints
/// the rendered statusline.
#[derive(Parser, Debug)]
#[command(name = "claude-statusline", version, about, long_about = None)]
pub struct Cli {
    /// Write a config file from a preset (minimal, default, efficiency,
    /// developer, pro, full)
    #[arg(
        long,
        value_name = "PRESET",
        num_args = 0..=1,
        default_missing_value = "default"
    )]
    pub init: Option<String>,

    /// Overwrite an existing config with --init
    #[arg(long, requires = "init")]
    pub force: bool,

    /// Print the settings snippet that wires this binary into the host
    #[arg(long, conflicts_with_all = ["init", "check"])]
    pub setup: bool,

    /// Validate the config file and exit
    #[arg(long, conflicts_with = "init")]
    pub check: bool,

    /// Print diagnostics to stderr
    #[arg(long)]
    pub debug: bool,
}
