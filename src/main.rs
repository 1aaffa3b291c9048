mod cli;
mod config;
mod cost;
mod error;
mod history;
mod limits;
mod probe;
mod render;
mod session;
mod storage;
mod theme;
mod transcript;
mod widget;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{output, Cli};

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = if let Some(preset) = &cli.init {
        cli::init::run(preset, cli.force)
    } else if cli.check {
        cli::check::run()
    } else if cli.setup {
        cli::setup::run()
    } else {
        cli::render::run(cli.debug)
    };

    if let Err(e) = result {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Diagnostics go to stderr. `--debug` turns everything on, otherwise
/// `CLAUDE_STATUSLINE_LOG` is read as a filter and the default is silence.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("CLAUDE_STATUSLINE_LOG").unwrap_or_else(|_| EnvFilter::new("off"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
