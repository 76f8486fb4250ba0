//! ql - gamified to-do CLI
//!
//! Tracks tasks per user, awards points by priority on completion, and keeps
//! daily completion streaks.

use clap::Parser;
use questlog::cli::Cli;
use questlog::output::{command_name, emit_error, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() {
    // Tracing is opt-in via RUST_LOG.
    // Keep startup robust in CI/robot envs: ignore invalid/huge filters.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() || raw.len() > 4096 {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let command = command_name(std::env::args().skip(1));
    let cli = Cli::parse();
    let events_to_stdout = cli
        .events
        .as_deref()
        .is_some_and(|value| value.trim() == "-");
    let mode = OutputMode::from_flags(cli.json && !events_to_stdout, cli.quiet);
    if let Err(err) = cli.run() {
        let _ = emit_error(mode, &command, &err);
        std::process::exit(err.exit_code());
    }
}
