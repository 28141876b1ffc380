use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(&cli);
    commands::run_command(cli)
}

/// Logs go to stderr so `--format json` output stays parseable.
/// `RUST_LOG` overrides the level chosen here.
fn init_tracing(cli: &cli::Cli) {
    let level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (cli::Command::Serve(_), false) => "info",
        _ => "warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
