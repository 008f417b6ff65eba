//! Relay CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use relay_cli::cli::{Cli, Commands};
use relay_cli::commands;
use relay_cli::repl::Repl;

fn main() {
    // Load .env.local if it exists (RELAY_* overrides)
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> commands::Result<()> {
    let state_dir = cli.state_dir();
    let catalog = relay_cli::select_catalog(&cli.agents)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let orchestrator =
        runtime.block_on(relay_cli::connect(&state_dir, catalog, &cli.session_prefix))?;

    match cli.command {
        None | Some(Commands::Repl) => Repl::new(&state_dir, runtime, orchestrator)?.run(),
        Some(cmd) => {
            let result = runtime.block_on(commands::execute(cmd, &orchestrator));
            orchestrator.shutdown();
            result
        }
    }
}
