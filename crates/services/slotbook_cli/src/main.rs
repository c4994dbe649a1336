// File: services/slotbook_cli/src/main.rs
use chrono::Utc;
use clap::Parser;
use slotbook_cli::{describe_event, run, AppState, Command};
use slotbook_common::{log_error, logging, Context};
use slotbook_config::load_config;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "slotbook", author, version, about = "Sign in and book appointments", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::init_with_level(if args.verbose { Level::DEBUG } else { Level::WARN });

    let config = match load_config() {
        Ok(config) => Arc::new(config),
        Err(err) => {
            log_error(&err, "Failed to load config");
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(err) => {
            log_error(&err, "Failed to set up services");
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut events = state.session.subscribe();
    let mut stdout = std::io::stdout();
    let result = run(args.command, &state, Utc::now(), &mut stdout).await;

    while let Ok(event) = events.try_recv() {
        let _ = writeln!(stdout, "{}", describe_event(&event));
    }
    if let Err(err) = stdout.flush().context("flushing stdout") {
        log_error(err, "Output lost");
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(err.exit_code())
        }
    }
}
