// src/bin/webact.rs

use anyhow::Result;
use colored::*;
use webact::cli::dispatcher;
use webact::store::ActionsStore;

/// The main entry point of the `webact` application.
/// It sets up logging, opens the store, dispatches to the correct handler,
/// and performs centralized error handling.
fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run_cli(args) {
        // For all errors, print a formatted message to stderr and exit with
        // a failure code.
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(args: Vec<String>) -> Result<()> {
    let mut store = ActionsStore::open_default()?;
    dispatcher::dispatch(args, &mut store)
}
