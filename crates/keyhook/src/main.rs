#![warn(missing_docs)]

//! Entry point for the `keyhook` binary.

mod cli;
mod error;
mod replay;
mod scenario;
mod sim;

use std::{io, panic, process};

use clap::Parser;
use logging::Capture;
use tracing::{Level, debug, error};

use crate::{
    cli::{Cli, Commands},
    error::Result,
    scenario::Scenario,
};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, and dispatch to the chosen subcommand.
fn run() -> Result<()> {
    let Cli { log, command } = Cli::parse();
    let capture = Capture::new(1024).with_min_level(Level::WARN);
    logging::init(&log, Some(&capture));

    match command {
        Commands::Check { path, dump } => {
            let scenario = Scenario::load(&path)?;
            if dump {
                println!("{}", scenario.to_json()?);
            } else {
                println!("OK");
            }
            Ok(())
        }
        Commands::Replay { path } => {
            let scenario = Scenario::load(&path)?;
            // Simulated host panics are contained and logged; keep stderr quiet.
            panic::set_hook(Box::new(|info| debug!(%info, "sim_panic")));
            let summary = replay::run(&scenario, &mut io::stdout().lock(), &capture)?;
            println!(
                "{} events: {} handled, {} forwarded",
                summary.events, summary.handled, summary.forwarded
            );
            Ok(())
        }
    }
}
