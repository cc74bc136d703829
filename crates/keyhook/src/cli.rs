//! Command-line interface definitions for keyhook.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `keyhook` binary.
#[derive(Parser, Debug)]
#[command(
    name = "keyhook",
    about = "Check and replay key binding scenarios against a simulated host",
    version
)]
pub struct Cli {
    /// Logging controls shared across keyhook binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to do with the scenario.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load and validate a scenario then exit.
    Check {
        /// Path to the scenario file (RON).
        path: PathBuf,

        /// Dump the parsed scenario as JSON to stdout
        #[arg(long)]
        dump: bool,
    },
    /// Install the hook into a simulated host and replay the scenario's steps.
    Replay {
        /// Path to the scenario file (RON).
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_check_with_log_flags() {
        let cli = Cli::try_parse_from(["keyhook", "--debug", "check", "s.ron", "--dump"]).unwrap();
        assert!(cli.log.debug);
        assert!(matches!(cli.command, Commands::Check { dump: true, .. }));
        assert!(Cli::try_parse_from(["keyhook", "--trace", "--debug", "replay", "s.ron"]).is_err());
    }
}
