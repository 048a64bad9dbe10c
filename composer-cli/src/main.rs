// ============================================================================
// composer-cli/src/main.rs
// ============================================================================
//
// COMPOSER CLI: Main Entry Point
//
// Parses the command line, sets up logging and hands the command to the
// library. Any error is printed to stderr and turns into exit code 1.
//
// USAGE:
//   composer --profiles profiles/ edit -i talk.mp4 \
//       --edits 0,10000,3000,0,14000,2000 -p mp4-low,mp4-high
//   composer --profiles profiles/ --dry-run encode -i talk.mp4 -p mp4-low

use std::process;

use clap::Parser;
use composer_cli::Cli;
use composer_cli::logging::init_logging;
use log::{error, info};

fn main() {
    let cli = Cli::parse();

    let log_path = match init_logging(cli.global.verbose, cli.global.log_dir.as_deref(), cli.command.name()) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    };
    if let Some(path) = &log_path {
        info!("Logging to {}", path.display());
    }

    if let Err(e) = composer_cli::run(cli) {
        if log_path.is_some() {
            error!("{e:#}");
        }
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
