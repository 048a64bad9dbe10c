// composer-cli/src/lib.rs
//
// Library portion of the Composer CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands, GlobalArgs};
pub use commands::Session;

use anyhow::Result;

impl Commands {
    /// Subcommand name used for log file names.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Encode(_) => "encode",
            Commands::Trim(_) => "trim",
            Commands::Image(_) => "image",
            Commands::Mux(_) => "mux",
            Commands::Watermark(_) => "watermark",
            Commands::MultiEncode(_) => "multi_encode",
            Commands::Edit(_) => "edit",
            Commands::Composite(_) => "composite",
            Commands::Concat(_) => "concat",
            Commands::Profiles => "profiles",
            Commands::Probe(_) => "probe",
        }
    }
}

/// Runs one parsed command line.
pub fn run(cli: Cli) -> Result<()> {
    let session = Session::new(&cli.global)?;
    match &cli.command {
        Commands::Encode(args) => commands::encode::run_encode(&session, args),
        Commands::Trim(args) => commands::encode::run_trim(&session, args),
        Commands::Image(args) => commands::encode::run_image(&session, args),
        Commands::Mux(args) => commands::encode::run_mux(&session, args),
        Commands::Watermark(args) => commands::encode::run_watermark(&session, args),
        Commands::MultiEncode(args) => commands::edit::run_multi_encode(&session, args),
        Commands::Edit(args) => commands::edit::run_edit(&session, args),
        Commands::Composite(args) => commands::composite::run_composite(&session, args),
        Commands::Concat(args) => commands::concat::run_concat(&session, args),
        Commands::Profiles => commands::info::run_profiles(&session),
        Commands::Probe(args) => commands::info::run_probe(&session, args),
    }
}
