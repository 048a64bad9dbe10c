// ============================================================================
// composer-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger Initialization and Log Files
//
// The CLI logs through the standard `log` macros with `env_logger` as the
// backend. Records go to stderr, or to a per-run log file when a log
// directory is given.
//
// USAGE:
// - RUST_LOG=info (default): Normal operation logs
// - RUST_LOG=debug or --verbose: compiled commands and filter clauses
// - RUST_LOG=trace: encoder banner and progress lines as well

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::LevelFilter;

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Name of the log file for one run of `operation`.
pub fn log_file_name(operation: &str) -> String {
    format!("composer_{operation}_{}.log", get_timestamp())
}

/// Initializes env_logger. Returns the log file path when `log_dir` is set.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>, operation: &str) -> Result<Option<PathBuf>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory '{}'", dir.display()))?;
            let path = dir.join(log_file_name(operation));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            builder
                .target(Target::Pipe(Box::new(file)))
                .format(|buf, record| {
                    writeln!(
                        buf,
                        "{} [{}] {}: {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        record.args()
                    )
                });
            Some(path)
        }
        None => None,
    };

    // A second init (tests) keeps the first logger.
    let _ = builder.try_init();
    Ok(log_path)
}
