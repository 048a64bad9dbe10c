// ============================================================================
// composer-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Error Types for Graph Compilation and Encoder Execution
//
// This module defines the error type shared by every component of the
// compiler and the process runner. Compilation errors are raised
// synchronously while the command is being built; process errors are raised
// right after the encoder exits. Nothing in this crate retries.
//
// KEY COMPONENTS:
// - CoreError: the error enum
// - CoreResult: result alias used throughout the crate
// - Constructor helpers for process start/wait/exit failures

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Errors produced while compiling or running an encoder command.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A profile template could not be tokenized.
    #[error("Template error: {0}")]
    Template(String),

    /// A profile asks for a filter graph the aggregator cannot compose.
    #[error("Unsupported filter graph: {0}")]
    UnsupportedGraph(String),

    /// The clip list cannot be turned into an edit.
    #[error("Invalid edit: {0}")]
    InvalidEdit(String),

    /// A required audio/video stream, track or layout is missing.
    #[error("Missing stream: {0}")]
    MissingStream(String),

    /// The encoder ran but exited unsuccessfully.
    #[error("Command '{command}' failed with status {status}: {output}")]
    ExternalProcess {
        command: String,
        status: ExitStatus,
        output: String,
    },

    #[error("Failed to start command '{0}': {1}")]
    CommandStart(String, #[source] io::Error),

    #[error("Failed to wait for command '{0}': {1}")]
    CommandWait(String, #[source] io::Error),

    #[error("Encoding profile '{0}' not found")]
    ProfileNotFound(String),

    #[error("Could not parse encoding profiles: {0}")]
    ProfileParse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("ffprobe error: {0}")]
    FfprobeParse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for composer operations
pub type CoreResult<T> = std::result::Result<T, CoreError>;

pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds the error for an encoder that exited with a failure status,
/// keeping its captured output for diagnostics.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    output: impl Into<String>,
) -> CoreError {
    CoreError::ExternalProcess {
        command: cmd.into(),
        status,
        output: output.into(),
    }
}
