//! Configuration utility functions
//!
//! Helpers for reading configuration overrides from environment variables.
//! An unset variable yields `None`; a set but malformed one is an error so a
//! typo never silently falls back to a default.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Get a string value from an environment variable, ignoring empty values
pub fn get_env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get a path value from an environment variable
pub fn get_env_path(key: &str) -> Option<PathBuf> {
    get_env_string(key).map(PathBuf::from)
}

/// Parse a value from an environment variable
pub fn get_env_parsed<T>(key: &str) -> CoreResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(key) {
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|e| {
            CoreError::Config(format!("{key} has invalid value '{raw}': {e}"))
        }),
        None => Ok(None),
    }
}
