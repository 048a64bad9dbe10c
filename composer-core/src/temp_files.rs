//! Temporary file management utilities.
//!
//! Temporary files live under the configured temp directory (or the system
//! one) and are removed by the tempfile crate when their handle is dropped.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::{Builder as TempFileBuilder, NamedTempFile};

use crate::config::CoreConfig;
use crate::error::CoreResult;
use crate::graph::concat::{ConcatInput, concat_file_list};

fn temp_base_dir(config: &CoreConfig) -> PathBuf {
    config.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
}

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;
    Ok(temp_file)
}

/// Writes the concat demuxer list for `inputs` to a fresh temporary file.
pub fn write_concat_list(config: &CoreConfig, inputs: &[ConcatInput]) -> CoreResult<NamedTempFile> {
    let mut file = create_temp_file(&temp_base_dir(config), "tracklist", "txt")?;
    file.write_all(concat_file_list(inputs).as_bytes())?;
    file.flush()?;
    log::debug!("Wrote concat list to {}", file.path().display());
    Ok(file)
}
