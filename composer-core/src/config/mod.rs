//! Configuration structures and constants for the composer-core library.
//!
//! This module provides the configuration for the encoder engine: which
//! ffmpeg binary to run, the transition duration used between edited clips,
//! where outputs and temporary files go, and the job-load weights callers use
//! when scheduling multi-profile work.

mod builder;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

pub use builder::CoreConfigBuilder;

use crate::error::{CoreError, CoreResult};

// Default constants

/// Default encoder binary, resolved through `PATH`.
pub const DEFAULT_FFMPEG_BINARY: &str = "ffmpeg";

/// Default transition between edited clips (fade out, then fade in).
pub const DEFAULT_TRANSITION_DURATION_MS: u64 = 2000;

/// Base job load of a multi-clip edit.
pub const DEFAULT_PROCESS_SMIL_JOB_LOAD: f32 = 2.0;

/// Upper bound of the job load of a multi-clip edit.
pub const DEFAULT_PROCESS_SMIL_JOB_LOAD_MAX: f32 = 4.0;

/// Extra job load added for every encoding profile of a multi-profile run.
pub const DEFAULT_PER_ENCODING_PROFILE_JOB_LOAD: f32 = 0.5;

// Environment variable names

pub const ENV_FFMPEG_PATH: &str = "COMPOSER_FFMPEG_PATH";
pub const ENV_TRANSITION_DURATION_MS: &str = "COMPOSER_TRANSITION_DURATION_MS";
pub const ENV_OUTPUT_DIR: &str = "COMPOSER_OUTPUT_DIR";
pub const ENV_TEMP_DIR: &str = "COMPOSER_TEMP_DIR";

/// Main configuration structure for the composer-core library.
///
/// All fields have sensible defaults. The builder pattern provides a
/// convenient way to create and configure instances.
///
/// # Examples
///
/// ```rust
/// use composer_core::config::CoreConfigBuilder;
/// use std::time::Duration;
///
/// let config = CoreConfigBuilder::new()
///     .ffmpeg_path("/usr/local/bin/ffmpeg")
///     .transition_duration(Duration::from_millis(1000))
///     .build();
/// assert_eq!(config.transition_duration.as_millis(), 1000);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Path (or bare name) of the ffmpeg binary
    pub ffmpeg_path: String,

    /// Transition between edited clips; also the minimum gap between clips
    pub transition_duration: Duration,

    /// Output directory; defaults to the directory of the first input
    pub output_dir: Option<PathBuf>,

    /// Optional directory for temporary files (defaults to the system temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Extra load per encoding profile of a multi-profile run
    pub per_profile_job_load: f32,

    /// Base load of a multi-clip edit
    pub process_smil_job_load: f32,

    /// Maximum load of a multi-clip edit
    pub process_smil_job_load_max: f32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: DEFAULT_FFMPEG_BINARY.to_string(),
            transition_duration: Duration::from_millis(DEFAULT_TRANSITION_DURATION_MS),
            output_dir: None,
            temp_dir: None,
            per_profile_job_load: DEFAULT_PER_ENCODING_PROFILE_JOB_LOAD,
            process_smil_job_load: DEFAULT_PROCESS_SMIL_JOB_LOAD,
            process_smil_job_load_max: DEFAULT_PROCESS_SMIL_JOB_LOAD_MAX,
        }
    }
}

impl CoreConfig {
    /// Default configuration with the `COMPOSER_*` environment overrides applied.
    pub fn from_env() -> CoreResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Applies the `COMPOSER_*` environment overrides on top of this configuration.
    pub fn apply_env(&mut self) -> CoreResult<()> {
        if let Some(path) = utils::get_env_string(ENV_FFMPEG_PATH) {
            self.ffmpeg_path = path;
        }
        if let Some(ms) = utils::get_env_parsed::<u64>(ENV_TRANSITION_DURATION_MS)? {
            self.transition_duration = Duration::from_millis(ms);
        }
        if let Some(dir) = utils::get_env_path(ENV_OUTPUT_DIR) {
            self.output_dir = Some(dir);
        }
        if let Some(dir) = utils::get_env_path(ENV_TEMP_DIR) {
            self.temp_dir = Some(dir);
        }
        Ok(())
    }

    /// Checks that the configuration can be used to build commands.
    pub fn validate(&self) -> CoreResult<()> {
        if self.ffmpeg_path.trim().is_empty() {
            return Err(CoreError::Config("ffmpeg path must not be empty".to_string()));
        }
        let loads = [
            ("per_profile_job_load", self.per_profile_job_load),
            ("process_smil_job_load", self.process_smil_job_load),
            ("process_smil_job_load_max", self.process_smil_job_load_max),
        ];
        for (name, load) in loads {
            if !load.is_finite() || load < 0.0 {
                return Err(CoreError::Config(format!(
                    "{name} must be a non-negative number, got {load}"
                )));
            }
        }
        Ok(())
    }

    /// Job load of a run producing `profile_count` outputs.
    pub fn estimate_job_load(&self, profile_count: usize) -> f32 {
        let load = self.process_smil_job_load + self.per_profile_job_load * profile_count as f32;
        load.min(self.process_smil_job_load_max)
    }
}
