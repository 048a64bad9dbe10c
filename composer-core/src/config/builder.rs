// ============================================================================
// composer-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Every field starts at its default so
// callers only name what they want to change.
//
// KEY COMPONENTS:
// - CoreConfigBuilder: Builder struct for creating CoreConfig instances

use std::path::PathBuf;
use std::time::Duration;

use super::CoreConfig;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use composer_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/srv/media/out"))
///     .temp_dir(PathBuf::from("/tmp/composer"))
///     .per_profile_job_load(0.25)
///     .build();
/// assert_eq!(config.per_profile_job_load, 0.25);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a builder holding the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ffmpeg_path(mut self, path: impl Into<String>) -> Self {
        self.config.ffmpeg_path = path.into();
        self
    }

    pub fn transition_duration(mut self, duration: Duration) -> Self {
        self.config.transition_duration = duration;
        self
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output_dir = Some(dir);
        self
    }

    pub fn temp_dir(mut self, dir: PathBuf) -> Self {
        self.config.temp_dir = Some(dir);
        self
    }

    pub fn per_profile_job_load(mut self, load: f32) -> Self {
        self.config.per_profile_job_load = load;
        self
    }

    pub fn process_smil_job_load(mut self, load: f32) -> Self {
        self.config.process_smil_job_load = load;
        self
    }

    pub fn process_smil_job_load_max(mut self, load: f32) -> Self {
        self.config.process_smil_job_load_max = load;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> CoreConfig {
        self.config
    }
}
