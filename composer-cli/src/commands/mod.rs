//! Command implementations for the CLI.
//!
//! Each submodule implements one group of subcommands on top of a
//! [`Session`], which holds the loaded profiles and the engine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use composer_core::{
    CoreConfig, CoreResult, EncoderEngine, EncodingProfile, ParameterMap, ProfileRegistry, probe_streams,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;

use crate::cli::{GlobalArgs, ProfileArgs, StreamsArg};

/// Single-profile operations: encode, trim, image, mux and watermark.
pub mod encode;

/// Multi-profile operations: multi-encode and edit.
pub mod edit;

/// Composite of one or two tracks.
pub mod composite;

/// End-to-end concatenation.
pub mod concat;

/// Profile listing and media probing.
pub mod info;

/// Everything a subcommand needs to compile and run.
pub struct Session {
    pub engine: EncoderEngine,
    pub profiles: ProfileRegistry,
    pub dry_run: bool,
    pub json: bool,
}

impl Session {
    pub fn new(global: &GlobalArgs) -> Result<Self> {
        let config = build_config(global)?;
        let profiles = load_profiles(&global.profile_paths)?;
        debug!("Loaded {} encoding profile(s)", profiles.len());
        Ok(Self {
            engine: EncoderEngine::new(config),
            profiles,
            dry_run: global.dry_run,
            json: global.json,
        })
    }

    pub fn profile(&self, id: &str) -> Result<&EncodingProfile> {
        Ok(self.profiles.get(id)?)
    }

    /// Resolves profile ids in the order given.
    pub fn profile_list(&self, ids: &[String]) -> Result<Vec<&EncodingProfile>> {
        ids.iter().map(|id| self.profile(id)).collect()
    }
}

/// Core configuration from the environment, overridden by CLI flags.
pub fn build_config(global: &GlobalArgs) -> Result<CoreConfig> {
    let mut config = CoreConfig::from_env().context("Invalid COMPOSER_* environment")?;
    if let Some(path) = &global.ffmpeg_path {
        config.ffmpeg_path = path.clone();
    }
    if let Some(dir) = &global.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory '{}'", dir.display()))?;
        config.output_dir = Some(dir.canonicalize()?);
    }
    config.validate()?;
    Ok(config)
}

/// Loads every profile file and directory in `paths`.
pub fn load_profiles(paths: &[PathBuf]) -> Result<ProfileRegistry> {
    let mut registry = ProfileRegistry::new();
    for path in paths {
        let loaded = if path.is_dir() {
            registry.load_dir(path)
        } else {
            registry.load_file(path)
        };
        loaded.with_context(|| format!("Failed to load profiles from '{}'", path.display()))?;
    }
    Ok(registry)
}

/// Template properties given with `--set`.
pub fn properties(args: &ProfileArgs) -> ParameterMap {
    args.properties.iter().cloned().collect()
}

/// Stream flags of `input`: taken from `--streams`, otherwise probed.
pub fn streams_of(input: &Path, streams: Option<StreamsArg>) -> Result<(bool, bool)> {
    if let Some(streams) = streams {
        return Ok(streams.flags());
    }
    let info = probe_streams(input).with_context(|| format!("Failed to probe '{}'", input.display()))?;
    debug!(
        "Probed {}: video={}, audio={}",
        input.display(),
        info.has_video,
        info.has_audio
    );
    Ok((info.has_video, info.has_audio))
}

/// Checks that an input file exists before anything is compiled.
pub fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("Invalid input path '{}': not a file", path.display());
    }
    Ok(())
}

/// Runs `job` behind a spinner.
pub fn with_spinner<T>(message: &str, job: impl FnOnce() -> CoreResult<T>) -> Result<T> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    let result = job();
    pb.finish_and_clear();
    Ok(result?)
}
