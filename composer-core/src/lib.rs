//! Filter-graph compiler for ffmpeg encoding jobs.
//!
//! This crate turns declarative requests (encoding profiles with templated
//! command lines, timed clips, composite layouts, concatenations) into one
//! ffmpeg command per job and runs it.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use composer_core::{CoreConfig, EncoderEngine, ProfileRegistry, TrimConcatRequest};
//! use std::path::{Path, PathBuf};
//!
//! let config = CoreConfig::from_env().unwrap();
//! config.validate().unwrap();
//!
//! let mut profiles = ProfileRegistry::new();
//! profiles.load_dir(Path::new("/etc/composer/profiles")).unwrap();
//! let low = profiles.get("mp4-low").unwrap();
//! let high = profiles.get("mp4-high").unwrap();
//!
//! let engine = EncoderEngine::new(config);
//! let request = TrimConcatRequest::new(vec![PathBuf::from("/media/lecture.mp4")])
//!     .with_edits(vec![0, 10_000, 30_000, 0, 60_000, 45_000]);
//! let outputs = engine.multi_trim_concat(&request, &[low, high]).unwrap();
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod external;
pub mod graph;
pub mod hls;
pub mod profile;
pub mod temp_files;
pub mod template;
pub mod tokenizer;

// Re-exports for public API
pub use command::{CommandBuilder, CompiledCommand};
pub use config::{CoreConfig, CoreConfigBuilder};
pub use engine::{ConcatJob, ConcatRequest, EncoderEngine, TrimConcatRequest};
pub use error::{CoreError, CoreResult};
pub use external::{
    FfmpegProcess, FfmpegSpawner, ProcessRegistry, SidecarSpawner, StreamInfo, probe_streams,
};
pub use graph::composite::{CompositeRequest, Dimension, LaidOutTrack, Layout, Point, Watermark};
pub use graph::concat::ConcatInput;
pub use graph::segments::VideoClip;
pub use profile::{EncodingProfile, MediaKind, ProfileRegistry};
pub use template::ParameterMap;
