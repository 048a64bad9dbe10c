// ============================================================================
// composer-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with the Encoder and Prober Binaries
//
// This module encapsulates everything that leaves the process: spawning the
// encoder, reading its output, tracking live processes and probing media
// files. The compiler modules never depend on it.
//
// KEY COMPONENTS:
// - ffmpeg_executor: spawner/process traits, ffmpeg-sidecar implementation,
//   process registry
// - runner: runs a CompiledCommand, classifies log lines, discovers outputs
// - ffprobe_executor: stream discovery through the ffprobe crate
//
// DESIGN PHILOSOPHY:
// Consumers (and tests) can provide their own FfmpegSpawner so no real
// encoder is needed to exercise the engine.

/// Contains traits and implementations for executing encoder commands
pub mod ffmpeg_executor;

/// Contains stream probing through ffprobe
pub mod ffprobe_executor;

/// Runs compiled commands and collects their output files
pub mod runner;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    FfmpegProcess, FfmpegSpawner, ProcessRegistry, SidecarProcess, SidecarSpawner, Terminate,
};
pub use ffprobe_executor::{StreamInfo, probe_streams};
pub use runner::run_command;
