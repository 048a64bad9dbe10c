//! Runs a compiled command and collects the files it wrote.
//!
//! The encoder's combined output is read event by event until the stream
//! ends. Each line is logged at a level chosen from its content, and lines
//! announcing output files are remembered. When the process fails, every
//! file it announced is deleted before the error is returned.

use std::path::{Path, PathBuf};

use ffmpeg_sidecar::event::FfmpegEvent;
use once_cell::sync::Lazy;
use regex::Regex;

use super::ffmpeg_executor::{FfmpegProcess, FfmpegSpawner, ProcessRegistry, exit_error, to_ffmpeg_command};
use crate::command::CompiledCommand;
use crate::error::CoreResult;

static OUTPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Output #\d+, (\S+?),? to '(.*)':").unwrap());

static HLS_OUTPUT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Opening '([^']+?)(?:\.tmp)?' for writing").unwrap());

const TRACE_PREFIXES: &[&str] = &["ffmpeg version", "configuration", "lib", "size=", "frame=", "built with"];

const DEBUG_PREFIXES: &[&str] = &[
    "artist",
    "compatible_brands",
    "copyright",
    "creation_time",
    "description",
    "composer",
    "date",
    "duration",
    "encoder",
    "handler_name",
    "input #",
    "last message repeated",
    "major_brand",
    "metadata",
    "minor_version",
    "output #",
    "program",
    "side data:",
    "stream #",
    "stream mapping",
    "title",
    "video:",
    "[libx264 @ ",
    "press [",
];

/// Log level assigned to one line of encoder output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Trace,
    Debug,
    Info,
}

pub fn classify_line(line: &str) -> LineClass {
    let lower = line.to_lowercase();
    if TRACE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        LineClass::Trace
    } else if line.starts_with("[hls @ ") || DEBUG_PREFIXES.iter().any(|p| lower.starts_with(p)) {
        LineClass::Debug
    } else {
        LineClass::Info
    }
}

/// Targets that never correspond to a file on disk.
pub fn is_null_sink(path: &str) -> bool {
    path == "NUL" || path == "/dev/null" || path == "-" || path.starts_with("pipe:")
}

/// Collects announced output files, in announcement order without repeats.
#[derive(Debug, Default)]
pub struct OutputCollector {
    files: Vec<PathBuf>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspects one line of encoder output.
    pub fn observe(&mut self, line: &str) {
        if line.starts_with("Output #") {
            if let Some(caps) = OUTPUT_PATTERN.captures(line) {
                let format = &caps[1];
                let path = &caps[2];
                if !is_null_sink(path) {
                    log::info!("Identified output file {path}");
                    // playlists are picked up from the hls lines instead
                    if !format.starts_with("hls") {
                        self.push(PathBuf::from(path));
                    }
                }
            }
        } else if line.starts_with("[hls @ ") {
            if let Some(caps) = HLS_OUTPUT_PATTERN.captures(line) {
                let path = &caps[1];
                if !is_null_sink(path) {
                    self.push(PathBuf::from(path));
                }
            }
        }
    }

    fn push(&mut self, path: PathBuf) {
        if !self.files.contains(&path) {
            self.files.push(path);
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn into_files(self) -> Vec<PathBuf> {
        self.files
    }
}

/// Text of an encoder event, if it carries a log line.
fn event_line(event: &FfmpegEvent) -> Option<&str> {
    match event {
        FfmpegEvent::Log(_, line) | FfmpegEvent::Error(line) => Some(line),
        FfmpegEvent::ParsedOutput(output) => Some(&output.raw_log_message),
        FfmpegEvent::ParsedVersion(version) => Some(&version.raw_log_message),
        FfmpegEvent::ParsedConfiguration(config) => Some(&config.raw_log_message),
        FfmpegEvent::ParsedInput(input) => Some(&input.raw_log_message),
        FfmpegEvent::Progress(progress) => Some(&progress.raw_log_message),
        _ => None,
    }
}

/// Strips the `[info] `-style level tag ffmpeg adds with `-loglevel level+...`.
fn strip_level_tag(line: &str) -> &str {
    const LEVELS: &[&str] = &["[info] ", "[warning] ", "[error] ", "[fatal] ", "[verbose] ", "[debug] "];
    LEVELS
        .iter()
        .find_map(|tag| line.strip_prefix(tag))
        .unwrap_or(line)
}

/// Deletes files written by a failed run.
pub fn remove_outputs(files: &[PathBuf]) {
    for file in files {
        if file.is_file() {
            match std::fs::remove_file(file) {
                Ok(()) => log::warn!("Removed output file of failed encoding process: {}", file.display()),
                Err(e) => log::warn!("Could not delete {}: {e}", file.display()),
            }
        }
    }
}

/// Spawns `command`, streams its output and waits for it to exit.
///
/// Returns the output files the encoder announced. The process is tracked in
/// `registry` while it runs.
pub fn run_command<S: FfmpegSpawner>(
    spawner: &S,
    registry: &ProcessRegistry,
    command: &CompiledCommand,
) -> CoreResult<Vec<PathBuf>> {
    log::info!("Executing encoding command: {command}");

    let mut process = spawner.spawn(to_ffmpeg_command(command))?;
    let id = process.terminator().map(|t| registry.register(t));

    let mut collector = OutputCollector::new();
    let mut captured = Vec::new();
    let events = process.handle_events(|event| {
        if let Some(raw) = event_line(&event) {
            let line = strip_level_tag(raw.trim());
            if !line.is_empty() {
                match classify_line(line) {
                    LineClass::Trace => log::trace!("{line}"),
                    LineClass::Debug => log::debug!("{line}"),
                    LineClass::Info => log::info!("{line}"),
                }
                collector.observe(line);
                captured.push(line.to_string());
            }
        }
        Ok(())
    });
    let status = match events {
        Ok(()) => process.wait(),
        Err(e) => {
            log::warn!("Lost encoder output, stopping the process: {e}");
            if let Err(kill) = process.kill() {
                log::warn!("Could not kill encoder process: {kill}");
            }
            if let Err(wait) = process.wait() {
                log::warn!("Could not reap encoder process: {wait}");
            }
            Err(e)
        }
    };

    if let Some(id) = id {
        registry.unregister(id);
    }

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            remove_outputs(collector.files());
            return Err(e);
        }
    };
    if !status.success() {
        log::warn!("Encoder exited abnormally with {status}");
        remove_outputs(collector.files());
        return Err(exit_error(command, status, captured.join("\n")));
    }

    let files = collector.into_files();
    log::info!("Encoding finished with {} output file(s)", files.len());
    Ok(files)
}

/// Maps the files a run produced onto the command's per-profile slots.
///
/// A slot stays empty when its expected file was not produced. Adaptive
/// commands return every produced file instead, since HLS writes many.
pub fn assign_output_slots(command: &CompiledCommand, produced: Vec<PathBuf>) -> Vec<Option<PathBuf>> {
    if command.is_adaptive() {
        return produced.into_iter().map(Some).collect();
    }
    command
        .outputs()
        .iter()
        .map(|expected| {
            expected
                .as_deref()
                .filter(|path| produced.iter().any(|p| same_file(p, path)))
                .map(Path::to_path_buf)
        })
        .collect()
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || matches!((a.canonicalize(), b.canonicalize()), (Ok(x), Ok(y)) if x == y)
}
