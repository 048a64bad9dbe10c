// ============================================================================
// composer-core/src/engine.rs
// ============================================================================
//
// ENCODER ENGINE: Compile and Run Encoder Commands
//
// The engine is the entry point for every operation. Each operation first
// compiles a CompiledCommand (the `compile_*` methods, which never touch the
// encoder) and then hands it to the process runner.
//
// KEY COMPONENTS:
// - EncoderEngine: operations over a spawner, a config and a process registry
// - TrimConcatRequest: inputs, edit points and stream flags for editing
// - ConcatRequest / ConcatJob: concat inputs and the command with its list file
//
// OPERATION FLOW:
//
//   encode / trim / extract_images / watermark ─┐
//   mux / composite / concat ───────────────────┴─> process ─> runner
//   multi_encode ─> multi_trim_concat ─> sanitize ─> edit graph ─> aggregate ─> runner

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::command::{CommandBuilder, CompiledCommand};
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, command_failed_error};
use crate::external::runner::{assign_output_slots, remove_outputs, run_command};
use crate::external::{FfmpegSpawner, ProcessRegistry, SidecarSpawner};
use crate::graph::FilterGraph;
use crate::graph::aggregate::{OutputAggregate, output_file};
use crate::graph::composite::{CompositeRequest, Dimension, build_composite_command, quote_path};
use crate::graph::concat::{ConcatInput, build_concat_command, validate_concat_inputs};
use crate::graph::edit::{EDIT_AUDIO_PAD, EDIT_VIDEO_PAD, build_edit_graph};
use crate::graph::segments::{VideoClip, sanitize_segments};
use crate::hls;
use crate::profile::EncodingProfile;
use crate::temp_files::write_concat_list;
use crate::template::{
    CMD_SUFFIX, ParameterMap, base_name, expand_command_fragments, fill_input_params, format_time_seconds,
    format_trim_seconds, substitute,
};
use crate::tokenizer::tokenize;

/// Property read by trimming profiles.
pub const PROP_TRIM_START: &str = "trim.start";
pub const PROP_TRIM_DURATION: &str = "trim.duration";
/// Property read by image extraction profiles.
pub const PROP_TIME: &str = "time";
/// Property holding the watermark image path.
pub const PROP_WATERMARK: &str = "watermark";

const COMPOSITE_FRAGMENT: &str = "compositeCommand";
const CONCAT_FRAGMENT: &str = "concatCommand";

/// Inputs and edit points for [`EncoderEngine::multi_trim_concat`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrimConcatRequest {
    pub inputs: Vec<PathBuf>,
    /// Flat `(source index, start ms, duration ms)` triplets
    pub edits: Option<Vec<u64>>,
    /// Falls back to the configured transition duration
    pub transition: Option<Duration>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl TrimConcatRequest {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self {
            inputs,
            edits: None,
            transition: None,
            has_video: true,
            has_audio: true,
        }
    }

    #[must_use]
    pub fn with_edits(mut self, edits: Vec<u64>) -> Self {
        self.edits = Some(edits);
        self
    }

    #[must_use]
    pub fn with_transition(mut self, transition: Duration) -> Self {
        self.transition = Some(transition);
        self
    }

    #[must_use]
    pub fn with_streams(mut self, has_video: bool, has_audio: bool) -> Self {
        self.has_video = has_video;
        self.has_audio = has_audio;
        self
    }
}

/// Inputs for [`EncoderEngine::concat`].
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatRequest {
    pub inputs: Vec<ConcatInput>,
    /// Output frame size; required for video unless `same_codec`
    pub dimension: Option<Dimension>,
    pub frame_rate: Option<f32>,
    /// Join without re-encoding through the concat demuxer
    pub same_codec: bool,
}

/// A compiled concat command and the demuxer list it reads, if any.
///
/// The list file is deleted when the job is dropped.
#[derive(Debug)]
pub struct ConcatJob {
    pub command: CompiledCommand,
    list_file: Option<NamedTempFile>,
}

impl ConcatJob {
    pub fn list_file(&self) -> Option<&Path> {
        self.list_file.as_ref().map(NamedTempFile::path)
    }
}

/// Compiles and runs encoder commands.
#[derive(Debug)]
pub struct EncoderEngine<S: FfmpegSpawner = SidecarSpawner> {
    config: CoreConfig,
    spawner: S,
    registry: ProcessRegistry,
}

impl EncoderEngine<SidecarSpawner> {
    /// An engine that runs the real encoder binary.
    pub fn new(config: CoreConfig) -> Self {
        Self::with_spawner(config, SidecarSpawner)
    }
}

impl<S: FfmpegSpawner> EncoderEngine<S> {
    pub fn with_spawner(config: CoreConfig, spawner: S) -> Self {
        Self {
            config,
            spawner,
            registry: ProcessRegistry::new(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Registry of the encoder processes this engine is running.
    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    /// Job load of a multi-profile run with `profile_count` profiles.
    pub fn estimate_job_load(&self, profile_count: usize) -> f32 {
        self.config.estimate_job_load(profile_count)
    }

    /// Terminates every encoder process that is still running.
    pub fn close(&self) {
        self.registry.terminate_all();
    }

    fn run(&self, command: &CompiledCommand) -> CoreResult<Vec<PathBuf>> {
        run_command(&self.spawner, &self.registry, command)
    }

    fn output_dir_for(&self, input: &Path) -> CoreResult<PathBuf> {
        if let Some(dir) = &self.config.output_dir {
            return Ok(dir.clone());
        }
        let absolute = std::path::absolute(input)?;
        Ok(absolute.parent().map(Path::to_path_buf).unwrap_or_default())
    }

    // ---- Single profile operations ----

    /// Compiles `profile` over the given `(role, file)` inputs.
    pub fn compile_process(
        &self,
        sources: &[(&str, &Path)],
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        let primary = ["video", "audio"]
            .iter()
            .find_map(|role| sources.iter().find(|(r, _)| r == role))
            .or_else(|| sources.first())
            .map(|(_, path)| *path)
            .ok_or_else(|| CoreError::InvalidInput("At least one track must be specified".to_string()))?;

        let mut params = properties.clone();
        for (role, path) in sources {
            fill_input_params(&mut params, role, path)?;
        }
        params.insert(
            "out.dir".to_string(),
            self.output_dir_for(primary)?.to_string_lossy().into_owned(),
        );
        params.insert("out.name".to_string(), unique_name(&base_name(primary)));
        if let Some(suffix) = &profile.suffix {
            let suffix = substitute(suffix, &params);
            params.insert("out.suffix".to_string(), suffix);
        }
        for (tag, suffix) in &profile.tagged_suffixes {
            let suffix = substitute(suffix, &params);
            params.insert(format!("out.suffix.{tag}"), suffix);
        }

        let tokens = profile_tokens(profile, &params)?;
        let output = tokens.last().and_then(|last| output_file(last));
        let command = CommandBuilder::new(&self.config.ffmpeg_path)
            .args(["-nostdin", "-nostats"])
            .args(tokens)
            .expect_output(&profile.identifier, output)
            .build();
        log::debug!("Compiled command for profile '{}': {command}", profile.identifier);
        Ok(command)
    }

    /// Runs `profile` over the given `(role, file)` inputs and returns the
    /// files the encoder wrote.
    pub fn process(
        &self,
        sources: &[(&str, &Path)],
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<Vec<PathBuf>> {
        let command = self.compile_process(sources, profile, properties)?;
        let outputs = self.run(&command)?;
        log::info!("Tracks successfully encoded using profile '{}'", profile.identifier);
        Ok(outputs)
    }

    pub fn compile_encode(
        &self,
        source: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        self.compile_process(&[("video", source)], profile, properties)
    }

    /// Encodes one file; the profile must produce exactly one output.
    pub fn encode(&self, source: &Path, profile: &EncodingProfile, properties: &ParameterMap) -> CoreResult<PathBuf> {
        let command = self.compile_encode(source, profile, properties)?;
        single_output(&command, self.run(&command)?)
    }

    pub fn compile_trim(
        &self,
        source: &Path,
        profile: &EncodingProfile,
        start_ms: u64,
        duration_ms: u64,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        self.compile_encode(source, profile, &trim_properties(properties, start_ms, duration_ms))
    }

    /// Cuts `duration_ms` starting at `start_ms` out of `source`.
    pub fn trim(
        &self,
        source: &Path,
        profile: &EncodingProfile,
        start_ms: u64,
        duration_ms: u64,
        properties: &ParameterMap,
    ) -> CoreResult<PathBuf> {
        self.encode(source, profile, &trim_properties(properties, start_ms, duration_ms))
    }

    pub fn compile_extract_images(
        &self,
        source: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
        times: &[f64],
    ) -> CoreResult<Vec<CompiledCommand>> {
        if times.is_empty() {
            return Ok(vec![self.compile_encode(source, profile, properties)?]);
        }
        times
            .iter()
            .map(|&time| self.compile_encode(source, profile, &time_properties(properties, time)))
            .collect()
    }

    /// Extracts one image per time in seconds, or a single image when no
    /// times are given. A failure removes the images extracted so far.
    pub fn extract_images(
        &self,
        source: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
        times: &[f64],
    ) -> CoreResult<Vec<PathBuf>> {
        if times.is_empty() {
            return Ok(vec![self.encode(source, profile, properties)?]);
        }
        let mut images = Vec::with_capacity(times.len());
        for &time in times {
            match self.encode(source, profile, &time_properties(properties, time)) {
                Ok(image) => images.push(image),
                Err(e) => {
                    log::warn!("Image extraction at {time}s failed, removing {} extracted image(s)", images.len());
                    remove_outputs(&images);
                    return Err(e);
                }
            }
        }
        Ok(images)
    }

    pub fn compile_mux(
        &self,
        video: &Path,
        audio: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        self.compile_process(&[("video", video), ("audio", audio)], profile, properties)
    }

    /// Combines the video of one file with the audio of another.
    pub fn mux(
        &self,
        video: &Path,
        audio: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<PathBuf> {
        let command = self.compile_mux(video, audio, profile, properties)?;
        single_output(&command, self.run(&command)?)
    }

    pub fn compile_watermark(
        &self,
        source: &Path,
        watermark: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        let mut params = properties.clone();
        params.insert(
            PROP_WATERMARK.to_string(),
            std::path::absolute(watermark)?.to_string_lossy().into_owned(),
        );
        self.compile_encode(source, profile, &params)
    }

    /// Encodes `source` with a profile that overlays the `watermark` image.
    pub fn watermark(
        &self,
        source: &Path,
        watermark: &Path,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<PathBuf> {
        let command = self.compile_watermark(source, watermark, profile, properties)?;
        single_output(&command, self.run(&command)?)
    }

    // ---- Composite and concat ----

    pub fn compile_composite(
        &self,
        request: &CompositeRequest,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<CompiledCommand> {
        let fragment = build_composite_command(request)?;
        let mut params = properties.clone();
        params.insert(format!("{CMD_SUFFIX}.{COMPOSITE_FRAGMENT}"), fragment);

        let mut sources = vec![("video", request.lower.path.as_path())];
        if let Some(upper) = &request.upper {
            sources.push(("audio", upper.path.as_path()));
        }
        self.compile_process(&sources, profile, &params)
    }

    /// Places one or two tracks (and a watermark) into one output frame.
    pub fn composite(
        &self,
        request: &CompositeRequest,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<PathBuf> {
        let command = self.compile_composite(request, profile, properties)?;
        single_output(&command, self.run(&command)?)
    }

    pub fn compile_concat(
        &self,
        request: &ConcatRequest,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<ConcatJob> {
        validate_concat_inputs(&request.inputs)?;

        let (fragment, list_file) = if request.same_codec {
            let list = write_concat_list(&self.config, &request.inputs)?;
            (format!("-f concat -safe 0 -i {}", quote_path(list.path())), Some(list))
        } else {
            (build_concat_command(&request.inputs, request.dimension, request.frame_rate)?, None)
        };

        let mut params = properties.clone();
        params.insert(format!("{CMD_SUFFIX}.{CONCAT_FRAGMENT}"), fragment);
        let command = self.compile_encode(&request.inputs[0].path, profile, &params)?;
        Ok(ConcatJob { command, list_file })
    }

    /// Joins the inputs end to end.
    pub fn concat(
        &self,
        request: &ConcatRequest,
        profile: &EncodingProfile,
        properties: &ParameterMap,
    ) -> CoreResult<PathBuf> {
        let job = self.compile_concat(request, profile, properties)?;
        let outputs = self.run(&job.command)?;
        single_output(&job.command, outputs)
    }

    // ---- Multi-profile operations ----

    pub fn compile_multi_trim_concat(
        &self,
        request: &TrimConcatRequest,
        profiles: &[&EncodingProfile],
    ) -> CoreResult<CompiledCommand> {
        let first = request
            .inputs
            .first()
            .ok_or_else(|| CoreError::InvalidInput("At least one track must be specified".to_string()))?;
        if request.edits.is_none() && request.inputs.len() > 1 {
            return Err(CoreError::InvalidEdit(
                "If there is no editing, only one track can be specified".to_string(),
            ));
        }
        if profiles.is_empty() {
            return Err(CoreError::InvalidInput("Missing encoding profile(s)".to_string()));
        }

        let transition_ms = request
            .transition
            .unwrap_or(self.config.transition_duration)
            .as_millis() as u64;
        let clips = request
            .edits
            .as_deref()
            .map(|edits| clips_from_edits(edits, request.inputs.len(), transition_ms))
            .transpose()?;

        let (video_pad, audio_pad, edit_clauses) = match &clips {
            Some(clips) => {
                // fades are whole seconds of the transition
                let fade = (transition_ms / 1000) as f64;
                let clauses = build_edit_graph(clips, fade, request.has_video, request.has_audio);
                (EDIT_VIDEO_PAD, EDIT_AUDIO_PAD, clauses)
            }
            None => ("[0:v]", "[0:a]", Vec::new()),
        };

        let params = self.shared_params(first)?;
        let aggregate = OutputAggregate::build(
            profiles,
            &params,
            request.has_video.then_some(video_pad),
            request.has_audio.then_some(audio_pad),
        )?;

        let graph = FilterGraph::new()
            .add_clauses(edit_clauses)
            .add_clauses(aggregate.filter_clauses())
            .build();

        let mut builder = CommandBuilder::new(&self.config.ffmpeg_path).args(["-nostats", "-hide_banner"]);
        for input in &request.inputs {
            builder = builder.input(&std::path::absolute(input)?);
        }
        builder = builder
            .filter_complex(graph)
            .args(aggregate.output_args().iter().cloned())
            .segment_suffixes(aggregate.segment_suffixes().to_vec())
            .adaptive(aggregate.is_adaptive());
        for (id, output) in aggregate.profile_ids().iter().zip(aggregate.outputs()) {
            builder = builder.expect_output(id, output.clone());
        }

        let command = builder.build();
        log::debug!("Compiled multi-profile command: {command}");
        Ok(command)
    }

    /// Cuts, joins and encodes `request` once per profile in one run.
    ///
    /// Slot `n` of the result belongs to the `n`-th delivery profile and is
    /// empty when that profile wrote no file. Adaptive runs return every
    /// playlist and segment instead, with segments renamed per profile.
    pub fn multi_trim_concat(
        &self,
        request: &TrimConcatRequest,
        profiles: &[&EncodingProfile],
    ) -> CoreResult<Vec<Option<PathBuf>>> {
        let command = self.compile_multi_trim_concat(request, profiles)?;
        let mut produced = self.run(&command)?;
        if command.is_adaptive() {
            if let Err(e) = hls::rename_segments(&mut produced, command.segment_suffixes()) {
                remove_outputs(&produced);
                return Err(e);
            }
        }
        Ok(assign_output_slots(&command, produced))
    }

    pub fn compile_multi_encode(&self, source: &Path, profiles: &[&EncodingProfile]) -> CoreResult<CompiledCommand> {
        self.compile_multi_trim_concat(&TrimConcatRequest::new(vec![source.to_path_buf()]), profiles)
    }

    /// Encodes one file with several profiles in a single run.
    pub fn multi_encode(&self, source: &Path, profiles: &[&EncodingProfile]) -> CoreResult<Vec<Option<PathBuf>>> {
        self.multi_trim_concat(&TrimConcatRequest::new(vec![source.to_path_buf()]), profiles)
    }

    /// Parameters shared by every profile of a multi-profile run.
    fn shared_params(&self, first: &Path) -> CoreResult<ParameterMap> {
        let mut params = ParameterMap::new();
        fill_input_params(&mut params, "video", first)?;
        let name = base_name(first);
        params.insert("in.name".to_string(), name.clone());
        params.insert(
            "out.dir".to_string(),
            self.output_dir_for(first)?.to_string_lossy().into_owned(),
        );
        params.insert("out.name.base".to_string(), name.clone());
        params.insert("out.name".to_string(), name);
        Ok(params)
    }
}

/// `<base>_<uuid>`, unique per call.
fn unique_name(base: &str) -> String {
    format!("{base}_{}", uuid::Uuid::new_v4())
}

/// Splices command fragments, tokenizes and substitutes a profile command.
fn profile_tokens(profile: &EncodingProfile, params: &ParameterMap) -> CoreResult<Vec<String>> {
    let commandline = expand_command_fragments(profile.require_command()?, params);
    let tokens = tokenize(&commandline).map_err(|e| {
        CoreError::Template(format!("profile '{}': {e}", profile.identifier))
    })?;
    Ok(tokens
        .iter()
        .map(|token| substitute(token, params))
        .filter(|token| !token.trim().is_empty())
        .collect())
}

fn trim_properties(properties: &ParameterMap, start_ms: u64, duration_ms: u64) -> ParameterMap {
    let mut params = properties.clone();
    params.insert(PROP_TRIM_START.to_string(), format_trim_seconds(start_ms as f64 / 1000.0));
    params.insert(PROP_TRIM_DURATION.to_string(), format_trim_seconds(duration_ms as f64 / 1000.0));
    params
}

fn time_properties(properties: &ParameterMap, time: f64) -> ParameterMap {
    let mut params = properties.clone();
    params.insert(PROP_TIME.to_string(), format_time_seconds(time));
    params
}

/// Turns flat edit triplets into sanitized clips.
///
/// A clip taken from the first `transition` milliseconds of its source is
/// shifted by half the transition (whole seconds) to keep lip sync.
fn clips_from_edits(edits: &[u64], input_count: usize, transition_ms: u64) -> CoreResult<Vec<VideoClip>> {
    if edits.len() % 3 != 0 {
        return Err(CoreError::InvalidEdit(format!(
            "edit points come in (track, start, duration) triplets, got {} values",
            edits.len()
        )));
    }
    let clips = edits
        .chunks_exact(3)
        .map(|edit| {
            let (src, start_ms, duration_ms) = (edit[0] as usize, edit[1], edit[2]);
            if src >= input_count {
                return Err(CoreError::InvalidEdit(format!(
                    "edit references track {src} but only {input_count} track(s) were given"
                )));
            }
            let adjust = if start_ms < transition_ms { transition_ms / 2000 } else { 0 };
            Ok(VideoClip::new(
                src,
                start_ms as f64 / 1000.0 + adjust as f64,
                duration_ms as f64 / 1000.0,
            ))
        })
        .collect::<CoreResult<Vec<_>>>()?;
    sanitize_segments(clips, (transition_ms / 1000) as f64)
}

/// Unwraps the single file of an operation that must produce exactly one.
fn single_output(command: &CompiledCommand, mut outputs: Vec<PathBuf>) -> CoreResult<PathBuf> {
    if outputs.len() == 1 {
        if let Some(output) = outputs.pop() {
            return Ok(output);
        }
    }
    remove_outputs(&outputs);
    Err(command_failed_error(
        command.to_string(),
        ExitStatus::default(),
        format!("Encode expects one output file ({} found)", outputs.len()),
    ))
}
