// ============================================================================
// composer-core/src/graph/aggregate.rs
// ============================================================================
//
// OUTPUT AGGREGATION: One Filtered Stream, Many Encoded Outputs
//
// A multi-profile run decodes and filters its input once and encodes it
// once per profile. The aggregator rewrites each profile's command template
// so it can live in a single ffmpeg invocation:
//
//   -vf / -filter:v and -af / -filter:a   move into the filter graph
//   -i <file>                             dropped, inputs are mapped already
//   -c:x copy                             dropped when splitting
//   -filter_complex / -lavfi              rejected (UnsupportedGraph)
//
// With more than one profile the shared pads are split:
//
//   [ov]split=2[ov00][ov1];[ov00]scale=640:-2[ov0]
//   -map [ov0] ... low.mp4  -map [ov1] ... high.mp4
//
// A group profile (`adaptive.type = HLS`) turns the delivery profiles into
// variant streams of one HLS output: per-variant options get stream
// specifiers, every variant gets a bitrate and a `-var_stream_map` ties
// them together.
//
// KEY COMPONENTS:
// - OutputAggregate: split clauses, filter clauses and output groups
// - adjust_stream_option: stream specifiers for variant options
// - distribute_bitrates: fallback variant bitrates

use std::path::PathBuf;

use super::{pad, strip_stream_brackets};
use crate::error::{CoreError, CoreResult};
use crate::profile::EncodingProfile;
use crate::template::{self, ParameterMap};
use crate::tokenizer::{split_loose, tokenize};

/// Options that take a `:v:<n>` stream specifier in variant streams.
const MAPPABLE_OPTIONS: &[&str] = &[
    "-bf",
    "-b_strategy",
    "-bitrate",
    "-bufsize",
    "-crf",
    "-f",
    "-flags",
    "-force_key_frames",
    "-g",
    "-level",
    "-keyint",
    "-keyint_min",
    "-maxrate",
    "-minrate",
    "-pix_fmt",
    "-preset",
    "-profile",
    "-r",
    "-refs",
    "-s",
    "-sc_threshold",
    "-tune",
    "-x264opts",
    "-x264-params",
];

const VIDEO_MIN_BITRATE_KEY: &str = "video.bitrates.mink";
const VIDEO_MAX_BITRATE_KEY: &str = "video.bitrates.maxk";
const AUDIO_MIN_BITRATE_KEY: &str = "audio.bitrates.mink";
const AUDIO_MAX_BITRATE_KEY: &str = "audio.bitrates.maxk";
const DEFAULT_VIDEO_BITRATES_K: (u32, u32) = (100, 4000);
const DEFAULT_AUDIO_BITRATES_K: (u32, u32) = (32, 160);

/// What one delivery profile contributes after rewriting.
#[derive(Debug, Default)]
struct ProfileCommand {
    /// Whether any output options survived the rewrite
    active: bool,
    video_filter: Option<String>,
    audio_filter: Option<String>,
    options: Vec<String>,
    output: Option<PathBuf>,
    video_bitrate: Option<String>,
    audio_bitrate: Option<String>,
}

/// Result of aggregating profiles over one pair of input pads.
#[derive(Debug, Clone, Default)]
pub struct OutputAggregate {
    video_split: Option<String>,
    audio_split: Option<String>,
    video_filters: Vec<String>,
    audio_filters: Vec<String>,
    output_args: Vec<String>,
    outputs: Vec<Option<PathBuf>>,
    profile_ids: Vec<String>,
    segment_suffixes: Vec<String>,
    adaptive: bool,
}

impl OutputAggregate {
    /// Aggregates `profiles` reading from `video_pad` / `audio_pad`.
    ///
    /// `params` holds the shared substitution values; `out.name.base` is the
    /// base name that every output gets a fresh unique suffix appended to.
    pub fn build(
        profiles: &[&EncodingProfile],
        params: &ParameterMap,
        video_pad: Option<&str>,
        audio_pad: Option<&str>,
    ) -> CoreResult<Self> {
        if video_pad.is_none() && audio_pad.is_none() {
            return Err(CoreError::MissingStream(
                "at least one of video or audio input must be specified".to_string(),
            ));
        }

        let mut delivery = Vec::with_capacity(profiles.len());
        let mut group = None;
        for &profile in profiles {
            match profile.adaptive_type() {
                None => delivery.push(profile),
                Some(kind) if kind.eq_ignore_ascii_case("HLS") => group = Some(profile),
                Some(kind) => {
                    return Err(CoreError::UnsupportedGraph(format!(
                        "profile '{}' requests adaptive type '{kind}', only HLS is supported",
                        profile.identifier
                    )));
                }
            }
        }
        if delivery.is_empty() {
            return Err(CoreError::InvalidInput(
                "at least one delivery encoding profile is required".to_string(),
            ));
        }

        let mut aggregate = OutputAggregate {
            adaptive: group.is_some(),
            profile_ids: delivery.iter().map(|p| p.identifier.clone()).collect(),
            ..Default::default()
        };

        let drop_copy = delivery.len() > 1;
        let mut commands = Vec::with_capacity(delivery.len());
        let mut active = 0;
        for profile in &delivery {
            let mut command = match group {
                Some(_) => {
                    aggregate
                        .segment_suffixes
                        .push(template::substitute(profile.suffix.as_deref().unwrap_or_default(), params));
                    variant_command(profile, params, drop_copy, active)?
                }
                None => delivery_command(profile, params, drop_copy)?,
            };
            command.active = !command.options.is_empty();
            if command.active {
                active += 1;
            } else {
                log::debug!(
                    "Profile '{}' produces no output options, leaving its slot empty",
                    profile.identifier
                );
            }
            commands.push(command);
        }
        if active == 0 {
            return Err(CoreError::InvalidInput(
                "none of the encoding profiles produces an output".to_string(),
            ));
        }

        aggregate.wire(&mut commands, video_pad, audio_pad, active);

        if let Some(group) = group {
            aggregate.add_variant_stream_map(group, params, &commands, video_pad.is_some(), audio_pad.is_some())?;
        }

        Ok(aggregate)
    }

    /// Connects each active profile to the input pads and emits its output group.
    fn wire(
        &mut self,
        commands: &mut [ProfileCommand],
        video_pad: Option<&str>,
        audio_pad: Option<&str>,
        active: usize,
    ) {
        let mut video_split = video_pad.filter(|_| active > 1).map(|p| format!("{p}split={active}"));
        let mut audio_split = audio_pad.filter(|_| active > 1).map(|p| format!("{p}asplit={active}"));

        let mut index = 0;
        for (slot, command) in commands.iter_mut().enumerate() {
            if !command.active {
                self.outputs.push(None);
                continue;
            }

            if let Some(input) = video_pad {
                let map = wire_stream(
                    input,
                    command.video_filter.take(),
                    "ov",
                    index,
                    active,
                    video_split.as_mut(),
                    &mut self.video_filters,
                );
                self.output_args.extend(["-map".to_string(), map]);
            } else if command.video_filter.is_some() {
                log::debug!("Ignoring video filter of profile '{}' without video", self.profile_ids[slot]);
            }

            if let Some(input) = audio_pad {
                let map = wire_stream(
                    input,
                    command.audio_filter.take(),
                    "oa",
                    index,
                    active,
                    audio_split.as_mut(),
                    &mut self.audio_filters,
                );
                self.output_args.extend(["-map".to_string(), map]);
            } else if command.audio_filter.is_some() {
                log::debug!("Ignoring audio filter of profile '{}' without audio", self.profile_ids[slot]);
            }

            self.output_args.append(&mut command.options);
            self.outputs.push(if self.adaptive { None } else { command.output.take() });
            index += 1;
        }

        self.video_split = video_split;
        self.audio_split = audio_split;
    }

    /// Appends the trailing HLS output group.
    fn add_variant_stream_map(
        &mut self,
        group: &EncodingProfile,
        params: &ParameterMap,
        commands: &[ProfileCommand],
        has_video: bool,
        has_audio: bool,
    ) -> CoreResult<()> {
        let mut group_params = params.clone();
        if !group_params.contains_key("out.name") {
            if let Some(base) = params.get("out.name.base") {
                group_params.insert("out.name".to_string(), base.clone());
            }
        }
        let suffix = template::substitute(group.suffix.as_deref().unwrap_or_default(), &group_params);
        group_params.insert("out.suffix".to_string(), suffix);
        let group_tokens = substituted_tokens(split_loose(group.require_command()?), &group_params);

        let variants: Vec<&ProfileCommand> = commands.iter().filter(|c| c.active).collect();
        let count = variants.len();

        let video_bitrates = resolve_bitrates(
            variants.iter().map(|c| c.video_bitrate.clone()).collect(),
            group,
            (VIDEO_MIN_BITRATE_KEY, VIDEO_MAX_BITRATE_KEY),
            DEFAULT_VIDEO_BITRATES_K,
        );
        let audio_bitrates = resolve_bitrates(
            variants.iter().map(|c| c.audio_bitrate.clone()).collect(),
            group,
            (AUDIO_MIN_BITRATE_KEY, AUDIO_MAX_BITRATE_KEY),
            DEFAULT_AUDIO_BITRATES_K,
        );

        let mut stream_map = Vec::with_capacity(count);
        for index in 0..count {
            let mut streams = Vec::with_capacity(2);
            if has_video {
                self.output_args.push(format!("-b:v:{index}"));
                self.output_args.push(video_bitrates[index].clone());
                streams.push(format!("v:{index}"));
            }
            if has_audio {
                self.output_args.push(format!("-b:a:{index}"));
                self.output_args.push(audio_bitrates[index].clone());
                streams.push(format!("a:{index}"));
            }
            stream_map.push(streams.join(","));
        }
        self.output_args.push("-var_stream_map".to_string());
        self.output_args.push(stream_map.join(" "));
        self.output_args.extend(group_tokens);
        Ok(())
    }

    /// Filter clauses in graph order: audio split and filters, then video.
    pub fn filter_clauses(&self) -> Vec<String> {
        self.audio_split
            .iter()
            .chain(self.audio_filters.iter())
            .chain(self.video_split.iter())
            .chain(self.video_filters.iter())
            .cloned()
            .collect()
    }

    pub fn video_split(&self) -> Option<&str> {
        self.video_split.as_deref()
    }

    pub fn audio_split(&self) -> Option<&str> {
        self.audio_split.as_deref()
    }

    pub fn video_filters(&self) -> &[String] {
        &self.video_filters
    }

    pub fn audio_filters(&self) -> &[String] {
        &self.audio_filters
    }

    /// Output tokens: `-map` directives and options per profile, in order.
    pub fn output_args(&self) -> &[String] {
        &self.output_args
    }

    /// Expected output file per delivery profile, in submission order.
    pub fn outputs(&self) -> &[Option<PathBuf>] {
        &self.outputs
    }

    pub fn profile_ids(&self) -> &[String] {
        &self.profile_ids
    }

    /// Substituted suffix per delivery profile; only set for HLS groups.
    pub fn segment_suffixes(&self) -> &[String] {
        &self.segment_suffixes
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }
}

/// Wires one stream kind of one profile and returns the pad to `-map`.
fn wire_stream(
    input: &str,
    filter: Option<String>,
    prefix: &str,
    index: usize,
    active: usize,
    split: Option<&mut String>,
    clauses: &mut Vec<String>,
) -> String {
    let out = pad(&format!("{prefix}{index}"));
    match (split, filter) {
        (None, Some(filter)) => {
            clauses.push(format!("{input}{filter}{out}"));
            out
        }
        (None, None) if active == 1 => strip_stream_brackets(input),
        (None, None) => out,
        (Some(split), Some(filter)) => {
            let split_out = pad(&format!("{prefix}0{index}"));
            split.push_str(&split_out);
            clauses.push(format!("{split_out}{filter}{out}"));
            out
        }
        (Some(split), None) => {
            split.push_str(&out);
            out
        }
    }
}

/// Rewrites a delivery profile for a plain multi-output run.
fn delivery_command(profile: &EncodingProfile, params: &ParameterMap, drop_copy: bool) -> CoreResult<ProfileCommand> {
    let mut params = params.clone();
    let base = params
        .get("out.name.base")
        .or_else(|| params.get("out.name"))
        .cloned()
        .unwrap_or_else(|| "output".to_string());
    params.insert("out.name".to_string(), format!("{base}_{}", uuid::Uuid::new_v4()));
    let suffix = template::substitute(profile.suffix.as_deref().unwrap_or_default(), &params);
    params.insert("out.suffix".to_string(), suffix);

    let tokens = substituted_tokens(tokenize(profile.require_command()?)?, &params);
    let mut command = extract(profile, &tokens, drop_copy, None)?;
    if !command.options.is_empty() {
        command.output = tokens.last().and_then(|last| output_file(last));
    }
    Ok(command)
}

/// Rewrites a delivery profile as variant `index` of an HLS group.
fn variant_command(
    profile: &EncodingProfile,
    params: &ParameterMap,
    drop_copy: bool,
    index: usize,
) -> CoreResult<ProfileCommand> {
    let mut params = params.clone();
    // output names come from the group profile
    for key in ["out.dir", "out.name", "out.suffix"] {
        params.remove(key);
    }
    let tokens = tokenize(profile.require_command()?)?
        .into_iter()
        .filter(|token| !token.contains("#{out.name}"));
    let tokens = substituted_tokens(tokens, &params);
    extract(profile, &tokens, drop_copy, Some(index))
}

/// Substitutes each template token on its own, so a value with spaces or
/// quotes stays one argument. Tokens that resolve to nothing are dropped.
fn substituted_tokens(tokens: impl IntoIterator<Item = String>, params: &ParameterMap) -> Vec<String> {
    tokens
        .into_iter()
        .map(|token| template::substitute(&token, params))
        .filter(|token| !token.trim().is_empty())
        .collect()
}

/// Sorts a profile's tokens into filters, bitrates and kept options.
/// `variant` is the variant index when rewriting for an HLS group.
fn extract(
    profile: &EncodingProfile,
    tokens: &[String],
    drop_copy: bool,
    variant: Option<usize>,
) -> CoreResult<ProfileCommand> {
    let mut command = ProfileCommand::default();
    let mut maxrate = None;
    let value_of = |i: usize| -> CoreResult<String> {
        tokens.get(i + 1).cloned().ok_or_else(|| {
            CoreError::Template(format!(
                "option '{}' of profile '{}' has no value",
                tokens[i], profile.identifier
            ))
        })
    };
    let keep = |opt: &str| match variant {
        Some(index) if opt.starts_with('-') => adjust_stream_option(opt, index),
        _ => opt.to_string(),
    };

    let mut i = 0;
    while i < tokens.len() {
        let opt = tokens[i].as_str();
        if opt.starts_with("-filter_complex") || opt.starts_with("-lavfi") {
            return Err(CoreError::UnsupportedGraph(format!(
                "profile '{}' uses {opt}; only simple -vf/-af filters can be combined with other outputs",
                profile.identifier
            )));
        } else if opt.starts_with("-vf") || opt.starts_with("-filter:v") {
            command.video_filter = Some(value_of(i)?.replace('"', ""));
            i += 1;
        } else if opt.starts_with("-af") || opt.starts_with("-filter:a") {
            command.audio_filter = Some(value_of(i)?.replace('"', ""));
            i += 1;
        } else if opt == "-i" {
            i += 1;
        } else if is_codec_option(opt) {
            let codec = value_of(i)?;
            if !(drop_copy && codec.contains("copy")) {
                let opt = match variant {
                    Some(_) if opt.starts_with("-codec:") || opt.contains("-vcodec") => "-c:v",
                    Some(_) if opt.contains("-acodec") => "-c:a",
                    _ => opt,
                };
                command.options.push(keep(opt));
                command.options.push(codec);
            }
            i += 1;
        } else if variant.is_some() && (opt.starts_with("-b:v") || opt == "-vb" || opt == "-bitrate") {
            command.video_bitrate = Some(value_of(i)?);
            i += 1;
        } else if variant.is_some() && (opt.starts_with("-b:a") || opt == "-ab") {
            command.audio_bitrate = Some(value_of(i)?);
            i += 1;
        } else if variant.is_some() && opt.starts_with("-maxrate") {
            let rate = value_of(i)?;
            command.options.push(keep(opt));
            command.options.push(rate.clone());
            maxrate = Some(rate);
            i += 1;
        } else {
            command.options.push(keep(opt));
        }
        i += 1;
    }

    if command.video_bitrate.is_none() {
        command.video_bitrate = maxrate;
    }
    Ok(command)
}

fn is_codec_option(opt: &str) -> bool {
    opt.starts_with("-c:") || opt.starts_with("-codec:") || opt.contains("-vcodec") || opt.contains("-acodec")
}

/// The last token of a profile as an output file; null sinks and pipes
/// produce no file.
pub(crate) fn output_file(token: &str) -> Option<PathBuf> {
    let is_sink = matches!(token, "-" | "NUL" | "/dev/null") || token.starts_with("pipe:") || token.starts_with('-');
    (!is_sink).then(|| PathBuf::from(token))
}

/// Adds a stream specifier for variant `index`: `-c:v` -> `-c:v:1`,
/// `-crf` -> `-crf:v:1`. Other options are returned unchanged.
pub fn adjust_stream_option(option: &str, index: usize) -> String {
    if option.ends_with(":v") || option.ends_with(":a") {
        format!("{option}:{index}")
    } else if MAPPABLE_OPTIONS.contains(&option) {
        format!("{option}:v:{index}")
    } else {
        option.to_string()
    }
}

/// `count` bitrates falling geometrically from `max_k` to `min_k`.
pub fn distribute_bitrates(count: usize, min_k: u32, max_k: u32) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    let (min, max) = (f64::from(min_k.min(max_k)), f64::from(max_k.max(min_k)));
    let factor = if count > 1 {
        (min / max).powf(1.0 / (count - 1) as f64)
    } else {
        1.0
    };
    (0..count)
        .map(|i| format!("{}k", (max * factor.powi(i as i32)).round() as u64))
        .collect()
}

/// Keeps the given bitrates when every variant has one; otherwise replaces
/// all of them with a distribution from the group profile's limits.
fn resolve_bitrates(
    given: Vec<Option<String>>,
    group: &EncodingProfile,
    (min_key, max_key): (&str, &str),
    (default_min, default_max): (u32, u32),
) -> Vec<String> {
    if given.iter().all(Option::is_some) {
        return given.into_iter().flatten().collect();
    }
    let limit = |key: &str, default: u32| {
        group
            .extension(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    };
    distribute_bitrates(given.len(), limit(min_key, default_min), limit(max_key, default_max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pad_names;
    use crate::profile::MediaKind;
    use std::collections::HashSet;

    fn profile(id: &str, command: &str) -> EncodingProfile {
        EncodingProfile::new(id, MediaKind::Visual, MediaKind::Visual, command)
    }

    fn params() -> ParameterMap {
        ParameterMap::from([
            ("out.dir".to_string(), "/out".to_string()),
            ("out.name.base".to_string(), "talk".to_string()),
            ("in.video.path".to_string(), "/in/talk.mp4".to_string()),
        ])
    }

    #[test]
    fn test_single_profile_without_filter_maps_raw_streams() {
        let p = profile("mp4", "-i #{in.video.path} -c:v libx264 -c:a aac #{out.dir}/#{out.name}.mp4");
        let agg = OutputAggregate::build(&[&p], &params(), Some("[0:v]"), Some("[0:a]")).unwrap();

        assert!(agg.filter_clauses().is_empty());
        let args = agg.output_args();
        assert_eq!(&args[..4], &["-map", "0:v", "-map", "0:a"]);
        assert_eq!(&args[4..8], &["-c:v", "libx264", "-c:a", "aac"]);
        let output = agg.outputs()[0].as_ref().unwrap();
        assert!(output.to_string_lossy().starts_with("/out/talk_"));
        assert!(output.to_string_lossy().ends_with(".mp4"));
    }

    #[test]
    fn test_single_profile_with_filters() {
        let p = profile("small", "-vf scale=640:-2 -af \"volume=2\" -c:v libx264 #{out.dir}/#{out.name}.mp4");
        let agg = OutputAggregate::build(&[&p], &params(), Some("[ov]"), Some("[oa]")).unwrap();

        assert_eq!(agg.video_split(), None);
        assert_eq!(
            agg.filter_clauses(),
            vec!["[oa]volume=2[oa0]", "[ov]scale=640:-2[ov0]"]
        );
        assert_eq!(&agg.output_args()[..4], &["-map", "[ov0]", "-map", "[oa0]"]);
    }

    #[test]
    fn test_split_with_mixed_filters() {
        let low = profile("low", "-vf scale=640:-2 -c:v libx264 #{out.dir}/#{out.name}-low.mp4");
        let high = profile("high", "-c:v libx264 -c:a copy #{out.dir}/#{out.name}-high.mp4");
        let agg = OutputAggregate::build(&[&low, &high], &params(), Some("[ov]"), Some("[oa]")).unwrap();

        assert_eq!(agg.video_split(), Some("[ov]split=2[ov00][ov1]"));
        assert_eq!(agg.audio_split(), Some("[oa]asplit=2[oa0][oa1]"));
        assert_eq!(agg.video_filters(), &["[ov00]scale=640:-2[ov0]".to_string()]);
        assert!(agg.audio_filters().is_empty());

        let args = agg.output_args().join(" ");
        assert!(args.starts_with("-map [ov0] -map [oa0] -c:v libx264 /out/talk_"));
        assert!(args.contains("-low.mp4 -map [ov1] -map [oa1] -c:v libx264 /out/talk_"));
        assert!(!args.contains("copy"));
    }

    #[test]
    fn test_outputs_get_distinct_names() {
        let a = profile("a", "-c:v libx264 #{out.dir}/#{out.name}.mp4");
        let b = profile("b", "-c:v libx264 #{out.dir}/#{out.name}.mp4");
        let agg = OutputAggregate::build(&[&a, &b], &params(), Some("[0:v]"), None).unwrap();
        assert_ne!(agg.outputs()[0], agg.outputs()[1]);
    }

    #[test]
    fn test_split_pads_are_unique() {
        for count in [1usize, 2, 26, 27] {
            let profiles: Vec<EncodingProfile> = (0..count)
                .map(|i| {
                    let filter = if i % 2 == 0 { "-vf scale=320:-2 " } else { "" };
                    profile(&format!("p{i}"), &format!("{filter}-c:v libx264 #{{out.dir}}/#{{out.name}}.mp4"))
                })
                .collect();
            let refs: Vec<&EncodingProfile> = profiles.iter().collect();
            let agg = OutputAggregate::build(&refs, &params(), Some("[ov]"), None).unwrap();

            let mapped: Vec<&String> = agg
                .output_args()
                .windows(2)
                .filter(|w| w[0] == "-map")
                .map(|w| &w[1])
                .collect();
            let unique: HashSet<&String> = mapped.iter().copied().collect();
            assert_eq!(unique.len(), count);

            if let Some(split) = agg.video_split() {
                let split_outputs = pad_names(split);
                let unique: HashSet<&String> = split_outputs[1..].iter().collect();
                assert_eq!(unique.len(), count);
            }

            let graph = agg.filter_clauses().join(";");
            let produced: Vec<String> = graph
                .split(';')
                .flat_map(|clause| {
                    let names = pad_names(clause);
                    names.into_iter().skip(1).collect::<Vec<_>>()
                })
                .collect();
            let unique: HashSet<&String> = produced.iter().collect();
            assert_eq!(unique.len(), produced.len());
        }
    }

    #[test]
    fn test_profile_without_output_keeps_its_slot() {
        let a = profile("a", "-c:v libx264 #{out.dir}/#{out.name}-a.mp4");
        let b = profile("b", "-i #{in.video.path} #{unset}");
        let c = profile("c", "-c:v libx264 #{out.dir}/#{out.name}-c.mp4");
        let agg = OutputAggregate::build(&[&a, &b, &c], &params(), Some("[ov]"), None).unwrap();

        let outputs = agg.outputs();
        assert_eq!(outputs.len(), 3);
        assert!(outputs[0].as_ref().unwrap().to_string_lossy().ends_with("-a.mp4"));
        assert!(outputs[1].is_none());
        assert!(outputs[2].as_ref().unwrap().to_string_lossy().ends_with("-c.mp4"));
        assert_eq!(agg.video_split(), Some("[ov]split=2[ov0][ov1]"));
    }

    #[test]
    fn test_null_sink_has_no_output_file() {
        let sink = profile("sink", "-f null -");
        let agg = OutputAggregate::build(&[&sink], &params(), Some("[0:v]"), None).unwrap();
        assert_eq!(agg.outputs(), &[None]);
        assert_eq!(agg.output_args(), &["-map", "0:v", "-f", "null", "-"]);
    }

    #[test]
    fn test_complex_filter_is_rejected() {
        let nested = profile("nested", "-filter_complex [0:v]scale=640:-2[v] -map [v] out.mp4");
        let plain = profile("plain", "-c:v libx264 out.mp4");
        let err = OutputAggregate::build(&[&nested, &plain], &params(), Some("[ov]"), Some("[oa]")).unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedGraph(_)));

        let lavfi = profile("lavfi", "-lavfi null out.mp4");
        assert!(OutputAggregate::build(&[&plain, &lavfi], &params(), Some("[ov]"), None).is_err());
    }

    #[test]
    fn test_no_streams_and_unknown_adaptive_type() {
        let p = profile("p", "-c:v libx264 out.mp4");
        assert!(matches!(
            OutputAggregate::build(&[&p], &params(), None, None),
            Err(CoreError::MissingStream(_))
        ));

        let dash = profile("dash", "-f dash out.mpd").with_extension("adaptive.type", "DASH");
        assert!(matches!(
            OutputAggregate::build(&[&p, &dash], &params(), Some("[ov]"), None),
            Err(CoreError::UnsupportedGraph(_))
        ));
    }

    #[test]
    fn test_hls_group() {
        let low = profile("low", "-c:v libx264 -crf 28 -b:v 800k -b:a 96k -vf scale=-2:360 #{out.dir}/#{out.name}#{out.suffix}")
            .with_suffix("-low.mp4");
        let high = profile("high", "-vcodec libx264 -preset fast -maxrate 3000k #{out.dir}/#{out.name}#{out.suffix}")
            .with_suffix("-high.mp4");
        let hls = profile("hls", "-f hls -hls_time 6 -master_pl_name master.m3u8 #{out.dir}/#{out.name}_%v#{out.suffix}")
            .with_suffix(".m3u8")
            .with_extension("adaptive.type", "hls");

        let agg = OutputAggregate::build(&[&low, &high, &hls], &params(), Some("[ov]"), Some("[oa]")).unwrap();
        assert!(agg.is_adaptive());
        assert_eq!(agg.outputs(), &[None, None]);
        assert_eq!(agg.segment_suffixes(), &["-low.mp4".to_string(), "-high.mp4".to_string()]);

        let args = agg.output_args().join(" ");
        assert!(args.starts_with("-map [ov0] -map [oa0] -c:v:0 libx264 -crf:v:0 28"));
        assert!(args.contains("-map [ov1] -map [oa1] -c:v:1 libx264 -preset:v:1 fast -maxrate:v:1 3000k"));
        assert!(!args.contains("-low.mp4"));
        // audio bitrate missing for `high`, so both audio bitrates are distributed
        assert!(args.contains("-b:v:0 800k -b:a:0 160k -b:v:1 3000k -b:a:1 32k"));
        assert!(args.contains("-var_stream_map v:0,a:0 v:1,a:1 -f hls -hls_time 6"));
        assert!(args.ends_with("/out/talk_%v.m3u8"));
    }

    #[test]
    fn test_substituted_values_stay_single_tokens() {
        let params = ParameterMap::from([
            ("out.dir".to_string(), "/media/Spring Term".to_string()),
            ("out.name.base".to_string(), "it's here".to_string()),
            ("in.video.path".to_string(), "/in/it's here.mp4".to_string()),
        ]);
        let mp4 = profile("mp4", "-i #{in.video.path} -c:v libx264 #{out.dir}/#{out.name}.mp4");
        let agg = OutputAggregate::build(&[&mp4], &params, Some("[0:v]"), None).unwrap();
        let output = agg.outputs()[0].as_ref().unwrap().to_string_lossy().into_owned();
        assert!(output.starts_with("/media/Spring Term/it's here_"));
        assert_eq!(agg.output_args().last(), Some(&output));

        let hls = profile("hls", "-f hls #{out.dir}/#{out.name}_%v.m3u8").with_extension("adaptive.type", "HLS");
        let agg = OutputAggregate::build(&[&mp4, &hls], &params, Some("[0:v]"), None).unwrap();
        assert_eq!(
            agg.output_args().last().map(String::as_str),
            Some("/media/Spring Term/it's here_%v.m3u8")
        );
    }

    #[test]
    fn test_adjust_stream_option() {
        assert_eq!(adjust_stream_option("-c:v", 1), "-c:v:1");
        assert_eq!(adjust_stream_option("-c:a", 0), "-c:a:0");
        assert_eq!(adjust_stream_option("-crf", 2), "-crf:v:2");
        assert_eq!(adjust_stream_option("-movflags", 2), "-movflags");
    }

    #[test]
    fn test_distribute_bitrates() {
        assert_eq!(distribute_bitrates(1, 100, 4000), vec!["4000k"]);
        assert_eq!(distribute_bitrates(2, 32, 160), vec!["160k", "32k"]);
        assert_eq!(distribute_bitrates(3, 100, 400), vec!["400k", "200k", "100k"]);
        assert!(distribute_bitrates(0, 1, 2).is_empty());
    }
}
