//! FFprobe integration for stream discovery.
//!
//! Callers use this to learn which streams a track carries before asking for
//! a concat or composite, since both builders need the audio/video flags.

use std::path::Path;

use ffprobe::{FfProbeError, ffprobe};
use serde::Serialize;

use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use crate::graph::composite::Dimension;

/// Streams found in one media file.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StreamInfo {
    pub has_video: bool,
    pub has_audio: bool,
    /// Size of the first video stream
    pub dimension: Option<Dimension>,
    /// Container duration in seconds
    pub duration: Option<f64>,
    /// Frame rate of the first video stream
    pub frame_rate: Option<f32>,
}

/// Probes `input_path` for its audio and video streams.
pub fn probe_streams(input_path: &Path) -> CoreResult<StreamInfo> {
    log::debug!("Running ffprobe for streams on: {}", input_path.display());
    let metadata = ffprobe(input_path).map_err(|err| {
        log::error!("ffprobe failed on {}: {:?}", input_path.display(), err);
        map_ffprobe_error(err, "streams")
    })?;

    let video = metadata
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let has_audio = metadata
        .streams
        .iter()
        .any(|s| s.codec_type.as_deref() == Some("audio"));

    let dimension = match video.map(|v| (v.width, v.height)) {
        Some((Some(w), Some(h))) => {
            let width = u32::try_from(w)
                .map_err(|_| CoreError::FfprobeParse(format!("invalid width {w} in {}", input_path.display())))?;
            let height = u32::try_from(h)
                .map_err(|_| CoreError::FfprobeParse(format!("invalid height {h} in {}", input_path.display())))?;
            Some(Dimension::new(width, height))
        }
        _ => None,
    };

    let duration = metadata
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok());

    let frame_rate = video.and_then(|v| parse_frame_rate(&v.avg_frame_rate));

    Ok(StreamInfo {
        has_video: video.is_some(),
        has_audio,
        dimension,
        duration,
        frame_rate,
    })
}

/// Parses ffprobe's `num/den` rate notation.
pub fn parse_frame_rate(rate: &str) -> Option<f32> {
    let (num, den) = rate.split_once('/')?;
    let num: f32 = num.trim().parse().ok()?;
    let den: f32 = den.trim().parse().ok()?;
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => {
            CoreError::FfprobeParse(format!("ffprobe {context} output deserialization: {err}"))
        }
        _ => CoreError::FfprobeParse(format!("Unknown ffprobe error during {context}: {err:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25/1"), Some(25.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("n/a"), None);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(probe_streams(Path::new("/nonexistent/composer/input.mp4")).is_err());
    }
}
