//! Scale/pad/overlay command fragment for picture-in-picture composites.
//!
//! The fragment is spliced into a profile template through the
//! `ffmpeg.command.compositeCommand` parameter. Input 0 is the lower track,
//! input 1 (added by the fragment) the upper one.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimension {
    pub width: u32,
    pub height: u32,
}

impl Dimension {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Parses `WIDTHxHEIGHT`.
    pub fn parse(value: &str) -> CoreResult<Self> {
        let (w, h) = value
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| CoreError::InvalidInput(format!("expected WIDTHxHEIGHT, got '{value}'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| CoreError::InvalidInput(format!("invalid dimension '{value}'")))
        };
        Ok(Self::new(parse(w)?, parse(h)?))
    }

    fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Position and size of one element inside the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Layout {
    pub offset: Point,
    pub dimension: Dimension,
}

impl Layout {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            offset: Point { x, y },
            dimension: Dimension::new(width, height),
        }
    }

    fn position(&self) -> String {
        format!("{}:{}", self.offset.x, self.offset.y)
    }

    fn scale(&self) -> String {
        format!("{}:{}", self.dimension.width, self.dimension.height)
    }
}

/// A video track placed in the output frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaidOutTrack {
    pub path: PathBuf,
    pub layout: Layout,
    pub has_audio: bool,
}

/// A still image placed over the composite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Watermark {
    pub path: PathBuf,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRequest {
    /// Size of the output frame
    pub output: Dimension,
    pub lower: LaidOutTrack,
    pub upper: Option<LaidOutTrack>,
    pub watermark: Option<Watermark>,
    /// ffmpeg color of the padded background
    pub background: String,
}

/// Builds the composite fragment.
///
/// Audio is only routed in the two-track case: both tracks with audio are
/// mixed, otherwise the one with audio is mapped, otherwise video only. A
/// single track keeps ffmpeg's default stream selection.
pub fn build_composite_command(request: &CompositeRequest) -> CoreResult<String> {
    if request.output.is_empty() {
        return Err(CoreError::MissingStream("composite output dimension is empty".to_string()));
    }
    let tracks = std::iter::once(("lower", &request.lower)).chain(request.upper.iter().map(|t| ("upper", t)));
    for (name, track) in tracks {
        if track.layout.dimension.is_empty() {
            return Err(CoreError::MissingStream(format!("{name} track has no layout dimension")));
        }
    }

    let video_id = if request.watermark.is_some() { "[video]" } else { "[out]" };
    let lower = &request.lower.layout;
    let pad_lower = format!(
        "{}:{}:{}:{}",
        request.output.width,
        request.output.height,
        lower.position(),
        request.background
    );

    let mut cmd = match &request.upper {
        None => format!("-filter:v [in]scale={},pad={pad_lower}{video_id}", lower.scale()),
        Some(upper) => format!(
            "-i {} -filter_complex [0:v]scale={},pad={pad_lower}[lower];[1:v]scale={}[upper];[lower][upper]overlay={}{video_id}",
            quote_path(&upper.path),
            lower.scale(),
            upper.layout.scale(),
            upper.layout.position(),
        ),
    };

    if let Some(watermark) = &request.watermark {
        cmd.push_str(&format!(
            ";movie={}[watermark];{video_id}[watermark]overlay={}[out]",
            watermark.path.display(),
            watermark.layout.position()
        ));
    }

    if let Some(upper) = &request.upper {
        let audio = match (request.lower.has_audio, upper.has_audio) {
            (true, true) => ";[0:a][1:a]amix=inputs=2[aout] -map [out] -map [aout]",
            (true, false) => " -map [out] -map 0:a",
            (false, true) => " -map [out] -map 1:a",
            (false, false) => " -map [out]",
        };
        cmd.push_str(audio);
    }

    log::debug!("Composite command: {cmd}");
    Ok(cmd)
}

/// Quotes a path for the command tokenizer when it contains whitespace.
pub(crate) fn quote_path(path: &std::path::Path) -> String {
    let text = path.display().to_string();
    if text.chars().any(char::is_whitespace) {
        format!("'{text}'")
    } else {
        text
    }
}
