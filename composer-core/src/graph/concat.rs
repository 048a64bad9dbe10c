//! End-to-end concatenation of heterogeneous inputs.
//!
//! Every video input is scaled to fit the output frame, centered on a
//! padded canvas and given the output aspect ratio so the `concat` filter
//! sees identical streams. Inputs without audio get a generated silent
//! stream when any other input has audio.

use std::path::PathBuf;

use super::composite::{Dimension, quote_path};
use super::{letter_pad, pad, stream_pad};
use crate::error::{CoreError, CoreResult};

/// One concat input and the streams it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatInput {
    pub path: PathBuf,
    pub has_video: bool,
    pub has_audio: bool,
}

impl ConcatInput {
    pub fn new(path: impl Into<PathBuf>, has_video: bool, has_audio: bool) -> Self {
        Self {
            path: path.into(),
            has_video,
            has_audio,
        }
    }
}

/// Checks the input list shared by every concat mode.
pub fn validate_concat_inputs(inputs: &[ConcatInput]) -> CoreResult<()> {
    if inputs.len() < 2 {
        return Err(CoreError::InvalidInput(format!(
            "concat needs at least two tracks, got {}",
            inputs.len()
        )));
    }
    if let Some(input) = inputs.iter().find(|i| !i.has_video && !i.has_audio) {
        return Err(CoreError::MissingStream(format!(
            "track has no audio or video stream: {}",
            input.path.display()
        )));
    }
    Ok(())
}

/// Builds the `-i ... -filter_complex ... -map ...` fragment.
///
/// When no input has video, only audio is concatenated. Otherwise
/// `dimension` is required and `frame_rate` optionally normalizes the
/// frame rate first.
pub fn build_concat_command(
    inputs: &[ConcatInput],
    dimension: Option<Dimension>,
    frame_rate: Option<f32>,
) -> CoreResult<String> {
    validate_concat_inputs(inputs)?;

    let only_audio = inputs.iter().all(|i| !i.has_video);
    let mut cmd = String::new();
    for input in inputs {
        cmd.push_str(&format!("-i {} ", quote_path(&input.path)));
    }
    cmd.push_str("-filter_complex ");

    let mut has_audio = false;
    if !only_audio {
        let Dimension { width, height } = dimension.ok_or_else(|| {
            CoreError::MissingStream("an output dimension is required to concatenate video".to_string())
        })?;
        let fps = match frame_rate {
            Some(rate) if rate > 0.0 => format!("fps=fps={rate:.6},"),
            _ => String::new(),
        };
        let aspect = width as f32 / height as f32;
        for (i, input) in inputs.iter().enumerate() {
            cmd.push_str(&format!(
                "{input_pad}{fps}scale=iw*min({width}/iw\\,{height}/ih):ih*min({width}/iw\\,{height}/ih),\
                 pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,setdar={aspect:?}{out};",
                input_pad = stream_pad(i, 'v'),
                out = pad(&letter_pad(i)),
            ));
            has_audio |= input.has_audio;
        }
        if has_audio {
            for (i, input) in inputs.iter().enumerate() {
                if !input.has_audio {
                    cmd.push_str(&format!("aevalsrc=0::d=1[silent{}];", i + 1));
                }
            }
        }
    }

    for (i, input) in inputs.iter().enumerate() {
        if !only_audio {
            cmd.push_str(&pad(&letter_pad(i)));
        }
        if input.has_audio {
            cmd.push_str(&stream_pad(i, 'a'));
        } else if has_audio {
            cmd.push_str(&format!("[silent{}]", i + 1));
        }
    }

    cmd.push_str(&format!("concat=n={}", inputs.len()));
    match (only_audio, has_audio) {
        (true, _) => cmd.push_str(":v=0:a=1[a] -map [a]"),
        (false, true) => cmd.push_str(":v=1:a=1[v][a] -map [v] -map [a]"),
        (false, false) => cmd.push_str(":v=1:a=0[v] -map [v]"),
    }

    log::debug!("Concat command: {cmd}");
    Ok(cmd)
}

/// Contents of a concat demuxer list for same-codec concatenation.
pub fn concat_file_list(inputs: &[ConcatInput]) -> String {
    inputs
        .iter()
        .map(|input| {
            // single quotes inside the path are closed, escaped and reopened
            let path = input.path.display().to_string().replace('\'', r"'\''");
            format!("file '{path}'\n")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_with_audio_backfill() {
        let inputs = [
            ConcatInput::new("/in/a.mp4", true, true),
            ConcatInput::new("/in/b.mp4", true, false),
        ];
        let cmd = build_concat_command(&inputs, Some(Dimension::new(1280, 720)), None).unwrap();
        assert_eq!(
            cmd,
            "-i /in/a.mp4 -i /in/b.mp4 -filter_complex \
             [0:v]scale=iw*min(1280/iw\\,720/ih):ih*min(1280/iw\\,720/ih),pad=1280:720:(ow-iw)/2:(oh-ih)/2,setdar=1.7777778[b];\
             [1:v]scale=iw*min(1280/iw\\,720/ih):ih*min(1280/iw\\,720/ih),pad=1280:720:(ow-iw)/2:(oh-ih)/2,setdar=1.7777778[c];\
             aevalsrc=0::d=1[silent2];\
             [b][0:a][c][silent2]concat=n=2:v=1:a=1[v][a] -map [v] -map [a]"
        );
        assert_eq!(cmd.matches("aevalsrc").count(), 1);
    }

    #[test]
    fn test_video_without_audio() {
        let inputs = [
            ConcatInput::new("/in/a.mp4", true, false),
            ConcatInput::new("/in/b.mp4", true, false),
        ];
        let cmd = build_concat_command(&inputs, Some(Dimension::new(640, 480)), Some(25.0)).unwrap();
        assert!(cmd.contains("[0:v]fps=fps=25.000000,scale="));
        assert!(cmd.contains("setdar=1.3333334[b]"));
        assert!(!cmd.contains("aevalsrc"));
        assert!(cmd.ends_with("[b][c]concat=n=2:v=1:a=0[v] -map [v]"));
    }

    #[test]
    fn test_audio_only() {
        let inputs = [
            ConcatInput::new("/in/a.mp3", false, true),
            ConcatInput::new("/in/b.mp3", false, true),
        ];
        let cmd = build_concat_command(&inputs, None, None).unwrap();
        assert_eq!(
            cmd,
            "-i /in/a.mp3 -i /in/b.mp3 -filter_complex [0:a][1:a]concat=n=2:v=0:a=1[a] -map [a]"
        );
    }

    #[test]
    fn test_many_inputs_use_wide_pads() {
        let inputs: Vec<ConcatInput> = (0..27)
            .map(|i| ConcatInput::new(format!("/in/{i}.mp4"), true, true))
            .collect();
        let cmd = build_concat_command(&inputs, Some(Dimension::new(1280, 720)), None).unwrap();
        assert!(cmd.contains("setdar=1.7777778[z];"));
        assert!(cmd.contains("setdar=1.7777778[bb];"));
        assert!(cmd.contains("[z][24:a][bb][25:a][cc][26:a]concat=n=27"));
    }

    #[test]
    fn test_invalid_inputs() {
        let one = [ConcatInput::new("/in/a.mp4", true, true)];
        assert!(matches!(
            build_concat_command(&one, Some(Dimension::new(1, 1)), None),
            Err(CoreError::InvalidInput(_))
        ));

        let empty_track = [
            ConcatInput::new("/in/a.mp4", true, true),
            ConcatInput::new("/in/b.dat", false, false),
        ];
        assert!(matches!(
            build_concat_command(&empty_track, Some(Dimension::new(1, 1)), None),
            Err(CoreError::MissingStream(_))
        ));

        let video = [
            ConcatInput::new("/in/a.mp4", true, true),
            ConcatInput::new("/in/b.mp4", true, true),
        ];
        assert!(matches!(
            build_concat_command(&video, None, None),
            Err(CoreError::MissingStream(_))
        ));
    }

    #[test]
    fn test_concat_file_list() {
        let inputs = [
            ConcatInput::new("/in/a.mp4", true, true),
            ConcatInput::new("/in/it's.mp4", true, true),
        ];
        assert_eq!(
            concat_file_list(&inputs),
            "file '/in/a.mp4'\nfile '/in/it'\\''s.mp4'\n"
        );
    }
}
