//! Trim, fade and concat clauses for a multi-clip edit.
//!
//! Every clip is trimmed out of its source and faded in and out over the
//! transition. The clips are then concatenated into `[ov]` / `[oa]`, which
//! is what the output aggregator reads from.

use super::segments::VideoClip;
use super::{pad, stream_pad};
use crate::template::format_clause_seconds;

/// Combined video pad of an edit.
pub const EDIT_VIDEO_PAD: &str = "[ov]";
/// Combined audio pad of an edit.
pub const EDIT_AUDIO_PAD: &str = "[oa]";

/// Builds the edit clauses in graph order.
///
/// With one clip the trim clause writes straight to `[ov]`/`[oa]`. With
/// more, clip `i` writes to `[vi]`/`[ai]` and a concat clause joins them.
/// `fade` is the fade duration in seconds; zero disables fading.
pub fn build_edit_graph(clips: &[VideoClip], fade: f64, has_video: bool, has_audio: bool) -> Vec<String> {
    let mut clauses = Vec::new();
    let single = clips.len() == 1;

    for (i, clip) in clips.iter().enumerate() {
        if has_video {
            let out = if single { EDIT_VIDEO_PAD.to_string() } else { pad(&format!("v{i}")) };
            clauses.push(trim_clause(clip, fade, 'v', &out));
        }
        if has_audio {
            let out = if single { EDIT_AUDIO_PAD.to_string() } else { pad(&format!("a{i}")) };
            clauses.push(trim_clause(clip, fade, 'a', &out));
        }
    }

    if clips.len() > 1 {
        let n = clips.len();
        if has_video {
            let inputs: String = (0..n).map(|i| pad(&format!("v{i}"))).collect();
            clauses.push(format!("{inputs}concat=n={n}:unsafe=1{EDIT_VIDEO_PAD}"));
        }
        if has_audio {
            let inputs: String = (0..n).map(|i| pad(&format!("a{i}"))).collect();
            clauses.push(format!("{inputs}concat=n={n}:v=0:a=1{EDIT_AUDIO_PAD}"));
        }
    }

    for clause in &clauses {
        log::debug!("Edit clause: {clause}");
    }
    clauses
}

fn trim_clause(clip: &VideoClip, fade: f64, kind: char, out: &str) -> String {
    // audio filters carry an `a` prefix
    let prefix = if kind == 'a' { "a" } else { "" };
    let mut clause = format!(
        "{input}{prefix}trim={start}:duration={duration},{prefix}setpts=PTS-STARTPTS",
        input = stream_pad(clip.src, kind),
        start = format_clause_seconds(clip.start),
        duration = format_clause_seconds(clip.duration),
    );
    if fade > 0.0 {
        let fade_out_start = (clip.duration - fade).max(0.0);
        let d = format_clause_seconds(fade);
        clause.push_str(&format!(
            ",{prefix}fade=t=in:st=0:d={d},{prefix}fade=t=out:st={st}:d={d}",
            st = format_clause_seconds(fade_out_start),
        ));
    }
    clause.push_str(out);
    clause
}
