//! Clip list cleanup for multi-clip edits.
//!
//! Each clip is followed by a fade out and the next one starts with a fade
//! in, so clips shorter than the transition and cuts shorter than the
//! transition both produce unusable output. [`sanitize_segments`] drops the
//! former and merges across the latter.

use std::cmp::Ordering;

use crate::error::{CoreError, CoreResult};

/// A time range of one input file. Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoClip {
    /// Index into the ordered input file list
    pub src: usize,
    pub start: f64,
    pub duration: f64,
}

impl VideoClip {
    pub fn new(src: usize, start: f64, duration: f64) -> Self {
        Self {
            src,
            start,
            duration,
        }
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Moves the end point, keeping the start.
    pub fn set_end(&mut self, end: f64) {
        self.duration = end - self.start;
    }
}

impl PartialOrd for VideoClip {
    /// Clips order by source, then start time.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.src.cmp(&other.src) {
            Ordering::Equal => self.start.partial_cmp(&other.start),
            ord => Some(ord),
        }
    }
}

/// Cleans a requested clip list.
///
/// Clips are sorted by start time when they all come from the same source;
/// with several sources the requested order is kept, since their timestamps
/// are not comparable. Clips not longer than `gap` are dropped. Adjacent
/// clips of the same source whose cut (next start minus previous end) is
/// strictly smaller than `gap` are merged into one clip.
pub fn sanitize_segments(mut clips: Vec<VideoClip>, gap: f64) -> CoreResult<Vec<VideoClip>> {
    let Some(first) = clips.first() else {
        return Err(CoreError::InvalidEdit("no clips to edit".to_string()));
    };

    let single_source = clips.iter().all(|clip| clip.src == first.src);
    if single_source {
        clips.sort_by(|a, b| a.start.total_cmp(&b.start));
    }

    let mut kept = clips.into_iter().filter(|clip| clip.duration > gap);
    let Some(mut current) = kept.next() else {
        return Err(CoreError::InvalidEdit(format!(
            "every clip is shorter than the {gap}s transition"
        )));
    };

    let mut result = Vec::new();
    for next in kept {
        if next.src == current.src && next.start - current.end() < gap {
            log::debug!(
                "Merging clip at {:.2}s into clip at {:.2}s (cut shorter than {gap}s)",
                next.start,
                current.start
            );
            current.set_end(next.end());
        } else {
            result.push(current);
            current = next;
        }
    }
    result.push(current);
    Ok(result)
}
