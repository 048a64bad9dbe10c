//! Post-processing of HLS output.
//!
//! The encoder names variant segment files after a shared template, so after
//! an adaptive run each segment file is renamed with the suffix of the
//! profile that produced it and every playlist is rewritten to point at the
//! new names.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::CoreResult;
use crate::template::base_name;

static URI_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"URI="([^"]+)""#).unwrap());

/// Whether `path` is an HLS playlist (`.m3u8`).
pub fn is_playlist(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("m3u8"))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Rewrites the file references of one playlist through `names` (old file
/// name to new file name). Unknown references are left alone.
pub fn rewrite_references(playlist: &str, names: &HashMap<String, String>) -> String {
    let mut rewritten = String::with_capacity(playlist.len());
    for line in playlist.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            // blank lines are kept as-is
        } else if line.starts_with('#') {
            if line.starts_with("#EXT-X-MAP:") || line.starts_with("#EXT-X-MEDIA:") {
                match URI_PATTERN.captures(line).and_then(|c| {
                    let uri = c.get(1)?.as_str();
                    names.get(uri).map(|new| (uri, new))
                }) {
                    Some((uri, new)) => rewritten.push_str(&line.replacen(uri, new, 1)),
                    None => rewritten.push_str(line),
                }
            } else {
                rewritten.push_str(line);
            }
        } else if let Some(new) = names.get(trimmed) {
            rewritten.push_str(new);
        } else {
            let path = Path::new(trimmed);
            match names.get(&file_name(path)) {
                Some(new) => match path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    Some(parent) => rewritten.push_str(&parent.join(new).to_string_lossy()),
                    None => rewritten.push_str(new),
                },
                None => rewritten.push_str(trimmed),
            }
        }
        rewritten.push('\n');
    }
    rewritten
}

/// Renames segment files with their profile suffix and fixes the playlists.
///
/// Segments are ordered by file name, which follows the encoder's variant
/// numbering, and segment `i` receives `suffixes[i]`. Entries of `files` are
/// updated as each rename lands, so on error `files` still names what is on
/// disk.
pub fn rename_segments(files: &mut [PathBuf], suffixes: &[String]) -> CoreResult<()> {
    let mut segments: Vec<usize> = (0..files.len()).filter(|&i| !is_playlist(&files[i])).collect();
    segments.sort_by_key(|&i| file_name(&files[i]));

    let mut names: HashMap<String, String> = HashMap::new();
    for (index, suffix) in segments.into_iter().zip(suffixes) {
        let segment = &files[index];
        let parent = segment.parent().unwrap_or_else(|| Path::new(""));
        let target = parent.join(format!("{}{suffix}", base_name(segment)));
        if &target == segment {
            continue;
        }
        log::debug!("Move file from {} to {}", segment.display(), target.display());
        if target.exists() {
            std::fs::remove_file(&target)?;
        }
        std::fs::rename(segment, &target)?;
        names.insert(file_name(segment), file_name(&target));
        files[index] = target;
    }

    if !names.is_empty() {
        for playlist in files.iter().filter(|f| is_playlist(f)) {
            let content = std::fs::read_to_string(playlist)?;
            std::fs::write(playlist, rewrite_references(&content, &names))?;
        }
    }
    Ok(())
}
