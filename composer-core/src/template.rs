// ============================================================================
// composer-core/src/template.rs
// ============================================================================
//
// TEMPLATE SUBSTITUTION: `#{key}` Placeholders in Profile Commands
//
// Encoding profiles carry command templates such as
// `-i #{in.video.path} -c:v libx264 #{out.dir}/#{out.name}#{out.suffix}`.
// This module resolves those placeholders against a ParameterMap.
//
// Placeholders whose key is not in the map are deleted, not reported. Profiles
// rely on this to express optional fragments, so it must stay that way.
//
// KEY COMPONENTS:
// - ParameterMap: key/value parameters for one compilation
// - substitute: one-pass placeholder resolution
// - expand_command_fragments: splices `ffmpeg.command.<name>` values
// - fill_input_params: the `in.<role>.*` facts of an input file
// - Fixed decimal formatters for timing values

use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::CoreResult;

/// Parameters available to a template. Keys are case-sensitive.
pub type ParameterMap = BTreeMap<String, String>;

/// Key that always resolves to a single space.
pub const SPACE_KEY: &str = "space";

/// Extension key holding a profile's command template.
pub const CMD_SUFFIX: &str = "ffmpeg.command";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\{([^}]*)\}").unwrap());

/// Resolves every placeholder in one pass.
///
/// Known keys are replaced verbatim, `#{space}` becomes a space and every
/// other placeholder is removed. Inserted values are never scanned again, so
/// a value that itself contains `#{...}` comes through unchanged.
pub fn substitute(template: &str, params: &ParameterMap) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| resolve(&caps[1], params).unwrap_or_default())
        .into_owned()
}

fn resolve(key: &str, params: &ParameterMap) -> Option<String> {
    match params.get(key) {
        Some(value) => Some(value.clone()),
        None if key == SPACE_KEY => Some(" ".to_string()),
        None => None,
    }
}

/// Splices `ffmpeg.command.<name>` parameters into the raw command line.
///
/// Fragments are whole command snippets (`-i a.mp4 -filter_complex ...`)
/// and must be inserted before the command line is tokenized.
pub fn expand_command_fragments(commandline: &str, params: &ParameterMap) -> String {
    let prefix = format!("{CMD_SUFFIX}.");
    params
        .iter()
        .filter_map(|(key, value)| key.strip_prefix(&prefix).map(|name| (name, value)))
        .fold(commandline.to_string(), |cmd, (name, value)| {
            cmd.replace(&format!("#{{{name}}}"), value)
        })
}

// ---- Input file facts ----

static MIME_TYPES: Lazy<BTreeMap<&'static str, &'static str>> = Lazy::new(|| {
    BTreeMap::from([
        ("aac", "audio/aac"),
        ("avi", "video/x-msvideo"),
        ("flac", "audio/flac"),
        ("gif", "image/gif"),
        ("jpeg", "image/jpeg"),
        ("jpg", "image/jpeg"),
        ("m3u8", "application/x-mpegURL"),
        ("m4a", "audio/mp4"),
        ("mkv", "video/x-matroska"),
        ("mov", "video/quicktime"),
        ("mp3", "audio/mpeg"),
        ("mp4", "video/mp4"),
        ("ogg", "audio/ogg"),
        ("png", "image/png"),
        ("ts", "video/mp2t"),
        ("txt", "text/plain"),
        ("wav", "audio/wav"),
        ("webm", "video/webm"),
    ])
});

/// Best-effort MIME type from the file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| MIME_TYPES.get(ext.to_ascii_lowercase().as_str()).copied())
        .unwrap_or("application/octet-stream")
}

/// File stem as used for `*.name` parameters.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Adds `in.<role>.{path,name,suffix,filename,mimetype}` for one input.
pub fn fill_input_params(params: &mut ParameterMap, role: &str, path: &Path) -> CoreResult<()> {
    let absolute = std::path::absolute(path)?;
    let prefix = format!("in.{role}");
    params.insert(format!("{prefix}.path"), absolute.to_string_lossy().into_owned());
    params.insert(format!("{prefix}.name"), base_name(&absolute));
    params.insert(
        format!("{prefix}.suffix"),
        absolute
            .extension()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    params.insert(
        format!("{prefix}.filename"),
        absolute
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    );
    params.insert(format!("{prefix}.mimetype"), mime_type_for(&absolute).to_string());
    Ok(())
}

// ---- Fixed decimal formatting ----
// Rust formatting never uses locale separators; these pin the digit counts
// the encoder profiles were written against.

/// `00.00000`: at least two integer digits, five decimals.
pub fn format_trim_seconds(seconds: f64) -> String {
    format!("{seconds:08.5}")
}

/// `0.00000`: five decimals.
pub fn format_time_seconds(seconds: f64) -> String {
    format!("{seconds:.5}")
}

/// `0.00`: two decimals, used inside filter clauses.
pub fn format_clause_seconds(seconds: f64) -> String {
    format!("{seconds:.2}")
}
