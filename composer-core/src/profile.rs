// ============================================================================
// composer-core/src/profile.rs
// ============================================================================
//
// ENCODING PROFILES: Named, Reusable Encoding Recipes
//
// A profile names a command template (the `ffmpeg.command` extension), the
// media kinds it accepts and produces, and the output suffix(es) used to
// name its files. Profiles are immutable once loaded.
//
// Two on-disk formats are understood:
//
//   JSON, an object keyed by profile id:
//     { "h264-low": { "name": "low quality", "input": "visual",
//                     "output": "visual", "suffix": "-low.mp4",
//                     "ffmpeg.command": "-i #{in.video.path} ..." } }
//
//   Properties, one `profile.<id>.<key> = <value>` per line:
//     profile.h264-low.name = low quality
//     profile.h264-low.ffmpeg.command = -i #{in.video.path} \
//         -c:v libx264 #{out.dir}/#{out.name}#{out.suffix}
//
// KEY COMPONENTS:
// - MediaKind: what a profile reads or writes
// - EncodingProfile: one profile
// - ProfileRegistry: profiles by id, loaded from files or strings

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::template::CMD_SUFFIX;

/// Extension key marking a group profile (HLS only).
pub const ADAPTIVE_TYPE_KEY: &str = "adaptive.type";

const DEFAULT_JOB_LOAD: f32 = 1.0;

/// Kind of media a profile accepts or produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaKind {
    Audio,
    Visual,
    AudioVisual,
    Stream,
    EnhancedAudio,
    Image,
    ImageSequence,
    Cover,
    Nothing,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio",
            MediaKind::Visual => "Visual",
            MediaKind::AudioVisual => "AudioVisual",
            MediaKind::Stream => "Stream",
            MediaKind::EnhancedAudio => "EnhancedAudio",
            MediaKind::Image => "Image",
            MediaKind::ImageSequence => "ImageSequence",
            MediaKind::Cover => "Cover",
            MediaKind::Nothing => "Nothing",
        }
    }

    /// Kind of a source from its stream flags.
    pub fn from_streams(has_video: bool, has_audio: bool) -> Self {
        match (has_video, has_audio) {
            (true, true) => MediaKind::AudioVisual,
            (true, false) => MediaKind::Visual,
            (false, true) => MediaKind::Audio,
            (false, false) => MediaKind::Nothing,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "audio" => MediaKind::Audio,
            "visual" => MediaKind::Visual,
            "audiovisual" => MediaKind::AudioVisual,
            "stream" => MediaKind::Stream,
            "enhancedaudio" => MediaKind::EnhancedAudio,
            "image" => MediaKind::Image,
            "imagesequence" => MediaKind::ImageSequence,
            "cover" => MediaKind::Cover,
            "nothing" => MediaKind::Nothing,
            other => {
                return Err(CoreError::ProfileParse(format!("unknown media kind '{other}'")));
            }
        };
        Ok(kind)
    }
}

impl TryFrom<String> for MediaKind {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MediaKind> for String {
    fn from(kind: MediaKind) -> Self {
        kind.as_str().to_string()
    }
}

/// A named encoding recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodingProfile {
    /// Profile id; filled from the registry key when loading
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub name: String,
    /// Media kind the profile can be applied to
    pub input: MediaKind,
    /// Media kind the profile produces
    pub output: MediaKind,
    /// Output suffix template, e.g. `-#{in.video.name}.mp4`
    #[serde(default)]
    pub suffix: Option<String>,
    /// Additional suffixes per tag, exposed as `out.suffix.<tag>`
    #[serde(default, rename = "suffixes")]
    pub tagged_suffixes: BTreeMap<String, String>,
    #[serde(default, rename = "mimetype")]
    pub mime_type: Option<String>,
    #[serde(default = "default_job_load", rename = "jobload")]
    pub job_load: f32,
    /// Every other key, notably `ffmpeg.command` and `ffmpeg.command.*`
    #[serde(flatten)]
    pub extensions: BTreeMap<String, String>,
}

fn default_job_load() -> f32 {
    DEFAULT_JOB_LOAD
}

impl EncodingProfile {
    /// A profile with the given template and nothing else set.
    pub fn new(identifier: impl Into<String>, input: MediaKind, output: MediaKind, command: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            name: identifier.clone(),
            identifier,
            input,
            output,
            suffix: None,
            tagged_suffixes: BTreeMap::new(),
            mime_type: None,
            job_load: DEFAULT_JOB_LOAD,
            extensions: BTreeMap::from([(CMD_SUFFIX.to_string(), command.into())]),
        }
    }

    #[must_use]
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }

    /// The command template, if the profile has one.
    pub fn command(&self) -> Option<&str> {
        self.extension(CMD_SUFFIX)
    }

    /// The command template, or an error naming the profile.
    pub fn require_command(&self) -> CoreResult<&str> {
        self.command().ok_or_else(|| {
            CoreError::Template(format!(
                "profile '{}' has no {CMD_SUFFIX} template",
                self.identifier
            ))
        })
    }

    /// Value of `adaptive.type` for group profiles.
    pub fn adaptive_type(&self) -> Option<&str> {
        self.extension(ADAPTIVE_TYPE_KEY)
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tagged_suffixes.keys().map(String::as_str)
    }

    /// Whether a source of `kind` can be processed with this profile.
    pub fn is_applicable_to(&self, kind: MediaKind) -> bool {
        self.input == kind
            || (kind == MediaKind::AudioVisual
                && matches!(self.input, MediaKind::Audio | MediaKind::Visual))
    }
}

/// Profiles keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, EncodingProfile>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: EncodingProfile) {
        self.profiles.insert(profile.identifier.clone(), profile);
    }

    pub fn get(&self, id: &str) -> CoreResult<&EncodingProfile> {
        self.profiles
            .get(id)
            .ok_or_else(|| CoreError::ProfileNotFound(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Loads a profile file; `.json` files are JSON, anything else properties.
    pub fn load_file(&mut self, path: &Path) -> CoreResult<usize> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let count = if is_json {
            self.load_json_str(&content)?
        } else {
            self.load_properties_str(&content)?
        };
        log::debug!("Loaded {count} encoding profile(s) from {}", path.display());
        Ok(count)
    }

    /// Loads every `.json` and `.properties` file of a directory.
    pub fn load_dir(&mut self, dir: &Path) -> CoreResult<usize> {
        let mut entries: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| matches!(ext, "json" | "properties"))
            })
            .collect();
        entries.sort();

        let mut count = 0;
        for path in entries {
            count += self.load_file(&path)?;
        }
        Ok(count)
    }

    /// Loads profiles from a JSON object keyed by profile id.
    pub fn load_json_str(&mut self, json: &str) -> CoreResult<usize> {
        let parsed: BTreeMap<String, EncodingProfile> = serde_json::from_str(json)
            .map_err(|e| CoreError::ProfileParse(format!("invalid profile JSON: {e}")))?;
        let count = parsed.len();
        for (id, mut profile) in parsed {
            if profile.name.is_empty() {
                profile.name = id.clone();
            }
            profile.identifier = id;
            self.insert(profile);
        }
        Ok(count)
    }

    /// Loads profiles from `profile.<id>.<key> = <value>` lines.
    ///
    /// Profiles are discovered through their `.name` key. Keys are assigned
    /// to the longest matching profile id, so ids may contain dots.
    pub fn load_properties_str(&mut self, content: &str) -> CoreResult<usize> {
        let properties = parse_properties(content);

        let mut ids: Vec<String> = properties
            .keys()
            .filter_map(|key| key.strip_prefix("profile."))
            .filter_map(|rest| rest.strip_suffix(".name"))
            .map(str::to_string)
            .collect();
        // longest first so `a.b` wins over `a`
        ids.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut grouped: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
        for (key, value) in &properties {
            let Some(rest) = key.strip_prefix("profile.") else {
                continue;
            };
            let owner = ids.iter().find_map(|id| {
                rest.strip_prefix(id.as_str())
                    .and_then(|r| r.strip_prefix('.'))
                    .map(|attribute| (id.as_str(), attribute))
            });
            match owner {
                Some((id, attribute)) => {
                    grouped.entry(id).or_default().insert(attribute, value.as_str());
                }
                None => log::warn!("Ignoring property '{key}' without a profile name"),
            }
        }

        let count = grouped.len();
        for (id, attributes) in grouped {
            let profile = profile_from_attributes(id, &attributes)?;
            self.insert(profile);
        }
        Ok(count)
    }

    /// Resolves `ids` (all profiles when empty) and keeps those applicable
    /// to a source of `kind`, in the requested order.
    pub fn find_suitable_profiles(&self, ids: &[String], kind: MediaKind) -> CoreResult<Vec<&EncodingProfile>> {
        let candidates: Vec<&EncodingProfile> = if ids.is_empty() {
            self.profiles.values().collect()
        } else {
            ids.iter().map(|id| self.get(id)).collect::<CoreResult<_>>()?
        };
        Ok(candidates
            .into_iter()
            .filter(|profile| {
                let ok = profile.is_applicable_to(kind);
                if !ok {
                    log::debug!(
                        "Profile '{}' ({} input) is not applicable to {kind} media",
                        profile.identifier,
                        profile.input
                    );
                }
                ok
            })
            .collect())
    }
}

fn profile_from_attributes(id: &str, attributes: &BTreeMap<&str, &str>) -> CoreResult<EncodingProfile> {
    let required_kind = |key: &str| -> CoreResult<MediaKind> {
        attributes
            .get(key)
            .ok_or_else(|| CoreError::ProfileParse(format!("profile '{id}' is missing '{key}'")))?
            .parse()
    };

    let mut profile = EncodingProfile {
        identifier: id.to_string(),
        name: attributes.get("name").map(|s| s.to_string()).unwrap_or_else(|| id.to_string()),
        input: required_kind("input")?,
        output: required_kind("output")?,
        suffix: None,
        tagged_suffixes: BTreeMap::new(),
        mime_type: None,
        job_load: DEFAULT_JOB_LOAD,
        extensions: BTreeMap::new(),
    };

    for (&key, &value) in attributes {
        match key {
            "name" | "input" | "output" => {}
            "suffix" => profile.suffix = Some(value.to_string()),
            "mimetype" => profile.mime_type = Some(value.to_string()),
            "jobload" => {
                profile.job_load = value.parse().map_err(|_| {
                    CoreError::ProfileParse(format!("profile '{id}' has invalid jobload '{value}'"))
                })?;
            }
            _ => match key.strip_prefix("suffix.") {
                Some(tag) => {
                    profile.tagged_suffixes.insert(tag.to_string(), value.to_string());
                }
                None => {
                    profile.extensions.insert(key.to_string(), value.to_string());
                }
            },
        }
    }
    Ok(profile)
}

/// Minimal `.properties` reader: `#`/`!` comments, `=` or `:` separators and
/// trailing-backslash line continuations.
fn parse_properties(content: &str) -> BTreeMap<String, String> {
    let mut properties = BTreeMap::new();
    let mut logical = String::new();

    for raw in content.lines() {
        let line = if logical.is_empty() { raw.trim() } else { raw.trim_start() };
        if logical.is_empty() && (line.is_empty() || line.starts_with('#') || line.starts_with('!')) {
            continue;
        }

        let trailing_backslashes = line.chars().rev().take_while(|&c| c == '\\').count();
        if trailing_backslashes % 2 == 1 {
            logical.push_str(&line[..line.len() - 1]);
            continue;
        }
        logical.push_str(line);

        let entry = std::mem::take(&mut logical);
        if let Some(pos) = entry.find(['=', ':']) {
            let key = entry[..pos].trim();
            let value = entry[pos + 1..].trim();
            if !key.is_empty() {
                properties.insert(key.to_string(), value.to_string());
            }
        }
    }
    properties
}
