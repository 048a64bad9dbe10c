// composer-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use composer_core::{Dimension, Layout};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "Composer: ffmpeg filter-graph compiler",
    long_about = "Compiles encoding profiles, multi-clip edits, composites and concatenations \
                  into a single ffmpeg command and runs it via composer-core."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Profile files or directories (.json / .properties); repeatable
    #[arg(long = "profiles", global = true, value_name = "PATH", env = "COMPOSER_PROFILES", value_delimiter = ',')]
    pub profile_paths: Vec<PathBuf>,

    /// Directory for output files (defaults to the directory of the first input)
    #[arg(short = 'o', long = "output-dir", global = true, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path of the ffmpeg binary
    #[arg(long = "ffmpeg", global = true, value_name = "PATH")]
    pub ffmpeg_path: Option<String>,

    /// Optional: Directory for a per-run log file
    #[arg(short, long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print the compiled command instead of running it
    #[arg(long, global = true, default_value_t = false)]
    pub dry_run: bool,

    /// Print results as JSON
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Encodes one file with one profile
    Encode(EncodeArgs),
    /// Cuts a section out of a file
    Trim(TrimArgs),
    /// Extracts still images at the given times
    Image(ImageArgs),
    /// Combines the video of one file with the audio of another
    Mux(MuxArgs),
    /// Encodes a file with a profile that overlays a watermark image
    Watermark(WatermarkArgs),
    /// Encodes one file with several profiles in a single run
    MultiEncode(MultiEncodeArgs),
    /// Cuts clips out of one or more files, joins them and encodes them with several profiles
    Edit(EditArgs),
    /// Places one or two tracks (and a watermark) into one output frame
    Composite(CompositeArgs),
    /// Joins files end to end
    Concat(ConcatArgs),
    /// Lists the loaded encoding profiles
    Profiles,
    /// Prints the streams of a media file
    Probe(ProbeArgs),
}

/// Which streams the inputs carry.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamsArg {
    /// Audio and video
    Av,
    /// Video only
    Video,
    /// Audio only
    Audio,
}

impl StreamsArg {
    pub fn flags(self) -> (bool, bool) {
        match self {
            StreamsArg::Av => (true, true),
            StreamsArg::Video => (true, false),
            StreamsArg::Audio => (false, true),
        }
    }
}

/// Options shared by every single-profile command.
#[derive(Args, Debug, Clone)]
pub struct ProfileArgs {
    /// Encoding profile id
    #[arg(short = 'p', long = "profile", required = true, value_name = "ID")]
    pub profile: String,

    /// Extra template property (`key=value`); repeatable
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Input media file
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct TrimArgs {
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Start of the section in milliseconds
    #[arg(long, value_name = "MS")]
    pub start: u64,

    /// Length of the section in milliseconds
    #[arg(long, value_name = "MS")]
    pub duration: u64,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct ImageArgs {
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Times in seconds (e.g. 1.5,30); one image without times
    #[arg(short = 't', long = "times", value_delimiter = ',', value_name = "SECONDS")]
    pub times: Vec<f64>,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct MuxArgs {
    /// File providing the video stream
    #[arg(long, required = true, value_name = "PATH")]
    pub video: PathBuf,

    /// File providing the audio stream
    #[arg(long, required = true, value_name = "PATH")]
    pub audio: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct WatermarkArgs {
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Watermark image
    #[arg(long, required = true, value_name = "PATH")]
    pub image: PathBuf,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct MultiEncodeArgs {
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,

    /// Encoding profile ids, in output order
    #[arg(short = 'p', long = "profile", required = true, value_delimiter = ',', value_name = "ID")]
    pub profiles: Vec<String>,

    /// Streams of the input; probed with ffprobe when omitted
    #[arg(long, value_enum, value_name = "STREAMS")]
    pub streams: Option<StreamsArg>,
}

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Input media files; clips refer to them by position
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub inputs: Vec<PathBuf>,

    /// Flat `track,start_ms,duration_ms` triplets (e.g. 0,10000,3000,0,14000,2000)
    #[arg(short = 'e', long = "edits", value_delimiter = ',', value_name = "TRIPLETS")]
    pub edits: Option<Vec<u64>>,

    /// Transition duration in milliseconds
    #[arg(long, value_name = "MS")]
    pub transition: Option<u64>,

    /// Encoding profile ids, in output order
    #[arg(short = 'p', long = "profile", required = true, value_delimiter = ',', value_name = "ID")]
    pub profiles: Vec<String>,

    /// Streams of the inputs; probed from the first input when omitted
    #[arg(long, value_enum, value_name = "STREAMS")]
    pub streams: Option<StreamsArg>,
}

#[derive(Args, Debug)]
pub struct CompositeArgs {
    /// Output frame size
    #[arg(long, value_name = "WxH", value_parser = parse_dimension)]
    pub size: Dimension,

    /// Lower (background) track
    #[arg(long, required = true, value_name = "PATH")]
    pub lower: PathBuf,

    /// Placement of the lower track
    #[arg(long, value_name = "WxH+X+Y", value_parser = parse_layout)]
    pub lower_layout: Layout,

    /// Upper track drawn over the lower one
    #[arg(long, value_name = "PATH", requires = "upper_layout")]
    pub upper: Option<PathBuf>,

    /// Placement of the upper track
    #[arg(long, value_name = "WxH+X+Y", value_parser = parse_layout)]
    pub upper_layout: Option<Layout>,

    /// Watermark image
    #[arg(long, value_name = "PATH", requires = "watermark_layout")]
    pub watermark: Option<PathBuf>,

    /// Placement of the watermark
    #[arg(long, value_name = "WxH+X+Y", value_parser = parse_layout)]
    pub watermark_layout: Option<Layout>,

    /// Pad color around the lower track
    #[arg(long, default_value = "black", value_name = "COLOR")]
    pub background: String,

    /// Streams of the tracks; probed with ffprobe when omitted
    #[arg(long, value_enum, value_name = "STREAMS")]
    pub streams: Option<StreamsArg>,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct ConcatArgs {
    /// Input media files, in playback order
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub inputs: Vec<PathBuf>,

    /// Output frame size
    #[arg(long, value_name = "WxH", value_parser = parse_dimension)]
    pub size: Option<Dimension>,

    /// Output frame rate
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Join without re-encoding through the concat demuxer
    #[arg(long, default_value_t = false)]
    pub same_codec: bool,

    /// Streams of every input; each input is probed when omitted
    #[arg(long, value_enum, value_name = "STREAMS")]
    pub streams: Option<StreamsArg>,

    #[command(flatten)]
    pub profile: ProfileArgs,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(short = 'i', long = "input", required = true, value_name = "INPUT_PATH")]
    pub input: PathBuf,
}

// --- Value Parsers ---

fn parse_property(value: &str) -> Result<(String, String), String> {
    let (key, value) = value
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{value}'"))?;
    if key.trim().is_empty() {
        return Err("property key is empty".to_string());
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn parse_dimension(value: &str) -> Result<Dimension, String> {
    Dimension::parse(value).map_err(|e| e.to_string())
}

/// `WxH+X+Y`, offsets optional.
fn parse_layout(value: &str) -> Result<Layout, String> {
    let mut parts = value.split('+');
    let dimension = parse_dimension(parts.next().unwrap_or_default())?;
    let mut offset = || -> Result<i32, String> {
        parts
            .next()
            .map_or(Ok(0), |v| v.parse().map_err(|_| format!("invalid offset in layout '{value}'")))
    };
    let (x, y) = (offset()?, offset()?);
    Ok(Layout::new(x, y, dimension.width, dimension.height))
}
