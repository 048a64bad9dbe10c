//! Implementation of the 'composite' subcommand.

use anyhow::Result;
use composer_core::{CompositeRequest, LaidOutTrack, Watermark};

use super::{Session, properties, require_file, streams_of, with_spinner};
use crate::cli::CompositeArgs;
use crate::output::{print_commands, print_files};

/// Builds the composite request, probing each track for audio unless
/// `--streams` is given.
fn composite_request(args: &CompositeArgs) -> Result<CompositeRequest> {
    require_file(&args.lower)?;
    let (_, lower_audio) = streams_of(&args.lower, args.streams)?;

    let upper = match (&args.upper, args.upper_layout) {
        (Some(path), Some(layout)) => {
            require_file(path)?;
            let (_, has_audio) = streams_of(path, args.streams)?;
            Some(LaidOutTrack {
                path: path.clone(),
                layout,
                has_audio,
            })
        }
        _ => None,
    };

    let watermark = match (&args.watermark, args.watermark_layout) {
        (Some(path), Some(layout)) => Some(Watermark {
            path: std::path::absolute(path)?,
            layout,
        }),
        _ => None,
    };

    Ok(CompositeRequest {
        output: args.size,
        lower: LaidOutTrack {
            path: args.lower.clone(),
            layout: args.lower_layout,
            has_audio: lower_audio,
        },
        upper,
        watermark,
        background: args.background.clone(),
    })
}

pub fn run_composite(session: &Session, args: &CompositeArgs) -> Result<()> {
    let request = composite_request(args)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let command = session.engine.compile_composite(&request, profile, &props)?;
        return print_commands(&[command], session.json);
    }

    let output = with_spinner("Compositing", || session.engine.composite(&request, profile, &props))?;
    print_files(&[output], session.json)
}
