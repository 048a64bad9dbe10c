//! Implementation of the 'concat' subcommand.

use anyhow::Result;
use composer_core::{ConcatInput, ConcatRequest};
use log::info;

use super::{Session, properties, require_file, streams_of, with_spinner};
use crate::cli::ConcatArgs;
use crate::output::{print_commands, print_files};

pub fn run_concat(session: &Session, args: &ConcatArgs) -> Result<()> {
    let mut inputs = Vec::with_capacity(args.inputs.len());
    for path in &args.inputs {
        require_file(path)?;
        let (has_video, has_audio) = streams_of(path, args.streams)?;
        inputs.push(ConcatInput::new(path, has_video, has_audio));
    }
    let request = ConcatRequest {
        inputs,
        dimension: args.size,
        frame_rate: args.fps,
        same_codec: args.same_codec,
    };
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        // the list file of a same-codec job is removed again when the job drops
        let job = session.engine.compile_concat(&request, profile, &props)?;
        return print_commands(&[job.command], session.json);
    }

    info!("Concatenating {} track(s)", request.inputs.len());
    let output = with_spinner("Concatenating", || session.engine.concat(&request, profile, &props))?;
    print_files(&[output], session.json)
}
