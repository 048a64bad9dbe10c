//! Implementation of the multi-profile subcommands.
//!
//! `multi-encode` and `edit` run every requested profile in one encoder
//! process and report one output slot per delivery profile.

use std::time::Duration;

use anyhow::Result;
use composer_core::TrimConcatRequest;
use log::info;

use super::{Session, require_file, streams_of, with_spinner};
use crate::cli::{EditArgs, MultiEncodeArgs};
use crate::output::{print_commands, print_files, print_outputs};

pub fn run_multi_encode(session: &Session, args: &MultiEncodeArgs) -> Result<()> {
    require_file(&args.input)?;
    let (has_video, has_audio) = streams_of(&args.input, args.streams)?;
    let request = TrimConcatRequest::new(vec![args.input.clone()]).with_streams(has_video, has_audio);
    run_request(session, &request, &args.profiles)
}

pub fn run_edit(session: &Session, args: &EditArgs) -> Result<()> {
    for input in &args.inputs {
        require_file(input)?;
    }
    let (has_video, has_audio) = streams_of(&args.inputs[0], args.streams)?;

    let mut request = TrimConcatRequest::new(args.inputs.clone()).with_streams(has_video, has_audio);
    if let Some(edits) = &args.edits {
        request = request.with_edits(edits.clone());
    }
    if let Some(ms) = args.transition {
        request = request.with_transition(Duration::from_millis(ms));
    }
    run_request(session, &request, &args.profiles)
}

fn run_request(session: &Session, request: &TrimConcatRequest, ids: &[String]) -> Result<()> {
    let profiles = session.profile_list(ids)?;

    if session.dry_run {
        let command = session.engine.compile_multi_trim_concat(request, &profiles)?;
        return print_commands(&[command], session.json);
    }

    info!(
        "Encoding {} track(s) with {} profile(s), estimated job load {:.1}",
        request.inputs.len(),
        profiles.len(),
        session.engine.estimate_job_load(profiles.len())
    );
    let outputs = with_spinner("Encoding", || session.engine.multi_trim_concat(request, &profiles))?;

    // Adaptive runs return every playlist and segment instead of slots.
    let adaptive = profiles.iter().any(|p| p.adaptive_type().is_some());
    if adaptive {
        let files: Vec<_> = outputs.into_iter().flatten().collect();
        print_files(&files, session.json)
    } else {
        let delivery: Vec<String> = profiles.iter().map(|p| p.identifier.clone()).collect();
        print_outputs(&delivery, &outputs, session.json)
    }
}
