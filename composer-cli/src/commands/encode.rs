//! Implementation of the single-profile subcommands.
//!
//! `encode`, `trim`, `image`, `mux` and `watermark` each apply one profile
//! and produce one file (or one image per requested time).

use anyhow::Result;
use log::info;

use super::{Session, properties, require_file, with_spinner};
use crate::cli::{EncodeArgs, ImageArgs, MuxArgs, TrimArgs, WatermarkArgs};
use crate::output::{print_commands, print_files};

pub fn run_encode(session: &Session, args: &EncodeArgs) -> Result<()> {
    require_file(&args.input)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let command = session.engine.compile_encode(&args.input, profile, &props)?;
        return print_commands(&[command], session.json);
    }

    info!("Encoding {} with profile '{}'", args.input.display(), profile.identifier);
    let output = with_spinner("Encoding", || session.engine.encode(&args.input, profile, &props))?;
    print_files(&[output], session.json)
}

pub fn run_trim(session: &Session, args: &TrimArgs) -> Result<()> {
    require_file(&args.input)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let command = session
            .engine
            .compile_trim(&args.input, profile, args.start, args.duration, &props)?;
        return print_commands(&[command], session.json);
    }

    info!(
        "Trimming {} ms at {} ms out of {}",
        args.duration,
        args.start,
        args.input.display()
    );
    let output = with_spinner("Trimming", || {
        session
            .engine
            .trim(&args.input, profile, args.start, args.duration, &props)
    })?;
    print_files(&[output], session.json)
}

pub fn run_image(session: &Session, args: &ImageArgs) -> Result<()> {
    require_file(&args.input)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let commands = session
            .engine
            .compile_extract_images(&args.input, profile, &props, &args.times)?;
        return print_commands(&commands, session.json);
    }

    let images = with_spinner("Extracting images", || {
        session.engine.extract_images(&args.input, profile, &props, &args.times)
    })?;
    info!("Extracted {} image(s)", images.len());
    print_files(&images, session.json)
}

pub fn run_mux(session: &Session, args: &MuxArgs) -> Result<()> {
    require_file(&args.video)?;
    require_file(&args.audio)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let command = session.engine.compile_mux(&args.video, &args.audio, profile, &props)?;
        return print_commands(&[command], session.json);
    }

    let output = with_spinner("Muxing", || {
        session.engine.mux(&args.video, &args.audio, profile, &props)
    })?;
    print_files(&[output], session.json)
}

pub fn run_watermark(session: &Session, args: &WatermarkArgs) -> Result<()> {
    require_file(&args.input)?;
    require_file(&args.image)?;
    let profile = session.profile(&args.profile.profile)?;
    let props = properties(&args.profile);

    if session.dry_run {
        let command = session
            .engine
            .compile_watermark(&args.input, &args.image, profile, &props)?;
        return print_commands(&[command], session.json);
    }

    let output = with_spinner("Watermarking", || {
        session.engine.watermark(&args.input, &args.image, profile, &props)
    })?;
    print_files(&[output], session.json)
}
