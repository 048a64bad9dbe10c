//! Implementation of the 'profiles' and 'probe' subcommands.

use anyhow::{Context, Result};
use composer_core::probe_streams;
use serde_json::json;

use super::Session;
use crate::cli::ProbeArgs;

/// Lists every loaded profile with its media kinds.
pub fn run_profiles(session: &Session) -> Result<()> {
    let profiles: Vec<_> = session
        .profiles
        .ids()
        .filter_map(|id| session.profiles.get(id).ok())
        .collect();

    if session.json {
        let entries: Vec<_> = profiles
            .iter()
            .map(|p| {
                json!({
                    "id": p.identifier,
                    "name": p.name,
                    "input": p.input,
                    "output": p.output,
                    "suffix": p.suffix,
                    "adaptive": p.adaptive_type(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if profiles.is_empty() {
        println!("No encoding profiles loaded (use --profiles or COMPOSER_PROFILES)");
    }
    for profile in profiles {
        println!(
            "{:<24} {} -> {}  {}",
            profile.identifier, profile.input, profile.output, profile.name
        );
    }
    Ok(())
}

/// Prints what ffprobe reports for a file.
pub fn run_probe(session: &Session, args: &ProbeArgs) -> Result<()> {
    let info = probe_streams(&args.input).with_context(|| format!("Failed to probe '{}'", args.input.display()))?;
    if session.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Video:      {}", if info.has_video { "yes" } else { "no" });
    println!("Audio:      {}", if info.has_audio { "yes" } else { "no" });
    if let Some(dim) = info.dimension {
        println!("Dimension:  {}x{}", dim.width, dim.height);
    }
    if let Some(rate) = info.frame_rate {
        println!("Frame rate: {rate:.3}");
    }
    if let Some(duration) = info.duration {
        println!("Duration:   {duration:.3}s");
    }
    Ok(())
}
