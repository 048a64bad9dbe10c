// ============================================================================
// composer-cli/src/output.rs
// ============================================================================
//
// OUTPUT: What the CLI Prints on stdout
//
// Dry runs print the compiled commands, real runs print the produced files.
// Both have a plain text form (one entry per line) and a JSON form.

use std::path::PathBuf;

use anyhow::Result;
use composer_core::CompiledCommand;
use serde_json::json;

/// Prints compiled commands, one per line or as a JSON array.
pub fn print_commands(commands: &[CompiledCommand], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(commands)?);
    } else {
        for command in commands {
            println!("{command}");
        }
    }
    Ok(())
}

/// Prints output slots in profile order; an empty slot prints `-`.
pub fn print_outputs(profiles: &[String], outputs: &[Option<PathBuf>], json: bool) -> Result<()> {
    if json {
        let entries: Vec<_> = outputs
            .iter()
            .enumerate()
            .map(|(i, output)| json!({ "profile": profiles.get(i), "output": output }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for output in outputs {
            match output {
                Some(path) => println!("{}", path.display()),
                None => println!("-"),
            }
        }
    }
    Ok(())
}

/// Prints produced files that have no profile slot (adaptive runs, images).
pub fn print_files(files: &[PathBuf], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(files)?);
    } else {
        for file in files {
            println!("{}", file.display());
        }
    }
    Ok(())
}
