//! Compiled encoder commands.
//!
//! A [`CompiledCommand`] is the product of every compile operation: the full
//! argument list (binary first) plus the output file expected for each
//! encoding profile. Slot `n` of the outputs always belongs to profile `n`;
//! a profile that produces no file keeps an empty slot.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// An argument list ready to run, with its expected outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledCommand {
    args: Vec<String>,
    outputs: Vec<Option<PathBuf>>,
    profiles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    segment_suffixes: Vec<String>,
    adaptive: bool,
}

impl CompiledCommand {
    /// The encoder binary.
    pub fn program(&self) -> &str {
        self.args.first().map(String::as_str).unwrap_or_default()
    }

    /// Arguments after the binary.
    pub fn arguments(&self) -> &[String] {
        self.args.get(1..).unwrap_or_default()
    }

    /// The whole token list, binary first.
    pub fn tokens(&self) -> &[String] {
        &self.args
    }

    /// Expected output file per profile, in profile order.
    pub fn outputs(&self) -> &[Option<PathBuf>] {
        &self.outputs
    }

    /// Profile ids matching `outputs()` slot by slot.
    pub fn profiles(&self) -> &[String] {
        &self.profiles
    }

    /// Per-profile suffixes of HLS variant segments.
    pub fn segment_suffixes(&self) -> &[String] {
        &self.segment_suffixes
    }

    /// Whether the command writes an adaptive (HLS) playlist.
    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Index of the first occurrence of `token`.
    pub fn position(&self, token: &str) -> Option<usize> {
        self.args.iter().position(|a| a == token)
    }

    /// The token following the first occurrence of `option`.
    pub fn value_of(&self, option: &str) -> Option<&str> {
        self.position(option)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }
}

impl fmt::Display for CompiledCommand {
    /// Shell-like rendering for logs; tokens with whitespace are quoted.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                    format!("'{arg}'")
                } else {
                    arg.clone()
                }
            })
            .collect();
        f.write_str(&rendered.join(" "))
    }
}

/// Builder for [`CompiledCommand`].
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    command: CompiledCommand,
}

impl CommandBuilder {
    /// Starts a command for `binary`.
    #[must_use]
    pub fn new(binary: &str) -> Self {
        Self {
            command: CompiledCommand {
                args: vec![binary.to_string()],
                outputs: Vec::new(),
                profiles: Vec::new(),
                segment_suffixes: Vec::new(),
                adaptive: false,
            },
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Adds `-i <path>`.
    #[must_use]
    pub fn input(self, path: &Path) -> Self {
        self.arg("-i").arg(path.to_string_lossy())
    }

    /// Adds `-filter_complex <graph>` when there is a graph.
    #[must_use]
    pub fn filter_complex(self, graph: Option<String>) -> Self {
        match graph {
            Some(graph) => self.arg("-filter_complex").arg(graph),
            None => self,
        }
    }

    /// Records the output expected from `profile`.
    #[must_use]
    pub fn expect_output(mut self, profile: &str, output: Option<PathBuf>) -> Self {
        self.command.profiles.push(profile.to_string());
        self.command.outputs.push(output);
        self
    }

    #[must_use]
    pub fn segment_suffixes(mut self, suffixes: Vec<String>) -> Self {
        self.command.segment_suffixes = suffixes;
        self
    }

    #[must_use]
    pub fn adaptive(mut self, adaptive: bool) -> Self {
        self.command.adaptive = adaptive;
        self
    }

    #[must_use]
    pub fn build(self) -> CompiledCommand {
        self.command
    }
}
