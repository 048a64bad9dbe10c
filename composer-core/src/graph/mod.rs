// ============================================================================
// composer-core/src/graph/mod.rs
// ============================================================================
//
// FILTER GRAPH: Building Blocks for ffmpeg `-filter_complex` Graphs
//
// A filter graph is a `;`-separated list of clauses. Each clause reads from
// named input pads, applies a `,`-separated filter chain and writes to named
// output pads, e.g. `[0:v]trim=1.00:duration=4.00,setpts=PTS-STARTPTS[v0]`.
// Pad names must be unique within one graph; ffmpeg does not report a
// duplicated intermediate pad, it silently wires the wrong streams.
//
// KEY COMPONENTS:
// - FilterGraph: ordered clause collection rendered with `;`
// - Pad helpers: bracketed names, stream references, letter pads
// - segments: clip sanitizing for multi-clip edits
// - edit: trim/fade/concat clauses for an edit
// - aggregate: one processed stream split into N encoded outputs
// - composite: scale/pad/overlay of up to two tracks plus a watermark
// - concat: normalize and join heterogeneous inputs

pub mod aggregate;
pub mod composite;
pub mod concat;
pub mod edit;
pub mod segments;

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered list of filter clauses.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    clauses: Vec<String>,
}

impl FilterGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a clause; empty clauses are skipped.
    #[must_use]
    pub fn add_clause(mut self, clause: impl Into<String>) -> Self {
        let clause = clause.into();
        if !clause.is_empty() {
            self.clauses.push(clause);
        }
        self
    }

    /// Appends a clause when there is one.
    #[must_use]
    pub fn add_optional(self, clause: Option<String>) -> Self {
        match clause {
            Some(clause) => self.add_clause(clause),
            None => self,
        }
    }

    #[must_use]
    pub fn add_clauses<I>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        clauses.into_iter().fold(self, FilterGraph::add_clause)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[String] {
        &self.clauses
    }

    /// Renders the graph, `None` when there is nothing to filter.
    #[must_use]
    pub fn build(self) -> Option<String> {
        if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(";"))
        }
    }
}

/// Wraps a pad name in brackets: `ov` -> `[ov]`.
pub fn pad(name: &str) -> String {
    format!("[{name}]")
}

/// Reference to a stream of an input file: `(0, 'v')` -> `[0:v]`.
pub fn stream_pad(input_index: usize, kind: char) -> String {
    format!("[{input_index}:{kind}]")
}

static RAW_STREAM_PAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d+:(?:[av]|\d{1,2}))\]$").unwrap());

/// Strips brackets from a raw stream reference so it can be used with `-map`
/// outside a filter graph: `[0:v]` -> `0:v`. Named pads are returned as is.
pub fn strip_stream_brackets(pad: &str) -> String {
    RAW_STREAM_PAD
        .captures(pad)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| pad.to_string())
}

/// Letter pad name for the `index`-th concat input: `b`..`z`, then `bb`..`zz`,
/// then `bbb`.. and so on. Each width holds 25 names; `a` is never produced.
pub fn letter_pad(index: usize) -> String {
    let width = index / 25 + 1;
    let letter = char::from(b'b' + (index % 25) as u8);
    std::iter::repeat_n(letter, width).collect()
}

static PAD_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[([^\[\]]+)\]").unwrap());

/// All bracketed pad names in a rendered graph, in order of appearance.
pub fn pad_names(graph: &str) -> Vec<String> {
    PAD_NAME
        .captures_iter(graph)
        .map(|caps| caps[1].to_string())
        .collect()
}
