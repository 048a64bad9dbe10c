//! Shell-like splitting of command templates into argument tokens.
//!
//! Two splitters live here. [`tokenize`] is the strict one used for profile
//! command lines: quotes group words and must be balanced. [`split_loose`]
//! only recognises whole quoted words and never fails; it is used on the
//! argument groups the compiler generates itself.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Copy, PartialEq)]
enum State {
    Normal,
    InSingle,
    InDouble,
}

/// Splits a command line into tokens.
///
/// Whitespace separates tokens outside quotes. Single and double quotes group
/// text into one token and are removed; adjacent quoted and unquoted text
/// joins into the same token. A backslash escapes a following quote
/// character; any other backslash is kept, since filter expressions use
/// `\,` for their own escaping. Empty quotes (`''`) yield an empty token.
pub fn tokenize(input: &str) -> CoreResult<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut state = State::Normal;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match (state, c) {
            (State::InSingle, '\'') | (State::InDouble, '"') => state = State::Normal,
            (State::InDouble, '\\') if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            (State::InSingle | State::InDouble, _) => current.push(c),
            (State::Normal, '\'') => {
                state = State::InSingle;
                has_token = true;
            }
            (State::Normal, '"') => {
                state = State::InDouble;
                has_token = true;
            }
            (State::Normal, '\\') if matches!(chars.peek(), Some('\'' | '"')) => {
                if let Some(quote) = chars.next() {
                    current.push(quote);
                }
                has_token = true;
            }
            (State::Normal, c) if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            (State::Normal, c) => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if state != State::Normal {
        return Err(CoreError::Template(format!(
            "unbalanced quotes in command line: {input}"
        )));
    }
    if has_token {
        tokens.push(current);
    }
    Ok(tokens)
}

static LOOSE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|\S+"#).unwrap());

/// Splits on whitespace, keeping whole `"..."` / `'...'` words together
/// without their quotes. Stray quotes are kept as ordinary characters.
pub fn split_loose(input: &str) -> Vec<String> {
    LOOSE_TOKEN
        .captures_iter(input)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}
