//! Fuzzy token builder.
//!
//! Turns one free-text field value into a Lucene query fragment where each
//! word carries an edit-distance tolerance that grows with its length:
//!
//! | word length | clause        |
//! |-------------|---------------|
//! | ≤ 3         | `field:word`  |
//! | 4–5         | `field:word~1`|
//! | ≥ 6         | `field:word~2`|
//!
//! Words are AND-ed so every word of a multi-word value must match.

use regex::Regex;
use std::sync::LazyLock;

/// Separators between words of a field value.
static WORD_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-+]+").expect("valid regex"));

/// Characters with special meaning in the Lucene query syntax.
const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', '/',
];

/// Edit distance allowed for a word of `len` characters.
#[must_use]
pub const fn fuzziness_for_len(len: usize) -> u8 {
    match len {
        0..=3 => 0,
        4..=5 => 1,
        _ => 2,
    }
}

/// Escapes Lucene special characters with a backslash.
#[must_use]
pub fn escape_term(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Builds the fuzzy fragment for `field` from a raw `token`.
///
/// Returns an empty string when the token has no words (empty, blank, or
/// separators only). Callers must skip the field in that case.
#[must_use]
pub fn fuzzy_fragment(field: &str, token: &str) -> String {
    WORD_SEPARATOR_RE
        .split(token.trim())
        .filter(|word| !word.is_empty())
        .map(|word| match fuzziness_for_len(word.chars().count()) {
            0 => format!("{field}:{}", escape_term(word)),
            n => format!("{field}:{}~{n}", escape_term(word)),
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}
