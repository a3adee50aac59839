//! Parsing for the comma/whitespace separated header lists used by the
//! `Access-Control-*` response headers.
//!
//! Lists are RFC 2616 `#token` productions, except that plain whitespace is
//! also accepted as a separator. Anything outside that grammar makes the
//! whole list invalid; callers treat an invalid list as a denial.

use crate::util::is_token_byte;
use once_cell::sync::Lazy;
use regex_automata::meta::Regex;

static TOKEN_LIST: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\A[!#$%&'*+.^_`|~0-9A-Za-z \t,\-]*\z").ok());

static DELTA_SECONDS: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\A[ \t]*[0-9]+[ \t]*\z").ok());

fn is_separator(ch: char) -> bool {
    matches!(ch, ',' | ' ' | '\t')
}

/// Splits a header value on commas and linear whitespace without checking
/// the element grammar. Empty elements are skipped.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(is_separator).filter(|item| !item.is_empty())
}

/// Parses a token list, returning `None` when the value violates the grammar.
///
/// An empty (or separator-only) value is a valid, empty list.
pub fn parse_token_list(value: &str) -> Option<Vec<&str>> {
    let valid = TOKEN_LIST
        .as_ref()
        .is_some_and(|regex| regex.is_match(value.as_bytes()));
    if !valid {
        return None;
    }

    let tokens: Vec<&str> = split_list(value).collect();
    debug_assert!(tokens.iter().all(|token| token.bytes().all(is_token_byte)));
    Some(tokens)
}

/// `true` when the value holds exactly one list element.
pub fn is_single_value(value: &str) -> bool {
    let mut items = split_list(value);
    items.next().is_some() && items.next().is_none()
}

/// Case-insensitive membership test over a token list. Matches whole
/// elements only, so `X-Custom` is not found in `X-Custom-Extra`.
pub fn list_contains(value: &str, name: &str) -> bool {
    parse_token_list(value).is_some_and(|tokens| {
        tokens
            .iter()
            .any(|token| token.eq_ignore_ascii_case(name.trim()))
    })
}

/// Parses `delta-seconds`: a single non-negative integer, optionally padded
/// with whitespace. Values that overflow `u64` are rejected.
pub fn parse_max_age(value: &str) -> Option<u64> {
    let valid = DELTA_SECONDS
        .as_ref()
        .is_some_and(|regex| regex.is_match(value.as_bytes()));
    if !valid {
        return None;
    }
    value.trim().parse().ok()
}

#[cfg(test)]
#[path = "header_list_test.rs"]
mod header_list_test;
