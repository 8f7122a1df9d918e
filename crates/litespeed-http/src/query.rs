//! Query string parsing and percent-decoding.
//!
//! Handles key-value extraction, multi-value parameters (the same key
//! appearing multiple times), percent-decoding, and the usual edge cases
//! (empty values, missing `=`). Decoding is eager: the resulting
//! [`QueryParams`] owns its strings because requests own their data.

use litespeed_core::QueryParams;
use std::borrow::Cow;

/// Parse a query string (without the leading `?`) into multi-valued
/// parameters. Keys and values are form-decoded (`+` as space, `%XX`).
#[must_use]
pub fn parse_query(raw: &str) -> QueryParams {
    let mut params = QueryParams::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.append(form_decode(key).into_owned(), form_decode(value).into_owned());
    }
    params
}

/// Percent-decode a path segment. `+` is literal here.
#[must_use]
pub fn percent_decode(input: &str) -> Cow<'_, str> {
    if input.contains('%') {
        Cow::Owned(decode_bytes(input, false))
    } else {
        Cow::Borrowed(input)
    }
}

/// Decode a form-encoded value: `%XX` plus `+` as space.
#[must_use]
pub fn form_decode(input: &str) -> Cow<'_, str> {
    if input.contains('%') || input.contains('+') {
        Cow::Owned(decode_bytes(input, true))
    } else {
        Cow::Borrowed(input)
    }
}

fn decode_bytes(input: &str, plus_as_space: bool) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                    out.push(hi << 4 | lo);
                    i += 3;
                    continue;
                }
                // malformed escape stays literal
                out.push(b'%');
                i += 1;
            }
            b'+' if plus_as_space => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
