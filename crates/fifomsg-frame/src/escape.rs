//! Reversible backslash escaping of reserved tokens.
//!
//! `escape` puts a backslash in front of every occurrence of a token;
//! `unescape` turns every backslash-token pair back into the token. The
//! `_all` variants run one pass per reserved token. Escaping goes through
//! [`RESERVED_TOKENS`] front to back and unescaping back to front, so each
//! unescape pass sees exactly the bytes its escape pass produced even when
//! tokens overlap (`NAMEDPIPEND` contains both `NAMEDPIPE` and `END`).

use crate::token::{contains_reserved, ESCAPE, RESERVED_TOKENS};

/// Escape every occurrence of `token` in `text`.
///
/// Occurrences are matched left to right without overlap. An empty token
/// leaves the text unchanged.
pub fn escape(text: &[u8], token: &[u8]) -> Vec<u8> {
    if token.is_empty() {
        return text.to_vec();
    }

    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while let Some(found) = find(text, token, pos) {
        out.extend_from_slice(&text[pos..found]);
        out.push(ESCAPE);
        out.extend_from_slice(token);
        pos = found + token.len();
    }
    out.extend_from_slice(&text[pos..]);
    out
}

/// Replace every backslash immediately followed by `token` with `token`.
pub fn unescape(text: &[u8], token: &[u8]) -> Vec<u8> {
    if token.is_empty() {
        return text.to_vec();
    }

    let mut escaped = Vec::with_capacity(token.len() + 1);
    escaped.push(ESCAPE);
    escaped.extend_from_slice(token);

    let mut out = Vec::with_capacity(text.len());
    let mut pos = 0;
    while let Some(found) = find(text, &escaped, pos) {
        out.extend_from_slice(&text[pos..found]);
        out.extend_from_slice(token);
        pos = found + escaped.len();
    }
    out.extend_from_slice(&text[pos..]);
    out
}

/// Escape all reserved tokens.
pub fn escape_all(text: &[u8]) -> Vec<u8> {
    if !contains_reserved(text) {
        return text.to_vec();
    }
    RESERVED_TOKENS
        .iter()
        .fold(text.to_vec(), |acc, token| escape(&acc, token))
}

/// Undo [`escape_all`].
pub fn unescape_all(text: &[u8]) -> Vec<u8> {
    RESERVED_TOKENS
        .iter()
        .rev()
        .fold(text.to_vec(), |acc, token| unescape(&acc, token))
}

/// Position of the first occurrence of `needle` in `haystack` at or after `from`.
pub(crate) fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from >= haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| offset + from)
}
