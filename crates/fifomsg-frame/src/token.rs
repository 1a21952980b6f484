//! Reserved protocol tokens.
//!
//! These byte strings delimit frames on the wire. Any occurrence inside an
//! identifier or payload is escaped before transmission.

/// Global prefix that opens every frame.
pub const PREFIX: &[u8] = b"NAMEDPIPE";

/// Start marker following the prefix.
pub const START: &[u8] = b"START";

/// End marker closing every frame.
pub const END: &[u8] = b"END";

/// Escape byte placed in front of a reserved token.
pub const ESCAPE: u8 = b'\\';

/// Structural separator between header fields.
pub const SEPARATOR: u8 = b':';

/// All reserved tokens, in escaping order.
///
/// Unescaping walks this list backwards.
pub const RESERVED_TOKENS: [&[u8]; 3] = [PREFIX, START, END];

/// `PREFIX:START:`, the byte sequence a reader scans for.
pub const FRAME_MARKER: &[u8] = b"NAMEDPIPE:START:";

/// `:END:`, the fixed tail of every frame.
pub const FRAME_TRAILER: &[u8] = b":END:";

/// Identifier used by the reference reader/writer pair.
pub const DEFAULT_IDENTIFIER: &str = "NAMEDPIPE";

/// Returns true if `bytes` contains any reserved token.
pub fn contains_reserved(bytes: &[u8]) -> bool {
    RESERVED_TOKENS
        .iter()
        .any(|token| bytes.windows(token.len()).any(|w| w == *token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_and_trailer_match_tokens() {
        let mut marker = PREFIX.to_vec();
        marker.push(SEPARATOR);
        marker.extend_from_slice(START);
        marker.push(SEPARATOR);
        assert_eq!(marker, FRAME_MARKER);

        let mut trailer = vec![SEPARATOR];
        trailer.extend_from_slice(END);
        trailer.push(SEPARATOR);
        assert_eq!(trailer, FRAME_TRAILER);
    }

    #[test]
    fn detects_reserved_content() {
        assert!(contains_reserved(b"xxENDxx"));
        assert!(contains_reserved(b"NAMEDPIPE"));
        assert!(!contains_reserved(b"plain text"));
        assert!(!contains_reserved(b""));
    }
}
