use bytes::{BufMut, Bytes, BytesMut};

use crate::escape::{escape_all, find, unescape_all};
use crate::token::{ESCAPE, FRAME_MARKER, FRAME_TRAILER, SEPARATOR};

/// Default maximum wire size of a single frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Default initial size of the receive buffer, and the step it grows by.
pub const DEFAULT_BUFFER_INCREMENT: usize = 8096;

/// Longest decimal length field accepted before a header is declared corrupt.
const MAX_LEN_DIGITS: usize = 20;

/// A message addressed to an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Routing identifier.
    pub identifier: String,
    /// The message payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(identifier: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            identifier: identifier.into(),
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame after escaping.
    pub fn wire_size(&self) -> usize {
        encoded_len(&self.identifier, &self.payload)
    }
}

/// A frame pulled out of a receive buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Unescaped identifier.
    pub identifier: String,
    /// Unescaped payload.
    pub content: Bytes,
    /// Bytes of the buffer this frame occupied, counted from the buffer
    /// start and including any garbage skipped before the marker.
    pub consumed: usize,
}

impl DecodedMessage {
    /// Drop the buffer bookkeeping and keep the message.
    pub fn into_frame(self) -> Frame {
        Frame {
            identifier: self.identifier,
            payload: self.content,
        }
    }
}

/// Why a scan asked for bytes to be discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No frame marker in the buffer; the bytes can never start a frame.
    NoMarker,
    /// Length fields are present but not decimal numbers.
    MalformedHeader,
    /// Declared frame size exceeds the configured maximum.
    Oversized,
    /// Separator after the identifier or the `:END:` trailer is misplaced.
    BadTerminator,
    /// Identifier is not valid UTF-8 after unescaping.
    InvalidIdentifier,
}

/// Outcome of scanning a buffer for the next frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scan {
    /// A complete frame; discard `consumed` bytes.
    Complete(DecodedMessage),
    /// Not enough data yet.
    Incomplete,
    /// The first `len` bytes can be dropped; scan again afterwards.
    Skip { len: usize, reason: SkipReason },
}

/// Encode a frame into the wire format, returning the number of bytes appended.
///
/// Wire format:
/// ```text
/// NAMEDPIPE:START:<idLen>:<msgLen>:<escapedId>:<escapedPayload>:END:
/// ```
///
/// `idLen` and `msgLen` are decimal byte counts of the escaped parts.
pub fn encode_frame(identifier: &str, payload: &[u8], dst: &mut BytesMut) -> usize {
    let id = escape_all(identifier.as_bytes());
    let body = escape_all(payload);
    let id_len = id.len().to_string();
    let body_len = body.len().to_string();

    let total = wire_len(id.len(), body.len());
    dst.reserve(total);
    dst.put_slice(FRAME_MARKER);
    dst.put_slice(id_len.as_bytes());
    dst.put_u8(SEPARATOR);
    dst.put_slice(body_len.as_bytes());
    dst.put_u8(SEPARATOR);
    dst.put_slice(&id);
    dst.put_u8(SEPARATOR);
    dst.put_slice(&body);
    dst.put_slice(FRAME_TRAILER);
    total
}

/// Wire size of a frame for `identifier` and `payload`.
pub fn encoded_len(identifier: &str, payload: &[u8]) -> usize {
    wire_len(
        escape_all(identifier.as_bytes()).len(),
        escape_all(payload).len(),
    )
}

fn wire_len(id_len: usize, body_len: usize) -> usize {
    FRAME_MARKER.len()
        + decimal_digits(id_len)
        + 1
        + decimal_digits(body_len)
        + 1
        + id_len
        + 1
        + body_len
        + FRAME_TRAILER.len()
}

fn decimal_digits(mut n: usize) -> usize {
    let mut digits = 1;
    while n >= 10 {
        n /= 10;
        digits += 1;
    }
    digits
}

/// Look for the next complete frame at the front of `buf`.
///
/// Partial data always yields [`Scan::Incomplete`]. Data that can never
/// become a valid frame yields [`Scan::Skip`] so the caller can discard it
/// and resynchronise on the next marker.
pub fn scan_frame(buf: &[u8], max_frame_size: usize) -> Scan {
    if buf.len() < FRAME_MARKER.len() {
        return Scan::Incomplete;
    }

    let Some(start) = find_marker(buf) else {
        // Keep a marker-sized tail: it may hold the beginning of the next
        // marker plus the byte that tells whether it is escaped.
        let len = buf.len() - FRAME_MARKER.len();
        return if len > 0 {
            Scan::Skip {
                len,
                reason: SkipReason::NoMarker,
            }
        } else {
            Scan::Incomplete
        };
    };
    let resync = |reason| Scan::Skip {
        len: start + 1,
        reason,
    };

    let header_start = start + FRAME_MARKER.len();
    let (id_len, id_len_end) = match length_field(buf, header_start) {
        Field::Value(value, end) => (value, end),
        Field::Incomplete => return Scan::Incomplete,
        Field::Malformed => return resync(SkipReason::MalformedHeader),
    };
    let (body_len, body_len_end) = match length_field(buf, id_len_end + 1) {
        Field::Value(value, end) => (value, end),
        Field::Incomplete => return Scan::Incomplete,
        Field::Malformed => return resync(SkipReason::MalformedHeader),
    };

    // body_len_end + ':' + id + ':' + body + ":END:"
    let total = match body_len_end
        .checked_add(id_len)
        .and_then(|n| n.checked_add(body_len))
        .and_then(|n| n.checked_add(2 + FRAME_TRAILER.len()))
    {
        Some(total) if total - start <= max_frame_size => total,
        _ => return resync(SkipReason::Oversized),
    };
    if buf.len() < total {
        return Scan::Incomplete;
    }

    let id_start = body_len_end + 1;
    let id_end = id_start + id_len;
    let body_start = id_end + 1;
    let body_end = total - FRAME_TRAILER.len();
    if buf[id_end] != SEPARATOR || &buf[body_end..total] != FRAME_TRAILER {
        return resync(SkipReason::BadTerminator);
    }

    let Ok(identifier) = String::from_utf8(unescape_all(&buf[id_start..id_end])) else {
        return resync(SkipReason::InvalidIdentifier);
    };
    let content = Bytes::from(unescape_all(&buf[body_start..body_end]));

    Scan::Complete(DecodedMessage {
        identifier,
        content,
        consumed: total,
    })
}

/// First marker that sits at the buffer start or is not preceded by the escape byte.
pub(crate) fn find_marker(buf: &[u8]) -> Option<usize> {
    let mut pos = 0;
    while let Some(found) = find(buf, FRAME_MARKER, pos) {
        if found == 0 || buf[found - 1] != ESCAPE {
            return Some(found);
        }
        pos = found + 1;
    }
    None
}

enum Field {
    /// Parsed value and the position of its terminating separator.
    Value(usize, usize),
    Incomplete,
    Malformed,
}

fn length_field(buf: &[u8], from: usize) -> Field {
    let window = &buf[from.min(buf.len())..];
    let Some(end) = window.iter().position(|&b| b == SEPARATOR) else {
        return if window.len() > MAX_LEN_DIGITS {
            Field::Malformed
        } else {
            Field::Incomplete
        };
    };

    let digits = &window[..end];
    if digits.is_empty() || digits.len() > MAX_LEN_DIGITS || !digits.iter().all(u8::is_ascii_digit)
    {
        return Field::Malformed;
    }

    // Only ASCII digits remain, so the conversion can fail on overflow alone.
    match std::str::from_utf8(digits).ok().and_then(|s| s.parse().ok()) {
        Some(value) => Field::Value(value, from + end),
        None => Field::Malformed,
    }
}

/// Configuration for frame reading and writing.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Initial receive buffer size in bytes. Default: 8096.
    pub initial_buffer_capacity: usize,
    /// Bytes added to the receive buffer each time it fills up without
    /// holding a complete frame. Default: 8096.
    pub buffer_increment: usize,
    /// Maximum wire size of one frame. Larger declared frames are skipped on
    /// read and rejected on write. Default: 16 MiB.
    pub max_frame_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            initial_buffer_capacity: DEFAULT_BUFFER_INCREMENT,
            buffer_increment: DEFAULT_BUFFER_INCREMENT,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(identifier: &str, payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(identifier, payload, &mut buf);
        buf
    }

    fn decode(buf: &[u8]) -> DecodedMessage {
        match scan_frame(buf, DEFAULT_MAX_FRAME_SIZE) {
            Scan::Complete(msg) => msg,
            other => panic!("expected a complete frame, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_wire_format() {
        let buf = encode("NAMEDPIPE", b"Some special message 0");
        assert_eq!(
            buf.as_ref(),
            b"NAMEDPIPE:START:10:22:\\NAMEDPIPE:Some special message 0:END:"
        );
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let buf = encode("sensor", b"hello, fifomsg!");
        let msg = decode(&buf);

        assert_eq!(msg.identifier, "sensor");
        assert_eq!(msg.content.as_ref(), b"hello, fifomsg!");
        assert_eq!(msg.consumed, buf.len());
    }

    #[test]
    fn test_roundtrip_payload_variety() {
        let binary: Vec<u8> = (0..=255u8).collect();
        let large: Vec<u8> = b"NAMEDPIPE:START:END:\\"
            .iter()
            .copied()
            .cycle()
            .take(16 * 1024)
            .collect();
        let payloads: [&[u8]; 8] = [
            b"",
            b"NAMEDPIPE",
            b"STARTEND",
            b"NAMEDPIPE:START:5:5:xxxxx:yyyyy:END:",
            b":END:",
            b"\\",
            &binary,
            &large,
        ];

        for payload in payloads {
            let buf = encode("id", payload);
            let msg = decode(&buf);
            assert_eq!(msg.identifier, "id");
            assert_eq!(msg.content.as_ref(), payload);
            assert_eq!(msg.consumed, buf.len());
        }
    }

    #[test]
    fn test_roundtrip_reserved_identifier() {
        for id in ["NAMEDPIPE", "START", "END", "NAMEDPIPEND", "a:b", "", "\\END"] {
            let buf = encode(id, b"x");
            assert_eq!(decode(&buf).identifier, id);
        }
    }

    #[test]
    fn test_encoded_len_matches_encoding() {
        for (id, payload) in [
            ("a", &b""[..]),
            ("NAMEDPIPE", &b"ENDENDEND"[..]),
            ("x", &[7u8; 12345][..]),
        ] {
            assert_eq!(encoded_len(id, payload), encode(id, payload).len());
            assert_eq!(Frame::new(id, payload.to_vec()).wire_size(), encoded_len(id, payload));
        }
    }

    #[test]
    fn test_decode_short_buffer() {
        assert_eq!(scan_frame(b"NAMEDPIPE:", DEFAULT_MAX_FRAME_SIZE), Scan::Incomplete);
        assert_eq!(scan_frame(b"", DEFAULT_MAX_FRAME_SIZE), Scan::Incomplete);
    }

    #[test]
    fn test_every_prefix_is_incomplete() {
        let buf = encode("NAMEDPIPE", b"a payload with END inside");
        for cut in 0..buf.len() {
            assert_eq!(
                scan_frame(&buf[..cut], DEFAULT_MAX_FRAME_SIZE),
                Scan::Incomplete,
                "prefix of {cut} bytes"
            );
        }
    }

    #[test]
    fn test_missing_separators_are_incomplete() {
        assert_eq!(
            scan_frame(b"NAMEDPIPE:START:12", DEFAULT_MAX_FRAME_SIZE),
            Scan::Incomplete
        );
        assert_eq!(
            scan_frame(b"NAMEDPIPE:START:1:4", DEFAULT_MAX_FRAME_SIZE),
            Scan::Incomplete
        );
    }

    #[test]
    fn test_garbage_before_frame_is_consumed() {
        let frame = encode("id", b"body");
        let mut buf = b"noise!!".to_vec();
        buf.extend_from_slice(&frame);

        let msg = decode(&buf);
        assert_eq!(msg.content.as_ref(), b"body");
        assert_eq!(msg.consumed, 7 + frame.len());
    }

    #[test]
    fn test_escaped_marker_is_not_a_frame_start() {
        let frame = encode("id", b"body");
        let mut buf = b"\\NAMEDPIPE:START:".to_vec();
        buf.extend_from_slice(&frame);

        let msg = decode(&buf);
        assert_eq!(msg.identifier, "id");
        assert_eq!(msg.consumed, buf.len());
    }

    #[test]
    fn test_only_escaped_marker_is_skipped() {
        let buf = b"garbage \\NAMEDPIPE:START:";
        assert_eq!(
            scan_frame(buf, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                len: buf.len() - FRAME_MARKER.len(),
                reason: SkipReason::NoMarker,
            }
        );
    }

    #[test]
    fn test_no_marker_keeps_possible_marker_tail() {
        let buf = b"0123456789abcdefNAMEDPI";
        let Scan::Skip { len, reason } = scan_frame(buf, DEFAULT_MAX_FRAME_SIZE) else {
            panic!("expected skip");
        };
        assert_eq!(reason, SkipReason::NoMarker);
        assert_eq!(len, buf.len() - FRAME_MARKER.len());
        assert!(buf[len..].ends_with(b"NAMEDPI"));
    }

    #[test]
    fn test_non_numeric_lengths_resync() {
        let mut buf = b"NAMEDPIPE:START:ab:2:x:yy:END:".to_vec();
        let good = encode("id", b"ok");
        buf.extend_from_slice(&good);

        assert_eq!(
            scan_frame(&buf, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                len: 1,
                reason: SkipReason::MalformedHeader,
            }
        );
        // After the skip the corrupt marker is gone and the next frame decodes.
        let msg = decode(&buf[1..]);
        assert_eq!(msg.content.as_ref(), b"ok");
    }

    #[test]
    fn test_signed_or_empty_lengths_are_malformed() {
        for header in [
            &b"NAMEDPIPE:START:+1:1:a:b:END:"[..],
            &b"NAMEDPIPE:START::1:a:b:END:"[..],
            &b"NAMEDPIPE:START:1: 1:a:b:END:"[..],
        ] {
            assert!(matches!(
                scan_frame(header, DEFAULT_MAX_FRAME_SIZE),
                Scan::Skip {
                    reason: SkipReason::MalformedHeader,
                    ..
                }
            ));
        }
    }

    #[test]
    fn test_runaway_length_field_is_malformed() {
        let buf = b"NAMEDPIPE:START:123456789012345678901234567890";
        assert!(matches!(
            scan_frame(buf, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                reason: SkipReason::MalformedHeader,
                ..
            }
        ));
    }

    #[test]
    fn test_oversized_declaration_resyncs() {
        let buf = encode("id", &[1u8; 64]);
        assert!(matches!(
            scan_frame(&buf, 32),
            Scan::Skip {
                len: 1,
                reason: SkipReason::Oversized,
            }
        ));

        let overflow = b"NAMEDPIPE:START:18446744073709551615:1:";
        assert!(matches!(
            scan_frame(overflow, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                reason: SkipReason::Oversized,
                ..
            }
        ));
    }

    #[test]
    fn test_bad_trailer_resyncs() {
        let buf = b"NAMEDPIPE:START:2:2:id:ab:XXX:";
        assert_eq!(
            scan_frame(buf, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                len: 1,
                reason: SkipReason::BadTerminator,
            }
        );

        let missing_separator = b"NAMEDPIPE:START:2:2:idXab:END:";
        assert!(matches!(
            scan_frame(missing_separator, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                reason: SkipReason::BadTerminator,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_identifier_resyncs() {
        let buf = b"NAMEDPIPE:START:1:1:\xff:a:END:";
        assert!(matches!(
            scan_frame(buf, DEFAULT_MAX_FRAME_SIZE),
            Scan::Skip {
                reason: SkipReason::InvalidIdentifier,
                ..
            }
        ));
    }

    #[test]
    fn test_total_length_arithmetic() {
        // 16 marker + "3:5:" + "abc" + ":" + "hello" + ":END:" = 34 bytes.
        let buf = b"NAMEDPIPE:START:3:5:abc:hello:END:trailing";
        let msg = decode(buf);
        assert_eq!(msg.identifier, "abc");
        assert_eq!(msg.content.as_ref(), b"hello");
        assert_eq!(msg.consumed, 34);
    }

    #[test]
    fn test_multiple_frames() {
        let mut buf = encode("one", b"first");
        encode_frame("two", b"second", &mut buf);

        let first = decode(&buf);
        assert_eq!(first.identifier, "one");
        assert_eq!(first.content.as_ref(), b"first");

        let second = decode(&buf[first.consumed..]);
        assert_eq!(second.identifier, "two");
        assert_eq!(second.content.as_ref(), b"second");
        assert_eq!(first.consumed + second.consumed, buf.len());
    }

    #[test]
    fn test_into_frame() {
        let msg = decode(&encode("id", b"x"));
        assert_eq!(msg.into_frame(), Frame::new("id", &b"x"[..]));
    }

    #[test]
    fn test_decimal_digits() {
        assert_eq!(decimal_digits(0), 1);
        assert_eq!(decimal_digits(9), 1);
        assert_eq!(decimal_digits(10), 2);
        assert_eq!(decimal_digits(8096), 4);
    }
}
