use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{trace, warn};

use crate::codec::{
    encode_frame, find_marker, scan_frame, DecodedMessage, Frame,
    DEFAULT_MAX_FRAME_SIZE,
};
use crate::error::FrameError;

/// `tokio_util` codec speaking the named-pipe frame format.
///
/// Pairs with `FramedRead` / `FramedWrite` over any async byte stream.
/// Decoding applies the same resynchronisation rules as
/// [`crate::FrameReader`].
#[derive(Debug, Clone, Copy)]
pub struct FifoCodec {
    max_frame_size: usize,
}

impl FifoCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for FifoCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl Decoder for FifoCodec {
    type Item = DecodedMessage;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match scan_frame(src, self.max_frame_size) {
                crate::Scan::Complete(msg) => {
                    src.advance(msg.consumed);
                    trace!(identifier = %msg.identifier, size = msg.content.len(), "decoded frame");
                    return Ok(Some(msg));
                }
                crate::Scan::Skip { len, reason } => {
                    warn!(discarded = len, ?reason, "skipping unusable bytes in pipe stream");
                    src.advance(len);
                }
                crate::Scan::Incomplete => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(msg) = self.decode(src)? {
            return Ok(Some(msg));
        }
        if src.is_empty() {
            return Ok(None);
        }
        if find_marker(src).is_some() {
            return Err(FrameError::ConnectionClosed);
        }
        // Trailing bytes that never started a frame.
        src.clear();
        Ok(None)
    }
}

impl Encoder<Frame> for FifoCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode((item.identifier.as_str(), item.payload.as_ref()), dst)
    }
}

impl Encoder<(&str, &[u8])> for FifoCodec {
    type Error = FrameError;

    fn encode(&mut self, item: (&str, &[u8]), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (identifier, payload) = item;
        let start = dst.len();
        let size = encode_frame(identifier, payload, dst);
        if size > self.max_frame_size {
            dst.truncate(start);
            return Err(FrameError::PayloadTooLarge {
                size,
                max: self.max_frame_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio_util::codec::{FramedRead, FramedWrite};

    use super::*;

    #[tokio::test]
    async fn framed_read_decodes_chunked_stream() {
        let mut wire = BytesMut::new();
        encode_frame("NAMEDPIPE", b"Some special message 0", &mut wire);
        encode_frame("other", b"NAMEDPIPE:END:", &mut wire);
        let wire = wire.freeze();

        let mut frames = FramedRead::new(wire.as_ref(), FifoCodec::default());

        let first = frames.next().await.unwrap().unwrap();
        assert_eq!(first.identifier, "NAMEDPIPE");
        assert_eq!(first.content.as_ref(), b"Some special message 0");

        let second = frames.next().await.unwrap().unwrap();
        assert_eq!(second.identifier, "other");
        assert_eq!(second.content.as_ref(), b"NAMEDPIPE:END:");

        assert!(frames.next().await.is_none());
    }

    #[tokio::test]
    async fn framed_write_then_read_over_duplex() {
        let (client, server) = tokio::io::duplex(64);

        let writer = tokio::spawn(async move {
            let mut sink = FramedWrite::new(client, FifoCodec::default());
            for i in 0..20 {
                sink.send(Frame::new("seq", format!("message {i}")))
                    .await
                    .unwrap();
            }
        });

        let mut frames = FramedRead::new(server, FifoCodec::default());
        for i in 0..20 {
            let msg = frames.next().await.unwrap().unwrap();
            assert_eq!(msg.identifier, "seq");
            assert_eq!(msg.content.as_ref(), format!("message {i}").as_bytes());
        }

        writer.await.unwrap();
        assert!(frames.next().await.is_none());
    }

    #[test]
    fn decode_skips_leading_garbage() {
        let mut codec = FifoCodec::default();
        let mut buf = BytesMut::from(&b"junk NAMEDPIPE:START:zz:"[..]);
        encode_frame("id", b"data", &mut buf);

        let msg = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(msg.identifier, "id");
        assert_eq!(msg.content.as_ref(), b"data");
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_partial_frame() {
        let mut codec = FifoCodec::default();
        let mut full = BytesMut::new();
        encode_frame("id", b"partial", &mut full);

        let mut buf = BytesMut::from(&full[..full.len() - 3]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&full[full.len() - 3..]);
        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn eof_mid_frame_is_connection_closed() {
        let mut codec = FifoCodec::default();
        let mut full = BytesMut::new();
        encode_frame("id", b"cut short", &mut full);
        let mut buf = BytesMut::from(&full[..full.len() - 1]);

        let err = codec.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[test]
    fn eof_with_trailing_noise_is_clean() {
        let mut codec = FifoCodec::default();
        let mut buf = BytesMut::from(&b"noise"[..]);
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn encode_rejects_oversized_frame() {
        let mut codec = FifoCodec::new(16);
        let mut dst = BytesMut::new();
        let err = codec
            .encode(Frame::new("id", "more than sixteen bytes"), &mut dst)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 16, .. }));
        assert!(dst.is_empty());
    }

    #[test]
    fn rejected_frame_leaves_earlier_output_intact() {
        let mut codec = FifoCodec::new(64);
        let mut dst = BytesMut::new();
        codec.encode(Frame::new("a", "ok"), &mut dst).unwrap();
        let before = dst.clone();

        let big = vec![b'x'; 128];
        let err = codec.encode(("b", big.as_slice()), &mut dst).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { max: 64, .. }));
        assert_eq!(dst, before);
    }
}
