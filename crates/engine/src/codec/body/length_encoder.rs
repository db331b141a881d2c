//! Encoder for bodies framed by `Content-Length`.

use crate::ensure;
use crate::protocol::{PayloadItem, SendError};
use bytes::BytesMut;
use tokio_util::codec::Encoder;
use tracing::warn;

/// Copies payload bytes through while holding the sender to the announced length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    length: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { length }
    }

    #[inline]
    pub fn remaining(&self) -> u64 {
        self.length
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.length == 0
    }
}

impl Encoder<PayloadItem> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                if bytes.is_empty() {
                    return Ok(());
                }
                if self.length == 0 {
                    warn!(len = bytes.len(), "body longer than its content length");
                    return Err(SendError::invalid_body("body longer than its content length"));
                }
                ensure!(
                    bytes.len() as u64 <= self.length,
                    SendError::invalid_body(format!("{} bytes left but got {}", self.length, bytes.len()))
                );
                dst.extend_from_slice(&bytes);
                self.length -= bytes.len() as u64;
                Ok(())
            }
            PayloadItem::Eof => {
                ensure!(
                    self.length == 0,
                    SendError::invalid_body(format!("body ended {} bytes before its content length", self.length))
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_exact_length() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        encoder.encode(PayloadItem::Eof, &mut dst).unwrap();
        assert_eq!(&dst[..], b"hello");
        assert!(encoder.is_finished());
    }

    #[test]
    fn test_length_mismatch() {
        let mut encoder = LengthEncoder::new(2);
        let mut dst = BytesMut::new();
        assert!(encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"abc")), &mut dst).is_err());
        assert!(encoder.encode(PayloadItem::Eof, &mut dst).is_err());
        assert!(dst.is_empty());
    }
}
