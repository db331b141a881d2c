//! Encoder for HTTP chunked transfer encoding.

use crate::protocol::{PayloadItem, SendError, Trailer};
use bytes::{BufMut, BytesMut};
use std::io::Write;
use tokio_util::codec::Encoder;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: u64,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.eof
    }

    /// Payload bytes encoded so far, without framing.
    #[inline]
    pub fn send_size(&self) -> u64 {
        self.send_size
    }

    /// Writes the zero-size chunk, the trailer fields and the closing blank line.
    pub fn encode_last(&mut self, trailer: &Trailer, dst: &mut BytesMut) {
        if self.eof {
            return;
        }
        self.eof = true;
        dst.put_slice(b"0\r\n");
        trailer.encode(dst);
        dst.put_slice(b"\r\n");
    }
}

impl Encoder<PayloadItem> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            // a zero-size chunk would terminate the body
            PayloadItem::Chunk(bytes) if bytes.is_empty() => Ok(()),
            PayloadItem::Chunk(bytes) => {
                write!(dst.writer(), "{:X}\r\n", bytes.len())?;
                dst.reserve(bytes.len() + 2);
                dst.put_slice(&bytes);
                dst.put_slice(b"\r\n");
                self.send_size += bytes.len() as u64;
                Ok(())
            }
            PayloadItem::Eof => {
                self.encode_last(&Trailer::new(), dst);
                Ok(())
            }
        }
    }
}
