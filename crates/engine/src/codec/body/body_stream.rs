use crate::codec::body::body_reader::{apply_trailer, next_payload};
use crate::codec::body::payload_decoder::PayloadDecoder;
use crate::network::Reader;
use crate::protocol::{ContentLength, ParseError, PayloadItem, Trailer};
use bytes::{Buf, Bytes, BytesMut};
use std::fmt::{Debug, Formatter};
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

/// A message body read lazily from the connection.
///
/// The stream borrows the connection's [`Reader`] for as long as it lives, so
/// the next message cannot be read before the stream is gone. Whatever the
/// consumer leaves unread must be discarded with [`BodyStream::release`] to
/// keep the connection aligned on message boundaries.
///
/// Dropping an unreleased stream consumes the rest of the body only if it is
/// already buffered; otherwise the reader is poisoned and the connection will
/// not be reused.
pub struct BodyStream<'r> {
    reader: &'r mut dyn Reader,
    decoder: PayloadDecoder,
    pending: Bytes,
    trailer: Trailer,
    finished: bool,
}

impl<'r> BodyStream<'r> {
    pub fn new(reader: &'r mut dyn Reader, content_length: ContentLength) -> Self {
        Self::from_parts(reader, PayloadDecoder::new(content_length), Bytes::new(), false)
    }

    pub(crate) fn from_parts(
        reader: &'r mut dyn Reader,
        decoder: PayloadDecoder,
        prefix: Bytes,
        disable_normalizing: bool,
    ) -> Self {
        let mut trailer = Trailer::new();
        trailer.set_disable_normalizing(disable_normalizing);
        Self { reader, decoder, pending: prefix, trailer, finished: false }
    }

    /// Whether the end of the body has been read from the connection.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Trailer fields, available once the stream is finished.
    #[inline]
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn take_trailer(&mut self) -> Trailer {
        std::mem::take(&mut self.trailer)
    }

    /// Returns the next piece of the body, `None` at its end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>, ParseError> {
        if !self.pending.is_empty() {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        if self.finished {
            return Ok(None);
        }

        match next_payload(&mut *self.reader, &mut self.decoder).await {
            Ok(PayloadItem::Chunk(bytes)) => Ok(Some(bytes)),
            Ok(PayloadItem::Eof) => {
                self.finished = true;
                apply_trailer(&mut self.decoder, &mut self.trailer)?;
                Ok(None)
            }
            Err(e) => {
                self.reader.poison();
                Err(e)
            }
        }
    }

    /// Copies body bytes into `buf`, returning `0` at the end of the body.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ParseError> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            match self.chunk().await? {
                Some(bytes) => self.pending = bytes,
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }

    /// Appends the rest of the body to `dst`, returning the number of bytes appended.
    pub async fn read_to_end(&mut self, dst: &mut BytesMut) -> Result<usize, ParseError> {
        let mut total = 0;
        while let Some(bytes) = self.chunk().await? {
            total += bytes.len();
            dst.extend_from_slice(&bytes);
        }
        Ok(total)
    }

    /// Discards the unread rest of the body, leaving the connection at the
    /// start of the next message. Calling it again is a no-op.
    pub async fn release(&mut self) -> Result<(), ParseError> {
        self.pending.clear();
        let mut skipped = 0;
        while let Some(bytes) = self.chunk().await? {
            skipped += bytes.len();
        }
        if skipped > 0 {
            debug!(skipped, "skipped unread body bytes");
        }
        Ok(())
    }
}

impl Drop for BodyStream<'_> {
    fn drop(&mut self) {
        if self.finished || self.reader.is_poisoned() {
            return;
        }

        loop {
            match self.decoder.decode(self.reader.buffer()) {
                Ok(Some(PayloadItem::Chunk(_))) => continue,
                Ok(Some(PayloadItem::Eof)) => {
                    self.finished = true;
                    warn!("body stream dropped without release, skipped the buffered remainder");
                    return;
                }
                Ok(None) | Err(_) => break,
            }
        }

        warn!("body stream dropped before the body was read, the connection can not be reused");
        self.reader.poison();
    }
}

impl Debug for BodyStream<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyStream")
            .field("decoder", &self.decoder)
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
