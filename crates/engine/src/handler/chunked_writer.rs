//! Streaming a response body while the handler is still running.

use crate::codec::body::ChunkedEncoder;
use crate::codec::header::encode_response_header;
use crate::ensure;
use crate::network::Writer;
use crate::protocol::{ContentLength, PayloadItem, RequestHeader, Response, SendError};
use bytes::Bytes;
use std::fmt::{Debug, Formatter};
use tokio_util::codec::Encoder;
use tracing::trace;

const FLUSH_THRESHOLD: usize = 64 * 1024;

#[derive(Debug)]
enum Framing {
    Chunked(ChunkedEncoder),
    /// HTTP/1.0 peers cannot read chunks; the body ends with the connection.
    UntilClose,
    NoBody,
}

/// How far a streamed response got, kept by the [`RequestContext`](super::RequestContext).
#[derive(Debug, Default)]
pub(crate) struct StreamState {
    framing: Option<Framing>,
    finished: bool,
}

impl StreamState {
    /// Whether the response header has been written.
    #[inline]
    pub(crate) fn is_started(&self) -> bool {
        self.framing.is_some()
    }

    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Writes the response body in chunks before the handler returns.
///
/// The response header is encoded with the first call, so changes to it made
/// afterwards are not sent, except for the trailer fields which
/// [`finalize`](Self::finalize) writes after the last chunk. Chunks stay
/// buffered until [`flush`](Self::flush). A body the handler leaves open is
/// finalized by the connection once the handler returns.
pub struct ChunkedWriter<'c> {
    request: &'c RequestHeader,
    response: &'c mut Response,
    writer: &'c mut dyn Writer,
    state: &'c mut StreamState,
}

impl<'c> ChunkedWriter<'c> {
    pub(crate) fn new(
        request: &'c RequestHeader,
        response: &'c mut Response,
        writer: &'c mut dyn Writer,
        state: &'c mut StreamState,
    ) -> Self {
        Self { request, response, writer, state }
    }

    fn start(&mut self) -> Result<(), SendError> {
        if self.state.is_started() {
            return Ok(());
        }

        let header = &mut self.response.header;
        let framing = if !self.request.is_http11() {
            header.set_content_length(ContentLength::Identity);
            header.set_connection_close(true);
            Framing::UntilClose
        } else {
            header.set_content_length(ContentLength::Chunked);
            Framing::Chunked(ChunkedEncoder::new())
        };
        if self.request.connection_close() {
            header.set_connection_close(true);
        }
        let framing = if self.request.is_head() || header.must_skip_body() { Framing::NoBody } else { framing };

        encode_response_header(header, self.writer.buffer_mut())?;
        trace!(status = header.status().as_u16(), framing = ?framing, "started streamed response");
        self.state.framing = Some(framing);
        Ok(())
    }

    /// Appends `data` as one chunk, writing the response header first if needed.
    ///
    /// Empty slices are skipped: a zero-size chunk would end the body.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), SendError> {
        ensure!(!self.state.is_finished(), SendError::invalid_body("response body already finalized"));
        self.start()?;

        let dst = self.writer.buffer_mut();
        match &mut self.state.framing {
            Some(Framing::Chunked(encoder)) => encoder.encode(PayloadItem::Chunk(Bytes::copy_from_slice(data)), dst)?,
            Some(Framing::UntilClose) => dst.extend_from_slice(data),
            Some(Framing::NoBody) | None => {}
        }

        if self.writer.buffered_len() >= FLUSH_THRESHOLD {
            self.writer.flush().await?;
        }
        Ok(())
    }

    /// Sends everything written so far to the peer.
    pub async fn flush(&mut self) -> Result<(), SendError> {
        self.start()?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Ends the body with the last chunk and the response trailer, then flushes.
    ///
    /// Calling it again only flushes.
    pub async fn finalize(&mut self) -> Result<(), SendError> {
        if !self.state.is_finished() {
            self.start()?;
            if let Some(Framing::Chunked(encoder)) = &mut self.state.framing {
                encoder.encode_last(self.response.header.trailer(), self.writer.buffer_mut());
                trace!(size = encoder.send_size(), "finalized chunked response body");
            }
            self.state.finished = true;
        }
        self.writer.flush().await?;
        Ok(())
    }
}

impl Debug for ChunkedWriter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedWriter").field("state", &self.state).finish_non_exhaustive()
    }
}
