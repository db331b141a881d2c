//! Writes message bodies onto a connection [`Writer`].

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::ensure;
use crate::network::Writer;
use crate::protocol::{Body, ContentLength, PayloadItem, SendError, Trailer};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Encoder;
use tracing::{trace, warn};

const COPY_BUF_SIZE: usize = 16 * 1024;
const FLUSH_THRESHOLD: usize = 64 * 1024;

async fn flush_if_full(writer: &mut dyn Writer) -> Result<(), SendError> {
    if writer.buffered_len() >= FLUSH_THRESHOLD {
        writer.flush().await?;
    }
    Ok(())
}

/// Copies exactly `length` bytes from `source`.
///
/// A source ending early is an error: the header already promised `length` bytes.
pub async fn write_body_fixed(
    writer: &mut dyn Writer,
    source: &mut (dyn AsyncRead + Send + Unpin),
    length: u64,
) -> Result<(), SendError> {
    let mut encoder = LengthEncoder::new(length);
    let mut buf = BytesMut::with_capacity(COPY_BUF_SIZE.min(length as usize));

    while !encoder.is_finished() {
        let want = encoder.remaining().min(COPY_BUF_SIZE as u64);
        buf.reserve(want as usize);
        let n = (&mut *source).take(want).read_buf(&mut buf).await?;
        ensure!(
            n > 0,
            SendError::invalid_body(format!("body source ended {} bytes before its length", encoder.remaining()))
        );
        encoder.encode(PayloadItem::Chunk(buf.split().freeze()), writer.buffer_mut())?;
        flush_if_full(writer).await?;
    }
    encoder.encode(PayloadItem::Eof, writer.buffer_mut())
}

/// Copies `source` as chunked body until it ends, then writes the last chunk
/// with `trailer`.
///
/// The header has already committed to chunked framing, so a failing source
/// does not fail the write: the body is terminated where the source broke and
/// the error is logged.
pub async fn write_body_chunked(
    writer: &mut dyn Writer,
    source: &mut (dyn AsyncRead + Send + Unpin),
    trailer: &Trailer,
) -> Result<(), SendError> {
    let mut encoder = ChunkedEncoder::new();
    let mut buf = BytesMut::with_capacity(COPY_BUF_SIZE);

    loop {
        buf.reserve(COPY_BUF_SIZE);
        match source.read_buf(&mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                encoder.encode(PayloadItem::Chunk(buf.split().freeze()), writer.buffer_mut())?;
                flush_if_full(writer).await?;
            }
            Err(e) => {
                warn!(cause = %e, "writing chunked response body encountered an error from the reader");
                break;
            }
        }
    }

    encoder.encode_last(trailer, writer.buffer_mut());
    trace!(size = encoder.send_size(), "finished writing chunked body");
    Ok(())
}

/// The framing `body` is written with: its length when known, chunked otherwise.
pub fn content_length_of(body: &Body) -> ContentLength {
    match body {
        Body::Buffered(bytes) => ContentLength::Length(bytes.len() as u64),
        Body::Stream { size: Some(size), .. } => ContentLength::Length(*size),
        Body::Stream { size: None, .. } => ContentLength::Chunked,
    }
}

/// Writes `body` framed as [`content_length_of`] reports; `trailer` follows a chunked body.
pub async fn write_body(writer: &mut dyn Writer, body: &mut Body, trailer: &Trailer) -> Result<(), SendError> {
    match body {
        Body::Buffered(bytes) => {
            writer.write_binary(bytes);
            Ok(())
        }
        Body::Stream { source, size: Some(size) } => write_body_fixed(writer, source.as_mut(), *size).await,
        Body::Stream { source, size: None } => write_body_chunked(writer, source.as_mut(), trailer).await,
    }
}
