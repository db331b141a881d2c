//! Async readers pulling a message body out of a connection [`Reader`].
//!
//! Two modes are offered. [`read_body`] materializes the whole body and fails
//! with [`ParseError::BodyTooLarge`] past the size limit. [`read_body_streaming`]
//! buffers bodies up to the limit and hands anything larger over as a
//! [`BodyStream`], keeping the bytes already decoded as its prefix.

use crate::codec::body::body_stream::BodyStream;
use crate::codec::body::payload_decoder::PayloadDecoder;
use crate::ensure;
use crate::network::Reader;
use crate::protocol::{ContentLength, ParseError, PayloadItem, Trailer};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

/// Outcome of [`read_body_streaming`].
#[derive(Debug)]
pub enum BodyRead<'r> {
    /// The whole body is in the destination buffer.
    Complete,
    /// The body was too large to buffer and continues in the stream.
    Streaming(BodyStream<'r>),
}

impl<'r> BodyRead<'r> {
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, BodyRead::Complete)
    }

    /// The stream over the rest of the body, `None` if it was fully buffered.
    pub fn into_stream(self) -> Option<BodyStream<'r>> {
        match self {
            BodyRead::Complete => None,
            BodyRead::Streaming(stream) => Some(stream),
        }
    }
}

/// Decodes the next payload item, reading from the connection when the
/// buffered bytes do not hold one.
pub(crate) async fn next_payload(reader: &mut dyn Reader, decoder: &mut PayloadDecoder) -> Result<PayloadItem, ParseError> {
    loop {
        if let Some(item) = decoder.decode(reader.buffer())? {
            return Ok(item);
        }
        if reader.fill().await? == 0 {
            return decoder.decode_eof(reader.buffer())?.ok_or(ParseError::UnexpectedEof);
        }
    }
}

/// Moves the trailer fields of a finished chunked body into `trailer`.
pub(crate) fn apply_trailer(decoder: &mut PayloadDecoder, trailer: &mut Trailer) -> Result<(), ParseError> {
    for (key, value) in decoder.take_trailer() {
        trailer.set(&key, &value)?;
    }
    Ok(())
}

/// Appends payload to `dst` until the body ends (`true`) or `dst` grows past `limit` (`false`).
async fn read_until_limit(
    reader: &mut dyn Reader,
    decoder: &mut PayloadDecoder,
    limit: usize,
    dst: &mut BytesMut,
) -> Result<bool, ParseError> {
    loop {
        match next_payload(reader, decoder).await? {
            PayloadItem::Chunk(bytes) => {
                dst.extend_from_slice(&bytes);
                if dst.len() > limit {
                    trace!(len = dst.len(), limit, "body grew past the limit");
                    return Ok(false);
                }
            }
            PayloadItem::Eof => return Ok(true),
        }
    }
}

fn decoder_for(content_length: ContentLength, trailer: &Trailer) -> PayloadDecoder {
    PayloadDecoder::new(content_length).disable_normalizing(trailer.is_disable_normalizing())
}

/// Reads a whole body into `dst`.
///
/// A fixed length above `max_body_size` fails before any byte is consumed;
/// chunked and identity bodies fail as soon as they grow past it. Trailer fields
/// of a chunked body are stored into `trailer`.
pub async fn read_body(
    reader: &mut dyn Reader,
    content_length: ContentLength,
    max_body_size: usize,
    dst: &mut BytesMut,
    trailer: &mut Trailer,
) -> Result<(), ParseError> {
    if let ContentLength::Length(len) = content_length {
        ensure!(len <= max_body_size as u64, ParseError::body_too_large(max_body_size));
        dst.reserve(len as usize);
    }

    let mut decoder = decoder_for(content_length, trailer);
    ensure!(
        read_until_limit(reader, &mut decoder, max_body_size, dst).await?,
        ParseError::body_too_large(max_body_size)
    );
    apply_trailer(&mut decoder, trailer)
}

/// Reads a body into `dst` if it fits into `max_body_size`, otherwise returns a
/// stream over the rest of it.
///
/// For a fixed length above the limit nothing is consumed and the stream
/// starts at the first body byte. Chunked and identity bodies are decoded until
/// they cross the limit; the bytes decoded so far move from `dst` into the
/// stream's prefix, so nothing is read twice.
pub async fn read_body_streaming<'r>(
    reader: &'r mut dyn Reader,
    content_length: ContentLength,
    max_body_size: usize,
    dst: &mut BytesMut,
    trailer: &mut Trailer,
) -> Result<BodyRead<'r>, ParseError> {
    let mut decoder = decoder_for(content_length, trailer);
    let disable_normalizing = trailer.is_disable_normalizing();

    if let ContentLength::Length(len) = content_length
        && len > max_body_size as u64
    {
        trace!(len, max_body_size, "streaming fixed length body");
        return Ok(BodyRead::Streaming(BodyStream::from_parts(reader, decoder, Bytes::new(), disable_normalizing)));
    }

    if read_until_limit(&mut *reader, &mut decoder, max_body_size, dst).await? {
        apply_trailer(&mut decoder, trailer)?;
        return Ok(BodyRead::Complete);
    }

    let prefix = dst.split().freeze();
    Ok(BodyRead::Streaming(BodyStream::from_parts(reader, decoder, prefix, disable_normalizing)))
}
