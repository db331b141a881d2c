//! Server side reading of requests.
//!
//! [`read_request_header`] reads and consumes the header block of the next
//! request; [`read_request_body`] then applies the request body policy:
//!
//! - a request without length framing has an empty body
//! - a GET-only server refuses every method but `GET` and `HEAD`
//! - bodies up to the size limit are buffered into the request, larger ones
//!   fail with `BodyTooLarge` or, when streaming is enabled, are handed out
//!   as a [`BodyStream`]
//! - a buffered form body can be decoded right away

use crate::codec::body::{BodyRead, BodyStream, read_body, read_body_streaming};
use crate::codec::header::{parse_request_header, read_header_block};
use crate::ensure;
use crate::network::Reader;
use crate::protocol::form::parse_form;
use crate::protocol::{ContentLength, ParseError, Request, RequestHeader};
use bytes::Bytes;
use tracing::trace;

/// How [`read_request_body`] treats request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestBodyOptions {
    pub max_body_size: usize,
    pub stream_body: bool,
    pub get_only: bool,
    pub pre_parse_form: bool,
}

impl Default for RequestBodyOptions {
    fn default() -> Self {
        Self { max_body_size: 4 * 1024 * 1024, stream_body: false, get_only: false, pre_parse_form: true }
    }
}

/// Reads the next request header into `header`, which is reset first.
pub async fn read_request_header(reader: &mut dyn Reader, header: &mut RequestHeader) -> Result<(), ParseError> {
    read_header_block(reader, |buf| {
        header.reset();
        parse_request_header(header, buf)
    })
    .await?;
    Ok(())
}

/// Reads the body of the request whose header was just read.
///
/// Returns a stream when the body is too large to buffer and streaming is
/// enabled; the stream must be released before the next request is read.
pub async fn read_request_body<'r>(
    reader: &'r mut dyn Reader,
    request: &mut Request,
    options: &RequestBodyOptions,
) -> Result<Option<BodyStream<'r>>, ParseError> {
    let (header, body, form) = request.parts_mut();
    ensure!(!options.get_only || header.is_get() || header.is_head(), ParseError::GetOnly);

    let content_length = match header.content_length() {
        // requests are never delimited by the end of the connection
        ContentLength::Identity | ContentLength::Length(0) => return Ok(None),
        content_length => content_length,
    };
    trace!(content_length = content_length.as_raw(), "reading request body");

    let dst = body.buffer_mut();
    if options.stream_body {
        match read_body_streaming(reader, content_length, options.max_body_size, dst, header.trailer_mut()).await? {
            BodyRead::Complete => {}
            BodyRead::Streaming(stream) => return Ok(Some(stream)),
        }
    } else {
        read_body(reader, content_length, options.max_body_size, dst, header.trailer_mut()).await?;
    }

    if options.pre_parse_form && !header.content_type().is_empty() {
        let bytes = Bytes::copy_from_slice(body.as_bytes());
        parse_form(header.content_type(), &bytes, form)?;
    }
    Ok(None)
}
