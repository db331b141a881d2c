//! Client side reading of responses.
//!
//! An interim `100 Continue` response is skipped. The body is read unless the
//! response cannot have one: a reply to `HEAD` (signalled through
//! [`Response::set_skip_body`]) or a 1xx, 204 or 304 status.

use crate::codec::body::{BodyRead, BodyStream, read_body, read_body_streaming};
use crate::codec::header::{parse_response_header, read_header_block};
use crate::network::Reader;
use crate::protocol::{ContentLength, ParseError, Response, ResponseHeader};
use http::StatusCode;
use tracing::trace;

/// Reads the final response header into `header`, skipping `100 Continue`.
pub async fn read_response_header(reader: &mut dyn Reader, header: &mut ResponseHeader) -> Result<(), ParseError> {
    loop {
        read_header_block(&mut *reader, |buf| {
            header.reset();
            parse_response_header(header, buf)
        })
        .await?;

        if header.status() != StatusCode::CONTINUE {
            return Ok(());
        }
        trace!("skipped interim 100 continue response");
    }
}

fn has_body(response: &Response) -> bool {
    !response.skip_body() && !response.header.must_skip_body()
}

/// Reads a whole response; the body is limited to `max_body_size`.
///
/// After the body is read, the header's content length is the body's length.
pub async fn read_response(reader: &mut dyn Reader, response: &mut Response, max_body_size: usize) -> Result<(), ParseError> {
    read_response_header(reader, &mut response.header).await?;
    if !has_body(response) {
        return Ok(());
    }

    let (header, body) = response.parts_mut();
    let dst = body.buffer_mut();
    dst.clear();
    read_body(reader, header.content_length(), max_body_size, dst, header.trailer_mut()).await?;
    header.set_content_length(ContentLength::Length(dst.len() as u64));
    Ok(())
}

/// Reads a response, buffering bodies up to `max_body_size` and streaming
/// larger ones. A returned stream must be released before the connection is
/// used again.
pub async fn read_response_stream<'r>(
    reader: &'r mut dyn Reader,
    response: &mut Response,
    max_body_size: usize,
) -> Result<Option<BodyStream<'r>>, ParseError> {
    read_response_header(&mut *reader, &mut response.header).await?;
    if !has_body(response) {
        return Ok(None);
    }

    let (header, body) = response.parts_mut();
    let dst = body.buffer_mut();
    dst.clear();
    match read_body_streaming(reader, header.content_length(), max_body_size, dst, header.trailer_mut()).await? {
        BodyRead::Complete => {
            header.set_content_length(ContentLength::Length(dst.len() as u64));
            Ok(None)
        }
        BodyRead::Streaming(stream) => Ok(Some(stream)),
    }
}
