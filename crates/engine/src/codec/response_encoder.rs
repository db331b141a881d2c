use crate::codec::body::{content_length_of, write_body};
use crate::codec::header::encode_response_header;
use crate::network::Writer;
use crate::protocol::{Response, SendError};
use tracing::trace;

/// Writes `response` into `writer`'s buffer; the caller flushes.
///
/// The framing is decided here from the body as it is now: a buffered body
/// gets its length, a streamed body of known size is copied as a fixed-length
/// body and one of unknown size is sent chunked, followed by the trailer.
/// Responses that may not carry a body, and those marked with
/// [`Response::set_skip_body`], are written without one.
pub async fn write_response(writer: &mut dyn Writer, response: &mut Response) -> Result<(), SendError> {
    let skip_body = response.skip_body() || response.header.must_skip_body();
    let (header, body) = response.parts_mut();

    header.set_content_length(content_length_of(body));
    encode_response_header(header, writer.buffer_mut())?;
    trace!(status = header.status().as_u16(), content_length = header.content_length_raw(), skip_body, "encoded response header");

    if !skip_body {
        write_body(writer, body, header.trailer()).await?;
    }
    Ok(())
}
