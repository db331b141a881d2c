use crate::codec::body::{content_length_of, write_body};
use crate::codec::header::encode_request_header;
use crate::network::Writer;
use crate::protocol::{Request, SendError};
use tracing::trace;

/// Writes `request` into `writer`'s buffer; the caller flushes.
///
/// Framing follows the body exactly like [`write_response`](crate::codec::write_response).
pub async fn write_request(writer: &mut dyn Writer, request: &mut Request) -> Result<(), SendError> {
    let (header, body, _form) = request.parts_mut();

    header.set_content_length(content_length_of(body));
    encode_request_header(header, writer.buffer_mut())?;
    trace!(method = %header.method(), content_length = header.content_length_raw(), "encoded request header");

    write_body(writer, body, header.trailer()).await
}
