use crate::codec::header::MAX_HEADER_BYTES;
use crate::network::Reader;
use crate::protocol::ParseError;
use bytes::Buf;
use std::io;
use tracing::trace;

/// Reads one header block from `reader` and consumes it.
///
/// `parse` is retried on the whole read-ahead buffer whenever it reports
/// [`ParseError::NeedMoreData`], each time after waiting for one byte more than
/// is currently buffered. A small request therefore costs a single read, while
/// a block trickling in byte by byte still parses to the same result.
///
/// An end of stream before the first byte is [`ParseError::NothingRead`]; later
/// it is [`ParseError::UnexpectedEof`].
pub async fn read_header_block<F>(reader: &mut dyn Reader, mut parse: F) -> Result<usize, ParseError>
where
    F: FnMut(&[u8]) -> Result<usize, ParseError> + Send,
{
    let mut n = 1;
    loop {
        if let Err(e) = reader.peek(n).await {
            return Err(match e.kind() {
                io::ErrorKind::UnexpectedEof if n == 1 => ParseError::NothingRead,
                io::ErrorKind::UnexpectedEof => ParseError::UnexpectedEof,
                _ => ParseError::io(e),
            });
        }

        match parse(reader.buffered()) {
            Ok(consumed) => {
                reader.buffer().advance(consumed);
                trace!(consumed, "read header block");
                return Ok(consumed);
            }
            Err(ParseError::NeedMoreData) => {
                let buffered = reader.buffered_len();
                if buffered >= MAX_HEADER_BYTES {
                    return Err(ParseError::too_large_header(buffered, MAX_HEADER_BYTES));
                }
                n = buffered + 1;
            }
            Err(e) => return Err(e),
        }
    }
}
