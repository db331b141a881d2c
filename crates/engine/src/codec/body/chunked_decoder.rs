//! Decoder for HTTP chunked transfer encoding.
//!
//! See [RFC 9112 Section 7.1](https://www.rfc-editor.org/rfc/rfc9112#section-7.1).
//! Each chunk is a hex size line, the chunk data and a CRLF. The zero-size chunk
//! is followed by an optional trailer block, which is scanned with the same
//! [`HeaderScanner`](crate::codec::header::HeaderScanner) used for headers.
//!
//! Every framing violation is reported as [`ParseError::ChunkFraming`]: once a
//! chunked body went wrong, the position of the next message is unknown.

use crate::codec::header::{MAX_HEADER_BYTES, scan_headers};
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use std::task::Poll;
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// Trailer fields collected after the last chunk, in wire order.
pub type TrailerFields = Vec<(Vec<u8>, Vec<u8>)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining_size: u64,
    size_digits: usize,
    disable_normalizing: bool,
    trailer: TrailerFields,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining_size: 0, size_digits: 0, disable_normalizing: false, trailer: Vec::new() }
    }

    /// Keeps trailer field names as received instead of normalizing them.
    pub fn disable_normalizing(mut self, disable: bool) -> Self {
        self.disable_normalizing = disable;
        self
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.state == End
    }

    /// Takes the trailer fields received after the last chunk.
    pub fn take_trailer(&mut self) -> TrailerFields {
        std::mem::take(&mut self.trailer)
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Read the chunk size in hex
    Size,
    /// Spaces after the size
    SizeLws,
    /// Skip chunk extensions
    Extension,
    /// LF after the size line
    SizeLf,
    Body,
    BodyCr,
    BodyLf,
    /// Trailer block after the last chunk, up to and including the blank line
    Trailer,
    End,
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("finished reading chunked data");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut buf = None;

            self.state = match self.step(src, &mut buf) {
                Poll::Pending => return Ok(None),
                Poll::Ready(Ok(new_state)) => new_state,
                Poll::Ready(Err(e)) => return Err(e),
            };

            if let Some(bytes) = buf {
                trace!(len = bytes.len(), "read chunked bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::UnexpectedEof),
        }
    }
}

macro_rules! try_next_byte {
    ($src:ident) => {{
        if !$src.is_empty() {
            $src.get_u8()
        } else {
            return Poll::Pending;
        }
    }};
}

fn framing<T>(reason: &str) -> Poll<Result<T, ParseError>> {
    Poll::Ready(Err(ParseError::chunk_framing(reason)))
}

impl ChunkedDecoder {
    fn step(&mut self, src: &mut BytesMut, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
        match self.state {
            Size => self.read_size(src),
            SizeLws => read_size_lws(src),
            Extension => read_extension(src),
            SizeLf => self.read_size_lf(src),
            Body => read_body(src, &mut self.remaining_size, buf),
            BodyCr => read_body_cr(src),
            BodyLf => read_body_lf(src),
            Trailer => self.read_trailer(src),
            End => Poll::Ready(Ok(End)),
        }
    }

    /// Accumulates one hex digit of the size, or leaves the size on a delimiter.
    fn read_size(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        let digit = match try_next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            delimiter @ (b'\t' | b' ' | b';' | b'\r') => {
                if self.size_digits == 0 {
                    return framing("missing chunk size");
                }
                return Poll::Ready(Ok(match delimiter {
                    b';' => Extension,
                    b'\r' => SizeLf,
                    _ => SizeLws,
                }));
            }
            _ => return framing("invalid chunk size"),
        };

        let size = self.remaining_size.checked_mul(16).and_then(|size| size.checked_add(u64::from(digit)));
        match size {
            Some(size) => {
                self.remaining_size = size;
                self.size_digits += 1;
                Poll::Ready(Ok(Size))
            }
            None => framing("chunk size overflow"),
        }
    }

    fn read_size_lf(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        match try_next_byte!(src) {
            b'\n' => {
                self.size_digits = 0;
                if self.remaining_size == 0 { Poll::Ready(Ok(Trailer)) } else { Poll::Ready(Ok(Body)) }
            }
            _ => framing("invalid chunk size LF"),
        }
    }

    fn read_trailer(&mut self, src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
        let consumed = match scan_headers(src, self.disable_normalizing) {
            Ok((fields, consumed)) => {
                self.trailer.extend(fields.into_iter().map(|field| (field.name.into_owned(), field.value.into_owned())));
                consumed
            }
            Err(ParseError::NeedMoreData) if src.len() > MAX_HEADER_BYTES => {
                return framing("trailer block too large");
            }
            Err(ParseError::NeedMoreData) => return Poll::Pending,
            Err(e) => return Poll::Ready(Err(ParseError::chunk_framing(format!("invalid trailer: {e}")))),
        };
        src.advance(consumed);
        trace!(fields = self.trailer.len(), "read chunked trailer");
        Poll::Ready(Ok(End))
    }
}

fn read_size_lws(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
    match try_next_byte!(src) {
        // no more digits may follow the spaces
        b'\t' | b' ' => Poll::Ready(Ok(SizeLws)),
        b';' => Poll::Ready(Ok(Extension)),
        b'\r' => Poll::Ready(Ok(SizeLf)),
        _ => framing("invalid chunk size linear white space"),
    }
}

/// Extensions are ignored up to the CR; a bare LF inside one is rejected.
fn read_extension(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(SizeLf)),
        b'\n' => framing("chunk extension contains newline"),
        _ => Poll::Ready(Ok(Extension)),
    }
}

fn read_body(src: &mut BytesMut, remaining_size: &mut u64, buf: &mut Option<Bytes>) -> Poll<Result<ChunkedState, ParseError>> {
    if src.is_empty() {
        return Poll::Ready(Ok(Body));
    }

    if *remaining_size == 0 {
        return Poll::Ready(Ok(BodyCr));
    }

    let remaining = usize::try_from(*remaining_size).unwrap_or(usize::MAX);
    let read_size = remaining.min(src.len());

    *remaining_size -= read_size as u64;
    *buf = Some(src.split_to(read_size).freeze());

    if *remaining_size > 0 { Poll::Ready(Ok(Body)) } else { Poll::Ready(Ok(BodyCr)) }
}

fn read_body_cr(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
    match try_next_byte!(src) {
        b'\r' => Poll::Ready(Ok(BodyLf)),
        _ => framing("missing CR after chunk data"),
    }
}

fn read_body_lf(src: &mut BytesMut) -> Poll<Result<ChunkedState, ParseError>> {
    match try_next_byte!(src) {
        b'\n' => Poll::Ready(Ok(Size)),
        _ => framing("missing LF after chunk data"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut ChunkedDecoder, buffer: &mut BytesMut) -> Result<Vec<u8>, ParseError> {
        let mut body = Vec::new();
        loop {
            match decoder.decode(buffer)? {
                Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
                Some(PayloadItem::Eof) => return Ok(body),
                None => return Err(ParseError::NeedMoreData),
            }
        }
    }

    #[test]
    fn test_single_chunk() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        let body = decode_all(&mut decoder, &mut buffer).unwrap();
        assert_eq!(body, b"hello");
        assert!(decoder.take_trailer().is_empty());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multiple_chunks_leave_next_message() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n7\r\n, world\r\n0\r\n\r\nGET / HTTP/1.1\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(decode_all(&mut decoder, &mut buffer).unwrap(), b"hello, world");
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n");
    }

    #[test]
    fn test_size_with_spaces_and_extension() {
        let mut buffer = BytesMut::from(&b"A  \r\n0123456789\r\n3;name=value\r\nabc\r\n0\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert_eq!(decode_all(&mut decoder, &mut buffer).unwrap(), b"0123456789abc");
    }

    #[test]
    fn test_trailer_fields() {
        let mut buffer = BytesMut::from(&b"5\r\nhello\r\n0\r\nx-checksum: abc\r\nX-Other:  1 \r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();

        assert_eq!(decode_all(&mut decoder, &mut buffer).unwrap(), b"hello");
        let trailer = decoder.take_trailer();
        assert_eq!(trailer, vec![(b"X-Checksum".to_vec(), b"abc".to_vec()), (b"X-Other".to_vec(), b"1".to_vec())]);
    }

    #[test]
    fn test_incomplete_input() {
        let mut buffer = BytesMut::from(&b"5\r\nhel"[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"hel"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"lo\r\n0\r\nX-Late: 1\r");
        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap(), &Bytes::from_static(b"lo"));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
        assert!(!decoder.is_finished());

        buffer.extend_from_slice(b"\n\r\n");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(decoder.take_trailer().len(), 1);
    }

    #[test]
    fn test_byte_at_a_time() {
        let wire = b"3\r\nabc\r\n10\r\n0123456789abcdef\r\n0\r\nX-A: b\r\n\r\n";
        let mut decoder = ChunkedDecoder::new();
        let mut buffer = BytesMut::new();
        let mut body = Vec::new();
        let mut finished = false;
        for &byte in wire.iter() {
            buffer.extend_from_slice(&[byte]);
            while let Some(item) = decoder.decode(&mut buffer).unwrap() {
                match item {
                    PayloadItem::Chunk(bytes) => body.extend_from_slice(&bytes),
                    PayloadItem::Eof => {
                        finished = true;
                        break;
                    }
                }
            }
        }
        assert!(finished);
        assert_eq!(body, b"abc0123456789abcdef");
    }

    #[test]
    fn test_framing_errors() {
        let cases: [&[u8]; 6] = [
            b"xyz\r\n",
            b"\r\n",
            b";ext\r\n",
            b"5\r\nhelloBad",
            b"5 x\r\n",
            b"fffffffffffffffff\r\n",
        ];
        for case in cases {
            let mut buffer = BytesMut::from(case);
            let mut decoder = ChunkedDecoder::new();
            let result = decode_all(&mut decoder, &mut buffer);
            assert!(matches!(result, Err(ParseError::ChunkFraming { .. })), "case {:?}", String::from_utf8_lossy(case));
        }
    }

    #[test]
    fn test_invalid_trailer() {
        let mut buffer = BytesMut::from(&b"0\r\nbad\nname: x\r\n\r\n"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(matches!(decode_all(&mut decoder, &mut buffer), Err(ParseError::ChunkFraming { .. })));
    }

    #[test]
    fn test_truncated_at_eof() {
        let mut buffer = BytesMut::from(&b"5\r\nhe"[..]);
        let mut decoder = ChunkedDecoder::new();
        assert!(decoder.decode_eof(&mut buffer).unwrap().unwrap().is_chunk());
        assert!(matches!(decoder.decode_eof(&mut buffer), Err(ParseError::UnexpectedEof)));
    }

    #[test]
    fn test_large_chunk() {
        let size = 1024 * 1024;
        let mut data = Vec::with_capacity(size + 16);
        data.extend(format!("{size:x}\r\n").into_bytes());
        data.extend(vec![b'A'; size]);
        data.extend(b"\r\n0\r\n\r\n");

        let mut buffer = BytesMut::from(&data[..]);
        let mut decoder = ChunkedDecoder::new();

        let chunk = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(chunk.as_bytes().unwrap().len(), size);
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
    }
}
