use bytes::{Bytes, BytesMut};
use std::fmt::{Debug, Formatter};
use tokio::io::AsyncRead;

/// Buffers larger than this are released on reset instead of being reused.
pub const MAX_RETAINED_BODY_CAPACITY: usize = 64 * 1024;

pub type BodySource = Box<dyn AsyncRead + Send + Unpin>;

/// Body owned by a [`Request`](crate::protocol::Request) or
/// [`Response`](crate::protocol::Response).
///
/// A buffered body is fully materialized and written with a `Content-Length`
/// computed at write time. A stream body is pulled from its source while
/// writing: with a known size it is copied as a fixed-length body, otherwise
/// it is sent chunked.
pub enum Body {
    Buffered(BytesMut),
    Stream { source: BodySource, size: Option<u64> },
}

impl Body {
    pub fn empty() -> Self {
        Body::Buffered(BytesMut::new())
    }

    #[inline]
    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream { .. })
    }

    /// The buffered bytes; a stream body has none.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Buffered(bytes) => bytes,
            Body::Stream { .. } => &[],
        }
    }

    /// Mutable access to the buffer, turning a stream body into an empty buffer.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        match self {
            Body::Buffered(bytes) => bytes,
            Body::Stream { .. } => {
                *self = Body::empty();
                self.buffer_mut()
            }
        }
    }

    pub fn set(&mut self, bytes: &[u8]) {
        let buffer = self.buffer_mut();
        buffer.clear();
        buffer.extend_from_slice(bytes);
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buffer_mut().extend_from_slice(bytes);
    }

    pub fn set_stream(&mut self, source: BodySource, size: Option<u64>) {
        *self = Body::Stream { source, size };
    }

    /// Takes the buffered bytes out, leaving an empty buffer behind.
    pub fn take_bytes(&mut self) -> Bytes {
        self.buffer_mut().split().freeze()
    }

    /// Clears the body for reuse, keeping the buffer unless it grew too large.
    pub fn reset(&mut self) {
        match self {
            Body::Buffered(bytes) if bytes.capacity() <= MAX_RETAINED_BODY_CAPACITY => bytes.clear(),
            _ => *self = Body::empty(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl Debug for Body {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Body::Stream { size, .. } => f.debug_struct("Stream").field("size", size).finish_non_exhaustive(),
        }
    }
}

impl From<&[u8]> for Body {
    fn from(bytes: &[u8]) -> Self {
        Body::Buffered(BytesMut::from(bytes))
    }
}

impl From<&str> for Body {
    fn from(str: &str) -> Self {
        Body::from(str.as_bytes())
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::Buffered(BytesMut::from(&bytes[..]))
    }
}
