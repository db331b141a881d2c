use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

const INIT_BUFFER_SIZE: usize = 8 * 1024;
const MIN_READ_SPACE: usize = 1024;

/// Byte source of a connection with a read-ahead buffer.
///
/// Everything the parsers look at lives in [`Reader::buffered`]; bytes leave the
/// buffer only through [`Reader::skip`], [`Reader::read_byte`] or by splitting
/// them off [`Reader::buffer`], so looking ahead never loses data.
#[async_trait]
pub trait Reader: Send {
    /// The read-ahead buffer. Consumers split or advance it to consume bytes.
    fn buffer(&mut self) -> &mut BytesMut;

    fn buffered(&self) -> &[u8];

    /// Reads more bytes from the underlying stream into the buffer.
    ///
    /// Returns the number of bytes appended, `0` at end of stream.
    async fn fill(&mut self) -> io::Result<usize>;

    /// Marks the reader as no longer aligned with message framing.
    fn poison(&mut self);

    fn is_poisoned(&self) -> bool;

    #[inline]
    fn buffered_len(&self) -> usize {
        self.buffered().len()
    }

    /// Waits until at least `n` bytes are buffered and returns the first `n`
    /// without consuming them.
    async fn peek(&mut self, n: usize) -> io::Result<&[u8]> {
        while self.buffered_len() < n {
            if self.fill().await? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended before peek completed"));
            }
        }
        Ok(&self.buffered()[..n])
    }

    /// Discards the next `n` bytes, reading from the stream as needed.
    async fn skip(&mut self, n: usize) -> io::Result<()> {
        let mut remaining = n;
        loop {
            let available = remaining.min(self.buffered_len());
            self.buffer().advance(available);
            remaining -= available;
            if remaining == 0 {
                return Ok(());
            }
            if self.fill().await? == 0 {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stream ended before skip completed"));
            }
        }
    }

    async fn read_byte(&mut self) -> io::Result<u8> {
        let byte = self.peek(1).await?[0];
        self.buffer().advance(1);
        Ok(byte)
    }
}

/// [`Reader`] over a tokio [`AsyncRead`], with an optional per-read timeout.
#[derive(Debug)]
pub struct ConnReader<R> {
    inner: R,
    buffer: BytesMut,
    read_timeout: Option<Duration>,
    poisoned: bool,
}

impl<R> ConnReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, INIT_BUFFER_SIZE)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self { inner, buffer: BytesMut::with_capacity(capacity), read_timeout: None, poisoned: false }
    }

    /// Sets the deadline applied to every single read; `None` waits forever.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    #[inline]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Takes the reader apart, returning the stream and the bytes read ahead of it.
    pub fn into_parts(self) -> (R, BytesMut) {
        (self.inner, self.buffer)
    }
}

#[async_trait]
impl<R> Reader for ConnReader<R>
where
    R: AsyncRead + Unpin + Send,
{
    #[inline]
    fn buffer(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    #[inline]
    fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    async fn fill(&mut self) -> io::Result<usize> {
        if self.buffer.capacity() - self.buffer.len() < MIN_READ_SPACE {
            self.buffer.reserve(INIT_BUFFER_SIZE);
        }

        let read = self.inner.read_buf(&mut self.buffer);
        let n = match self.read_timeout {
            Some(duration) => tokio::time::timeout(duration, read)
                .await
                .map_err(|_elapsed| io::Error::new(io::ErrorKind::TimedOut, "read timeout"))??,
            None => read.await?,
        };
        trace!(n, buffered = self.buffer.len(), "filled read buffer");
        Ok(n)
    }

    fn poison(&mut self) {
        self.poisoned = true;
    }

    fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::TrickleReader;

    #[tokio::test]
    async fn test_peek_does_not_consume() {
        let mut reader = ConnReader::new(&b"hello world"[..]);
        assert_eq!(reader.peek(5).await.unwrap(), b"hello");
        assert_eq!(reader.peek(5).await.unwrap(), b"hello");
        reader.skip(6).await.unwrap();
        assert_eq!(reader.read_byte().await.unwrap(), b'w');
        assert_eq!(reader.buffered(), b"orld");
    }

    #[tokio::test]
    async fn test_peek_past_eof() {
        let mut reader = ConnReader::new(&b"abc"[..]);
        let err = reader.peek(4).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(reader.buffered_len(), 3);
    }

    #[tokio::test]
    async fn test_skip_across_reads() {
        let mut reader = ConnReader::new(TrickleReader::new(b"0123456789"));
        reader.skip(7).await.unwrap();
        assert_eq!(reader.read_byte().await.unwrap(), b'7');

        let err = reader.skip(5).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let (client, _server) = tokio::io::duplex(64);
        let mut reader = ConnReader::new(client);
        reader.set_read_timeout(Some(Duration::from_millis(10)));
        let err = reader.fill().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
