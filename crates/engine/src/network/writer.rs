use async_trait::async_trait;
use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Buffered byte sink of a connection.
///
/// Encoders append to [`Writer::buffer_mut`]; nothing reaches the peer until
/// [`Writer::flush`] is called.
#[async_trait]
pub trait Writer: Send {
    fn buffer_mut(&mut self) -> &mut BytesMut;

    /// Writes the buffered bytes to the underlying stream and flushes it.
    async fn flush(&mut self) -> io::Result<()>;

    #[inline]
    fn write_binary(&mut self, bytes: &[u8]) {
        self.buffer_mut().extend_from_slice(bytes);
    }

    #[inline]
    fn buffered_len(&mut self) -> usize {
        self.buffer_mut().len()
    }
}

#[derive(Debug)]
pub struct ConnWriter<W> {
    writer: W,
    buffer: BytesMut,
    write_timeout: Option<Duration>,
}

impl<W> ConnWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, 8 * 1024)
    }

    pub fn with_capacity(writer: W, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), write_timeout: None }
    }

    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    #[inline]
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn clear_buf(&mut self) {
        self.buffer.clear();
    }

    /// Takes the writer apart; bytes not yet flushed are discarded.
    pub fn into_inner(self) -> W {
        self.writer
    }

    async fn write_out(&mut self) -> io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(self.buffer.as_ref()).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }
}

#[async_trait]
impl<W> Writer for ConnWriter<W>
where
    W: AsyncWrite + Unpin + Send,
{
    #[inline]
    fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }

    async fn flush(&mut self) -> io::Result<()> {
        match self.write_timeout {
            Some(duration) => tokio::time::timeout(duration, self.write_out())
                .await
                .map_err(|_elapsed| io::Error::new(io::ErrorKind::TimedOut, "write timeout"))?,
            None => self.write_out().await,
        }
    }
}

/// In-memory [`Writer`], useful for rendering a message to bytes.
#[async_trait]
impl Writer for BytesMut {
    #[inline]
    fn buffer_mut(&mut self) -> &mut BytesMut {
        self
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
