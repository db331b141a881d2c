use crate::client::{ClientOptions, Doer, do_request_follow_redirects};
use crate::codec::body::BodyStream;
use crate::codec::{read_response, read_response_stream, write_request};
use crate::network::{ConnReader, ConnWriter, Reader, Writer};
use crate::protocol::{ClientError, ParseError, Request, Response, SendError};
use async_trait::async_trait;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace};

/// One client connection, sending requests and reading their responses in turn.
///
/// Once a response or request carries `Connection: close`, a response could
/// not be read, or a streamed body was abandoned before its end, further
/// requests fail with [`ClientError::ConnectionClosed`].
#[derive(Debug)]
pub struct ClientConnection<R, W> {
    reader: ConnReader<R>,
    writer: ConnWriter<W>,
    options: ClientOptions,
    closed: bool,
}

impl<R, W> ClientConnection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_options(reader, writer, ClientOptions::default())
    }

    pub fn with_options(reader: R, writer: W, options: ClientOptions) -> Self {
        let mut reader = ConnReader::new(reader);
        reader.set_read_timeout(options.read_timeout);
        let mut writer = ConnWriter::new(writer);
        writer.set_write_timeout(options.write_timeout);
        Self { reader, writer, options, closed: false }
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    async fn send(&mut self, request: &mut Request, response: &mut Response) -> Result<(), ClientError> {
        if self.reader.is_poisoned() && !self.closed {
            debug!("previous response body was not read to its end, closing connection");
            self.closed = true;
        }
        if self.closed {
            return Err(ClientError::ConnectionClosed);
        }

        write_request(&mut self.writer, request).await?;
        self.writer.flush().await.map_err(SendError::io)?;
        trace!(uri = %String::from_utf8_lossy(request.header.uri()), "request sent");

        response.reset();
        response.header.set_disable_normalizing(self.options.disable_header_names_normalizing);
        response.set_skip_body(request.header.is_head());
        Ok(())
    }

    fn finish(&mut self, request: &Request, response: &Response) {
        if request.header.connection_close() || response.header.connection_close() {
            debug!(status = response.status().as_u16(), "connection will be closed after this response");
            self.closed = true;
        }
    }

    /// Like [`Doer::do_request`], but a body larger than the buffering limit
    /// is returned as a stream, which must be released before the next request.
    pub async fn do_request_stream(
        &mut self,
        request: &mut Request,
        response: &mut Response,
    ) -> Result<Option<BodyStream<'_>>, ClientError> {
        self.send(request, response).await?;
        let closing = request.header.connection_close();
        match read_response_stream(&mut self.reader, response, self.options.max_response_body_size).await {
            Ok(stream) => {
                if closing || response.header.connection_close() {
                    self.closed = true;
                }
                Ok(stream)
            }
            Err(e) => {
                self.closed = true;
                Err(map_read_error(e))
            }
        }
    }

    /// Sends `request` to `url`, following redirects up to the configured limit.
    pub async fn do_redirects(
        &mut self,
        request: &mut Request,
        response: &mut Response,
        url: &str,
    ) -> Result<StatusCode, ClientError> {
        let max_redirects = self.options.max_redirects;
        do_request_follow_redirects(self, request, response, url, max_redirects).await
    }
}

#[async_trait]
impl<R, W> Doer for ClientConnection<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn do_request(&mut self, request: &mut Request, response: &mut Response) -> Result<(), ClientError> {
        self.send(request, response).await?;
        if let Err(e) = read_response(&mut self.reader, response, self.options.max_response_body_size).await {
            self.closed = true;
            return Err(map_read_error(e));
        }
        self.finish(request, response);
        Ok(())
    }
}

fn map_read_error(e: ParseError) -> ClientError {
    match e {
        ParseError::NothingRead => ClientError::ConnectionClosed,
        e => e.into(),
    }
}
