//! The surface business code is plugged into.
//!
//! A [`Handler`] receives a [`RequestContext`] holding the parsed request and
//! an empty response. It fills in the response and returns; the connection
//! writes it. A handler may instead stream the body through a
//! [`ChunkedWriter`] before returning. Request bodies larger than the
//! buffering limit are available as a [`BodyStream`] when the server streams
//! request bodies.

mod chunked_writer;

pub use chunked_writer::ChunkedWriter;

use crate::codec::body::BodyStream;
use crate::codec::write_response;
use crate::network::Writer;
use crate::protocol::{Request, RequestHeader, Response, SendError};
use chunked_writer::StreamState;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::future::BoxFuture;
use std::error::Error;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, ctx: &mut RequestContext<'_>) -> Result<(), Self::Error>;
}

/// Decides whether a request sent with `Expect: 100-continue` may send its body.
pub type ContinueHandler = Arc<dyn Fn(&RequestHeader) -> bool + Send + Sync>;

/// Takes over a connection once the current response has been written.
pub type HijackHandler = Box<dyn FnOnce(HijackedConn) -> BoxFuture<'static, ()> + Send>;

/// The raw connection handed to a [`HijackHandler`].
///
/// `read_ahead` holds bytes the server already read from the peer but did not
/// consume; they precede anything read from `reader`.
pub struct HijackedConn {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
    pub read_ahead: BytesMut,
}

impl Debug for HijackedConn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HijackedConn").field("read_ahead", &self.read_ahead.len()).finish_non_exhaustive()
    }
}

/// Everything a handler sees of one request/response cycle.
pub struct RequestContext<'r> {
    request: Request,
    response: Response,
    body_stream: Option<BodyStream<'r>>,
    hijack: Option<HijackHandler>,
    writer: &'r mut dyn Writer,
    stream_state: StreamState,
}

impl<'r> RequestContext<'r> {
    /// `writer` is where the response goes, whether streamed by the handler
    /// or written by the connection afterwards.
    pub fn new(
        request: Request,
        response: Response,
        body_stream: Option<BodyStream<'r>>,
        writer: &'r mut dyn Writer,
    ) -> Self {
        Self { request, response, body_stream, hijack: None, writer, stream_state: StreamState::default() }
    }

    #[inline]
    pub fn request(&self) -> &Request {
        &self.request
    }

    #[inline]
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    #[inline]
    pub fn response(&self) -> &Response {
        &self.response
    }

    #[inline]
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// The streamed request body, present only when the body was too large to buffer.
    pub fn body_stream(&mut self) -> Option<&mut BodyStream<'r>> {
        self.body_stream.as_mut()
    }

    /// Hands the connection to `handler` after the response is written.
    ///
    /// The server stops serving the connection from that point on.
    pub fn hijack(&mut self, handler: HijackHandler) {
        self.hijack = Some(handler);
    }

    #[inline]
    pub fn is_hijacked(&self) -> bool {
        self.hijack.is_some()
    }

    pub fn set_connection_close(&mut self) {
        self.response.header.set_connection_close(true);
    }

    /// Streams the response body to the peer; see [`ChunkedWriter`].
    ///
    /// Once used, the body set on [`response_mut`](Self::response_mut) is ignored.
    pub fn chunked_writer(&mut self) -> ChunkedWriter<'_> {
        ChunkedWriter::new(&self.request.header, &mut self.response, &mut *self.writer, &mut self.stream_state)
    }

    /// Whether the response header already went out through a [`ChunkedWriter`].
    #[inline]
    pub fn is_streaming(&self) -> bool {
        self.stream_state.is_started()
    }

    /// Writes the response the handler left behind and flushes it.
    ///
    /// A streamed response is finalized instead.
    pub(crate) async fn send_response(&mut self) -> Result<(), SendError> {
        if self.is_streaming() {
            return self.chunked_writer().finalize().await;
        }
        write_response(&mut *self.writer, &mut self.response).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn into_parts(self) -> (Request, Response, Option<BodyStream<'r>>, Option<HijackHandler>) {
        (self.request, self.response, self.body_stream, self.hijack)
    }
}

impl Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestContext")
            .field("request", &self.request)
            .field("response", &self.response)
            .field("body_stream", &self.body_stream)
            .field("hijacked", &self.hijack.is_some())
            .field("stream_state", &self.stream_state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Err> Handler for HandlerFn<F>
where
    F: for<'a, 'r> Fn(&'a mut RequestContext<'r>) -> BoxFuture<'a, Result<(), Err>> + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>> + 'static,
{
    type Error = Err;

    async fn call(&self, ctx: &mut RequestContext<'_>) -> Result<(), Self::Error> {
        (self.f)(ctx).await
    }
}

/// Wraps a function returning a boxed future into a [`Handler`].
///
/// ```
/// use futures::future::BoxFuture;
/// use h1_engine::handler::{make_handler, RequestContext};
/// use std::convert::Infallible;
///
/// fn hello<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
///     Box::pin(async move {
///         ctx.response_mut().set_body(b"Hello World!\r\n");
///         Ok(())
///     })
/// }
///
/// let handler = make_handler(hello);
/// ```
pub fn make_handler<F, Err>(f: F) -> HandlerFn<F>
where
    F: for<'a, 'r> Fn(&'a mut RequestContext<'r>) -> BoxFuture<'a, Result<(), Err>> + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    HandlerFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use futures::FutureExt;
    use std::convert::Infallible;

    fn echo_path<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
        Box::pin(async move {
            let path = ctx.request().header.path().to_vec();
            ctx.response_mut().set_body(&path);
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = make_handler(echo_path);
        let mut request = Request::new();
        request.header.set_uri(b"/hello?name=world");

        let mut out = BytesMut::new();
        let mut ctx = RequestContext::new(request, Response::new(), None, &mut out);
        handler.call(&mut ctx).await.unwrap();
        assert!(!ctx.is_hijacked());

        let (_request, response, stream, hijack) = ctx.into_parts();
        assert_eq!(response.body(), b"/hello");
        assert!(stream.is_none());
        assert!(hijack.is_none());
    }

    #[test]
    fn test_hijack_is_recorded() {
        let mut out = BytesMut::new();
        let mut ctx = RequestContext::new(Request::new(), Response::new(), None, &mut out);
        ctx.hijack(Box::new(|_conn: HijackedConn| async {}.boxed()));
        ctx.set_connection_close();
        assert!(ctx.is_hijacked());
        assert!(ctx.response().header.connection_close());
    }

    #[tokio::test]
    async fn test_send_response_after_streaming() {
        let mut out = BytesMut::new();
        let mut ctx = RequestContext::new(Request::new(), Response::new(), None, &mut out);
        ctx.response_mut().header.set_no_default_date(true);
        ctx.response_mut().header.set_no_default_content_type(true);
        ctx.response_mut().set_body(b"replaced");
        assert!(!ctx.is_streaming());

        ctx.chunked_writer().write(b"live").await.unwrap();
        assert!(ctx.is_streaming());
        ctx.send_response().await.unwrap();
        drop(ctx);

        assert_eq!(&out[..], b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nlive\r\n0\r\n\r\n");
    }
}
