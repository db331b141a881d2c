use std::any::Any;
use std::error::Error;
use std::mem;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace};

use crate::codec::{read_request_body, read_request_header, write_response};
use crate::connection::ServerOptions;
use crate::handler::{Handler, HijackHandler, HijackedConn, RequestContext};
use crate::network::{ConnReader, ConnWriter, Reader, Writer};
use crate::protocol::{HttpError, ParseError, Request, RequestHeader, Response, ResponseHeader, SendError};

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// How a connection ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    /// The peer closed a fresh connection before sending anything.
    NothingRead,
    /// A kept-alive connection was closed, timed out or shut down while
    /// waiting for its next request.
    IdleClose,
    /// The last response was sent with `Connection: close`.
    ShortConnection,
    /// A handler took the connection over.
    Hijacked,
}

enum Step {
    KeepAlive,
    End(ConnectionEnd),
    Hijack(HijackHandler),
}

/// Serves the requests of one HTTP/1.x connection, one after another.
///
/// Each request is read, handed to the [`Handler`] and answered before the
/// next one is read. The connection stays open while both sides allow
/// keep-alive. A streamed request body the handler did not read to the end
/// is skipped after the response is written. A response the handler started
/// streaming is finalized once the handler returns.
///
/// A handler panic is caught here and answered with `500` before the
/// connection is closed.
#[derive(Debug)]
pub struct HttpConnection<R, W> {
    reader: ConnReader<R>,
    writer: ConnWriter<W>,
    options: Arc<ServerOptions>,
    shutdown: CancellationToken,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_options(reader, writer, Arc::new(ServerOptions::default()))
    }

    pub fn with_options(reader: R, writer: W, options: Arc<ServerOptions>) -> Self {
        let mut reader = ConnReader::new(reader);
        reader.set_read_timeout(options.read_timeout);
        let mut writer = ConnWriter::new(writer);
        writer.set_write_timeout(options.write_timeout);
        Self { reader, writer, options, shutdown: CancellationToken::new() }
    }

    /// Closes the connection after the current response once `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn process<H: Handler>(mut self, handler: Arc<H>) -> Result<ConnectionEnd, HttpError> {
        let mut request = Request::new();
        let mut response = Response::new();
        let disable_normalizing = self.options.disable_header_names_normalizing;
        request.header.set_disable_normalizing(disable_normalizing);
        response.header.set_disable_normalizing(disable_normalizing);
        response.header.set_no_default_date(self.options.no_default_date);
        response.header.set_no_default_content_type(self.options.no_default_content_type);

        let mut served = 0_u64;
        loop {
            if served > 0 && !self.wait_for_request().await {
                debug!(served, "keep-alive connection closed while idle");
                return Ok(ConnectionEnd::IdleClose);
            }

            request.reset();
            response.reset();
            match self.serve_request(&mut request, &mut response, handler.as_ref(), served).await? {
                Step::KeepAlive => served += 1,
                Step::End(end) => {
                    debug!(served, ?end, "connection finished");
                    return Ok(end);
                }
                Step::Hijack(hijack) => {
                    self.hijack(hijack).await;
                    return Ok(ConnectionEnd::Hijacked);
                }
            }
        }
    }

    /// Waits up to the idle timeout for the first byte of the next request.
    async fn wait_for_request(&mut self) -> bool {
        if self.reader.buffered_len() > 0 {
            return true;
        }

        self.reader.set_read_timeout(self.options.idle_timeout);
        let ready = select! {
            biased;
            () = self.shutdown.cancelled() => false,
            filled = self.reader.fill() => match filled {
                Ok(n) => n > 0,
                Err(e) => {
                    trace!(cause = %e, "stop waiting for the next request");
                    false
                }
            },
        };
        self.reader.set_read_timeout(self.options.read_timeout);
        ready
    }

    async fn serve_request<H: Handler>(
        &mut self,
        request: &mut Request,
        response: &mut Response,
        handler: &H,
        served: u64,
    ) -> Result<Step, HttpError> {
        let options = Arc::clone(&self.options);
        apply_response_defaults(&options, response);

        match read_request_header(&mut self.reader, &mut request.header).await {
            Ok(()) => {}
            Err(ParseError::NothingRead) if served == 0 => return Ok(Step::End(ConnectionEnd::NothingRead)),
            Err(ParseError::NothingRead) => return Ok(Step::End(ConnectionEnd::IdleClose)),
            Err(e) => return fail(&mut self.writer, &options, response, e).await,
        }

        if request.header.expect_continue() {
            if !options.accepts_continue(&request.header) {
                info!(uri = %String::from_utf8_lossy(request.header.uri()), "rejected request expecting 100-continue");
                response.set_status(StatusCode::EXPECTATION_FAILED);
                response.header.set_connection_close(true);
                send_response(&mut self.writer, response).await?;
                return Ok(Step::End(ConnectionEnd::ShortConnection));
            }
            self.writer.write_binary(CONTINUE_RESPONSE);
            self.writer.flush().await.map_err(SendError::io)?;
            info!("receive expect request header, sent continue response");
        }

        let body_stream = match read_request_body(&mut self.reader, request, &options.request_body_options()).await {
            Ok(body_stream) => body_stream,
            Err(e) => return fail(&mut self.writer, &options, response, e).await,
        };

        let mut ctx = RequestContext::new(mem::take(request), mem::take(response), body_stream, &mut self.writer);
        let outcome = AssertUnwindSafe(handler.call(&mut ctx)).catch_unwind().await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) if ctx.is_streaming() => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                // the body is left unterminated so the peer sees it broke off
                error!(cause = %e, "handle request error after the response was started, closing connection");
                if let Err(e) = ctx.chunked_writer().flush().await {
                    debug!(cause = %e, "failed to flush partial response");
                }
                return Ok(Step::End(ConnectionEnd::ShortConnection));
            }
            Ok(Err(e)) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle request error, responding with internal server error");
                let response = ctx.response_mut();
                response.set_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
                response.header.set_connection_close(false);
                apply_response_defaults(&options, response);
            }
            Err(panic) => {
                let reason = panic_reason(panic.as_ref());
                error!(%reason, "handler panicked, closing connection");
                let sent = if ctx.is_streaming() {
                    ctx.chunked_writer().flush().await
                } else {
                    let response = ctx.response_mut();
                    response.set_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error");
                    apply_response_defaults(&options, response);
                    ctx.send_response().await
                };
                if let Err(e) = sent {
                    debug!(cause = %e, "failed to send response after handler panic");
                }
                return Err(HttpError::HandlerPanic { reason });
            }
        }

        if ctx.request().header.is_head() {
            ctx.response_mut().set_skip_body(true);
        }

        let close = should_close(
            &ctx.request().header,
            &ctx.response().header,
            options.disable_keep_alive,
            self.shutdown.is_cancelled(),
        );
        // a streamed header is already out, so only the connection itself can be closed
        if !ctx.is_streaming() {
            if close {
                ctx.response_mut().header.set_connection_close(true);
            } else if !ctx.request().header.is_http11() {
                ctx.response_mut().header.set(b"Connection", b"keep-alive");
            }
        }

        ctx.send_response().await?;

        let (handled_request, handled_response, mut body_stream, hijack) = ctx.into_parts();
        *request = handled_request;
        *response = handled_response;

        if let Some(body_stream) = body_stream.as_mut() {
            body_stream.release().await?;
        }
        drop(body_stream);
        if self.reader.is_poisoned() {
            return Err(HttpError::Misaligned);
        }

        if let Some(hijack) = hijack {
            return Ok(Step::Hijack(hijack));
        }
        if close {
            return Ok(Step::End(ConnectionEnd::ShortConnection));
        }
        Ok(Step::KeepAlive)
    }

    /// Hands the raw connection to `hijack` and waits for it to finish.
    ///
    /// The read and write timeouts are not carried over.
    async fn hijack(self, hijack: HijackHandler) {
        let (reader, read_ahead) = self.reader.into_parts();
        let conn = HijackedConn { reader: Box::new(reader), writer: Box::new(self.writer.into_inner()), read_ahead };
        info!(read_ahead = conn.read_ahead.len(), "connection hijacked");
        hijack(conn).await;
    }
}

/// Whether the connection must be closed after the current response.
///
/// Any one of these closes it: keep-alive disabled on the server, the server
/// shutting down, `Connection: close` on the request or on the response, or
/// an HTTP/1.0 request that did not ask for keep-alive.
pub fn should_close(
    request: &RequestHeader,
    response: &ResponseHeader,
    disable_keep_alive: bool,
    shutting_down: bool,
) -> bool {
    disable_keep_alive
        || shutting_down
        || request.connection_close()
        || response.connection_close()
        || (!request.is_http11() && !request.has_keep_alive())
}

fn apply_response_defaults(options: &ServerOptions, response: &mut Response) {
    if !options.no_default_server_header && response.header.server().is_empty() {
        response.header.set_server(&options.server_name);
    }
}

async fn send_response(writer: &mut dyn Writer, response: &mut Response) -> Result<(), SendError> {
    write_response(writer, response).await?;
    writer.flush().await.map_err(SendError::io)
}

/// Answers a request that could not be read, unless the peer is already gone.
async fn fail(
    writer: &mut dyn Writer,
    options: &ServerOptions,
    response: &mut Response,
    e: ParseError,
) -> Result<Step, HttpError> {
    if matches!(e, ParseError::UnexpectedEof) {
        debug!("connection closed in the middle of a request");
        return Err(e.into());
    }

    let status = e.status_code();
    error!(cause = %e, status = status.as_u16(), "failed to read request, sending error response");
    response.set_error(status, e.response_body());
    apply_response_defaults(options, response);
    if let Err(send_error) = send_response(writer, response).await {
        debug!(cause = %send_error, "failed to send error response");
    }
    Err(e.into())
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(reason) = panic.downcast_ref::<&str>() {
        (*reason).to_owned()
    } else if let Some(reason) = panic.downcast_ref::<String>() {
        reason.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::header::parse_request_header;
    use crate::handler::make_handler;
    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use std::convert::Infallible;
    use std::io::Cursor;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn options() -> ServerOptions {
        ServerOptions::new().server_name("test").no_default_date(true)
    }

    async fn serve<H: Handler + 'static>(
        input: &[u8],
        options: ServerOptions,
        handler: H,
    ) -> (Result<ConnectionEnd, HttpError>, String) {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let connection = HttpConnection::with_options(Cursor::new(input.to_vec()), server, Arc::new(options));
        let result = connection.process(Arc::new(handler)).await;

        let mut output = Vec::new();
        client.read_to_end(&mut output).await.unwrap();
        (result, String::from_utf8(output).unwrap())
    }

    fn echo_path<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
        Box::pin(async move {
            let path = ctx.request().header.path().to_vec();
            ctx.response_mut().set_body(&path);
            Ok(())
        })
    }

    fn echo_body<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
        Box::pin(async move {
            let body = ctx.request().body().to_vec();
            ctx.response_mut().set_body(&body);
            Ok(())
        })
    }

    fn read_first_chunk<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), ParseError>> {
        Box::pin(async move {
            let mut first = Vec::new();
            if let Some(stream) = ctx.body_stream() {
                let chunk = stream.chunk().await?.unwrap_or_default();
                first.extend_from_slice(&chunk[..chunk.len().min(2)]);
            }
            let mut body = ctx.request().header.path().to_vec();
            body.push(b':');
            body.extend_from_slice(&first);
            ctx.response_mut().set_body(&body);
            Ok(())
        })
    }

    fn failing<'a>(_ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), std::io::Error>> {
        Box::pin(async move { Err(std::io::Error::other("database unavailable")) })
    }

    fn upgrade<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
        Box::pin(async move {
            ctx.response_mut().set_status(StatusCode::SWITCHING_PROTOCOLS);
            ctx.hijack(Box::new(|mut conn: HijackedConn| {
                async move {
                    conn.writer.write_all(b"pong:").await.unwrap();
                    conn.writer.write_all(&conn.read_ahead).await.unwrap();
                    conn.writer.flush().await.unwrap();
                }
                .boxed()
            }));
            Ok(())
        })
    }

    fn stream_then_fail<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), SendError>> {
        Box::pin(async move {
            ctx.chunked_writer().write(b"partial").await?;
            Err(SendError::invalid_body("source went away"))
        })
    }

    /// Streams two chunks and waits between them until the peer saw the first.
    struct Ticker {
        delivered: Arc<Notify>,
    }

    #[async_trait]
    impl Handler for Ticker {
        type Error = Box<dyn Error + Send + Sync>;

        async fn call(&self, ctx: &mut RequestContext<'_>) -> Result<(), Self::Error> {
            ctx.response_mut().header.trailer_mut().set_announced(b"X-Ticks")?;
            let mut writer = ctx.chunked_writer();
            writer.write(b"tick").await?;
            writer.flush().await?;
            self.delivered.notified().await;
            writer.write(b"tock").await?;
            drop(writer);
            ctx.response_mut().header.trailer_mut().set(b"X-Ticks", b"2")?;
            Ok(())
        }
    }

    struct Panicking;

    #[async_trait]
    impl Handler for Panicking {
        type Error = Infallible;

        async fn call(&self, _ctx: &mut RequestContext<'_>) -> Result<(), Infallible> {
            panic!("handler exploded")
        }
    }

    #[tokio::test]
    async fn test_pipelined_keep_alive() {
        let input = b"GET /a HTTP/1.1\r\nHost: x\r\n\r\nGET /b HTTP/1.1\r\nHost: x\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(echo_path)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        let expected = "HTTP/1.1 200 OK\r\nServer: test\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 2\r\n\r\n";
        assert_eq!(output, format!("{expected}/a{expected}/b"));
    }

    #[tokio::test]
    async fn test_nothing_read() {
        let (result, output) = serve(b"", options(), make_handler(echo_path)).await;
        assert_eq!(result.unwrap(), ConnectionEnd::NothingRead);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_request_connection_close() {
        let input = b"GET /a HTTP/1.1\r\nConnection: close\r\n\r\nGET /never HTTP/1.1\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(echo_path)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::ShortConnection);
        assert!(output.contains("Connection: close\r\n\r\n/a"));
        assert!(!output.contains("/never"));
    }

    #[tokio::test]
    async fn test_http10_keep_alive() {
        let input = b"GET /a HTTP/1.0\r\nConnection: keep-alive\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(echo_path)).await;
        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        assert!(output.contains("Connection: keep-alive\r\n"));

        let (result, output) = serve(b"GET /a HTTP/1.0\r\n\r\n", options(), make_handler(echo_path)).await;
        assert_eq!(result.unwrap(), ConnectionEnd::ShortConnection);
        assert!(output.contains("Connection: close\r\n"));
    }

    #[tokio::test]
    async fn test_shutdown_closes_after_response() {
        let token = CancellationToken::new();
        token.cancel();

        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let input = Cursor::new(b"GET /a HTTP/1.1\r\n\r\n".to_vec());
        let connection = HttpConnection::with_options(input, server, Arc::new(options())).with_shutdown(token);
        let result = connection.process(Arc::new(make_handler(echo_path))).await;

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        assert_eq!(result.unwrap(), ConnectionEnd::ShortConnection);
        assert!(output.ends_with("Connection: close\r\n\r\n/a"));
    }

    #[tokio::test]
    async fn test_idle_timeout() {
        let (mut peer, server_read) = tokio::io::duplex(1024);
        let (mut client, server_write) = tokio::io::duplex(64 * 1024);
        peer.write_all(b"GET /a HTTP/1.1\r\n\r\n").await.unwrap();

        let options = options().idle_timeout(Some(Duration::from_millis(20)));
        let connection = HttpConnection::with_options(server_read, server_write, Arc::new(options));
        let result = connection.process(Arc::new(make_handler(echo_path))).await;
        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);

        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();
        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        drop(peer);
    }

    #[tokio::test]
    async fn test_malformed_request() {
        let input = b"POST / HTTP/1.1\r\nContent-Length: abc\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(echo_body)).await;

        assert!(matches!(result, Err(HttpError::Request { source: ParseError::InvalidContentLength { .. } })));
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\nServer: test\r\n"));
        assert!(output.ends_with("Connection: close\r\n\r\nError when parsing request"));
    }

    #[tokio::test]
    async fn test_truncated_request_gets_no_response() {
        let (result, output) = serve(b"GET / HTTP/1.1\r\nHost: x", options(), make_handler(echo_body)).await;
        assert!(matches!(result, Err(HttpError::Request { source: ParseError::UnexpectedEof })));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_body_too_large() {
        let input = b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789";
        let (result, output) = serve(input, options().max_request_body_size(4), make_handler(echo_body)).await;

        assert!(matches!(result, Err(HttpError::Request { source: ParseError::BodyTooLarge { .. } })));
        assert!(output.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
        assert!(output.ends_with("Request Entity Too Large"));
    }

    #[tokio::test]
    async fn test_get_only() {
        let input = b"POST / HTTP/1.1\r\nContent-Length: 1\r\n\r\nx";
        let (result, output) = serve(input, options().get_only(true), make_handler(echo_body)).await;

        assert!(matches!(result, Err(HttpError::Request { source: ParseError::GetOnly })));
        assert!(output.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_expect_continue() {
        let input = b"POST / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 5\r\n\r\nhello";
        let (result, output) = serve(input, options(), make_handler(echo_body)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        assert!(output.starts_with("HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("\r\n\r\nhello"));
    }

    #[tokio::test]
    async fn test_expect_continue_rejected() {
        let input = b"POST / HTTP/1.1\r\nExpect: 100-continue\r\nContent-Length: 5\r\n\r\n";
        let options = options().continue_handler(|_header| false);
        let (result, output) = serve(input, options, make_handler(echo_path)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::ShortConnection);
        assert!(output.starts_with("HTTP/1.1 417 Expectation Failed\r\n"));
        assert!(output.contains("Connection: close\r\n"));
        assert!(!output.contains("100 Continue"));
        assert!(output.ends_with("Content-Length: 0\r\nConnection: close\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_unread_stream_is_released() {
        let input = b"POST /up HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789GET /next HTTP/1.1\r\n\r\n";
        let options = options().stream_request_body(true).max_request_body_size(4);
        let (result, output) = serve(input, options, make_handler(read_first_chunk)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        assert!(output.contains("\r\n\r\n/up:01HTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("\r\n\r\n/next:"));
    }

    #[tokio::test]
    async fn test_head_response_has_no_body() {
        let (result, output) = serve(b"HEAD /abc HTTP/1.1\r\n\r\n", options(), make_handler(echo_path)).await;
        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        assert!(output.ends_with("Content-Length: 4\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_handler_error_keeps_connection() {
        let input = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(failing)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::IdleClose);
        assert_eq!(output.matches("HTTP/1.1 500 Internal Server Error\r\n").count(), 2);
        assert!(!output.contains("Connection: close"));
    }

    #[tokio::test]
    async fn test_handler_panic() {
        let input = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let (result, output) = serve(input, options(), Panicking).await;

        match result {
            Err(HttpError::HandlerPanic { reason }) => assert_eq!(reason, "handler exploded"),
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(output.matches("HTTP/1.1 500 Internal Server Error\r\n").count(), 1);
        assert!(output.ends_with("Connection: close\r\n\r\nInternal Server Error"));
    }

    #[tokio::test]
    async fn test_chunks_reach_peer_before_handler_returns() {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        let delivered = Arc::new(Notify::new());
        let input = b"GET /ticks HTTP/1.1\r\nConnection: close\r\n\r\n";
        let connection = HttpConnection::with_options(Cursor::new(input.to_vec()), server, Arc::new(options()));
        let server = tokio::spawn(connection.process(Arc::new(Ticker { delivered: delivered.clone() })));

        let head = "HTTP/1.1 200 OK\r\nServer: test\r\nContent-Type: text/plain; charset=utf-8\r\n\
                    Transfer-Encoding: chunked\r\nTrailer: X-Ticks\r\nConnection: close\r\n\r\n4\r\ntick\r\n";
        let mut received = vec![0; head.len()];
        timeout(Duration::from_secs(5), client.read_exact(&mut received)).await.unwrap().unwrap();
        assert_eq!(String::from_utf8(received).unwrap(), head);
        delivered.notify_one();

        let mut rest = String::new();
        client.read_to_string(&mut rest).await.unwrap();
        assert_eq!(rest, "4\r\ntock\r\n0\r\nX-Ticks: 2\r\n\r\n");
        assert_eq!(server.await.unwrap().unwrap(), ConnectionEnd::ShortConnection);
    }

    #[tokio::test]
    async fn test_handler_error_after_streaming_closes() {
        let input = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let (result, output) = serve(input, options(), make_handler(stream_then_fail)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::ShortConnection);
        assert!(output.ends_with("7\r\npartial\r\n"));
        assert!(!output.contains("500"));
        assert_eq!(output.matches("HTTP/1.1 200 OK").count(), 1);
    }

    #[tokio::test]
    async fn test_hijack() {
        let (result, output) = serve(b"GET /ws HTTP/1.1\r\n\r\nping", options(), make_handler(upgrade)).await;

        assert_eq!(result.unwrap(), ConnectionEnd::Hijacked);
        assert!(output.starts_with("HTTP/1.1 101 Switching Protocols\r\nServer: test\r\n\r\n"));
        assert!(output.ends_with("pong:ping"));
    }

    #[test]
    fn test_keep_alive_matrix() {
        let close: Option<&[u8]> = Some(b"close");
        let keep_alive: Option<&[u8]> = Some(b"keep-alive");
        let connection_values = [None, close, keep_alive];

        for http11 in [false, true] {
            for request_connection in connection_values {
                for response_connection in connection_values {
                    for disable_keep_alive in [false, true] {
                        let mut wire = if http11 { b"GET / HTTP/1.1\r\n".to_vec() } else { b"GET / HTTP/1.0\r\n".to_vec() };
                        if let Some(value) = request_connection {
                            wire.extend_from_slice(b"Connection: ");
                            wire.extend_from_slice(value);
                            wire.extend_from_slice(b"\r\n");
                        }
                        wire.extend_from_slice(b"\r\n");
                        let mut request = RequestHeader::new();
                        parse_request_header(&mut request, &wire).unwrap();

                        let mut response = ResponseHeader::new();
                        if let Some(value) = response_connection {
                            response.set(b"Connection", value);
                        }

                        let expected = disable_keep_alive
                            || request_connection == close
                            || response_connection == close
                            || (!http11 && request_connection != keep_alive);
                        assert_eq!(
                            should_close(&request, &response, disable_keep_alive, false),
                            expected,
                            "http11={http11} request={request_connection:?} response={response_connection:?} disabled={disable_keep_alive}"
                        );
                        assert!(should_close(&request, &response, disable_keep_alive, true));
                    }
                }
            }
        }
    }
}
