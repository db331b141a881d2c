use async_trait::async_trait;
use h1_engine::connection::{HttpConnection, ServerOptions};
use h1_engine::handler::{Handler, RequestContext};
use h1_engine::protocol::ParseError;
use http::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let options = Arc::new(
        ServerOptions::new()
            .stream_request_body(true)
            .read_timeout(Some(Duration::from_secs(10)))
            .idle_timeout(Some(Duration::from_secs(60)))
            .write_timeout(Some(Duration::from_secs(10))),
    );
    let handler = Arc::new(EchoHandler);
    let shutdown = CancellationToken::new();

    loop {
        let (tcp_stream, remote_addr) = tokio::select! {
            accepted = tcp_listener.accept() => match accepted {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                shutdown.cancel();
                return;
            }
        };

        let (handler, options, shutdown) = (handler.clone(), options.clone(), shutdown.clone());
        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::with_options(reader, writer, options).with_shutdown(shutdown);
            match connection.process(handler).await {
                Ok(end) => info!(%remote_addr, ?end, "connection finished"),
                Err(e) => error!(%remote_addr, cause = %e, "connection failed"),
            }
        });
    }
}

/// Answers `/echo` with the request body and everything else with a greeting.
#[derive(Debug)]
struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    type Error = ParseError;

    async fn call(&self, ctx: &mut RequestContext<'_>) -> Result<(), Self::Error> {
        if ctx.request().header.path() != b"/echo" {
            ctx.response_mut().set_body(b"Hello World!\r\n");
            return Ok(());
        }

        let mut echoed = ctx.request().body().to_vec();
        if let Some(stream) = ctx.body_stream() {
            while let Some(chunk) = stream.chunk().await? {
                echoed.extend_from_slice(&chunk);
            }
        }
        info!(len = echoed.len(), "echoing request body");

        let response = ctx.response_mut();
        response.set_status(StatusCode::OK);
        response.header.set(b"Content-Type", b"application/octet-stream");
        response.set_body(&echoed);
        Ok(())
    }
}
