//! An asynchronous HTTP/1.x request/response engine
//!
//! This crate parses and serializes HTTP/1.0 and HTTP/1.1 messages over any
//! tokio `AsyncRead`/`AsyncWrite` pair and drives the server side
//! request/response cycle of a connection. A small client layer sends requests
//! over an established connection and follows redirects.
//!
//! # Features
//!
//! - Header scanning tolerant of bare `\n` line endings, with an escalating peek
//! - Typed request and response headers with lazy field parsing
//! - Fixed length, chunked and identity bodies, buffered or streamed
//! - Chunked trailers with a list of forbidden field names
//! - Handlers can stream a chunked response before they return
//! - Keep-alive, `Expect: 100-continue` and connection hijacking
//! - Handler panics are isolated to their connection
//!
//! # Example
//!
//! ```no_run
//! use futures::future::BoxFuture;
//! use h1_engine::connection::{HttpConnection, ServerOptions};
//! use h1_engine::handler::{RequestContext, make_handler};
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(listener) => listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let options = Arc::new(ServerOptions::new().idle_timeout(Some(Duration::from_secs(30))));
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let (handler, options) = (handler.clone(), options.clone());
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             match HttpConnection::with_options(reader, writer, options).process(handler).await {
//!                 Ok(end) => info!(?end, "connection finished"),
//!                 Err(e) => error!(cause = %e, "connection failed"),
//!             }
//!         });
//!     }
//! }
//!
//! fn hello_world<'a>(ctx: &'a mut RequestContext<'_>) -> BoxFuture<'a, Result<(), Infallible>> {
//!     Box::pin(async move {
//!         info!(path = %String::from_utf8_lossy(ctx.request().header.path()), "request");
//!         ctx.response_mut().set_body(b"Hello World!\r\n");
//!         Ok(())
//!     })
//! }
//! ```
//!
//! # Architecture
//!
//! - [`network`]: the buffered [`Reader`](network::Reader) and
//!   [`Writer`](network::Writer) seams over a socket
//! - [`protocol`]: header models, bodies, trailers and error types
//! - [`codec`]: reading and writing whole messages for both roles
//! - [`handler`]: the [`Handler`](handler::Handler) trait and its context
//! - [`connection`]: the server side connection state machine
//! - [`client`]: sending requests and following redirects
//!
//! # Error Handling
//!
//! - [`protocol::ParseError`]: malformed or oversized input, timeouts
//! - [`protocol::SendError`]: failures while writing a message
//! - [`protocol::HttpError`]: why a server connection ended abnormally
//! - [`protocol::ClientError`]: failures of a client exchange
//!
//! # Limitations
//!
//! - HTTP/1.x only
//! - No TLS, dialing or connection pooling

pub mod client;
pub mod codec;
pub mod connection;
pub mod handler;
pub mod network;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
