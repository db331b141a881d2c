//! Wire codecs for HTTP/1.x messages.
//!
//! The codec works on the [`Reader`](crate::network::Reader) and
//! [`Writer`](crate::network::Writer) seams and never owns a socket.
//!
//! # Architecture
//!
//! - [`header`]: scanning header blocks, parsing them into the typed header
//!   models and serializing them back
//! - [`body`]: fixed-length, chunked and identity bodies, buffered or streamed
//!
//! On top of those, whole-message operations for both roles:
//!
//! - Server side:
//!   - [`read_request_header`] with the escalating peek of [`header::read_header_block`]
//!   - [`read_request_body`] applying [`RequestBodyOptions`]
//!   - [`write_response`]
//! - Client side:
//!   - [`write_request`]
//!   - [`read_response`] / [`read_response_stream`], skipping interim `100 Continue`
//!
//! # Example
//!
//! ```no_run
//! use h1_engine::codec::{read_response, write_request};
//! use h1_engine::network::{ConnReader, ConnWriter, Writer};
//! use h1_engine::protocol::{Request, Response};
//! use tokio::net::TcpStream;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let (read_half, write_half) = TcpStream::connect("127.0.0.1:8080").await?.into_split();
//! let mut reader = ConnReader::new(read_half);
//! let mut writer = ConnWriter::new(write_half);
//!
//! let mut request = Request::new();
//! request.header.set_uri(b"/");
//! request.header.set_host(b"127.0.0.1");
//! write_request(&mut writer, &mut request).await?;
//! writer.flush().await?;
//!
//! let mut response = Response::new();
//! read_response(&mut reader, &mut response, 4 * 1024 * 1024).await?;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod header;
mod request_decoder;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use request_decoder::{RequestBodyOptions, read_request_body, read_request_header};
pub use request_encoder::write_request;
pub use response_decoder::{read_response, read_response_header, read_response_stream};
pub use response_encoder::write_response;
