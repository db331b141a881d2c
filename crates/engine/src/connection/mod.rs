//! Server side connection handling.
//!
//! [`HttpConnection`] runs the request/response cycle of one accepted
//! connection until it closes, goes idle or is hijacked:
//!
//! 1. wait for the next request (idle timeout from the second request on)
//! 2. read the header, answering `Expect: 100-continue`
//! 3. read the body, buffered or streamed as configured in [`ServerOptions`]
//! 4. call the handler, recovering from panics
//! 5. write the response with the keep-alive decision of [`should_close`]
//! 6. release whatever the handler left of a streamed body
//!
//! Read failures are answered with a best-effort `400`, `408` or `413`
//! response before the connection is closed.

mod http_connection;
mod options;

pub use http_connection::{ConnectionEnd, HttpConnection, should_close};
pub use options::{DEFAULT_MAX_REQUEST_BODY_SIZE, ServerOptions};
