//! Transport seam between the protocol engine and the socket layer.
//!
//! The engine never touches a socket directly. It reads through a [`Reader`]
//! (buffered look-ahead with peek/skip) and writes through a [`Writer`]
//! (buffered writes plus an explicit flush). [`ConnReader`] and [`ConnWriter`]
//! adapt any tokio `AsyncRead`/`AsyncWrite` half and enforce the read and
//! write timeouts.

mod reader;
mod writer;

pub use reader::{ConnReader, Reader};
pub use writer::{ConnWriter, Writer};
