//! HTTP body handling module for processing request and response payloads
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkedDecoder`]: chunked transfer encoding, including the trailer block
//! - [`LengthDecoder`]: `Content-Length` framed payloads
//! - [`PayloadDecoder`]: picks one of the above, or reads until end of stream
//!
//! ## Encoders
//! - [`ChunkedEncoder`]: chunked transfer encoding with trailer fields
//! - [`LengthEncoder`]: fixed-length payloads, holding the sender to the length
//!
//! ## Connection level
//! - [`read_body`] / [`read_body_streaming`]: buffered or lazily streamed reads
//! - [`BodyStream`]: the lazy body, which must be released before the connection is reused
//! - [`write_body_fixed`] / [`write_body_chunked`]: copy a body source onto the connection
//! - [`write_body`]: writes a [`Body`](crate::protocol::Body) with the framing of [`content_length_of`]

mod body_reader;
mod body_stream;
mod body_writer;
mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;

pub use body_reader::{BodyRead, read_body, read_body_streaming};
pub use body_stream::BodyStream;
pub use body_writer::{content_length_of, write_body, write_body_chunked, write_body_fixed};
pub use chunked_decoder::{ChunkedDecoder, TrailerFields};
pub use chunked_encoder::ChunkedEncoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
pub use payload_decoder::PayloadDecoder;
