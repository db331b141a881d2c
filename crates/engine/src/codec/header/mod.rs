//! HTTP header processing module
//!
//! This module handles the header block of HTTP/1.x messages:
//!
//! - [`HeaderScanner`]: tokenizes a raw header block into name/value pairs,
//!   handling folded lines, trimming and name normalization
//! - [`parse_request_header`] / [`parse_response_header`]: interpret the first
//!   line and the fields into the typed header models
//! - [`encode_request_header`] / [`encode_response_header`]: deterministic
//!   serialization back to the wire
//! - [`read_header_block`]: drives a parser over a connection reader
//!
//! Parsing is restartable: when the buffered bytes end in the middle of the
//! block, the parsers fail with `NeedMoreData` and are simply called again on
//! a longer buffer.

mod header_decoder;
mod header_encoder;
mod header_reader;
mod header_scanner;

pub use header_decoder::{MAX_HEADER_BYTES, parse_request_header, parse_response_header};
pub use header_encoder::{encode_request_header, encode_response_header};
pub use header_reader::read_header_block;
pub use header_scanner::{HeaderScanner, RawHeader, scan_headers};
