//! Core HTTP protocol abstractions and implementations.
//!
//! This module provides the fundamental building blocks for HTTP protocol handling,
//! including request/response header models, bodies and error handling.
//!
//! # Key Components
//!
//! ## Header Models
//!
//! - [`RequestHeader`] / [`ResponseHeader`]: typed fields for everything that
//!   drives framing (method, status, content length, connection close,
//!   trailer announcement) plus an ordered [`Args`] store for the rest
//! - [`Trailer`]: fields sent after a chunked body, restricted to safe names
//! - [`ContentLength`]: fixed length, chunked or identity framing
//!
//! ## Messages
//!
//! - [`Request`] / [`Response`]: a header together with its [`Body`]
//! - [`form`]: url-encoded and multipart form decoding
//!
//! ## Error Handling
//!
//! - [`HttpError`]: top-level session failure
//! - [`ParseError`]: request/response parsing failures
//! - [`SendError`]: response/request writing failures
//! - [`ClientError`]: client call failures

mod args;
pub use args::Args;

mod body;
pub use body::{Body, BodySource, MAX_RETAINED_BODY_CAPACITY};

mod error;
pub use error::{ClientError, HttpError, ParseError, SendError};

pub mod form;

mod message;
pub use message::{ContentLength, PayloadItem};

mod request;
pub use request::{Request, RequestHeader};

mod response;
pub use response::{DEFAULT_CONTENT_TYPE, Response, ResponseHeader, must_skip_body};

mod trailer;
pub use trailer::{Trailer, is_forbidden_trailer};
