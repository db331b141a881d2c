use http::StatusCode;
use std::io;
use thiserror::Error;

/// Top-level failure of a connection session.
///
/// Clean terminations (idle close, last request served, hijack) are not
/// errors and are reported through [`crate::connection::ConnectionEnd`].
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    Request {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    Response {
        #[from]
        source: SendError,
    },

    #[error("handler panicked: {reason}")]
    HandlerPanic { reason: String },

    #[error("connection reader is no longer aligned with message framing")]
    Misaligned,
}

#[derive(Error, Debug)]
pub enum ParseError {
    /// The buffered bytes do not hold a complete header block yet.
    #[error("need more data to parse header")]
    NeedMoreData,

    #[error("malformed header: {reason}")]
    MalformedHeader { reason: String },

    #[error("invalid header name: {reason}")]
    InvalidHeaderName { reason: String },

    #[error("invalid header value: {reason}")]
    InvalidHeaderValue { reason: String },

    #[error("invalid first line: {reason}")]
    InvalidFirstLine { reason: String },

    #[error("invalid http method")]
    InvalidMethod,

    #[error("invalid status code: {reason}")]
    InvalidStatus { reason: String },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("body size exceeds the limit {max_size}")]
    BodyTooLarge { max_size: usize },

    #[error("invalid chunked body: {reason}")]
    ChunkFraming { reason: String },

    #[error("forbidden trailer key: {key}")]
    ForbiddenTrailer { key: String },

    /// The peer closed the connection before sending a single byte.
    #[error("nothing read from the connection")]
    NothingRead,

    /// The peer closed the connection in the middle of a message.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    #[error("non-GET request received by a GET-only server")]
    GetOnly,

    #[error("invalid form body: {reason}")]
    InvalidForm { reason: String },

    #[error("io error: {source}")]
    Io { source: io::Error },
}

impl ParseError {
    pub fn malformed_header<S: ToString>(str: S) -> Self {
        Self::MalformedHeader { reason: str.to_string() }
    }

    pub fn invalid_header_name<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderName { reason: str.to_string() }
    }

    pub fn invalid_header_value<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderValue { reason: str.to_string() }
    }

    pub fn invalid_first_line<S: ToString>(str: S) -> Self {
        Self::InvalidFirstLine { reason: str.to_string() }
    }

    pub fn invalid_status<S: ToString>(str: S) -> Self {
        Self::InvalidStatus { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn body_too_large(max_size: usize) -> Self {
        Self::BodyTooLarge { max_size }
    }

    pub fn chunk_framing<S: ToString>(str: S) -> Self {
        Self::ChunkFraming { reason: str.to_string() }
    }

    pub fn forbidden_trailer<S: ToString>(key: S) -> Self {
        Self::ForbiddenTrailer { key: key.to_string() }
    }

    pub fn invalid_form<S: ToString>(str: S) -> Self {
        Self::InvalidForm { reason: str.to_string() }
    }

    /// Wraps an io error, turning a truncated stream into [`ParseError::UnexpectedEof`].
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        let source = e.into();
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Self::UnexpectedEof
        } else {
            Self::Io { source }
        }
    }

    #[inline]
    pub fn is_need_more(&self) -> bool {
        matches!(self, Self::NeedMoreData)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::TimedOut)
    }

    #[inline]
    pub fn is_body_too_large(&self) -> bool {
        matches!(self, Self::BodyTooLarge { .. })
    }

    /// Status code of the best-effort error response written for this error.
    pub fn status_code(&self) -> StatusCode {
        if self.is_timeout() {
            StatusCode::REQUEST_TIMEOUT
        } else if self.is_body_too_large() {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        }
    }

    /// Body of the best-effort error response written for this error.
    pub fn response_body(&self) -> &'static str {
        if self.is_timeout() {
            "Request timeout"
        } else if self.is_body_too_large() {
            "Request Entity Too Large"
        } else {
            "Error when parsing request"
        }
    }
}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        Self::io(e)
    }
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("unsupported http version: {0:?}")]
    UnsupportedVersion(http::Version),

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("read response error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("write request error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("too many redirects, the limit is {max}")]
    TooManyRedirects { max: usize },

    #[error("redirect response without a Location header")]
    MissingLocation,

    #[error("invalid url: {reason}")]
    InvalidUrl { reason: String },

    #[error("connection closed by peer")]
    ConnectionClosed,
}

impl ClientError {
    pub fn invalid_url<S: ToString>(str: S) -> Self {
        Self::InvalidUrl { reason: str.to_string() }
    }
}

impl From<url::ParseError> for ClientError {
    fn from(e: url::ParseError) -> Self {
        Self::invalid_url(e)
    }
}
