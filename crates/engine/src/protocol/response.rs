use crate::protocol::{Args, Body, BodySource, ContentLength, ParseError, Trailer};
use crate::utils::{
    buffer_snippet, case_insensitive_eq, has_header_value, has_line_break, is_writable_field, normalized_key, parse_uint,
};
use http::{StatusCode, Version};
use tracing::warn;

pub const DEFAULT_CONTENT_TYPE: &[u8] = b"text/plain; charset=utf-8";

/// Status codes whose responses never carry a body: 1xx, 204 and 304.
#[inline]
pub fn must_skip_body(status: StatusCode) -> bool {
    status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED
}

#[derive(Debug, Clone)]
pub struct ResponseHeader {
    status: StatusCode,
    reason: Vec<u8>,
    version: Version,
    content_type: Vec<u8>,
    content_length: ContentLength,
    connection_close: bool,
    server: Vec<u8>,
    args: Args,
    trailer: Trailer,
    no_default_date: bool,
    no_default_content_type: bool,
    disable_normalizing: bool,
    invalid_content_length: Option<Vec<u8>>,
}

impl Default for ResponseHeader {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            reason: Vec::new(),
            version: Version::HTTP_11,
            content_type: Vec::new(),
            content_length: ContentLength::Length(0),
            connection_close: false,
            server: Vec::new(),
            args: Args::new(),
            trailer: Trailer::new(),
            no_default_date: false,
            no_default_content_type: false,
            disable_normalizing: false,
            invalid_content_length: None,
        }
    }
}

impl ResponseHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field, keeping allocations and the writer settings.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.reason.clear();
        self.version = Version::HTTP_11;
        self.content_type.clear();
        self.content_length = ContentLength::Length(0);
        self.connection_close = false;
        self.server.clear();
        self.args.clear();
        self.trailer.clear();
        self.invalid_content_length = None;
    }

    pub fn set_disable_normalizing(&mut self, disable: bool) {
        self.disable_normalizing = disable;
        self.trailer.set_disable_normalizing(disable);
    }

    #[inline]
    pub fn is_disable_normalizing(&self) -> bool {
        self.disable_normalizing
    }

    pub fn set_no_default_date(&mut self, no_default: bool) {
        self.no_default_date = no_default;
    }

    #[inline]
    pub fn no_default_date(&self) -> bool {
        self.no_default_date
    }

    pub fn set_no_default_content_type(&mut self, no_default: bool) {
        self.no_default_content_type = no_default;
    }

    #[inline]
    pub fn no_default_content_type(&self) -> bool {
        self.no_default_content_type
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Reason phrase received on the status line; empty for locally built responses.
    #[inline]
    pub fn reason(&self) -> &[u8] {
        &self.reason
    }

    pub fn set_reason(&mut self, reason: &[u8]) {
        if has_line_break(reason) {
            warn!(reason = %buffer_snippet(reason), "ignore value with a line break");
            return;
        }
        self.reason.clear();
        self.reason.extend_from_slice(reason);
    }

    #[inline]
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    #[inline]
    pub fn is_http11(&self) -> bool {
        self.version == Version::HTTP_11
    }

    #[inline]
    pub fn content_type(&self) -> &[u8] {
        &self.content_type
    }

    pub fn set_content_type(&mut self, content_type: &[u8]) {
        if has_line_break(content_type) {
            warn!(content_type = %buffer_snippet(content_type), "ignore value with a line break");
            return;
        }
        self.content_type.clear();
        self.content_type.extend_from_slice(content_type);
    }

    #[inline]
    pub fn content_length(&self) -> ContentLength {
        self.content_length
    }

    pub fn set_content_length(&mut self, content_length: ContentLength) {
        self.content_length = content_length;
    }

    #[inline]
    pub fn content_length_raw(&self) -> i64 {
        self.content_length.as_raw()
    }

    #[inline]
    pub fn connection_close(&self) -> bool {
        self.connection_close
    }

    pub fn set_connection_close(&mut self, close: bool) {
        self.connection_close = close;
    }

    /// Whether an HTTP/1.0 response explicitly asked for keep-alive.
    pub fn has_keep_alive(&self) -> bool {
        self.args.get_all(b"Connection").any(|v| has_header_value(v, b"keep-alive"))
    }

    #[inline]
    pub fn server(&self) -> &[u8] {
        &self.server
    }

    pub fn set_server(&mut self, server: &[u8]) {
        if has_line_break(server) {
            warn!(server = %buffer_snippet(server), "ignore value with a line break");
            return;
        }
        self.server.clear();
        self.server.extend_from_slice(server);
    }

    #[inline]
    pub fn must_skip_body(&self) -> bool {
        must_skip_body(self.status)
    }

    #[inline]
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    #[inline]
    pub fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailer
    }

    #[inline]
    pub fn args(&self) -> &Args {
        &self.args
    }

    pub(crate) fn args_mut(&mut self) -> &mut Args {
        &mut self.args
    }

    /// The raw `Content-Length` value that failed to parse, if the parser
    /// downgraded this response to an identity body.
    #[inline]
    pub fn invalid_content_length(&self) -> Option<&[u8]> {
        self.invalid_content_length.as_deref()
    }

    /// The recorded, non-fatal parse problem of this header, if any.
    pub fn soft_error(&self) -> Option<ParseError> {
        self.invalid_content_length.as_deref().map(|value| ParseError::invalid_content_length(buffer_snippet(value)))
    }

    pub(crate) fn record_invalid_content_length(&mut self, value: &[u8]) {
        self.invalid_content_length = Some(value.to_vec());
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        if case_insensitive_eq(key, b"Content-Type") {
            return (!self.content_type.is_empty()).then_some(&self.content_type[..]);
        }
        if case_insensitive_eq(key, b"Server") {
            return (!self.server.is_empty()).then_some(&self.server[..]);
        }
        self.args.get(key)
    }

    /// Sets a header, routing well-known names to their typed fields.
    pub fn set(&mut self, key: &[u8], value: &[u8]) {
        if !is_writable_field(key, value) {
            warn!(key = %buffer_snippet(key), "ignore header field with a line break");
            return;
        }
        let key = normalized_key(key, self.disable_normalizing);
        if !self.set_special(&key, value) {
            self.args.set(&key, value);
        }
    }

    pub fn add(&mut self, key: &[u8], value: &[u8]) {
        if !is_writable_field(key, value) {
            warn!(key = %buffer_snippet(key), "ignore header field with a line break");
            return;
        }
        let key = normalized_key(key, self.disable_normalizing);
        if !self.set_special(&key, value) {
            self.args.add(&key, value);
        }
    }

    pub fn remove(&mut self, key: &[u8]) {
        if case_insensitive_eq(key, b"Content-Type") {
            self.content_type.clear();
        } else if case_insensitive_eq(key, b"Server") {
            self.server.clear();
        } else if case_insensitive_eq(key, b"Content-Length") || case_insensitive_eq(key, b"Transfer-Encoding") {
            self.content_length = ContentLength::Identity;
        } else if case_insensitive_eq(key, b"Connection") {
            self.connection_close = false;
            self.args.remove(key);
        } else if case_insensitive_eq(key, b"Trailer") {
            self.trailer.clear();
        } else {
            self.args.remove(key);
        }
    }

    fn set_special(&mut self, key: &[u8], value: &[u8]) -> bool {
        if case_insensitive_eq(key, b"Content-Type") {
            self.set_content_type(value);
        } else if case_insensitive_eq(key, b"Server") {
            self.set_server(value);
        } else if case_insensitive_eq(key, b"Content-Length") {
            if let Some(len) = parse_uint(value) {
                self.content_length = ContentLength::Length(len);
            }
        } else if case_insensitive_eq(key, b"Transfer-Encoding") {
            if !case_insensitive_eq(value, b"identity") {
                self.content_length = ContentLength::Chunked;
            }
        } else if case_insensitive_eq(key, b"Connection") {
            if case_insensitive_eq(value, b"close") {
                self.connection_close = true;
            } else {
                self.connection_close = false;
                self.args.set(key, value);
            }
        } else if case_insensitive_eq(key, b"Trailer") {
            if let Err(e) = self.trailer.set_announced(value) {
                warn!(cause = %e, "ignore invalid trailer announcement");
            }
        } else {
            return false;
        }
        true
    }
}

/// A response header with its body.
///
/// The handler fills the body either as a buffer ([`Response::set_body`]) or
/// as a stream ([`Response::set_body_stream`]); the framing is decided when
/// the response is written.
#[derive(Debug, Default)]
pub struct Response {
    pub header: ResponseHeader,
    body: Body,
    skip_body: bool,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.header.reset();
        self.body.reset();
        self.skip_body = false;
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.header.status()
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.header.set_status(status);
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        self.body.as_bytes()
    }

    pub fn set_body(&mut self, body: &[u8]) {
        self.body.set(body);
    }

    pub fn append_body(&mut self, body: &[u8]) {
        self.body.append(body);
    }

    /// Sends the body from `source`; `size` of `None` selects chunked encoding.
    pub fn set_body_stream(&mut self, source: BodySource, size: Option<u64>) {
        self.body.set_stream(source, size);
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut ResponseHeader, &mut Body) {
        (&mut self.header, &mut self.body)
    }

    /// When set, only the header is written (e.g. for `HEAD` requests).
    pub fn set_skip_body(&mut self, skip: bool) {
        self.skip_body = skip;
    }

    #[inline]
    pub fn skip_body(&self) -> bool {
        self.skip_body
    }

    /// Sets status, body and `Connection: close`, as used for error responses.
    pub fn set_error(&mut self, status: StatusCode, body: &str) {
        self.reset();
        self.header.set_status(status);
        self.header.set_content_type(DEFAULT_CONTENT_TYPE);
        self.header.set_connection_close(true);
        self.body.set(body.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_must_skip_body() {
        assert!(must_skip_body(StatusCode::CONTINUE));
        assert!(must_skip_body(StatusCode::SWITCHING_PROTOCOLS));
        assert!(must_skip_body(StatusCode::NO_CONTENT));
        assert!(must_skip_body(StatusCode::NOT_MODIFIED));
        assert!(!must_skip_body(StatusCode::OK));
        assert!(!must_skip_body(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_special_headers() {
        let mut header = ResponseHeader::new();
        header.set(b"server", b"h1-engine");
        header.set(b"content-type", b"application/json");
        header.set(b"x-request-id", b"42");
        header.set(b"connection", b"keep-alive");

        assert_eq!(header.server(), b"h1-engine");
        assert_eq!(header.get(b"Content-Type"), Some(&b"application/json"[..]));
        assert_eq!(header.get(b"X-Request-Id"), Some(&b"42"[..]));
        assert!(header.has_keep_alive());
        assert!(!header.connection_close());

        header.remove(b"X-Request-Id");
        assert!(header.get(b"X-Request-Id").is_none());
    }

    #[test]
    fn test_line_break_values_ignored() {
        let mut header = ResponseHeader::new();
        header.set(b"Location", b"/next\r\nSet-Cookie: evil=1");
        header.set(b"X-Evil\r\nSet-Cookie", b"1");
        header.set(b"Content-Type", b"text/html\0");
        header.set_reason(b"OK\r\nX-Injected: 1");

        assert!(header.get(b"Location").is_none());
        assert!(header.args().is_empty());
        assert!(header.get(b"Content-Type").is_none());
        assert!(header.reason().is_empty());
    }

    #[test]
    fn test_set_error() {
        let mut response = Response::new();
        response.set_body(b"partial");
        response.header.set(b"X-Debug", b"1");
        response.set_error(StatusCode::BAD_REQUEST, "Error when parsing request");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.header.connection_close());
        assert!(response.header.args().is_empty());
        assert_eq!(response.body(), b"Error when parsing request");
    }
}
