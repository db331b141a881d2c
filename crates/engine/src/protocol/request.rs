//! HTTP request header model and request container.
//!
//! [`RequestHeader`] keeps the fields the engine needs for framing and
//! routing decisions as typed values (method, target, version, host,
//! content type, content length, connection close, trailer) and everything
//! else in an ordered [`Args`] store. A header is reset, not reallocated,
//! between requests on the same connection.

use crate::protocol::form::Form;
use crate::protocol::{Args, Body, ContentLength, Trailer};
use crate::utils::{
    buffer_snippet, case_insensitive_eq, has_header_value, has_line_break, is_writable_field, normalized_key, parse_uint,
};
use http::{Method, Version};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RequestHeader {
    method: Method,
    uri: Vec<u8>,
    version: Version,
    host: Vec<u8>,
    content_type: Vec<u8>,
    content_length: ContentLength,
    connection_close: bool,
    args: Args,
    trailer: Trailer,
    disable_normalizing: bool,
}

impl Default for RequestHeader {
    fn default() -> Self {
        Self {
            method: Method::GET,
            uri: Vec::new(),
            version: Version::HTTP_11,
            host: Vec::new(),
            content_type: Vec::new(),
            content_length: ContentLength::Identity,
            connection_close: false,
            args: Args::new(),
            trailer: Trailer::new(),
            disable_normalizing: false,
        }
    }
}

impl RequestHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every field, keeping allocations and the normalization setting.
    pub fn reset(&mut self) {
        self.method = Method::GET;
        self.uri.clear();
        self.version = Version::HTTP_11;
        self.host.clear();
        self.content_type.clear();
        self.content_length = ContentLength::Identity;
        self.connection_close = false;
        self.args.clear();
        self.trailer.clear();
    }

    pub fn set_disable_normalizing(&mut self, disable: bool) {
        self.disable_normalizing = disable;
        self.trailer.set_disable_normalizing(disable);
    }

    #[inline]
    pub fn is_disable_normalizing(&self) -> bool {
        self.disable_normalizing
    }

    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn set_method(&mut self, method: Method) {
        self.method = method;
    }

    #[inline]
    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    #[inline]
    pub fn is_head(&self) -> bool {
        self.method == Method::HEAD
    }

    /// The request target exactly as it appears on the request line.
    #[inline]
    pub fn uri(&self) -> &[u8] {
        &self.uri
    }

    pub fn set_uri(&mut self, uri: &[u8]) {
        if has_line_break(uri) {
            warn!(uri = %buffer_snippet(uri), "ignore value with a line break");
            return;
        }
        self.uri.clear();
        self.uri.extend_from_slice(uri);
    }

    /// The path part of the request target, without the query string.
    pub fn path(&self) -> &[u8] {
        let end = self.uri.iter().position(|&b| b == b'?' || b == b'#').unwrap_or(self.uri.len());
        &self.uri[..end]
    }

    /// The query string of the request target, without the leading `?`.
    pub fn query(&self) -> &[u8] {
        match self.uri.iter().position(|&b| b == b'?') {
            Some(start) => {
                let rest = &self.uri[start + 1..];
                let end = rest.iter().position(|&b| b == b'#').unwrap_or(rest.len());
                &rest[..end]
            }
            None => &[],
        }
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
    pub fn host(&self) -> &[u8] {
        &self.host
    }

    pub fn set_host(&mut self, host: &[u8]) {
        if has_line_break(host) {
            warn!(host = %buffer_snippet(host), "ignore value with a line break");
            return;
        }
        self.host.clear();
        self.host.extend_from_slice(host);
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

    /// Content length in its integer form: `-1` chunked, `-2` identity.
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

    /// Whether the client asked for a `100 Continue` before sending the body.
    pub fn expect_continue(&self) -> bool {
        self.args.get(b"Expect").is_some_and(|v| case_insensitive_eq(v, b"100-continue"))
    }

    /// Whether an HTTP/1.0 request explicitly asked for keep-alive.
    pub fn has_keep_alive(&self) -> bool {
        self.args.get_all(b"Connection").any(|v| has_header_value(v, b"keep-alive"))
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

    /// Looks up a header value; `Host` and `Content-Type` are served from their typed fields.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        if case_insensitive_eq(key, b"Host") {
            return (!self.host.is_empty()).then_some(&self.host[..]);
        }
        if case_insensitive_eq(key, b"Content-Type") {
            return (!self.content_type.is_empty()).then_some(&self.content_type[..]);
        }
        self.args.get(key)
    }

    /// Sets a header, routing well-known names to their typed fields.
    ///
    /// An unparsable `Content-Length` or a forbidden `Trailer` announcement is
    /// ignored here; the wire parser reports those as errors instead.
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

    /// Appends a header without replacing existing values of the same name.
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
        if case_insensitive_eq(key, b"Host") {
            self.host.clear();
        } else if case_insensitive_eq(key, b"Content-Type") {
            self.content_type.clear();
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
        if case_insensitive_eq(key, b"Host") {
            self.set_host(value);
        } else if case_insensitive_eq(key, b"Content-Type") {
            self.set_content_type(value);
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

    /// Iterates over every header as it would be written, typed fields first.
    pub fn visit_all<F: FnMut(&[u8], &[u8])>(&self, mut f: F) {
        if !self.host.is_empty() {
            f(b"Host", &self.host);
        }
        if !self.content_type.is_empty() {
            f(b"Content-Type", &self.content_type);
        }
        for (key, value) in self.args.iter() {
            f(key, value);
        }
    }
}

/// A request header together with its buffered body and parsed form.
#[derive(Debug, Default)]
pub struct Request {
    pub header: RequestHeader,
    body: Body,
    form: Form,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.header.reset();
        self.body.reset();
        self.form.clear();
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        self.body.as_bytes()
    }

    pub fn set_body(&mut self, body: &[u8]) {
        self.body.set(body);
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut Body {
        &mut self.body
    }

    #[inline]
    pub fn form(&self) -> &Form {
        &self.form
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut RequestHeader, &mut Body, &mut Form) {
        (&mut self.header, &mut self.body, &mut self.form)
    }
}
