//! Serialization of request and response headers.
//!
//! The field order is fixed so that the same header always renders to the
//! same bytes: first line, typed fields, auxiliary fields in insertion order,
//! `Trailer` announcement, `Connection: close`, blank line. Framing fields are
//! derived from the header's content length at the time of writing.

use crate::protocol::{ContentLength, DEFAULT_CONTENT_TYPE, RequestHeader, ResponseHeader, SendError};
use crate::utils::{buffer_snippet, case_insensitive_eq, is_writable_field};
use bytes::{BufMut, BytesMut};
use http::Version;
use std::io::Write;
use std::time::SystemTime;
use tracing::warn;

fn version_bytes(version: Version) -> Result<&'static [u8], SendError> {
    match version {
        Version::HTTP_11 => Ok(b"HTTP/1.1"),
        Version::HTTP_10 => Ok(b"HTTP/1.0"),
        other => Err(SendError::UnsupportedVersion(other)),
    }
}

fn put_field(dst: &mut BytesMut, key: &[u8], value: &[u8]) {
    if !is_writable_field(key, value) {
        warn!(key = %buffer_snippet(key), "skip header field that does not fit on one line");
        return;
    }
    dst.reserve(key.len() + value.len() + 4);
    dst.put_slice(key);
    dst.put_slice(b": ");
    dst.put_slice(value);
    dst.put_slice(b"\r\n");
}

fn put_framing(dst: &mut BytesMut, content_length: ContentLength) -> Result<(), SendError> {
    match content_length {
        ContentLength::Length(len) => write!(dst.writer(), "Content-Length: {len}\r\n")?,
        ContentLength::Chunked => dst.put_slice(b"Transfer-Encoding: chunked\r\n"),
        ContentLength::Identity => {}
    }
    Ok(())
}

pub fn encode_request_header(header: &RequestHeader, dst: &mut BytesMut) -> Result<(), SendError> {
    let version = version_bytes(header.version())?;
    let uri = if header.uri().is_empty() { &b"/"[..] } else { header.uri() };

    dst.put_slice(header.method().as_str().as_bytes());
    dst.put_u8(b' ');
    dst.put_slice(uri);
    dst.put_u8(b' ');
    dst.put_slice(version);
    dst.put_slice(b"\r\n");

    if !header.host().is_empty() {
        put_field(dst, b"Host", header.host());
    }
    if !header.content_type().is_empty() {
        put_field(dst, b"Content-Type", header.content_type());
    }

    let content_length = header.content_length();
    let bodiless = content_length == ContentLength::Length(0) && (header.is_get() || header.is_head());
    if !bodiless {
        put_framing(dst, content_length)?;
    }

    for (key, value) in header.args().iter() {
        if header.connection_close() && case_insensitive_eq(key, b"Connection") {
            continue;
        }
        put_field(dst, key, value);
    }

    if content_length.is_chunked() && !header.trailer().is_empty() {
        put_field(dst, b"Trailer", &header.trailer().announcement());
    }
    if header.connection_close() {
        put_field(dst, b"Connection", b"close");
    }

    dst.put_slice(b"\r\n");
    Ok(())
}

pub fn encode_response_header(header: &ResponseHeader, dst: &mut BytesMut) -> Result<(), SendError> {
    let version = version_bytes(header.version())?;
    let status = header.status();

    dst.put_slice(version);
    write!(dst.writer(), " {} ", status.as_u16())?;
    if header.reason().is_empty() {
        dst.put_slice(status.canonical_reason().unwrap_or("Unknown Status Code").as_bytes());
    } else {
        dst.put_slice(header.reason());
    }
    dst.put_slice(b"\r\n");

    if !header.server().is_empty() {
        put_field(dst, b"Server", header.server());
    }
    if !header.no_default_date() {
        put_field(dst, b"Date", httpdate::fmt_http_date(SystemTime::now()).as_bytes());
    }

    let skip_body = header.must_skip_body();
    if !header.content_type().is_empty() {
        put_field(dst, b"Content-Type", header.content_type());
    } else if !skip_body && !header.no_default_content_type() {
        put_field(dst, b"Content-Type", DEFAULT_CONTENT_TYPE);
    }

    let content_length = header.content_length();
    if !skip_body {
        put_framing(dst, content_length)?;
    }

    for (key, value) in header.args().iter() {
        if header.connection_close() && case_insensitive_eq(key, b"Connection") {
            continue;
        }
        put_field(dst, key, value);
    }

    if content_length.is_chunked() && !header.trailer().is_empty() {
        put_field(dst, b"Trailer", &header.trailer().announcement());
    }
    if header.connection_close() {
        put_field(dst, b"Connection", b"close");
    }

    dst.put_slice(b"\r\n");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::header::{parse_request_header, parse_response_header};
    use http::{Method, StatusCode};
    use indoc::indoc;

    #[test]
    fn test_request_field_order() {
        let mut header = RequestHeader::new();
        header.set_method(Method::POST);
        header.set_uri(b"/submit");
        header.set(b"x-first", b"1");
        header.set(b"host", b"example.com");
        header.set(b"X-Second", b"2");
        header.set(b"content-type", b"application/json");
        header.set_content_length(ContentLength::Length(2));
        header.set_connection_close(true);

        let mut dst = BytesMut::new();
        encode_request_header(&header, &mut dst).unwrap();

        let expected = indoc! {"
            POST /submit HTTP/1.1\r
            Host: example.com\r
            Content-Type: application/json\r
            Content-Length: 2\r
            X-First: 1\r
            X-Second: 2\r
            Connection: close\r
            \r
        "};
        assert_eq!(std::str::from_utf8(&dst).unwrap(), expected);
    }

    #[test]
    fn test_get_omits_zero_length() {
        let mut header = RequestHeader::new();
        header.set_uri(b"/");
        header.set_content_length(ContentLength::Length(0));

        let mut dst = BytesMut::new();
        encode_request_header(&header, &mut dst).unwrap();
        assert_eq!(&dst[..], b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn test_chunked_request_with_trailer() {
        let mut header = RequestHeader::new();
        header.set_method(Method::PUT);
        header.set_uri(b"/upload");
        header.set_content_length(ContentLength::Chunked);
        header.trailer_mut().set_announced(b"x-checksum").unwrap();

        let mut dst = BytesMut::new();
        encode_request_header(&header, &mut dst).unwrap();
        assert_eq!(
            std::str::from_utf8(&dst).unwrap(),
            "PUT /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\nTrailer: X-Checksum\r\n\r\n"
        );
    }

    #[test]
    fn test_response_header() {
        let mut header = ResponseHeader::new();
        header.set_server(b"h1-engine");
        header.set_no_default_date(true);
        header.set_content_length(ContentLength::Length(5));
        header.set(b"x-request-id", b"7");

        let mut dst = BytesMut::new();
        encode_response_header(&header, &mut dst).unwrap();
        let expected = indoc! {"
            HTTP/1.1 200 OK\r
            Server: h1-engine\r
            Content-Type: text/plain; charset=utf-8\r
            Content-Length: 5\r
            X-Request-Id: 7\r
            \r
        "};
        assert_eq!(std::str::from_utf8(&dst).unwrap(), expected);
    }

    #[test]
    fn test_line_break_cannot_split_header() {
        let mut header = ResponseHeader::new();
        header.set_no_default_date(true);
        header.set_content_length(ContentLength::Length(0));
        header.set(b"X-Name", b"a\r\nSet-Cookie: evil=1");
        header.add(b"X-Name", b"ok");
        header.set_server(b"h1\nX-Injected: 1");

        let mut dst = BytesMut::new();
        encode_response_header(&header, &mut dst).unwrap();
        assert_eq!(std::str::from_utf8(&dst).unwrap(), "HTTP/1.1 200 OK\r\nContent-Length: 0\r\nX-Name: ok\r\n\r\n");
    }

    #[test]
    fn test_response_skip_status_has_no_framing() {
        let mut header = ResponseHeader::new();
        header.set_no_default_date(true);
        header.set_status(StatusCode::NOT_MODIFIED);
        header.set_content_length(ContentLength::Length(10));

        let mut dst = BytesMut::new();
        encode_response_header(&header, &mut dst).unwrap();
        assert_eq!(&dst[..], b"HTTP/1.1 304 Not Modified\r\n\r\n");
    }

    #[test]
    fn test_response_date() {
        let header = ResponseHeader::new();
        let mut dst = BytesMut::new();
        encode_response_header(&header, &mut dst).unwrap();
        let text = std::str::from_utf8(&dst).unwrap();
        let date_line = text.lines().find(|l| l.starts_with("Date: ")).unwrap();
        assert!(httpdate::parse_http_date(&date_line["Date: ".len()..]).is_ok());
    }

    #[test]
    fn test_unsupported_version() {
        let mut header = RequestHeader::new();
        header.set_version(Version::HTTP_2);
        let mut dst = BytesMut::new();
        assert!(matches!(encode_request_header(&header, &mut dst), Err(SendError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_request_round_trip() {
        let mut header = RequestHeader::new();
        header.set_method(Method::POST);
        header.set_uri(b"/items?id=3");
        header.set(b"host", b"api.local");
        header.set(b"content-type", b"text/csv");
        header.set_content_length(ContentLength::Length(42));
        header.add(b"x-tag", b"a");
        header.add(b"x-tag", b"b");
        header.set(b"user-agent", b"  spaced value");

        let mut dst = BytesMut::new();
        encode_request_header(&header, &mut dst).unwrap();

        let mut parsed = RequestHeader::new();
        let consumed = parse_request_header(&mut parsed, &dst).unwrap();
        assert_eq!(consumed, dst.len());
        assert_eq!(parsed.method(), header.method());
        assert_eq!(parsed.uri(), header.uri());
        assert_eq!(parsed.host(), header.host());
        assert_eq!(parsed.content_type(), header.content_type());
        assert_eq!(parsed.content_length(), header.content_length());
        assert_eq!(parsed.connection_close(), header.connection_close());
        assert_eq!(parsed.args().get_all(b"X-Tag").collect::<Vec<_>>(), vec![&b"a"[..], &b"b"[..]]);
        assert_eq!(parsed.get(b"User-Agent"), Some(&b"spaced value"[..]));
    }

    #[test]
    fn test_response_round_trip() {
        let mut header = ResponseHeader::new();
        header.set_status(StatusCode::CREATED);
        header.set_server(b"srv");
        header.set_no_default_date(true);
        header.set_content_type(b"application/json");
        header.set_content_length(ContentLength::Chunked);
        header.trailer_mut().set_announced(b"X-Digest").unwrap();
        header.set(b"x-custom", b"v");

        let mut dst = BytesMut::new();
        encode_response_header(&header, &mut dst).unwrap();

        let mut parsed = ResponseHeader::new();
        parse_response_header(&mut parsed, &dst).unwrap();
        assert_eq!(parsed.status(), StatusCode::CREATED);
        assert_eq!(parsed.server(), b"srv");
        assert_eq!(parsed.content_type(), b"application/json");
        assert!(parsed.content_length().is_chunked());
        assert_eq!(parsed.trailer().announcement(), b"X-Digest");
        assert_eq!(parsed.get(b"X-Custom"), Some(&b"v"[..]));
        assert!(!parsed.connection_close());
    }
}
