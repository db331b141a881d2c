//! Parsing of request and response header blocks into the typed header models.
//!
//! Both parsers work on a buffer that may hold only part of the header block;
//! in that case they fail with [`ParseError::NeedMoreData`] and leave it to
//! the caller to retry once more bytes are buffered. On success they return
//! the number of bytes that made up the whole block (first line included).

use crate::codec::header::HeaderScanner;
use crate::ensure;
use crate::protocol::{ContentLength, ParseError, RequestHeader, ResponseHeader};
use crate::utils::{buffer_snippet, case_insensitive_eq, parse_uint};
use http::{Method, StatusCode, Version};
use tracing::{trace, warn};

/// Upper bound on the size of a header block, first line included.
pub const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Returns the next line without its line ending, and the bytes consumed.
fn next_line(buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
    let Some(end) = buf.iter().position(|&b| b == b'\n') else {
        return Err(ParseError::NeedMoreData);
    };
    let line = match &buf[..end] {
        [line @ .., b'\r'] => line,
        line => line,
    };
    Ok((line, end + 1))
}

/// Returns the first non-empty line and the bytes consumed up to its end.
fn first_line(buf: &[u8]) -> Result<(&[u8], usize), ParseError> {
    let mut pos = 0;
    loop {
        let (line, n) = next_line(&buf[pos..])?;
        pos += n;
        if !line.is_empty() {
            return Ok((line, pos));
        }
    }
}

fn parse_version(protocol: &[u8]) -> Version {
    if protocol == b"HTTP/1.1" { Version::HTTP_11 } else { Version::HTTP_10 }
}

/// Every byte must be HTAB, visible ASCII, SP or obs-text.
fn valid_header_value(value: &[u8]) -> bool {
    value.iter().all(|&b| b == b'\t' || (b >= 0x20 && b != 0x7f))
}

pub fn parse_request_header(header: &mut RequestHeader, buf: &[u8]) -> Result<usize, ParseError> {
    let first_line_len = parse_request_line(header, buf)?;
    let fields_len = parse_request_fields(header, &buf[first_line_len..])?;
    Ok(first_line_len + fields_len)
}

fn parse_request_line(header: &mut RequestHeader, buf: &[u8]) -> Result<usize, ParseError> {
    let (line, consumed) = first_line(buf)?;

    let method_end = line.iter().position(|&b| b == b' ').unwrap_or(0);
    ensure!(
        method_end > 0,
        ParseError::invalid_first_line(format!("cannot find http request method in {}", buffer_snippet(buf)))
    );
    let method = Method::from_bytes(&line[..method_end]).map_err(|_e| ParseError::InvalidMethod)?;
    header.set_method(method);

    let rest = &line[method_end + 1..];
    let (uri, version) = match rest.iter().rposition(|&b| b == b' ') {
        None => (rest, Version::HTTP_10),
        Some(n) => (&rest[..n], parse_version(&rest[n + 1..])),
    };
    ensure!(
        !uri.is_empty(),
        ParseError::invalid_first_line(format!("request uri cannot be empty in {}", buffer_snippet(buf)))
    );
    header.set_uri(uri);
    header.set_version(version);

    Ok(consumed)
}

fn parse_request_fields(header: &mut RequestHeader, buf: &[u8]) -> Result<usize, ParseError> {
    header.set_content_length(ContentLength::Identity);

    let mut scanner = HeaderScanner::new(buf).disable_normalizing(header.is_disable_normalizing());
    let mut deferred = None;
    let mut invalid_length = None;

    for raw in scanner.by_ref() {
        let raw = raw?;
        let (key, value) = (&raw.name[..], &raw.value[..]);

        // spaces between the header key and colon are not allowed
        ensure!(
            !key.iter().any(|b| matches!(b, b' ' | b'\t')),
            ParseError::invalid_header_name(format!("invalid header key {}", buffer_snippet(key)))
        );
        ensure!(
            valid_header_value(value),
            ParseError::invalid_header_value(format!("invalid header value {}", buffer_snippet(value)))
        );

        if case_insensitive_eq(key, b"Host") {
            header.set_host(value);
        } else if case_insensitive_eq(key, b"Content-Type") {
            header.set_content_type(value);
        } else if case_insensitive_eq(key, b"Content-Length") {
            if !header.content_length().is_chunked() {
                match parse_uint(value) {
                    Some(len) => header.set_content_length(ContentLength::Length(len)),
                    None => {
                        header.set_content_length(ContentLength::Identity);
                        invalid_length.get_or_insert_with(|| ParseError::invalid_content_length(buffer_snippet(value)));
                    }
                }
            }
        } else if case_insensitive_eq(key, b"Connection") {
            // once set, close is never cleared by a later field
            if case_insensitive_eq(value, b"close") {
                header.set_connection_close(true);
            } else {
                header.args_mut().add(key, value);
            }
        } else if case_insensitive_eq(key, b"Transfer-Encoding") {
            if !case_insensitive_eq(value, b"identity") {
                header.set_content_length(ContentLength::Chunked);
            }
        } else if case_insensitive_eq(key, b"Trailer") {
            if let Err(e) = header.trailer_mut().set_announced(value) {
                deferred.get_or_insert(e);
            }
        } else {
            header.args_mut().add(key, value);
        }
    }

    // a chunked body makes any Content-Length irrelevant
    if !header.content_length().is_chunked() {
        deferred = deferred.or(invalid_length);
    }
    if let Some(e) = deferred {
        header.set_connection_close(true);
        return Err(e);
    }

    if !header.is_http11() && !header.connection_close() {
        // http/1.0 closes the connection unless 'Connection: keep-alive' is set
        let close = !header.has_keep_alive();
        header.set_connection_close(close);
    }

    trace!(
        method = %header.method(),
        content_length = header.content_length_raw(),
        close = header.connection_close(),
        "parsed request header"
    );
    Ok(scanner.consumed())
}

pub fn parse_response_header(header: &mut ResponseHeader, buf: &[u8]) -> Result<usize, ParseError> {
    let first_line_len = parse_status_line(header, buf)?;
    let fields_len = parse_response_fields(header, &buf[first_line_len..])?;
    Ok(first_line_len + fields_len)
}

fn parse_status_line(header: &mut ResponseHeader, buf: &[u8]) -> Result<usize, ParseError> {
    let (line, consumed) = first_line(buf)?;

    let Some(protocol_end) = line.iter().position(|&b| b == b' ') else {
        return Err(ParseError::invalid_first_line(format!(
            "cannot find whitespace in the first line of response {}",
            buffer_snippet(buf)
        )));
    };
    header.set_version(parse_version(&line[..protocol_end]));

    let rest = &line[protocol_end + 1..];
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    let code = u16::try_from(parse_uint(&rest[..digits]).unwrap_or(u64::MAX))
        .ok()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| ParseError::invalid_status(format!("cannot parse status code in {}", buffer_snippet(buf))))?;
    ensure!(
        rest.len() == digits || rest[digits] == b' ',
        ParseError::invalid_status(format!("unexpected char at the end of status code in {}", buffer_snippet(buf)))
    );
    header.set_status(code);
    header.set_reason(rest.get(digits + 1..).unwrap_or_default());

    Ok(consumed)
}

fn parse_response_fields(header: &mut ResponseHeader, buf: &[u8]) -> Result<usize, ParseError> {
    header.set_content_length(ContentLength::Identity);

    let mut scanner = HeaderScanner::new(buf).disable_normalizing(header.is_disable_normalizing());
    let mut deferred = None;

    for raw in scanner.by_ref() {
        let raw = raw?;
        let (key, value) = (&raw.name[..], &raw.value[..]);
        if key.is_empty() {
            continue;
        }

        if case_insensitive_eq(key, b"Content-Type") {
            header.set_content_type(value);
        } else if case_insensitive_eq(key, b"Content-Length") {
            if !header.content_length().is_chunked() {
                match parse_uint(value) {
                    Some(len) => header.set_content_length(ContentLength::Length(len)),
                    None => {
                        // lenient towards peers: read until close instead of failing
                        warn!(value = %buffer_snippet(value), "invalid content-length in response");
                        header.set_content_length(ContentLength::Identity);
                        header.record_invalid_content_length(value);
                    }
                }
            }
        } else if case_insensitive_eq(key, b"Connection") {
            // once set, close is never cleared by a later field
            if case_insensitive_eq(value, b"close") {
                header.set_connection_close(true);
            } else {
                header.args_mut().add(key, value);
            }
        } else if case_insensitive_eq(key, b"Server") {
            header.set_server(value);
        } else if case_insensitive_eq(key, b"Transfer-Encoding") {
            if !case_insensitive_eq(value, b"identity") {
                header.set_content_length(ContentLength::Chunked);
            }
        } else if case_insensitive_eq(key, b"Trailer") {
            if let Err(e) = header.trailer_mut().set_announced(value) {
                deferred.get_or_insert(e);
            }
        } else {
            header.args_mut().add(key, value);
        }
    }

    if let Some(e) = deferred {
        header.set_connection_close(true);
        return Err(e);
    }

    if header.content_length().is_identity() && !header.must_skip_body() {
        // the body is delimited by the end of the connection
        header.set_connection_close(true);
    }
    if !header.is_http11() && !header.connection_close() {
        let close = !header.has_keep_alive();
        header.set_connection_close(close);
    }

    trace!(
        status = header.status().as_u16(),
        content_length = header.content_length_raw(),
        close = header.connection_close(),
        "parsed response header"
    );
    Ok(scanner.consumed())
}
