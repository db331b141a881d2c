//! Tokenizer for a raw header block.
//!
//! [`HeaderScanner`] walks a byte buffer that is believed to start with a
//! header block and yields one [`RawHeader`] per field until the terminating
//! empty line. The buffer is never copied unless a field needs rewriting:
//! names are borrowed when they are already in canonical form and values are
//! borrowed unless they span folded continuation lines.
//!
//! An incomplete block yields [`ParseError::NeedMoreData`], so callers can
//! retry with a larger window of the connection's read-ahead buffer.

use crate::protocol::ParseError;
use crate::utils::{buffer_snippet, normalize_header_key};
use std::borrow::Cow;
use tracing::trace;

/// One header field as found on the wire.
///
/// Borrowed views are only valid until the backing buffer is mutated, which
/// the lifetime enforces; call [`RawHeader::into_owned`] to keep a field longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader<'a> {
    pub name: Cow<'a, [u8]>,
    pub value: Cow<'a, [u8]>,
}

impl RawHeader<'_> {
    pub fn into_owned(self) -> RawHeader<'static> {
        RawHeader { name: Cow::Owned(self.name.into_owned()), value: Cow::Owned(self.value.into_owned()) }
    }
}

#[derive(Debug)]
pub struct HeaderScanner<'a> {
    buf: &'a [u8],
    pos: usize,
    disable_normalizing: bool,
    done: bool,
}

impl<'a> HeaderScanner<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, disable_normalizing: false, done: false }
    }

    pub fn disable_normalizing(mut self, disable: bool) -> Self {
        self.disable_normalizing = disable;
        self
    }

    /// Bytes consumed so far, including the terminating empty line once it was seen.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.pos
    }

    /// Whether the terminating empty line has been consumed.
    #[inline]
    pub fn is_finished(&self) -> bool {
        self.done
    }

    fn fail(&mut self, e: ParseError) -> Option<Result<RawHeader<'a>, ParseError>> {
        self.done = true;
        Some(Err(e))
    }
}

impl<'a> Iterator for HeaderScanner<'a> {
    type Item = Result<RawHeader<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rest = &self.buf[self.pos..];
        if rest.starts_with(b"\r\n") {
            self.pos += 2;
            self.done = true;
            return None;
        }
        if rest.starts_with(b"\n") {
            self.pos += 1;
            self.done = true;
            return None;
        }

        // a header name is always followed by a line feed at some point, at least the
        // one of the terminating empty line
        let Some(line_end) = find(rest, b'\n') else {
            return self.fail(ParseError::NeedMoreData);
        };
        let Some(colon) = find(rest, b':') else {
            return self.fail(ParseError::NeedMoreData);
        };
        if line_end < colon {
            return self.fail(ParseError::invalid_header_name(format!(
                "line break before colon in {}",
                buffer_snippet(&rest[..line_end])
            )));
        }

        let name = &rest[..colon];

        let mut value_start = colon + 1;
        while value_start < line_end && matches!(rest[value_start], b' ' | b'\t') {
            value_start += 1;
        }

        // extend the value over folded continuation lines
        let mut value_end = line_end;
        let mut folded = false;
        loop {
            let next = value_end + 1;
            if next >= rest.len() || !matches!(rest[next], b' ' | b'\t') {
                break;
            }
            match find(&rest[next..], b'\n') {
                Some(d) => {
                    value_end = next + d;
                    folded = true;
                }
                None => return self.fail(ParseError::NeedMoreData),
            }
        }

        let raw_value = &rest[value_start..value_end];
        let value = if folded { Cow::Owned(unfold(raw_value)) } else { Cow::Borrowed(trim_line_end(raw_value)) };

        self.pos += value_end + 1;

        let name = canonical_name(name, self.disable_normalizing);
        trace!(name = %String::from_utf8_lossy(&name), folded, "scanned header");
        Some(Ok(RawHeader { name, value }))
    }
}

#[inline]
fn find(buf: &[u8], byte: u8) -> Option<usize> {
    buf.iter().position(|&b| b == byte)
}

fn trim_line_end(mut value: &[u8]) -> &[u8] {
    if let [rest @ .., b'\r'] = value {
        value = rest;
    }
    while let [rest @ .., b' '] = value {
        value = rest;
    }
    value
}

/// Joins folded lines with a single space; any CR or LF left inside becomes a space.
fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    for (index, line) in raw.split(|&b| b == b'\n').enumerate() {
        let line = trim_line_end(line);
        let line = if index == 0 { line } else { crate::utils::trim_space(line) };
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(b' ');
        }
        out.extend(line.iter().map(|&b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
    }
    out
}

fn canonical_name(name: &[u8], disable_normalizing: bool) -> Cow<'_, [u8]> {
    if disable_normalizing || is_canonical(name) {
        return Cow::Borrowed(name);
    }
    let mut owned = name.to_vec();
    normalize_header_key(&mut owned, false);
    Cow::Owned(owned)
}

fn is_canonical(name: &[u8]) -> bool {
    let mut upper_next = true;
    for &b in name {
        let ok = if upper_next { !b.is_ascii_lowercase() } else { !b.is_ascii_uppercase() };
        if !ok {
            return false;
        }
        upper_next = b == b'-';
    }
    true
}

/// Scans a complete header block into owned fields, returning them with the
/// number of bytes consumed.
pub fn scan_headers(buf: &[u8], disable_normalizing: bool) -> Result<(Vec<RawHeader<'_>>, usize), ParseError> {
    let mut scanner = HeaderScanner::new(buf).disable_normalizing(disable_normalizing);
    let mut headers = Vec::new();
    for header in scanner.by_ref() {
        headers.push(header?);
    }
    Ok((headers, scanner.consumed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn collect(raw: &str) -> Vec<(String, String)> {
        let (headers, consumed) = scan_headers(raw.as_bytes(), false).unwrap();
        assert_eq!(consumed, raw.len());
        headers
            .into_iter()
            .map(|h| (String::from_utf8(h.name.into_owned()).unwrap(), String::from_utf8(h.value.into_owned()).unwrap()))
            .collect()
    }

    #[test]
    fn test_basic() {
        let raw = indoc! {"
            Host: 127.0.0.1:8080\r
            user-agent: curl/7.79.1\r
            Accept: */*\r
            \r
        "};
        let headers = collect(raw);
        assert_eq!(
            headers,
            vec![
                ("Host".into(), "127.0.0.1:8080".into()),
                ("User-Agent".into(), "curl/7.79.1".into()),
                ("Accept".into(), "*/*".into()),
            ]
        );
    }

    #[test]
    fn test_folded_value() {
        let headers = collect("Content-Type: foo/bar;\r\n\tnewline\r\nFoo: Bar\r\n\r\n");
        assert_eq!(
            headers,
            vec![("Content-Type".into(), "foo/bar; newline".into()), ("Foo".into(), "Bar".into())]
        );
    }

    #[test]
    fn test_multi_line_values() {
        let raw = "EmptyValue1:\r\n\
                   Content-Type: foo/bar;\r\n\tnewline;\r\n another/newline\r\n\
                   Foo: Bar\r\n\
                   Multi-Line: one;\r\n two\r\n\
                   Values: v1;\r\n v2; v3;\r\n v4;\tv5\r\n\
                   \r\n";
        let headers = collect(raw);
        assert_eq!(
            headers,
            vec![
                ("Emptyvalue1".into(), String::new()),
                ("Content-Type".into(), "foo/bar; newline; another/newline".into()),
                ("Foo".into(), "Bar".into()),
                ("Multi-Line".into(), "one; two".into()),
                ("Values".into(), "v1; v2; v3; v4;\tv5".into()),
            ]
        );
    }

    #[test]
    fn test_trailing_whitespace_and_bare_lf() {
        let headers = collect("Foo:   bar   \nX-Empty: \n\n");
        assert_eq!(headers, vec![("Foo".into(), "bar".into()), ("X-Empty".into(), String::new())]);
    }

    #[test]
    fn test_borrowed_when_canonical() {
        let raw = b"Content-Length: 10\r\nx-lower: v\r\n\r\n";
        let (headers, _) = scan_headers(raw, false).unwrap();
        assert!(matches!(headers[0].name, Cow::Borrowed(_)));
        assert!(matches!(headers[0].value, Cow::Borrowed(_)));
        assert!(matches!(headers[1].name, Cow::Owned(_)));
        assert_eq!(&headers[1].name[..], b"X-Lower");
    }

    #[test]
    fn test_disable_normalizing() {
        let (headers, _) = scan_headers(b"x-lower: v\r\n\r\n", true).unwrap();
        assert_eq!(&headers[0].name[..], b"x-lower");
    }

    #[test]
    fn test_invalid_name() {
        let raw = b"Host: go.dev\r\nGopher-New-\r\n Line: This is a header on multiple lines\r\n\r\n";
        let result = scan_headers(raw, false);
        assert!(matches!(result, Err(ParseError::InvalidHeaderName { .. })));
    }

    #[test]
    fn test_need_more() {
        for raw in [&b"This is a header on multiple lines"[..], b"Gopher-New-\r\n Line", b"Host: a\r\n", b"Host: a"] {
            let result = scan_headers(raw, false);
            assert!(matches!(result, Err(ParseError::NeedMoreData)), "{:?}", String::from_utf8_lossy(raw));
        }
    }

    #[test]
    fn test_consumed_stops_at_block_end() {
        let raw = b"Foo: bar\r\n\r\nbody bytes";
        let (headers, consumed) = scan_headers(raw, false).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(&raw[consumed..], b"body bytes");
    }
}
