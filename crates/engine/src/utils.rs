//! Utility macros and byte helpers shared by the parser and the writers.
//!
//! Header names and comma separated header values are handled here as plain
//! byte slices, so both the scanner and the typed header models agree on one
//! definition of "normalized" and "contains value".

/// A macro for early returns with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
/// It's useful for validation checks where you want to return early with an error
/// if some condition is not satisfied.
///
/// # Arguments
///
/// * `$predicate` - A boolean expression that should evaluate to true
/// * `$error` - The error value to return if the predicate is false
///
/// # Example
///
/// ```ignore
/// ensure!(header_len <= MAX_HEADER_BYTES, ParseError::too_large_header(header_len, MAX_HEADER_BYTES));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Normalizes a header name in place: the first byte and every byte following
/// a `-` are upper-cased, every other byte is lower-cased.
///
/// `content-type` becomes `Content-Type`, `X-FORWARDED-FOR` becomes `X-Forwarded-For`.
pub fn normalize_header_key(key: &mut [u8], disable_normalizing: bool) {
    if disable_normalizing || key.is_empty() {
        return;
    }

    let mut upper_next = true;
    for b in key.iter_mut() {
        if upper_next {
            b.make_ascii_uppercase();
        } else {
            b.make_ascii_lowercase();
        }
        upper_next = *b == b'-';
    }
}

/// Returns an owned, normalized copy of `key`.
pub fn normalized_key(key: &[u8], disable_normalizing: bool) -> Vec<u8> {
    let mut owned = key.to_vec();
    normalize_header_key(&mut owned, disable_normalizing);
    owned
}

#[inline]
pub fn case_insensitive_eq(a: &[u8], b: &[u8]) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Strips leading and trailing spaces and tabs.
pub fn trim_space(mut b: &[u8]) -> &[u8] {
    while let [b' ' | b'\t', rest @ ..] = b {
        b = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = b {
        b = rest;
    }
    b
}

/// Iterates over the comma separated items of a header value, trimmed.
pub fn header_values(value: &[u8]) -> impl Iterator<Item = &[u8]> {
    value.split(|&b| b == b',').map(trim_space)
}

/// Reports whether the comma separated header value `value` contains `needle`
/// (case-insensitive), e.g. `Connection: Upgrade, keep-alive` contains `keep-alive`.
pub fn has_header_value(value: &[u8], needle: &[u8]) -> bool {
    header_values(value).any(|v| case_insensitive_eq(v, needle))
}

/// CR, LF and NUL would end or split a header line when written.
#[inline]
pub fn has_line_break(b: &[u8]) -> bool {
    b.iter().any(|&c| matches!(c, b'\r' | b'\n' | 0))
}

/// Whether `key: value` renders as exactly one header line.
pub fn is_writable_field(key: &[u8], value: &[u8]) -> bool {
    !key.is_empty() && !key.contains(&b':') && !has_line_break(key) && !has_line_break(value)
}

/// Renders at most the first 64 bytes of `buf` for error messages.
pub fn buffer_snippet(buf: &[u8]) -> String {
    const LIMIT: usize = 64;
    if buf.len() <= LIMIT {
        format!("{:?}", String::from_utf8_lossy(buf))
    } else {
        format!("{:?}...", String::from_utf8_lossy(&buf[..LIMIT]))
    }
}

/// Parses an unsigned decimal integer, rejecting empty input, signs and overflow.
pub fn parse_uint(b: &[u8]) -> Option<u64> {
    if b.is_empty() {
        return None;
    }
    b.iter().try_fold(0u64, |acc, &c| {
        if c.is_ascii_digit() { acc.checked_mul(10)?.checked_add(u64::from(c - b'0')) } else { None }
    })
}
