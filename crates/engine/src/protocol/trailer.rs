//! Header fields sent after a chunked body.
//!
//! Trailer fields are restricted: any name that influences message framing,
//! routing or authentication is refused at insertion time, so a trailer can
//! never smuggle a second `Content-Length` or `Transfer-Encoding` past the
//! header parser.

use crate::ensure;
use crate::protocol::{Args, ParseError};
use crate::utils::{case_insensitive_eq, has_line_break, header_values, normalize_header_key};
use bytes::{BufMut, BytesMut};

const FORBIDDEN_TRAILER_KEYS: [&[u8]; 21] = [
    b"Authorization",
    b"Cache-Control",
    b"Connection",
    b"Content-Encoding",
    b"Content-Length",
    b"Content-Range",
    b"Content-Type",
    b"Expect",
    b"Host",
    b"Keep-Alive",
    b"Max-Forwards",
    b"Pragma",
    b"Proxy-Authenticate",
    b"Proxy-Authorization",
    b"Proxy-Connection",
    b"Range",
    b"Realm",
    b"Te",
    b"Trailer",
    b"Transfer-Encoding",
    b"Www-Authenticate",
];

/// Reports whether `key` may not appear as a trailer field.
pub fn is_forbidden_trailer(key: &[u8]) -> bool {
    FORBIDDEN_TRAILER_KEYS.iter().any(|forbidden| case_insensitive_eq(forbidden, key))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailer {
    args: Args,
    disable_normalizing: bool,
}

impl Trailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_disable_normalizing(&mut self, disable: bool) {
        self.disable_normalizing = disable;
    }

    #[inline]
    pub fn is_disable_normalizing(&self) -> bool {
        self.disable_normalizing
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Appends a trailer field, keeping existing values for the same key.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<(), ParseError> {
        let key = self.checked_key(key)?;
        ensure!(!has_line_break(value), ParseError::invalid_header_value("line break in trailer value"));
        self.args.add(&key, value);
        Ok(())
    }

    /// Sets a trailer field, replacing every existing value for the key.
    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), ParseError> {
        let key = self.checked_key(key)?;
        ensure!(!has_line_break(value), ParseError::invalid_header_value("line break in trailer value"));
        self.args.set(&key, value);
        Ok(())
    }

    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.args.get(key)
    }

    pub fn remove(&mut self, key: &[u8]) {
        self.args.remove(key);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.args.iter()
    }

    pub fn clear(&mut self) {
        self.args.clear();
    }

    /// Registers the names announced by a `Trailer: a, b` header with empty values.
    ///
    /// Previously registered fields are dropped first.
    pub fn set_announced(&mut self, value: &[u8]) -> Result<(), ParseError> {
        self.args.clear();
        for key in header_values(value).filter(|k| !k.is_empty()) {
            let key = self.checked_key(key)?;
            if !self.args.contains(&key) {
                self.args.add(&key, b"");
            }
        }
        Ok(())
    }

    /// Value of the `Trailer` header announcing this trailer's keys, e.g. `Foo, Bar`.
    pub fn announcement(&self) -> Vec<u8> {
        let mut keys: Vec<&[u8]> = Vec::with_capacity(self.args.len());
        for (key, _) in self.args.iter() {
            if !keys.iter().any(|k| case_insensitive_eq(k, key)) {
                keys.push(key);
            }
        }
        keys.join(&b", "[..])
    }

    /// Writes every field as a `Key: value\r\n` line, without the terminating blank line.
    pub fn encode(&self, dst: &mut BytesMut) {
        for (key, value) in self.args.iter() {
            dst.reserve(key.len() + value.len() + 4);
            dst.put_slice(key);
            dst.put_slice(b": ");
            dst.put_slice(value);
            dst.put_slice(b"\r\n");
        }
    }

    fn checked_key(&self, key: &[u8]) -> Result<Vec<u8>, ParseError> {
        ensure!(
            !key.is_empty() && !has_line_break(key) && !key.iter().any(|b| matches!(b, b' ' | b'\t' | b':')),
            ParseError::invalid_header_name(format!("invalid trailer key {:?}", String::from_utf8_lossy(key)))
        );
        let mut key = key.to_vec();
        normalize_header_key(&mut key, self.disable_normalizing);
        ensure!(!is_forbidden_trailer(&key), ParseError::forbidden_trailer(String::from_utf8_lossy(&key)));
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_text(trailer: &Trailer) -> String {
        let mut dst = BytesMut::new();
        trailer.encode(&mut dst);
        String::from_utf8(dst.to_vec()).unwrap()
    }

    #[test]
    fn test_add_and_set() {
        let mut trailer = Trailer::new();
        trailer.add(b"foo", b"value1").unwrap();
        trailer.add(b"foo", b"value2").unwrap();
        trailer.add(b"bar", b"value3").unwrap();
        let text = header_text(&trailer);
        assert!(text.contains("Foo: value1"));
        assert!(text.contains("Foo: value2"));
        assert!(text.contains("Bar: value3"));

        trailer.set(b"foo", b"value4").unwrap();
        let text = header_text(&trailer);
        assert!(!text.contains("Foo: value1"));
        assert!(text.contains("Foo: value4"));

        trailer.remove(b"FOO");
        assert_eq!(trailer.len(), 1);
        assert_eq!(trailer.get(b"bar"), Some(&b"value3"[..]));
    }

    #[test]
    fn test_forbidden_keys() {
        let mut trailer = Trailer::new();
        assert!(matches!(trailer.add(b"Content-Type", b""), Err(ParseError::ForbiddenTrailer { .. })));
        assert!(matches!(trailer.set(b"proxy-connection", b""), Err(ParseError::ForbiddenTrailer { .. })));
        assert!(matches!(trailer.add(b"bad key", b"v"), Err(ParseError::InvalidHeaderName { .. })));
        assert!(matches!(trailer.add(b"X-Sum", b"1\r\nX-Other: 2"), Err(ParseError::InvalidHeaderValue { .. })));
        assert!(matches!(trailer.set(b"X-Sum:", b"1"), Err(ParseError::InvalidHeaderName { .. })));

        for key in FORBIDDEN_TRAILER_KEYS {
            assert!(is_forbidden_trailer(key));
        }
        assert!(is_forbidden_trailer(b"transfer-encoding"));
        assert!(!is_forbidden_trailer(b"X-Checksum"));
    }

    #[test]
    fn test_announced() {
        let mut trailer = Trailer::new();
        trailer.set_announced(b"      foo,      crafter       ,        aaa      ").unwrap();
        let text = header_text(&trailer);
        assert!(text.contains("Foo:"));
        assert!(text.contains("Crafter:"));
        assert!(text.contains("Aaa:"));
        assert_eq!(trailer.announcement(), b"Foo, Crafter, Aaa");

        trailer.set_announced(b"FOO-CRAFTER-AAA").unwrap();
        assert_eq!(header_text(&trailer), "Foo-Crafter-Aaa: \r\n");

        assert!(trailer.set_announced(b"foo, content-length").is_err());
    }

    #[test]
    fn test_empty() {
        let mut trailer = Trailer::new();
        assert!(trailer.is_empty());
        trailer.set(b"foo", b"").unwrap();
        assert!(!trailer.is_empty());
    }
}
