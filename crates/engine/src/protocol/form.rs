//! Pre-parsing of `application/x-www-form-urlencoded` and
//! `multipart/form-data` request bodies.

use crate::codec::header::scan_headers;
use crate::ensure;
use crate::protocol::ParseError;
use crate::utils::{case_insensitive_eq, trim_space};
use bytes::Bytes;
use mime::Mime;
use tracing::trace;

/// A file part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFile {
    pub field: String,
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Fields decoded from a form body, in the order they appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    values: Vec<(String, String)>,
    files: Vec<FormFile>,
}

impl Form {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.files.is_empty()
    }

    /// First value of the field `name`.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> &[(String, String)] {
        &self.values
    }

    pub fn file(&self, name: &str) -> Option<&FormFile> {
        self.files.iter().find(|f| f.field == name)
    }

    pub fn files(&self) -> &[FormFile] {
        &self.files
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.files.clear();
    }

    pub fn parse_urlencoded(&mut self, body: &[u8]) -> Result<(), ParseError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body).map_err(ParseError::invalid_form)?;
        self.values.extend(pairs);
        Ok(())
    }

    pub fn parse_multipart(&mut self, body: &Bytes, boundary: &str) -> Result<(), ParseError> {
        ensure!(!boundary.is_empty(), ParseError::invalid_form("empty multipart boundary"));

        let delimiter = format!("--{boundary}");
        let delimiter = delimiter.as_bytes();
        let mut pos = find_subslice(body, delimiter, 0)
            .ok_or_else(|| ParseError::invalid_form("multipart boundary not found"))?;

        loop {
            pos += delimiter.len();
            let rest = &body[pos..];
            if rest.starts_with(b"--") {
                return Ok(());
            }
            let line_break = match rest {
                [b'\r', b'\n', ..] => 2,
                [b'\n', ..] => 1,
                _ => return Err(ParseError::invalid_form("malformed multipart delimiter line")),
            };
            pos += line_break;

            let (headers, consumed) = scan_headers(&body[pos..], false).map_err(|e| match e {
                ParseError::NeedMoreData => ParseError::invalid_form("truncated multipart part header"),
                other => other,
            })?;
            let data_start = pos + consumed;

            let mut closing = Vec::with_capacity(delimiter.len() + 2);
            closing.extend_from_slice(b"\r\n");
            closing.extend_from_slice(delimiter);
            let data_end = find_subslice(body, &closing, data_start)
                .ok_or_else(|| ParseError::invalid_form("unterminated multipart part"))?;

            let mut name = None;
            let mut filename = None;
            let mut content_type = None;
            for header in &headers {
                if case_insensitive_eq(&header.name, b"Content-Disposition") {
                    let disposition = String::from_utf8_lossy(&header.value);
                    name = disposition_param(&disposition, "name");
                    filename = disposition_param(&disposition, "filename");
                } else if case_insensitive_eq(&header.name, b"Content-Type") {
                    content_type = Some(String::from_utf8_lossy(&header.value).into_owned());
                }
            }

            let field = name.ok_or_else(|| ParseError::invalid_form("multipart part without a name"))?;
            let data = body.slice(data_start..data_end);
            trace!(field, len = data.len(), "parsed multipart part");
            match filename {
                Some(filename) => self.files.push(FormFile { field, filename, content_type, data }),
                None => self.values.push((field, String::from_utf8_lossy(&data).into_owned())),
            }

            // step onto the delimiter that closed this part
            pos = data_end + 2;
        }
    }
}

/// Decodes `body` into `form` when `content_type` is a form type.
///
/// Returns whether the body was recognised as a form.
pub fn parse_form(content_type: &[u8], body: &Bytes, form: &mut Form) -> Result<bool, ParseError> {
    let Ok(content_type) = std::str::from_utf8(content_type) else {
        return Ok(false);
    };
    let Ok(parsed) = content_type.parse::<Mime>() else {
        return Ok(false);
    };

    if parsed.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() {
        form.parse_urlencoded(body)?;
        return Ok(true);
    }

    if parsed.type_() == mime::MULTIPART && parsed.subtype() == mime::FORM_DATA {
        let boundary = parsed
            .get_param(mime::BOUNDARY)
            .ok_or_else(|| ParseError::invalid_form("multipart content type without boundary"))?;
        form.parse_multipart(body, boundary.as_str())?;
        return Ok(true);
    }

    Ok(false)
}

fn disposition_param(disposition: &str, param: &str) -> Option<String> {
    disposition.split(';').skip(1).find_map(|part| {
        let (key, value) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case(param) {
            return None;
        }
        let value = std::str::from_utf8(trim_space(value.as_bytes())).ok()?;
        Some(value.trim_matches('"').to_string())
    })
}

fn find_subslice(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < from + needle.len() {
        return None;
    }
    haystack[from..].windows(needle.len()).position(|w| w == needle).map(|p| p + from)
}
