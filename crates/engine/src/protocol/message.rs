use bytes::Bytes;

/// Represents an item in the HTTP message payload stream.
///
/// This enum is used by the payload decoders to produce either data chunks
/// or signal the end of the payload stream (EOF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    /// A chunk of payload data
    Chunk(Bytes),
    /// Marks the end of the payload stream
    Eof,
}

impl PayloadItem {
    /// Returns true if this item represents the end of the payload stream
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    /// Returns true if this item contains chunk data
    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    /// Returns a reference to the contained bytes if this is a Chunk
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the PayloadItem and returns the contained bytes if this is a Chunk
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// How the body of a message is framed on the wire.
///
/// On the wire and in the raw accessors the two sentinel states keep their
/// classic integer encodings: `-1` for chunked, `-2` for identity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ContentLength {
    /// Body with a known length in bytes
    Length(u64),
    /// Body using chunked transfer encoding
    Chunked,
    /// Body without length framing, delimited by connection close
    #[default]
    Identity,
}

impl ContentLength {
    pub const CHUNKED_RAW: i64 = -1;
    pub const IDENTITY_RAW: i64 = -2;

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, ContentLength::Chunked)
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, ContentLength::Identity)
    }

    /// The fixed length, if any.
    #[inline]
    pub fn length(&self) -> Option<u64> {
        match self {
            ContentLength::Length(len) => Some(*len),
            _ => None,
        }
    }

    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            Self::CHUNKED_RAW => Some(ContentLength::Chunked),
            Self::IDENTITY_RAW => Some(ContentLength::Identity),
            len => u64::try_from(len).ok().map(ContentLength::Length),
        }
    }

    pub fn as_raw(&self) -> i64 {
        match self {
            ContentLength::Length(len) => i64::try_from(*len).unwrap_or(i64::MAX),
            ContentLength::Chunked => Self::CHUNKED_RAW,
            ContentLength::Identity => Self::IDENTITY_RAW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_sentinels() {
        assert_eq!(ContentLength::from_raw(-1), Some(ContentLength::Chunked));
        assert_eq!(ContentLength::from_raw(-2), Some(ContentLength::Identity));
        assert_eq!(ContentLength::from_raw(10), Some(ContentLength::Length(10)));
        assert_eq!(ContentLength::from_raw(-3), None);

        assert_eq!(ContentLength::Chunked.as_raw(), -1);
        assert_eq!(ContentLength::Identity.as_raw(), -2);
        assert_eq!(ContentLength::Length(7).as_raw(), 7);
    }
}
