//! Unified decoder over the three body framings.
//!
//! The framing is picked from the message's [`ContentLength`]:
//! - `Length(n)`: exactly `n` bytes
//! - `Chunked`: chunked transfer encoding, with trailer fields
//! - `Identity`: everything up to the end of the stream

use crate::codec::body::chunked_decoder::{ChunkedDecoder, TrailerFields};
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ContentLength, ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Read until the peer closes; `true` once the close was seen.
    Identity(bool),
}

impl PayloadDecoder {
    pub fn new(content_length: ContentLength) -> Self {
        match content_length {
            ContentLength::Length(len) => Self::fix_length(len),
            ContentLength::Chunked => Self::chunked(),
            ContentLength::Identity => Self::identity(),
        }
    }

    pub fn empty() -> Self {
        Self::fix_length(0)
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn identity() -> Self {
        Self { kind: Kind::Identity(false) }
    }

    /// Keeps trailer field names as received.
    pub fn disable_normalizing(mut self, disable: bool) -> Self {
        if let Kind::Chunked(decoder) = self.kind {
            self.kind = Kind::Chunked(decoder.disable_normalizing(disable));
        }
        self
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    /// Whether the end of the body has been decoded.
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            Kind::Length(decoder) => decoder.remaining() == 0,
            Kind::Chunked(decoder) => decoder.is_finished(),
            Kind::Identity(eof) => *eof,
        }
    }

    /// Trailer fields of a finished chunked body; empty for other framings.
    pub fn take_trailer(&mut self) -> TrailerFields {
        match &mut self.kind {
            Kind::Chunked(decoder) => decoder.take_trailer(),
            _ => Vec::new(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::Identity(true) => Ok(Some(PayloadItem::Eof)),
            Kind::Identity(false) if src.is_empty() => Ok(None),
            Kind::Identity(false) => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(decoder) => decoder.decode_eof(src),
            Kind::Identity(eof) => {
                if src.is_empty() {
                    *eof = true;
                    Ok(Some(PayloadItem::Eof))
                } else {
                    Ok(Some(PayloadItem::Chunk(src.split().freeze())))
                }
            }
        }
    }
}
