//! Reference decoder for `content-encoding`.
//!
//! This is the collaborator that turns raw bytes into decoded bytes or a
//! [`DecodingError`]. The view layer never calls it; it only observes the resulting
//! [`Payload`](crate::payload::Payload). Hosts that decode elsewhere can ignore it.
//!
//! Encodings are listed in the order they were applied, so they are undone in
//! reverse, e.g. `content-encoding: gzip, br` is decoded with brotli then gzip.

use crate::error::DecodingError;
use crate::payload::Headers;
use bytes::Bytes;
use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
use std::io::{self, Read};
use tracing::trace;

/// A content coding we know how to undo.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Deflate,
    Br,
    Zstd,
}

impl ContentEncoding {
    /// Parses one `content-encoding` token, case-insensitively.
    ///
    /// # Errors
    /// Returns an `UNKNOWN_ENCODING` [`DecodingError`] for anything we cannot undo.
    pub fn parse(token: &str) -> Result<Self, DecodingError> {
        match token.trim().to_ascii_lowercase().as_str() {
            "" | "identity" => Ok(Self::Identity),
            "gzip" | "x-gzip" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            "br" => Ok(Self::Br),
            "zstd" => Ok(Self::Zstd),
            _ => Err(DecodingError::unknown_encoding(token.trim())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
            Self::Br => "br",
            Self::Zstd => "zstd",
        }
    }

    fn decode(self, data: &[u8]) -> Result<Vec<u8>, io::Error> {
        let mut out = Vec::with_capacity(data.len().saturating_mul(2));
        match self {
            Self::Identity => out.extend_from_slice(data),
            Self::Gzip => {
                GzDecoder::new(data).read_to_end(&mut out)?;
            }
            Self::Deflate => {
                // servers disagree on whether "deflate" means zlib-wrapped or raw
                if ZlibDecoder::new(data).read_to_end(&mut out).is_err() {
                    out.clear();
                    DeflateDecoder::new(data).read_to_end(&mut out)?;
                }
            }
            Self::Br => {
                brotli::Decompressor::new(data, 4096).read_to_end(&mut out)?;
            }
            Self::Zstd => {
                out = zstd::stream::decode_all(data)?;
            }
        }
        Ok(out)
    }
}

/// Undoes every `content-encoding` declared in `headers`.
///
/// # Errors
/// Returns a [`DecodingError`] carrying `UNKNOWN_ENCODING` or `DECODE_FAILED`.
pub fn decode_body(raw: &Bytes, headers: &Headers) -> Result<Bytes, DecodingError> {
    let mut encodings = Vec::new();
    for value in headers.get_all(&http::header::CONTENT_ENCODING) {
        let Ok(tokens) = value.to_str() else {
            return Err(DecodingError::unknown_encoding(String::from_utf8_lossy(value.as_bytes())));
        };
        for token in tokens.split(',') {
            encodings.push(ContentEncoding::parse(token)?);
        }
    }

    if encodings.iter().all(|e| *e == ContentEncoding::Identity) {
        return Ok(raw.clone());
    }

    let mut data = raw.to_vec();
    for encoding in encodings.into_iter().rev() {
        let before = data.len();
        data = encoding.decode(&data).map_err(|e| DecodingError::decode_failed(encoding.name(), &e))?;
        trace!(encoding = encoding.name(), before, after = data.len(), "decoded body");
    }
    Ok(Bytes::from(data))
}
