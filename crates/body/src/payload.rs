//! The immutable message body value this crate reads.
//!
//! A [`Payload`] is built by whatever owns the message (an exchange store, a
//! breakpoint) and republished as a new value whenever anything about it changes.
//! Nothing here mutates a payload; per-view state is derived from it.

use crate::decode::decode_body;
use crate::error::DecodingError;
use bytes::Bytes;
use http::{HeaderName, HeaderValue};
use std::fmt;

/// Stable identity of a message body, e.g. `"<exchange id>/response"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PayloadId(String);

impl PayloadId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PayloadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PayloadId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PayloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared headers in the order they were received.
///
/// Lookups are case-insensitive because [`HeaderName`] is normalized to lowercase;
/// repeated names keep every value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// Appends a header, returning `Self` so tests and hosts can chain calls.
    ///
    /// # Errors
    /// Returns [`http::Error`] when the name or value is not a valid header token.
    pub fn with<K, V>(mut self, name: K, value: V) -> Result<Self, http::Error>
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        let name = <HeaderName as TryFrom<K>>::try_from(name).map_err(Into::into)?;
        let value = <HeaderValue as TryFrom<V>>::try_from(value).map_err(Into::into)?;
        self.append(name, value);
        Ok(self)
    }

    /// The first value for `name`.
    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// The first value for `name` if it is visible ASCII.
    pub fn get_str(&self, name: &HeaderName) -> Option<&str> {
        self.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn get_all<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries.iter().filter(move |(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_str(&http::header::CONTENT_TYPE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(n, v)| (n, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for Headers {
    fn from_iter<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl From<&http::HeaderMap> for Headers {
    fn from(map: &http::HeaderMap) -> Self {
        map.iter().map(|(n, v)| (n.clone(), v.clone())).collect()
    }
}

/// Where the asynchronous decode of a body stands.
///
/// Decoded bytes and a decoding error are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Decoding {
    #[default]
    Pending,
    Decoded(Bytes),
    Failed(DecodingError),
}

/// An immutable message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    id: PayloadId,
    raw: Option<Bytes>,
    decoding: Decoding,
    headers: Headers,
}

impl Payload {
    /// A payload whose decode has not finished yet.
    pub fn pending<I: Into<PayloadId>>(id: I, raw: Option<Bytes>, headers: Headers) -> Self {
        Self { id: id.into(), raw, decoding: Decoding::Pending, headers }
    }

    /// Runs the reference content-encoding decoder synchronously.
    ///
    /// Hosts that decode off-thread publish [`Payload::pending`] first and
    /// [`Payload::with_decoding`] once the result is in.
    pub fn decode<I: Into<PayloadId>>(id: I, raw: Bytes, headers: Headers) -> Self {
        let decoding = match decode_body(&raw, &headers) {
            Ok(decoded) => Decoding::Decoded(decoded),
            Err(e) => Decoding::Failed(e),
        };
        Self { id: id.into(), raw: Some(raw), decoding, headers }
    }

    /// A new payload value with the same identity and the given decode result.
    #[must_use]
    pub fn with_decoding(&self, decoding: Decoding) -> Self {
        Self { decoding, ..self.clone() }
    }

    pub fn id(&self) -> &PayloadId {
        &self.id
    }

    /// The bytes as received, before any content-encoding was undone.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    pub fn decoding(&self) -> &Decoding {
        &self.decoding
    }

    pub fn decoded(&self) -> Option<&Bytes> {
        match &self.decoding {
            Decoding::Decoded(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn decoding_error(&self) -> Option<&DecodingError> {
        match &self.decoding {
            Decoding::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The raw declared `content-type` header value, if any.
    pub fn declared_content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }
}
