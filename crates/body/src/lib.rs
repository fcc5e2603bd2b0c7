//! Content-type resolution and lossless encode/decode for untrusted message bodies
//!
//! This crate holds the protocol-level core used to present and edit arbitrary
//! message payloads (HTTP request and response bodies, breakpointed messages) whose
//! declared content type cannot be trusted and whose bytes may be text, binary or
//! simply corrupt.
//!
//! # Features
//!
//! - Lossless bytes ↔ text conversion that never corrupts binary bodies on re-encode
//! - A fixed, documented mapping from declared MIME types to viewable interpretations
//! - Pure resolution of the offerable interpretations and the effective one
//! - A projection of the asynchronous decode state (pending, decoded, failed)
//! - A reference `content-encoding` decoder (gzip, deflate, br, zstd)
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use micro_body::content_type::ContentType;
//! use micro_body::outcome::DecodingOutcome;
//! use micro_body::payload::{Headers, Payload};
//! use micro_body::resolver::{offerable_types, resolve_effective, MimeClassifier, StructuralClassifier};
//!
//! let headers = Headers::new().with(http::header::CONTENT_TYPE, "application/json").unwrap();
//! let payload = Payload::decode("exchange-1/response", Bytes::from_static(br#"{"a":1}"#), headers);
//!
//! let DecodingOutcome::Decoded(body) = DecodingOutcome::of(Some(&payload)) else {
//!     panic!("identity encoded body always decodes");
//! };
//!
//! let declared = payload.declared_content_type();
//! let mime = declared.and_then(micro_body::content_type::parse_mime);
//! let structural = MimeClassifier.classify(mime.as_ref(), declared, &body);
//!
//! let offerable = offerable_types(structural, declared, Some(&body[..]));
//! assert_eq!(resolve_effective(&offerable, None, structural), ContentType::Json);
//! ```
//!
//! # Architecture
//!
//! - [`payload`]: the immutable [`payload::Payload`] value and its headers
//! - [`content_type`]: the interpretation catalogue and MIME mapping
//! - [`encoding`]: the text encoding guard and the bytes ↔ text conversions
//! - [`resolver`]: offerable interpretations and the effective one
//! - [`outcome`]: the pending / decoded / failed projection
//! - [`decode`]: the reference `content-encoding` decoder
//!
//! ## Error Handling
//!
//! - [`DecodingError`]: a body could not be decoded; code and message are shown verbatim
//!
//! A user override that is no longer valid is not an error: it is dropped and the
//! default interpretation is used instead.

pub mod content_type;
pub mod decode;
pub mod encoding;
pub mod outcome;
pub mod payload;
pub mod resolver;

mod error;
pub use error::DECODE_FAILED;
pub use error::DecodingError;
pub use error::UNKNOWN_ENCODING;
