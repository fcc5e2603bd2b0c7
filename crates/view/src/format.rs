//! Turning a body into readable text for a given interpretation.
//!
//! [`Formatter`] is the seam editors call when the user asks for a body to be
//! tidied up. [`BodyFormatter`] is the implementation used unless a host supplies
//! its own.

use base64::Engine;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use micro_body::content_type::ContentType;
use micro_body::encoding::{EncodingChoice, TextEncodingGuard, to_text};
use thiserror::Error;

const HEX_BYTES_PER_LINE: usize = 16;
const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// The body could not be formatted as the requested interpretation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("body is not valid {content_type}: {reason}")]
    Malformed { content_type: ContentType, reason: String },

    #[error("{content_type} bodies cannot be formatted as text")]
    Unsupported { content_type: ContentType },
}

impl FormatError {
    pub fn malformed<S: ToString>(content_type: ContentType, reason: S) -> Self {
        Self::Malformed { content_type, reason: reason.to_string() }
    }

    pub fn unsupported(content_type: ContentType) -> Self {
        Self::Unsupported { content_type }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Malformed { content_type, .. } | Self::Unsupported { content_type } => *content_type,
        }
    }
}

/// Produces formatted text for `bytes` under the interpretation `content_type`.
#[cfg_attr(test, mockall::automock)]
pub trait Formatter {
    /// # Errors
    /// Returns [`FormatError`] when the bytes are not valid for the interpretation,
    /// or when the interpretation has no text form.
    fn format(&self, content_type: ContentType, bytes: &[u8]) -> Result<String, FormatError>;
}

impl<F: Formatter + ?Sized> Formatter for &F {
    fn format(&self, content_type: ContentType, bytes: &[u8]) -> Result<String, FormatError> {
        (**self).format(content_type, bytes)
    }
}

/// Formats every interpretation that has a text form.
#[derive(Debug, Default, Copy, Clone)]
pub struct BodyFormatter {
    guard: TextEncodingGuard,
}

impl BodyFormatter {
    pub fn new(guard: TextEncodingGuard) -> Self {
        Self { guard }
    }

    fn decoded_text(&self, bytes: &[u8]) -> String {
        to_text(bytes, self.guard.classify(bytes))
    }
}

impl Formatter for BodyFormatter {
    fn format(&self, content_type: ContentType, bytes: &[u8]) -> Result<String, FormatError> {
        match content_type {
            ContentType::Json => format_json(bytes),
            ContentType::Form => format_form(bytes),
            ContentType::Base64 => decode_base64(bytes).map(|decoded| self.decoded_text(&decoded)),
            ContentType::Raw => Ok(format_hex(bytes)),
            ContentType::Image | ContentType::Protobuf | ContentType::GrpcProto => Err(FormatError::unsupported(content_type)),
            // valid utf-8 is kept as is so the text matches what an editor decoded
            ContentType::Text
            | ContentType::Xml
            | ContentType::Html
            | ContentType::Css
            | ContentType::JavaScript
            | ContentType::Markdown
            | ContentType::Yaml
            | ContentType::EventStream => Ok(to_text(bytes, EncodingChoice::Utf8)),
        }
    }
}

fn format_json(bytes: &[u8]) -> Result<String, FormatError> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| FormatError::malformed(ContentType::Json, e))?;
    serde_json::to_string_pretty(&value).map_err(|e| FormatError::malformed(ContentType::Json, e))
}

fn format_form(bytes: &[u8]) -> Result<String, FormatError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(bytes).map_err(|e| FormatError::malformed(ContentType::Form, e))?;

    let mut out = String::new();
    for (name, value) in pairs {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&name);
        out.push_str(": ");
        out.push_str(&value);
    }
    Ok(out)
}

fn decode_base64(bytes: &[u8]) -> Result<Vec<u8>, FormatError> {
    const ENGINES: [&GeneralPurpose; 4] = [&STANDARD, &URL_SAFE, &STANDARD_NO_PAD, &URL_SAFE_NO_PAD];

    let compact: Vec<u8> = bytes.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
    let mut last_error = None;
    for engine in ENGINES {
        match engine.decode(&compact) {
            Ok(decoded) => return Ok(decoded),
            Err(e) => last_error = Some(e),
        }
    }
    Err(FormatError::malformed(
        ContentType::Base64,
        last_error.map_or_else(|| String::from("empty input"), |e| e.to_string()),
    ))
}

fn format_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, line) in bytes.chunks(HEX_BYTES_PER_LINE).enumerate() {
        if i > 0 {
            out.push('\n');
        }
        for (j, byte) in line.iter().enumerate() {
            if j > 0 {
                out.push(' ');
            }
            out.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
            out.push(char::from(HEX_DIGITS[usize::from(byte & 0x0f)]));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn format(content_type: ContentType, bytes: &[u8]) -> Result<String, FormatError> {
        BodyFormatter::default().format(content_type, bytes)
    }

    #[test]
    fn pretty_prints_json_keeping_key_order() {
        let formatted = format(ContentType::Json, br#"{"b":1,"a":[true,null]}"#).unwrap();
        assert_eq!(
            formatted,
            indoc! {r#"
                {
                  "b": 1,
                  "a": [
                    true,
                    null
                  ]
                }"#}
        );
    }

    #[test]
    fn malformed_json_is_an_error() {
        let error = format(ContentType::Json, b"{a:}").unwrap_err();
        assert!(matches!(error, FormatError::Malformed { content_type: ContentType::Json, .. }));
        assert!(error.to_string().starts_with("body is not valid json"));
    }

    #[test]
    fn form_pairs_one_per_line() {
        let formatted = format(ContentType::Form, b"name=micro+body&empty=&q=a%26b").unwrap();
        assert_eq!(formatted, "name: micro body\nempty: \nq: a&b");
    }

    #[test]
    fn base64_accepts_both_alphabets_and_whitespace() {
        assert_eq!(format(ContentType::Base64, b"aGVsbG8g\nd29ybGQ=").unwrap(), "hello world");
        assert_eq!(format(ContentType::Base64, b"-_8").unwrap(), to_text(&[0xfb, 0xff], micro_body::encoding::classify(&[0xfb, 0xff])));
        assert!(matches!(
            format(ContentType::Base64, b"not base64!"),
            Err(FormatError::Malformed { content_type: ContentType::Base64, .. })
        ));
    }

    #[test]
    fn raw_is_hex_sixteen_per_line() {
        let bytes: Vec<u8> = (0u8..18).collect();
        assert_eq!(
            format(ContentType::Raw, &bytes).unwrap(),
            indoc! {"
                00 01 02 03 04 05 06 07 08 09 0a 0b 0c 0d 0e 0f
                10 11"}
        );
        assert_eq!(format(ContentType::Raw, b"").unwrap(), "");
        assert_eq!(format(ContentType::Raw, &[0xab, 0xff, 0x7f, 0x80]).unwrap(), "ab ff 7f 80");
    }

    #[test]
    fn text_like_types_are_identity() {
        for content_type in [ContentType::Text, ContentType::Html, ContentType::Yaml] {
            assert_eq!(format(content_type, b"<p>hi</p>").unwrap(), "<p>hi</p>");
        }
    }

    #[test]
    fn text_ignores_the_guard_for_valid_utf8() {
        let strict = BodyFormatter::new(TextEncodingGuard::builder().max_control_ratio(0.0).build());
        assert_eq!(strict.format(ContentType::Text, "\u{e9}\u{1}a".as_bytes()).unwrap(), "\u{e9}\u{1}a");
        assert_eq!(strict.format(ContentType::Text, &[0xe9, 0x41]).unwrap(), "\u{e9}A");
    }

    #[test]
    fn binary_interpretations_are_unsupported() {
        for content_type in [ContentType::Image, ContentType::Protobuf, ContentType::GrpcProto] {
            assert_eq!(format(content_type, b"\x89PNG"), Err(FormatError::unsupported(content_type)));
        }
    }
}
