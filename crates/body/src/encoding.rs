//! Lossless conversion between body bytes and editable text.
//!
//! Editors work on strings, bodies are bytes. Decoding arbitrary bytes as UTF-8 and
//! encoding the edited string back silently replaces every invalid sequence with
//! U+FFFD, which corrupts binary bodies on the first keystroke. The guard picks, per
//! buffer, an [`EncodingChoice`] whose `to_text`/`from_text` pair is an exact inverse
//! for that buffer:
//!
//! - [`EncodingChoice::Utf8`] for plausible UTF-8 text
//! - [`EncodingChoice::BinaryPreserving`] (ISO-8859-1, one char per byte) otherwise
//!
//! # Example
//!
//! ```
//! use micro_body::encoding::{classify, from_text, to_text, EncodingChoice};
//!
//! let bytes = [0xff, 0x00, 0x80, b'a'];
//! let choice = classify(&bytes);
//! assert_eq!(choice, EncodingChoice::BinaryPreserving);
//!
//! let text = to_text(&bytes, choice);
//! assert_eq!(from_text(&text, choice).as_ref(), &bytes[..]);
//! ```

use bytes::Bytes;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, trace};

const DEFAULT_MAX_CONTROL_RATIO: f32 = 0.1;
const DEFAULT_SAMPLE_LIMIT: usize = 64 * 1024;

static DEFAULT_GUARD: Lazy<TextEncodingGuard> = Lazy::new(TextEncodingGuard::default);

/// How a buffer is mapped to and from editor text.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EncodingChoice {
    /// Standard UTF-8 mapping.
    Utf8,
    /// ISO-8859-1: byte `n` is char `U+00nn`, reversible for every byte sequence.
    BinaryPreserving,
}

impl EncodingChoice {
    /// The tag handed to the editor widget alongside the text.
    pub fn tag(self) -> &'static str {
        match self {
            EncodingChoice::Utf8 => "utf8",
            EncodingChoice::BinaryPreserving => "latin1",
        }
    }
}

impl fmt::Display for EncodingChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Decides whether a buffer can safely round-trip through UTF-8 text.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextEncodingGuard {
    max_control_ratio: f32,
    sample_limit: usize,
}

impl Default for TextEncodingGuard {
    fn default() -> Self {
        Self { max_control_ratio: DEFAULT_MAX_CONTROL_RATIO, sample_limit: DEFAULT_SAMPLE_LIMIT }
    }
}

impl TextEncodingGuard {
    pub fn builder() -> TextEncodingGuardBuilder {
        TextEncodingGuardBuilder::new()
    }

    /// Returns the shared guard with default thresholds.
    pub fn global() -> &'static TextEncodingGuard {
        &DEFAULT_GUARD
    }

    /// Classifies a buffer. Total and deterministic; empty input is `Utf8`.
    pub fn classify(&self, bytes: &[u8]) -> EncodingChoice {
        if bytes.is_empty() {
            return EncodingChoice::Utf8;
        }

        let Ok(text) = std::str::from_utf8(bytes) else {
            trace!(len = bytes.len(), "body is not valid utf-8");
            return EncodingChoice::BinaryPreserving;
        };

        // the bytes are valid utf-8, so cutting on a char boundary keeps the sample valid
        let sample = match text.char_indices().nth(self.sample_limit) {
            Some((index, _)) => &text[..index],
            None => text,
        };

        let total = sample.chars().count();
        let controls = sample.chars().filter(|c| is_binary_control_char(*c)).count();

        #[allow(clippy::cast_precision_loss, reason = "ratio of sample sizes, precision is irrelevant")]
        let ratio = controls as f32 / total as f32;
        if controls > 0 && (controls == total || ratio > self.max_control_ratio) {
            trace!(controls, total, "body is dominated by control characters");
            EncodingChoice::BinaryPreserving
        } else {
            EncodingChoice::Utf8
        }
    }

    pub fn max_control_ratio(&self) -> f32 {
        self.max_control_ratio
    }

    pub fn sample_limit(&self) -> usize {
        self.sample_limit
    }
}

/// Builder for [`TextEncodingGuard`].
#[derive(Debug)]
pub struct TextEncodingGuardBuilder {
    max_control_ratio: Option<f32>,
    sample_limit: Option<usize>,
}

impl TextEncodingGuardBuilder {
    fn new() -> Self {
        Self { max_control_ratio: None, sample_limit: None }
    }

    /// The share of disallowed control characters above which a buffer is binary.
    ///
    /// Clamped into `0.0..=1.0`; `0.0` means any single control character makes it binary.
    /// A sample made only of control characters is binary whatever the ratio.
    pub fn max_control_ratio(mut self, ratio: f32) -> Self {
        self.max_control_ratio = Some(ratio.clamp(0.0, 1.0));
        self
    }

    /// How many leading chars are scanned for control characters. At least one.
    pub fn sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = Some(limit.max(1));
        self
    }

    pub fn build(self) -> TextEncodingGuard {
        TextEncodingGuard {
            max_control_ratio: self.max_control_ratio.unwrap_or(DEFAULT_MAX_CONTROL_RATIO),
            sample_limit: self.sample_limit.unwrap_or(DEFAULT_SAMPLE_LIMIT),
        }
    }
}

/// Classifies with the default guard.
pub fn classify(bytes: &[u8]) -> EncodingChoice {
    TextEncodingGuard::global().classify(bytes)
}

/// Converts bytes into the text shown in an editor.
///
/// Never fails: if `Utf8` is requested for bytes that are not valid UTF-8 the
/// binary-preserving mapping is used instead, so no byte is ever replaced.
pub fn to_text(bytes: &[u8], choice: EncodingChoice) -> String {
    match choice {
        EncodingChoice::Utf8 => match std::str::from_utf8(bytes) {
            Ok(text) => text.to_owned(),
            Err(e) => {
                debug!(cause = %e, "utf8 requested for invalid utf-8, falling back to latin1");
                latin1_to_string(bytes)
            }
        },
        EncodingChoice::BinaryPreserving => latin1_to_string(bytes),
    }
}

/// Converts editor text back into canonical bytes.
///
/// For `BinaryPreserving`, chars above U+00FF cannot come from [`to_text`]; they can
/// only have been typed by the user and are written as their UTF-8 bytes rather than
/// being truncated.
pub fn from_text(text: &str, choice: EncodingChoice) -> Bytes {
    match choice {
        EncodingChoice::Utf8 => Bytes::copy_from_slice(text.as_bytes()),
        EncodingChoice::BinaryPreserving => {
            let mut buf = Vec::with_capacity(text.len());
            for c in text.chars() {
                match u8::try_from(u32::from(c)) {
                    Ok(byte) => buf.push(byte),
                    Err(_) => {
                        let mut utf8 = [0u8; 4];
                        buf.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
                    }
                }
            }
            Bytes::from(buf)
        }
    }
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Control characters that do not occur in ordinary text.
///
/// TAB, LF, CR, FF and ESC (terminal colour codes in logs) are tolerated.
#[inline]
fn is_binary_control_char(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0E}'..='\u{1A}' | '\u{1C}'..='\u{1F}' | '\u{7F}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_is_utf8() {
        assert_eq!(classify(b""), EncodingChoice::Utf8);
    }

    #[test]
    fn only_nul_is_binary() {
        assert_eq!(classify(&[0u8]), EncodingChoice::BinaryPreserving);
        assert_eq!(classify(&[0u8; 32]), EncodingChoice::BinaryPreserving);
    }

    #[test]
    fn plain_and_unicode_text_is_utf8() {
        assert_eq!(classify(b"Hello, World!"), EncodingChoice::Utf8);
        assert_eq!(classify("Привет мир 🌍".as_bytes()), EncodingChoice::Utf8);
        assert_eq!(classify(b"line1\r\nline2\tcol\x0cpage"), EncodingChoice::Utf8);
        assert_eq!(classify(b"\x1b[31mred\x1b[0m"), EncodingChoice::Utf8);
    }

    #[test]
    fn invalid_utf8_is_binary() {
        assert_eq!(classify(&[0xff, 0xd8, 0xff, 0xe0]), EncodingChoice::BinaryPreserving);
        assert_eq!(classify(&[b'a', b'b', 0xc3]), EncodingChoice::BinaryPreserving);
    }

    #[test]
    fn occasional_control_char_stays_text() {
        let mut text = "a".repeat(100).into_bytes();
        text.push(0x01);
        assert_eq!(classify(&text), EncodingChoice::Utf8);
    }

    #[test]
    fn control_dominated_utf8_is_binary() {
        // valid utf-8 protobuf-ish framing
        assert_eq!(classify(b"\x08\x96\x01\x12\x04test"), EncodingChoice::BinaryPreserving);
        assert_eq!(classify(b"\x08\x01\x10\x02\x18\x03"), EncodingChoice::BinaryPreserving);
    }

    #[test]
    fn strict_guard_rejects_any_control_char() {
        let guard = TextEncodingGuard::builder().max_control_ratio(0.0).build();
        let mut text = "a".repeat(100).into_bytes();
        text.push(0x01);
        assert_eq!(guard.classify(&text), EncodingChoice::BinaryPreserving);
        assert_eq!(guard.classify(b"no controls here\n"), EncodingChoice::Utf8);
    }

    #[test]
    fn lenient_guard_still_rejects_all_control_input() {
        let guard = TextEncodingGuard::builder().max_control_ratio(1.0).build();
        assert_eq!(guard.classify(&[0u8; 8]), EncodingChoice::BinaryPreserving);
        assert_eq!(guard.classify(b"\x01\x02a"), EncodingChoice::Utf8);
    }

    #[test]
    fn sample_limit_bounds_the_control_scan() {
        let guard = TextEncodingGuard::builder().sample_limit(4).build();
        let mut bytes = b"text".to_vec();
        bytes.extend_from_slice(&[0x01; 16]);
        assert_eq!(guard.classify(&bytes), EncodingChoice::Utf8);
        assert_eq!(classify(&bytes), EncodingChoice::BinaryPreserving);
    }

    #[test]
    fn builder_clamps_values() {
        let guard = TextEncodingGuard::builder().max_control_ratio(7.0).sample_limit(0).build();
        assert!((guard.max_control_ratio() - 1.0).abs() < f32::EPSILON);
        assert_eq!(guard.sample_limit(), 1);
        assert_eq!(TextEncodingGuard::builder().build(), TextEncodingGuard::default());
    }

    #[test]
    fn latin1_maps_each_byte_to_one_char() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = to_text(&bytes, EncodingChoice::BinaryPreserving);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(from_text(&text, EncodingChoice::BinaryPreserving).as_ref(), &bytes[..]);
    }

    #[test]
    fn utf8_requested_for_binary_does_not_lose_bytes() {
        let bytes = [0xff, 0xfe, 0x41];
        let text = to_text(&bytes, EncodingChoice::Utf8);
        assert_eq!(text, "\u{ff}\u{fe}A");
    }

    #[test]
    fn binary_preserving_keeps_typed_wide_chars() {
        let bytes = from_text("a€", EncodingChoice::BinaryPreserving);
        assert_eq!(bytes.as_ref(), "a€".as_bytes());
    }

    proptest! {
        #[test]
        fn round_trip_law(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
            let choice = classify(&bytes);
            let text = to_text(&bytes, choice);
            let decoded = from_text(&text, choice);
            prop_assert_eq!(decoded.as_ref(), &bytes[..]);
        }

        #[test]
        fn round_trip_law_for_text(text in "\\PC{0,200}") {
            let bytes = text.as_bytes();
            let choice = classify(bytes);
            let decoded = from_text(&to_text(bytes, choice), choice);
            prop_assert_eq!(decoded.as_ref(), bytes);
        }

        #[test]
        fn classify_is_deterministic(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(classify(&bytes), classify(&bytes));
        }
    }
}
