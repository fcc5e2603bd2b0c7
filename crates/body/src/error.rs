use std::io;
use thiserror::Error;

/// The code reported when a `content-encoding` token is not one we can undo.
pub const UNKNOWN_ENCODING: &str = "UNKNOWN_ENCODING";

/// The code reported when a known codec rejects the encoded bytes.
pub const DECODE_FAILED: &str = "DECODE_FAILED";

/// A payload could not be decoded per its declared transfer/content encoding.
///
/// Both the code and the message are shown to the user verbatim, so they are
/// kept exactly as the decoding collaborator produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct DecodingError {
    code: String,
    message: String,
}

impl DecodingError {
    pub fn new<C: ToString, M: ToString>(code: C, message: M) -> Self {
        Self { code: code.to_string(), message: message.to_string() }
    }

    pub fn unknown_encoding<S: AsRef<str>>(encoding: S) -> Self {
        Self::new(UNKNOWN_ENCODING, format!("unsupported content-encoding '{}'", encoding.as_ref()))
    }

    pub fn decode_failed<S: AsRef<str>>(encoding: S, source: &io::Error) -> Self {
        Self::new(DECODE_FAILED, format!("failed to decode '{}' body: {source}", encoding.as_ref()))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
