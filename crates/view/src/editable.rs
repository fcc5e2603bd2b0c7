//! The controller between an external byte buffer and a text editor.
//!
//! The buffer is owned by the host. This controller never changes it: edits are
//! converted back into bytes and handed upward through the `on_change` callback, and
//! the host decides whether to feed a new buffer back in via
//! [`EditableBody::observe_buffer`].

use crate::format::{BodyFormatter, FormatError, Formatter};
use crate::selection::EditableContentTypeBinding;
use crate::watch::Watched;
use bytes::Bytes;
use http::HeaderValue;
use micro_body::content_type::EditableContentType;
use micro_body::encoding::{EncodingChoice, TextEncodingGuard, from_text, to_text};
use std::fmt;
use tracing::{trace, warn};

type ChangeHandler = Box<dyn FnMut(Bytes) + Send>;

/// What the editor widget is given to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorContent {
    pub text: String,
    pub encoding: EncodingChoice,
    pub content_type: EditableContentType,
}

/// Edits a byte buffer as text without ever corrupting it.
pub struct EditableBody<F = BodyFormatter> {
    guard: TextEncodingGuard,
    formatter: F,
    content_type: EditableContentTypeBinding,
    buffer: Bytes,
    encoding: EncodingChoice,
    on_change: ChangeHandler,
}

impl<F> fmt::Debug for EditableBody<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditableBody")
            .field("content_type", &self.content_type)
            .field("buffer_len", &self.buffer.len())
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

impl<F: Formatter> EditableBody<F> {
    /// Starts editing `buffer`, following the live `content-type` header cell.
    pub fn new<H>(buffer: Bytes, content_type: &Watched<Option<HeaderValue>>, formatter: F, on_change: H) -> Self
    where
        H: FnMut(Bytes) + Send + 'static,
    {
        let guard = *TextEncodingGuard::global();
        let encoding = guard.classify(&buffer);
        Self {
            guard,
            formatter,
            content_type: EditableContentTypeBinding::bind(content_type),
            buffer,
            encoding,
            on_change: Box::new(on_change),
        }
    }

    /// Replaces the guard used to pick the encoding, re-classifying the current buffer.
    #[must_use]
    pub fn with_guard(mut self, guard: TextEncodingGuard) -> Self {
        self.guard = guard;
        self.encoding = guard.classify(&self.buffer);
        self
    }

    /// Tells the controller about the host's current buffer.
    ///
    /// The encoding is only re-derived when a different buffer is passed in, not when
    /// the same buffer is observed again. Returns whether it was re-derived.
    pub fn observe_buffer(&mut self, buffer: &Bytes) -> bool {
        if same_buffer(&self.buffer, buffer) {
            return false;
        }

        let encoding = self.guard.classify(buffer);
        trace!(len = buffer.len(), from = %self.encoding, to = %encoding, "new buffer observed");
        self.buffer = buffer.clone();
        self.encoding = encoding;
        true
    }

    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    pub fn encoding(&self) -> EncodingChoice {
        self.encoding
    }

    pub fn content_type(&self) -> EditableContentType {
        self.content_type.current()
    }

    /// Picks the editable content type by hand until the header next changes.
    pub fn select_content_type(&self, content_type: EditableContentType) {
        self.content_type.select(content_type);
    }

    pub fn editor_content(&self) -> EditorContent {
        EditorContent {
            text: to_text(&self.buffer, self.encoding),
            encoding: self.encoding,
            content_type: self.content_type(),
        }
    }

    /// Converts edited text back into bytes and hands them to `on_change`.
    ///
    /// The current buffer is left alone; it only changes when the host observes a new one.
    pub fn on_editor_text_changed(&mut self, text: &str) -> Bytes {
        let bytes = from_text(text, self.encoding);
        (self.on_change)(bytes.clone());
        bytes
    }

    /// Formats the editor text as the current content type and emits the result.
    ///
    /// The formatter sees the buffer decoded with this controller's encoding, the
    /// same text the editor shows, so formatting round-trips exactly like a manual edit.
    ///
    /// # Errors
    /// Returns the formatter's [`FormatError`]; nothing is emitted in that case.
    pub fn on_format_requested(&mut self) -> Result<Bytes, FormatError> {
        let content_type = self.content_type();
        let text = to_text(&self.buffer, self.encoding);
        match self.formatter.format(content_type.into(), text.as_bytes()) {
            Ok(text) => Ok(self.on_editor_text_changed(&text)),
            Err(e) => {
                warn!(%content_type, cause = %e, "format request rejected, leave body unchanged");
                Err(e)
            }
        }
    }
}

fn same_buffer(a: &Bytes, b: &Bytes) -> bool {
    a.as_ptr() == b.as_ptr() && a.len() == b.len()
}
