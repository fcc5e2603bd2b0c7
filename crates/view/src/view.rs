//! The read-only body view: everything a renderer needs, re-derived from the current payload.

use crate::selection::SelectionBinding;
use bytes::Bytes;
use micro_body::DecodingError;
use micro_body::content_type::{ContentType, parse_mime};
use micro_body::encoding::TextEncodingGuard;
use micro_body::outcome::{DecodingOutcome, DecodingOutcomeTracker};
use micro_body::payload::Payload;
use micro_body::resolver::{CandidateSet, MimeClassifier, StructuralClassifier, encoded_types, offerable_types_with, resolve_effective};
use std::sync::Arc;

/// What to render for the current payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyViewState {
    /// Nothing to show yet. The placeholder type is shown but cannot be changed.
    Pending { placeholder: ContentType },
    /// The decoded body and how to interpret it.
    Decoded { offerable: CandidateSet, effective: ContentType, body: Bytes },
    /// The decode failed. The raw bytes, if any, can still be inspected.
    Failed { error: DecodingError, encoded: Option<EncodedInspection> },
}

impl BodyViewState {
    /// The interpretation currently shown, if the user can interact with it.
    pub fn effective(&self) -> Option<ContentType> {
        match self {
            BodyViewState::Pending { .. } | BodyViewState::Failed { encoded: None, .. } => None,
            BodyViewState::Decoded { effective, .. } | BodyViewState::Failed { encoded: Some(EncodedInspection { effective, .. }), .. } => {
                Some(*effective)
            }
        }
    }
}

/// Interpretations offered over bytes that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInspection {
    pub offerable: CandidateSet,
    pub effective: ContentType,
    pub raw: Bytes,
}

/// Projects payloads into [`BodyViewState`]s, holding the user's choices in between.
#[derive(Debug)]
pub struct BodyView<C = MimeClassifier> {
    classifier: C,
    guard: TextEncodingGuard,
    tracker: DecodingOutcomeTracker,
    decoded: SelectionBinding,
    encoded: SelectionBinding,
}

impl BodyView<MimeClassifier> {
    pub fn builder() -> BodyViewBuilder<MimeClassifier> {
        BodyViewBuilder::default()
    }
}

impl Default for BodyView<MimeClassifier> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<C: StructuralClassifier> BodyView<C> {
    /// Observes `payload` and derives the state to render from it.
    pub fn project(&mut self, payload: Option<&Arc<Payload>>) -> BodyViewState {
        self.tracker.observe(payload);
        self.state()
    }

    /// Re-derives the state for the payload last passed to [`BodyView::project`].
    pub fn state(&mut self) -> BodyViewState {
        let payload = self.tracker.payload().cloned();
        let declared = payload.as_deref().and_then(Payload::declared_content_type);

        match self.tracker.outcome().clone() {
            DecodingOutcome::Pending => {
                let offerable = offerable_types_with(&self.guard, None, declared, None);
                BodyViewState::Pending { placeholder: resolve_effective(&offerable, None, None) }
            }
            DecodingOutcome::Decoded(body) => {
                let mime = declared.and_then(parse_mime);
                let structural = self.classifier.classify(mime.as_ref(), declared, &body);
                let offerable = offerable_types_with(&self.guard, structural, declared, Some(&body));
                let effective = self.decoded.observe(payload.as_deref().map(Payload::id), offerable.clone(), structural);
                BodyViewState::Decoded { offerable, effective, body }
            }
            DecodingOutcome::Failed(error) => {
                let encoded = payload.as_deref().and_then(|p| p.raw().map(|raw| (p.id(), raw.clone()))).map(|(id, raw)| {
                    let offerable = encoded_types();
                    let effective = self.encoded.observe(Some(id), offerable.clone(), None);
                    EncodedInspection { offerable, effective, raw }
                });
                BodyViewState::Failed { error, encoded }
            }
        }
    }

    /// Pins an interpretation for the current payload and returns the resulting state.
    ///
    /// Applies to the decoded view or to the encoded inspection, whichever is shown.
    /// Ignored while pending.
    pub fn select(&mut self, content_type: ContentType) -> BodyViewState {
        match self.tracker.outcome() {
            DecodingOutcome::Pending => {}
            DecodingOutcome::Decoded(_) => {
                self.decoded.select(content_type);
            }
            DecodingOutcome::Failed(_) => {
                self.encoded.select(content_type);
            }
        }
        self.state()
    }

    pub fn outcome(&self) -> &DecodingOutcome {
        self.tracker.outcome()
    }
}

/// Builds a [`BodyView`].
#[derive(Debug, Default)]
pub struct BodyViewBuilder<C> {
    classifier: C,
    guard: Option<TextEncodingGuard>,
}

impl<C: StructuralClassifier> BodyViewBuilder<C> {
    pub fn classifier<T: StructuralClassifier>(self, classifier: T) -> BodyViewBuilder<T> {
        BodyViewBuilder { classifier, guard: self.guard }
    }

    #[must_use]
    pub fn guard(mut self, guard: TextEncodingGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn build(self) -> BodyView<C> {
        BodyView {
            classifier: self.classifier,
            guard: self.guard.unwrap_or_else(|| *TextEncodingGuard::global()),
            tracker: DecodingOutcomeTracker::new(),
            decoded: SelectionBinding::new(),
            encoded: SelectionBinding::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use micro_body::payload::{Decoding, Headers};
    use mime::Mime;

    mockall::mock! {
        Classifier {}

        impl StructuralClassifier for Classifier {
            fn classify<'a, 'b>(&self, declared: Option<&'a Mime>, declared_header: Option<&'b str>, bytes: &[u8]) -> Option<ContentType>;
        }
    }

    fn headers(content_type: &str) -> Headers {
        Headers::new().with(http::header::CONTENT_TYPE, content_type).unwrap()
    }

    #[test]
    fn no_payload_is_a_text_placeholder() {
        let mut view = BodyView::default();
        assert_eq!(view.project(None), BodyViewState::Pending { placeholder: ContentType::Text });
    }

    #[test]
    fn pending_placeholder_follows_the_header() {
        let mut view = BodyView::default();
        let payload = Arc::new(Payload::pending("a", None, headers("application/json")));
        let state = view.project(Some(&payload));
        assert_eq!(state, BodyViewState::Pending { placeholder: ContentType::Json });
        assert_eq!(state.effective(), None);
    }

    #[test]
    fn selection_is_ignored_while_pending() {
        let mut view = BodyView::default();
        let payload = Arc::new(Payload::pending("a", None, headers("application/json")));
        view.project(Some(&payload));

        assert_eq!(view.select(ContentType::Raw), BodyViewState::Pending { placeholder: ContentType::Json });
    }

    #[test]
    fn completion_keeps_the_pin_of_the_same_payload() {
        let mut view = BodyView::default();
        let pending = Arc::new(Payload::pending("a", Some(Bytes::from_static(b"{}")), headers("application/json")));
        let decoded = Arc::new(pending.with_decoding(Decoding::Decoded(Bytes::from_static(b"{}"))));

        view.project(Some(&decoded));
        view.select(ContentType::Raw);

        let again = Arc::new(pending.with_decoding(Decoding::Decoded(Bytes::from_static(b"{ }"))));
        assert_eq!(view.project(Some(&again)).effective(), Some(ContentType::Raw));
    }

    #[test]
    fn classifier_decides_the_structural_type() {
        let mut classifier = MockClassifier::new();
        classifier.expect_classify().return_const(Some(ContentType::Protobuf));

        let mut view = BodyView::builder().classifier(classifier).build();
        let payload = Arc::new(Payload::decode("a", Bytes::from_static(b"\x08\x96\x01"), headers("application/octet-stream")));

        let BodyViewState::Decoded { offerable, effective, .. } = view.project(Some(&payload)) else {
            panic!("identity body must decode");
        };
        assert_eq!(offerable.first(), ContentType::Protobuf);
        assert_eq!(effective, ContentType::Protobuf);
    }

    #[test]
    fn failed_without_raw_bytes_has_nothing_to_inspect() {
        let mut view = BodyView::default();
        let payload = Arc::new(Payload::pending("a", None, Headers::new()).with_decoding(Decoding::Failed(DecodingError::new("X", "y"))));
        let state = view.project(Some(&payload));
        assert_eq!(state, BodyViewState::Failed { error: DecodingError::new("X", "y"), encoded: None });
        assert_eq!(view.select(ContentType::Raw).effective(), None);
    }

    #[test]
    fn encoded_inspection_has_its_own_selection() {
        let mut view = BodyView::default();
        let raw = Bytes::from_static(b"\x1f\x8b\x08");
        let failed = Arc::new(
            Payload::pending("a", Some(raw.clone()), headers("application/json"))
                .with_decoding(Decoding::Failed(DecodingError::decode_failed("gzip", &std::io::Error::other("truncated")))),
        );

        view.project(Some(&failed));
        let state = view.select(ContentType::Base64);
        let BodyViewState::Failed { encoded: Some(inspection), .. } = state else {
            panic!("raw bytes are present");
        };
        assert_eq!(inspection.effective, ContentType::Base64);
        assert_eq!(inspection.raw, raw);
    }
}
