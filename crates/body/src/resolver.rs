//! Working out which interpretations to offer for a body, and which one to show.
//!
//! Both functions are pure: the same inputs always give the same answer, so callers
//! can re-run them on every update instead of patching previous results.
//!
//! # Example
//!
//! ```
//! use micro_body::content_type::ContentType;
//! use micro_body::resolver::{offerable_types, resolve_effective};
//!
//! let offerable = offerable_types(Some(ContentType::Json), Some("application/json"), Some(br#"{"a":1}"#.as_slice()));
//! assert!(offerable.contains(ContentType::Json));
//! assert_eq!(resolve_effective(&offerable, None, Some(ContentType::Json)), ContentType::Json);
//! ```

use crate::content_type::{ContentType, compatible_types, compatible_types_for_header, push_unique};
use crate::encoding::{EncodingChoice, TextEncodingGuard};
use mime::Mime;
use std::slice;

/// The interpretations offered for a body when its bytes could not be decoded.
///
/// These are applied to the still-encoded bytes, independent of any declared type.
pub const ENCODED_TYPES: [ContentType; 4] = [ContentType::Text, ContentType::Raw, ContentType::Base64, ContentType::Image];

/// An ordered, duplicate-free, never-empty set of interpretations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    types: Vec<ContentType>,
}

impl CandidateSet {
    /// Builds a set from `types`, dropping duplicates. Falls back to `[text, raw]`
    /// so the set is never empty.
    pub fn new<I: IntoIterator<Item = ContentType>>(types: I) -> Self {
        let mut unique = Vec::new();
        for content_type in types {
            push_unique(&mut unique, content_type);
        }
        if unique.is_empty() {
            unique.extend([ContentType::Text, ContentType::Raw]);
        }
        Self { types: unique }
    }

    pub fn contains(&self, content_type: ContentType) -> bool {
        self.types.contains(&content_type)
    }

    /// The first candidate. Always present.
    pub fn first(&self) -> ContentType {
        self.types[0]
    }

    pub fn iter(&self) -> slice::Iter<'_, ContentType> {
        self.types.iter()
    }

    pub fn as_slice(&self) -> &[ContentType] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Always false; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a ContentType;
    type IntoIter = slice::Iter<'a, ContentType>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Computes the interpretations that are valid to offer for a body.
///
/// The structural type comes first, then everything the declared header vouches
/// for, then the lossy-but-always-valid `text` and `raw` views. With nothing else to
/// go on the result is exactly `[text, raw]`; for binary bytes without a structural
/// type `raw` is put before `text` so the fallback is hex rather than mojibake.
pub fn offerable_types(structural: Option<ContentType>, declared_header: Option<&str>, bytes: Option<&[u8]>) -> CandidateSet {
    offerable_types_with(TextEncodingGuard::global(), structural, declared_header, bytes)
}

/// [`offerable_types`] with an explicit guard.
pub fn offerable_types_with(
    guard: &TextEncodingGuard,
    structural: Option<ContentType>,
    declared_header: Option<&str>,
    bytes: Option<&[u8]>,
) -> CandidateSet {
    let mut types = Vec::with_capacity(6);
    types.extend(structural);
    if let Some(header) = declared_header {
        types.extend(compatible_types_for_header(header));
    }

    let binary = bytes.is_some_and(|b| guard.classify(b) == EncodingChoice::BinaryPreserving);
    if binary && structural.is_none() {
        types.extend([ContentType::Raw, ContentType::Text]);
    } else {
        types.extend([ContentType::Text, ContentType::Raw]);
    }

    CandidateSet::new(types)
}

/// The fixed candidate set for inspecting undecodable, still-encoded bytes.
pub fn encoded_types() -> CandidateSet {
    CandidateSet::new(ENCODED_TYPES)
}

/// Picks the interpretation to show.
///
/// An override wins if it is still offerable, otherwise the structural type if
/// offerable, otherwise the first candidate. A stale override is simply ignored.
pub fn resolve_effective(offerable: &CandidateSet, user_override: Option<ContentType>, structural: Option<ContentType>) -> ContentType {
    user_override
        .filter(|ct| offerable.contains(*ct))
        .or_else(|| structural.filter(|ct| offerable.contains(*ct)))
        .unwrap_or_else(|| offerable.first())
}

/// Byte-sniffing classifier that decides a body's structural content type.
///
/// Consumed as an opaque pure function.
#[cfg_attr(test, mockall::automock)]
pub trait StructuralClassifier {
    fn classify<'a, 'b>(&self, declared: Option<&'a Mime>, declared_header: Option<&'b str>, bytes: &[u8]) -> Option<ContentType>;
}

/// A classifier that trusts the declared MIME type and looks at nothing else.
#[derive(Debug, Default, Copy, Clone)]
pub struct MimeClassifier;

impl StructuralClassifier for MimeClassifier {
    fn classify(&self, declared: Option<&Mime>, _declared_header: Option<&str>, _bytes: &[u8]) -> Option<ContentType> {
        declared.and_then(|mime| compatible_types(mime).into_iter().next())
    }
}

impl<C: StructuralClassifier + ?Sized> StructuralClassifier for &C {
    fn classify(&self, declared: Option<&Mime>, declared_header: Option<&str>, bytes: &[u8]) -> Option<ContentType> {
        (**self).classify(declared, declared_header, bytes)
    }
}
