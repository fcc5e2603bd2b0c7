//! Where a body's decode stands, as seen by whoever renders it.
//!
//! The outcome is a pure projection of the current [`Payload`]: there are no timers,
//! retries or internal transitions. `Decoded` and `Failed` are terminal for a payload
//! instance; a new instance simply projects to whatever its own data says.

use crate::error::DecodingError;
use crate::payload::{Decoding, Payload, PayloadId};
use bytes::Bytes;
use std::sync::Arc;
use tracing::trace;

/// The three states of an in-flight decode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DecodingOutcome {
    /// No payload yet, or the decode has not finished.
    #[default]
    Pending,
    /// Full interpreted view over the decoded bytes.
    Decoded(Bytes),
    /// Error banner plus encoded-data inspection of the raw bytes.
    Failed(DecodingError),
}

impl DecodingOutcome {
    pub fn of(payload: Option<&Payload>) -> Self {
        match payload.map(Payload::decoding) {
            None | Some(Decoding::Pending) => DecodingOutcome::Pending,
            Some(Decoding::Decoded(bytes)) => DecodingOutcome::Decoded(bytes.clone()),
            Some(Decoding::Failed(e)) => DecodingOutcome::Failed(e.clone()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DecodingOutcome::Pending)
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self, DecodingOutcome::Decoded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DecodingOutcome::Failed(_))
    }

    /// Returns true once nothing further can happen for this payload instance.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    fn name(&self) -> &'static str {
        match self {
            DecodingOutcome::Pending => "pending",
            DecodingOutcome::Decoded(_) => "decoded",
            DecodingOutcome::Failed(_) => "failed",
        }
    }
}

/// What a call to [`DecodingOutcomeTracker::observe`] saw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Same payload reference as last time; nothing was recomputed.
    Unchanged,
    /// A payload with a different identity (or none) replaced the previous one.
    Reset,
    /// Same identity, new value, typically the decode finishing.
    Updated,
}

/// Re-projects the outcome whenever the observed payload reference changes.
#[derive(Debug, Default)]
pub struct DecodingOutcomeTracker {
    current: Option<Arc<Payload>>,
    outcome: DecodingOutcome,
}

impl DecodingOutcomeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, payload: Option<&Arc<Payload>>) -> Observation {
        let observation = match (&self.current, payload) {
            (None, None) => return Observation::Unchanged,
            (Some(old), Some(new)) if Arc::ptr_eq(old, new) => return Observation::Unchanged,
            (Some(old), Some(new)) if old.id() == new.id() => Observation::Updated,
            _ => Observation::Reset,
        };

        let outcome = DecodingOutcome::of(payload.map(Arc::as_ref));
        trace!(
            payload = payload.map(|p| p.id().as_str()),
            from = self.outcome.name(),
            to = outcome.name(),
            ?observation,
            "decoding outcome re-projected"
        );

        self.current = payload.map(Arc::clone);
        self.outcome = outcome;
        observation
    }

    pub fn outcome(&self) -> &DecodingOutcome {
        &self.outcome
    }

    pub fn payload(&self) -> Option<&Arc<Payload>> {
        self.current.as_ref()
    }

    pub fn payload_id(&self) -> Option<&PayloadId> {
        self.current.as_deref().map(Payload::id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::Headers;

    fn pending(id: &str) -> Payload {
        Payload::pending(id, Some(Bytes::from_static(b"raw")), Headers::new())
    }

    #[test]
    fn no_payload_is_pending() {
        assert_eq!(DecodingOutcome::of(None), DecodingOutcome::Pending);
        assert_eq!(DecodingOutcomeTracker::new().outcome(), &DecodingOutcome::Pending);
    }

    #[test]
    fn projection_follows_payload_data() {
        let payload = pending("a");
        assert!(DecodingOutcome::of(Some(&payload)).is_pending());

        let decoded = payload.with_decoding(Decoding::Decoded(Bytes::from_static(b"body")));
        assert_eq!(DecodingOutcome::of(Some(&decoded)), DecodingOutcome::Decoded(Bytes::from_static(b"body")));

        let failed = payload.with_decoding(Decoding::Failed(DecodingError::unknown_encoding("brotli")));
        let outcome = DecodingOutcome::of(Some(&failed));
        assert!(outcome.is_failed());
        assert!(outcome.is_terminal());
    }

    #[test]
    fn tracker_reacts_to_reference_changes_only() {
        let mut tracker = DecodingOutcomeTracker::new();
        let first = Arc::new(pending("a"));

        assert_eq!(tracker.observe(Some(&first)), Observation::Reset);
        assert_eq!(tracker.observe(Some(&first)), Observation::Unchanged);
        assert!(tracker.outcome().is_pending());

        let completed = Arc::new(first.with_decoding(Decoding::Decoded(Bytes::from_static(b"ok"))));
        assert_eq!(tracker.observe(Some(&completed)), Observation::Updated);
        assert!(tracker.outcome().is_decoded());

        let other = Arc::new(pending("b"));
        assert_eq!(tracker.observe(Some(&other)), Observation::Reset);
        assert!(tracker.outcome().is_pending());
        assert_eq!(tracker.payload_id().map(PayloadId::as_str), Some("b"));

        assert_eq!(tracker.observe(None), Observation::Reset);
        assert!(tracker.outcome().is_pending());
        assert_eq!(tracker.observe(None), Observation::Unchanged);
    }

    #[test]
    fn new_instance_resets_even_from_terminal() {
        let mut tracker = DecodingOutcomeTracker::new();
        let failed = Arc::new(pending("a").with_decoding(Decoding::Failed(DecodingError::new("X", "y"))));
        tracker.observe(Some(&failed));
        assert!(tracker.outcome().is_failed());

        let retried = Arc::new(pending("a"));
        assert_eq!(tracker.observe(Some(&retried)), Observation::Updated);
        assert!(tracker.outcome().is_pending());
    }
}
