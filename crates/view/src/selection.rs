//! Holding on to what the user picked, for as long as it still makes sense.
//!
//! [`SelectionBinding`] pins an interpretation for read-only views and re-validates
//! the pin against every new snapshot. [`EditableContentTypeBinding`] follows a live
//! `content-type` header for editors, falling back to the header-derived default
//! whenever the header changes.

use crate::watch::{Subscription, Watched};
use http::HeaderValue;
use micro_body::content_type::{ContentType, EditableContentType};
use micro_body::payload::PayloadId;
use micro_body::resolver::{CandidateSet, resolve_effective};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// The user override for the interpretation of one view.
#[derive(Debug, Clone)]
pub struct SelectionBinding {
    payload_id: Option<PayloadId>,
    offerable: CandidateSet,
    structural: Option<ContentType>,
    user_override: Option<ContentType>,
    // pins made on earlier payloads, restored when the user comes back to them
    pinned: HashMap<PayloadId, ContentType>,
}

impl Default for SelectionBinding {
    fn default() -> Self {
        Self {
            payload_id: None,
            offerable: CandidateSet::new(Vec::new()),
            structural: None,
            user_override: None,
            pinned: HashMap::new(),
        }
    }
}

impl SelectionBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the binding a new snapshot and returns the effective interpretation.
    ///
    /// Switching to another payload clears the override unless the user pinned
    /// something on that payload earlier. A pin that is no longer offerable is dropped,
    /// and so is a pin that has become the automatic choice.
    pub fn observe(&mut self, payload_id: Option<&PayloadId>, offerable: CandidateSet, structural: Option<ContentType>) -> ContentType {
        if self.payload_id.as_ref() != payload_id {
            self.user_override = payload_id.and_then(|id| self.pinned.get(id).copied());
            self.payload_id = payload_id.cloned();
        }
        self.offerable = offerable;
        self.structural = structural;

        if let Some(pinned) = self.user_override
            && !self.offerable.contains(pinned)
        {
            trace!(
                payload = self.payload_id.as_ref().map(PayloadId::as_str),
                content_type = %pinned,
                "drop override that is no longer offerable"
            );
            self.user_override = None;
            self.remember();
        }

        // a pin the data now agrees with is no longer a choice
        if self.user_override.is_some() && self.user_override == Some(self.automatic()) {
            self.user_override = None;
            self.remember();
        }

        self.effective()
    }

    /// Pins `content_type` for the current payload.
    ///
    /// Picking something that is not offered is ignored. Picking the automatic choice
    /// clears the pin so the view keeps following the data.
    pub fn select(&mut self, content_type: ContentType) -> ContentType {
        if !self.offerable.contains(content_type) {
            trace!(content_type = %content_type, "ignore selection of a type that is not offered");
            return self.effective();
        }

        let automatic = self.automatic();
        self.user_override = Some(content_type).filter(|ct| *ct != automatic);
        self.remember();
        self.effective()
    }

    pub fn clear(&mut self) {
        self.user_override = None;
        self.remember();
    }

    /// The interpretation to show right now.
    pub fn effective(&self) -> ContentType {
        resolve_effective(&self.offerable, self.user_override, self.structural)
    }

    /// The interpretation that would be shown without any override.
    pub fn automatic(&self) -> ContentType {
        resolve_effective(&self.offerable, None, self.structural)
    }

    pub fn user_override(&self) -> Option<ContentType> {
        self.user_override
    }

    pub fn offerable(&self) -> &CandidateSet {
        &self.offerable
    }

    fn remember(&mut self) {
        let Some(id) = &self.payload_id else {
            return;
        };
        match self.user_override {
            Some(content_type) => {
                self.pinned.insert(id.clone(), content_type);
            }
            None => {
                self.pinned.remove(id);
            }
        }
    }
}

/// The editable content type: the header-derived default plus an optional manual choice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct EditableSelection {
    default: EditableContentType,
    user_override: Option<EditableContentType>,
}

impl EditableSelection {
    pub fn current(&self) -> EditableContentType {
        self.user_override.unwrap_or(self.default)
    }

    pub fn default_type(&self) -> EditableContentType {
        self.default
    }

    pub fn user_override(&self) -> Option<EditableContentType> {
        self.user_override
    }
}

/// Keeps an editor's content type in sync with a live `content-type` header.
///
/// The header is observed for as long as the binding lives; dropping the binding
/// unsubscribes.
#[derive(Debug)]
pub struct EditableContentTypeBinding {
    selection: Arc<Mutex<EditableSelection>>,
    _subscription: Subscription,
}

impl EditableContentTypeBinding {
    pub fn bind(content_type: &Watched<Option<HeaderValue>>) -> Self {
        let selection = Arc::new(Mutex::new(EditableSelection::default()));

        let target = Arc::clone(&selection);
        let subscription = content_type.subscribe(move |header: &Option<HeaderValue>| {
            let header = header.as_ref().and_then(|value| value.to_str().ok());
            let default = EditableContentType::from_header(header);

            let mut selection = lock(&target);
            if selection.user_override.is_some() || selection.default != default {
                debug!(header, from = %selection.current(), to = %default, "content-type changed, reset editable type");
            }
            *selection = EditableSelection { default, user_override: None };
        });

        Self { selection, _subscription: subscription }
    }

    pub fn selection(&self) -> EditableSelection {
        *lock(&self.selection)
    }

    pub fn current(&self) -> EditableContentType {
        self.selection().current()
    }

    /// Chooses the editable type by hand. Held until the header next changes.
    pub fn select(&self, content_type: EditableContentType) {
        let mut selection = lock(&self.selection);
        let default = selection.default;
        selection.user_override = Some(content_type).filter(|ct| *ct != default);
    }
}

fn lock(selection: &Mutex<EditableSelection>) -> MutexGuard<'_, EditableSelection> {
    selection.lock().unwrap_or_else(PoisonError::into_inner)
}
