//! Session-scoped storage for the booking draft.
//!
//! The draft is the single handoff record between the seat-selection page
//! and the checkout page. The store holds one slot of serialized JSON for
//! the lifetime of the browsing session: it survives a page transition, not
//! an application restart.
//!
//! Consume-once discipline is the checkout flow's responsibility: `load` is
//! a peek, and `clear` must run exactly once, immediately after booking
//! creation succeeds — never on failure, which would lose the user's
//! selection over a transient error.

use crate::types::BookingDraft;
use std::sync::{Mutex, PoisonError};

/// Storage for the in-flight booking draft.
pub trait DraftStore: Send + Sync {
    /// Write the draft, replacing any previous one.
    fn save(&self, draft: &BookingDraft);

    /// Read the draft without consuming it.
    ///
    /// Returns `None` when the slot is empty, holds malformed JSON, or holds
    /// a draft that fails structural validation. Callers treat all three the
    /// same way: there is no draft, go back to browsing.
    fn load(&self) -> Option<BookingDraft>;

    /// Empty the slot.
    fn clear(&self);
}

/// In-process, session-scoped implementation of [`DraftStore`].
///
/// Holds the serialized draft exactly as a session-storage slot would, so
/// load tolerates whatever ended up in it.
#[derive(Debug, Default)]
pub struct SessionDraftStore {
    slot: Mutex<Option<String>>,
}

impl SessionDraftStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DraftStore for SessionDraftStore {
    fn save(&self, draft: &BookingDraft) {
        match serde_json::to_string(draft) {
            Ok(json) => {
                tracing::debug!(showtime = %draft.showtime_id, seats = draft.seats.len(), "draft saved");
                *self.slot() = Some(json);
            },
            Err(error) => {
                // Serialization of a plain data struct cannot realistically
                // fail; log rather than poison the flow.
                tracing::error!(%error, "failed to serialize booking draft");
            },
        }
    }

    fn load(&self) -> Option<BookingDraft> {
        let json = self.slot().clone()?;
        let draft: BookingDraft = match serde_json::from_str(&json) {
            Ok(draft) => draft,
            Err(error) => {
                tracing::warn!(%error, "draft slot held malformed JSON, treating as absent");
                return None;
            },
        };
        if let Err(error) = draft.validate() {
            tracing::warn!(%error, "draft slot held inconsistent draft, treating as absent");
            return None;
        }
        Some(draft)
    }

    fn clear(&self) {
        tracing::debug!("draft cleared");
        *self.slot() = None;
    }
}
