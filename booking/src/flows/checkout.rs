//! Checkout flow.
//!
//! Rehydrates the draft saved by seat selection, re-displays the computed
//! total, collects a payment method and terms acceptance, and submits the
//! booking.
//!
//! Draft lifecycle rules enforced here:
//! - the draft is peeked at load and consumed (cleared) exactly once,
//!   immediately after the booking request succeeds;
//! - a failed submission never clears the draft, so the user can retry;
//! - a missing or invalid draft at load is terminal for this page — there
//!   is nothing to retry, the user goes back to browsing.

use crate::cinema_api::{ApiError, CinemaApi, CreateBookingRequest, RejectionCode};
use crate::draft::DraftStore;
use crate::types::{Booking, BookingDraft, PaymentMethod, Showtime};
use cinebook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Why the checkout page could not reach `Ready`.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LoadFailure {
    /// No structurally valid draft in the session store.
    #[error("no booking draft to check out")]
    MissingDraft,
    /// The draft's showtime could not be fetched for display.
    #[error("could not load showtime: {message}")]
    ShowtimeUnavailable {
        /// Failure description.
        message: String,
    },
}

/// Why a submission failed.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SubmitError {
    /// Seats were booked by someone else between selection and submission.
    /// The draft's seat list is dead; the only exit is re-selection.
    #[error("selected seats are no longer available")]
    SeatsTaken,
    /// The server refused the booking for another stated reason.
    #[error("{message}")]
    Rejected {
        /// Server-provided message.
        message: String,
    },
    /// Network or server failure; retrying may succeed.
    #[error("request failed: {message}")]
    Transient {
        /// Failure description.
        message: String,
    },
}

impl SubmitError {
    /// Whether this failure invalidates the draft's seats and forces the
    /// user back to seat selection (blind retry is refused).
    #[must_use]
    pub const fn forces_reselection(&self) -> bool {
        matches!(self, Self::SeatsTaken)
    }
}

impl From<ApiError> for SubmitError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::Rejected {
                code: RejectionCode::SeatsTaken,
                ..
            } => Self::SeatsTaken,
            ApiError::Rejected { message, .. } => Self::Rejected { message },
            ApiError::Transient { message } => Self::Transient { message },
        }
    }
}

// ============================================================================
// State
// ============================================================================

/// Everything the checkout page holds once the draft is rehydrated.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutContext {
    /// The draft being checked out.
    pub draft: BookingDraft,
    /// The showtime, fetched for display.
    pub showtime: Showtime,
    /// Selected payment method, if any.
    pub payment_method: Option<PaymentMethod>,
    /// Terms-and-conditions acceptance.
    pub terms_accepted: bool,
    /// Inline message from the last local validation failure.
    pub last_error: Option<String>,
}

impl CheckoutContext {
    /// Context for a freshly loaded draft.
    #[must_use]
    pub const fn new(draft: BookingDraft, showtime: Showtime) -> Self {
        Self {
            draft,
            showtime,
            payment_method: None,
            terms_accepted: false,
            last_error: None,
        }
    }

    /// Whether submission is enabled: payment method selected and terms
    /// accepted. Pure client-side gating, no network validation.
    #[must_use]
    pub const fn can_submit(&self) -> bool {
        self.payment_method.is_some() && self.terms_accepted
    }
}

/// State machine of the checkout page.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CheckoutState {
    /// Page not yet loaded; send [`CheckoutAction::Load`].
    #[default]
    Idle,
    /// Draft read and showtime fetch in flight.
    Loading,
    /// Draft rehydrated; collecting payment method and terms.
    Ready(CheckoutContext),
    /// Booking request in flight; duplicate submits are ignored.
    Submitting(CheckoutContext),
    /// Booking persisted; the confirmation view renders this record.
    Succeeded {
        /// The server-owned booking.
        booking: Booking,
    },
    /// Submission failed; the draft is preserved.
    Failed {
        /// Context for retry or correction.
        context: CheckoutContext,
        /// What went wrong.
        error: SubmitError,
    },
    /// Load failed; terminal for this page (no submission was attempted).
    Unrecoverable {
        /// Why the page cannot proceed.
        reason: LoadFailure,
    },
}

impl CheckoutState {
    /// The editable context, if the page is interactive.
    #[must_use]
    pub const fn context(&self) -> Option<&CheckoutContext> {
        match self {
            Self::Ready(context) | Self::Submitting(context) => Some(context),
            Self::Failed { context, .. } => Some(context),
            _ => None,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the checkout flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CheckoutAction {
    /// Read the draft and fetch its showtime.
    Load,
    /// Draft and showtime are ready.
    DraftLoaded {
        /// The validated draft.
        draft: BookingDraft,
        /// Its showtime, for display.
        showtime: Showtime,
    },
    /// The page cannot proceed.
    LoadFailed {
        /// Why.
        reason: LoadFailure,
    },
    /// Choose a payment method.
    SelectPaymentMethod {
        /// The chosen method id.
        method: PaymentMethod,
    },
    /// Accept or retract the terms.
    SetTermsAccepted {
        /// New acceptance value.
        accepted: bool,
    },
    /// Submit the booking.
    Submit,
    /// The server persisted the booking; the draft slot is already cleared.
    BookingCreated {
        /// The persisted record.
        booking: Booking,
    },
    /// The booking request failed; the draft is untouched.
    BookingFailed {
        /// What went wrong.
        error: SubmitError,
    },
    /// Retry a failed submission. Refused after a seats-taken conflict.
    Retry,
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the checkout flow.
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Remote cinema API.
    pub api: Arc<dyn CinemaApi>,
    /// Session draft store shared with seat selection.
    pub drafts: Arc<dyn DraftStore>,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the checkout flow.
#[derive(Clone, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    /// Creates the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// The submission effect: create the booking and, on success, consume
    /// the draft before reporting back. Failure leaves the slot untouched.
    fn submit_effect(
        context: &CheckoutContext,
        method: PaymentMethod,
        env: &CheckoutEnvironment,
    ) -> Effect<CheckoutAction> {
        let request = CreateBookingRequest {
            showtime_id: context.draft.showtime_id.clone(),
            seats: context.draft.seats.clone(),
            promotion_code: context.draft.promo_code.clone(),
            payment_method: method,
        };
        let api = Arc::clone(&env.api);
        let drafts = Arc::clone(&env.drafts);
        Effect::future(async move {
            Some(match api.create_booking(request).await {
                Ok(booking) => {
                    // Consume-once: the only place the draft is cleared.
                    drafts.clear();
                    CheckoutAction::BookingCreated { booking }
                },
                Err(error) => CheckoutAction::BookingFailed {
                    error: SubmitError::from(error),
                },
            })
        })
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per transition
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            CheckoutAction::Load => {
                if !matches!(state, CheckoutState::Idle) {
                    return smallvec![];
                }
                *state = CheckoutState::Loading;

                let api = Arc::clone(&env.api);
                let drafts = Arc::clone(&env.drafts);
                smallvec![Effect::future(async move {
                    let Some(draft) = drafts.load() else {
                        return Some(CheckoutAction::LoadFailed {
                            reason: LoadFailure::MissingDraft,
                        });
                    };
                    Some(match api.get_showtime(&draft.showtime_id).await {
                        Ok(showtime) => CheckoutAction::DraftLoaded { draft, showtime },
                        Err(error) => CheckoutAction::LoadFailed {
                            reason: LoadFailure::ShowtimeUnavailable {
                                message: error.to_string(),
                            },
                        },
                    })
                })]
            },

            CheckoutAction::DraftLoaded { draft, showtime } => {
                if matches!(state, CheckoutState::Loading) {
                    *state = CheckoutState::Ready(CheckoutContext::new(draft, showtime));
                }
                smallvec![]
            },

            CheckoutAction::LoadFailed { reason } => {
                if matches!(state, CheckoutState::Loading) {
                    *state = CheckoutState::Unrecoverable { reason };
                }
                smallvec![]
            },

            CheckoutAction::SelectPaymentMethod { method } => {
                match state {
                    CheckoutState::Ready(context) => {
                        context.payment_method = Some(method);
                        context.last_error = None;
                    },
                    // Editing after a retryable failure returns to Ready.
                    CheckoutState::Failed { context, error } if !error.forces_reselection() => {
                        let mut context = context.clone();
                        context.payment_method = Some(method);
                        context.last_error = None;
                        *state = CheckoutState::Ready(context);
                    },
                    _ => {},
                }
                smallvec![]
            },

            CheckoutAction::SetTermsAccepted { accepted } => {
                match state {
                    CheckoutState::Ready(context) => {
                        context.terms_accepted = accepted;
                        context.last_error = None;
                    },
                    CheckoutState::Failed { context, error } if !error.forces_reselection() => {
                        let mut context = context.clone();
                        context.terms_accepted = accepted;
                        context.last_error = None;
                        *state = CheckoutState::Ready(context);
                    },
                    _ => {},
                }
                smallvec![]
            },

            CheckoutAction::Submit => {
                let CheckoutState::Ready(context) = state else {
                    // Not loaded, already submitting, or already succeeded:
                    // rejected locally, no request is sent.
                    return smallvec![];
                };
                let Some(method) = context.payment_method.clone() else {
                    context.last_error = Some("Select a payment method".to_string());
                    return smallvec![];
                };
                if !context.terms_accepted {
                    context.last_error = Some("Accept the terms to continue".to_string());
                    return smallvec![];
                }
                context.last_error = None;

                let effect = Self::submit_effect(context, method, env);
                let context = context.clone();
                *state = CheckoutState::Submitting(context);
                smallvec![effect]
            },

            CheckoutAction::BookingCreated { booking } => {
                if matches!(state, CheckoutState::Submitting(_)) {
                    *state = CheckoutState::Succeeded { booking };
                }
                smallvec![]
            },

            CheckoutAction::BookingFailed { error } => {
                if let CheckoutState::Submitting(context) = state {
                    *state = CheckoutState::Failed {
                        context: context.clone(),
                        error,
                    };
                }
                smallvec![]
            },

            CheckoutAction::Retry => {
                let CheckoutState::Failed { context, error } = state else {
                    return smallvec![];
                };
                if error.forces_reselection() {
                    // Seats are gone; a blind retry would fail the same way.
                    return smallvec![];
                }
                let Some(method) = context.payment_method.clone() else {
                    return smallvec![];
                };
                let effect = Self::submit_effect(context, method, env);
                let context = context.clone();
                *state = CheckoutState::Submitting(context);
                smallvec![effect]
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cinema_api::MockCinemaApi;
    use crate::draft::{DraftStore, SessionDraftStore};
    use crate::types::{
        BookingId, CinemaId, HallId, Money, MovieId, SeatId, ShowtimeId, TicketPrice,
    };
    use cinebook_testing::{ReducerTest, assertions};

    fn showtime() -> Showtime {
        Showtime {
            id: ShowtimeId::new("st-1"),
            movie_id: MovieId::new("mv-1"),
            cinema_id: CinemaId::new("cn-1"),
            hall_id: HallId::new("hall-1"),
            start_time: "2025-06-01T19:00:00Z".parse().unwrap(),
            end_time: "2025-06-01T21:00:00Z".parse().unwrap(),
            format: "2D".to_string(),
            price: TicketPrice {
                regular: Money::from_minor(90_000),
            },
            available_seats: ["A1", "A2", "A3"].iter().map(|s| s.parse().unwrap()).collect(),
            booked_seats: std::collections::BTreeSet::new(),
        }
    }

    fn draft() -> BookingDraft {
        BookingDraft {
            showtime_id: ShowtimeId::new("st-1"),
            seats: vec!["A1".parse::<SeatId>().unwrap(), "A2".parse().unwrap()],
            promo_code: None,
            promotion_id: None,
            subtotal: Money::from_minor(180_000),
            discount: Money::ZERO,
            total: Money::from_minor(180_000),
        }
    }

    fn booking() -> Booking {
        Booking {
            id: BookingId::new("bk-1"),
            showtime_id: ShowtimeId::new("st-1"),
            seats: draft().seats,
            total: draft().total,
            created_at: "2025-06-01T12:05:00Z".parse().unwrap(),
        }
    }

    fn test_env() -> CheckoutEnvironment {
        CheckoutEnvironment {
            api: MockCinemaApi::new().shared(),
            drafts: Arc::new(SessionDraftStore::new()),
        }
    }

    fn ready_context() -> CheckoutContext {
        let mut context = CheckoutContext::new(draft(), showtime());
        context.payment_method = Some(PaymentMethod::new("credit_card"));
        context.terms_accepted = true;
        context
    }

    #[test]
    fn load_starts_the_rehydration_effect() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Idle)
            .when_action(CheckoutAction::Load)
            .then_state(|state| assert!(matches!(state, CheckoutState::Loading)))
            .then_effects(|effects| assertions::assert_effect_count(effects, 1))
            .run();
    }

    #[test]
    fn missing_draft_is_terminal() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Loading)
            .when_action(CheckoutAction::LoadFailed {
                reason: LoadFailure::MissingDraft,
            })
            .then_state(|state| {
                assert!(matches!(
                    state,
                    CheckoutState::Unrecoverable {
                        reason: LoadFailure::MissingDraft
                    }
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_requires_payment_method_and_terms() {
        let context = CheckoutContext::new(draft(), showtime());

        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Ready(context))
            .when_action(CheckoutAction::Submit)
            .then_state(|state| {
                let CheckoutState::Ready(context) = state else {
                    unreachable!("submit without gating must stay Ready");
                };
                assert!(context.last_error.is_some());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn terms_alone_are_not_enough() {
        let mut context = CheckoutContext::new(draft(), showtime());
        context.terms_accepted = true;

        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Ready(context))
            .when_action(CheckoutAction::Submit)
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn gated_submit_enters_submitting_with_one_effect() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Ready(ready_context()))
            .when_action(CheckoutAction::Submit)
            .then_state(|state| assert!(matches!(state, CheckoutState::Submitting(_))))
            .then_effects(|effects| assertions::assert_effect_count(effects, 1))
            .run();
    }

    #[test]
    fn duplicate_submit_while_in_flight_is_ignored() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Submitting(ready_context()))
            .when_action(CheckoutAction::Submit)
            .then_state(|state| {
                assert!(matches!(state, CheckoutState::Submitting(_)));
                assert!(state.context().unwrap().can_submit());
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn submit_after_success_is_rejected_locally() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Succeeded { booking: booking() })
            .when_action(CheckoutAction::Submit)
            .then_state(|state| assert!(matches!(state, CheckoutState::Succeeded { .. })))
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn booking_created_reaches_succeeded() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Submitting(ready_context()))
            .when_action(CheckoutAction::BookingCreated { booking: booking() })
            .then_state(|state| {
                let CheckoutState::Succeeded { booking } = state else {
                    unreachable!("expected Succeeded");
                };
                assert_eq!(booking.id.as_str(), "bk-1");
            })
            .run();
    }

    #[test]
    fn booking_failure_preserves_context_for_retry() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Submitting(ready_context()))
            .when_action(CheckoutAction::BookingFailed {
                error: SubmitError::Transient {
                    message: "gateway timeout".to_string(),
                },
            })
            .then_state(|state| {
                let CheckoutState::Failed { context, error } = state else {
                    unreachable!("expected Failed");
                };
                assert_eq!(context.draft, draft());
                assert!(!error.forces_reselection());
            })
            .run();
    }

    #[test]
    fn retry_after_transient_failure_resubmits() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Failed {
                context: ready_context(),
                error: SubmitError::Transient {
                    message: "gateway timeout".to_string(),
                },
            })
            .when_action(CheckoutAction::Retry)
            .then_state(|state| assert!(matches!(state, CheckoutState::Submitting(_))))
            .then_effects(|effects| assertions::assert_effect_count(effects, 1))
            .run();
    }

    #[test]
    fn seats_taken_refuses_retry() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(test_env())
            .given_state(CheckoutState::Failed {
                context: ready_context(),
                error: SubmitError::SeatsTaken,
            })
            .when_action(CheckoutAction::Retry)
            .then_state(|state| {
                assert!(matches!(
                    state,
                    CheckoutState::Failed {
                        error: SubmitError::SeatsTaken,
                        ..
                    }
                ));
            })
            .then_effects(assertions::assert_no_effects)
            .run();
    }

    #[test]
    fn seats_taken_maps_from_the_conflict_rejection_code() {
        let error = SubmitError::from(ApiError::Rejected {
            code: RejectionCode::SeatsTaken,
            message: "seats A1, A2 already booked".to_string(),
        });
        assert_eq!(error, SubmitError::SeatsTaken);
        assert!(error.forces_reselection());

        let other = SubmitError::from(ApiError::Rejected {
            code: RejectionCode::Other,
            message: "showtime closed".to_string(),
        });
        assert!(!other.forces_reselection());
    }

    #[tokio::test]
    async fn load_effect_reads_draft_without_consuming_it() {
        let drafts = Arc::new(SessionDraftStore::new());
        drafts.save(&draft());
        let env = CheckoutEnvironment {
            api: MockCinemaApi::new().with_showtime(showtime()).shared(),
            drafts: Arc::clone(&drafts) as Arc<dyn DraftStore>,
        };

        let mut state = CheckoutState::Idle;
        let effects = CheckoutReducer::new().reduce(&mut state, CheckoutAction::Load, &env);
        let action = match effects.into_iter().next().unwrap() {
            Effect::Future(fut) => fut.await.unwrap(),
            other => unreachable!("expected future effect, got {other:?}"),
        };

        assert!(matches!(action, CheckoutAction::DraftLoaded { .. }));
        // Peek, not take: a load failure later must not lose the draft.
        assert!(drafts.load().is_some());
    }
}
