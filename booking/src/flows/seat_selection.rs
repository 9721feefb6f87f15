//! Seat-selection flow.
//!
//! Covers the seat-selection page: loading a showtime with live
//! availability, toggling seats, applying and removing a coupon, and
//! handing a priced draft off to checkout.
//!
//! Pricing facts the flow maintains:
//! - a seat is selectable iff offered and not booked (sets intersected);
//! - the displayed subtotal is always unit price times selection size;
//! - an applied discount is only shown while the live subtotal equals the
//!   subtotal it was validated against, so a seat change silently dropping
//!   the basis also drops the discount and the user re-applies explicitly.

use crate::cinema_api::{ApiError, CinemaApi, CouponCheckRequest};
use crate::draft::DraftStore;
use crate::pricing;
use crate::types::{BookingDraft, Money, PromotionOutcome, SeatId, Showtime, ShowtimeId};
use cinebook_core::environment::Clock;
use cinebook_core::{SmallVec, effect::Effect, reducer::Reducer, smallvec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Promotion sub-state within an active selection.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PromotionStatus {
    /// No promotion applied.
    #[default]
    None,
    /// A coupon check is in flight, pinned to the subtotal it was built from.
    Validating {
        /// Trimmed coupon code being checked.
        code: String,
        /// Subtotal the check was constructed against.
        basis: Money,
    },
    /// A validated discount is applied.
    Applied(PromotionOutcome),
    /// The last check was rejected; the inline message stays visible.
    Rejected {
        /// The rejected code.
        code: String,
        /// Rejection reason for inline display.
        reason: String,
    },
}

impl PromotionStatus {
    /// Whether a coupon check is in flight.
    #[must_use]
    pub const fn is_validating(&self) -> bool {
        matches!(self, Self::Validating { .. })
    }

    /// The applied outcome, if any.
    #[must_use]
    pub const fn applied(&self) -> Option<&PromotionOutcome> {
        match self {
            Self::Applied(outcome) => Some(outcome),
            _ => None,
        }
    }
}

/// Live state of the seat-selection page once a showtime is loaded.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSelection {
    /// The showtime and its authoritative seat sets.
    pub showtime: Showtime,
    /// Seats the user has tentatively chosen.
    pub selected: BTreeSet<SeatId>,
    /// Promotion sub-state.
    pub promotion: PromotionStatus,
    /// A draft save is in flight.
    pub proceeding: bool,
    /// The draft was saved; the host can navigate to checkout.
    pub handoff_complete: bool,
    /// Inline validation or transient-failure message.
    pub last_error: Option<String>,
}

impl ActiveSelection {
    /// Fresh selection state for a newly loaded showtime.
    #[must_use]
    pub const fn new(showtime: Showtime) -> Self {
        Self {
            showtime,
            selected: BTreeSet::new(),
            promotion: PromotionStatus::None,
            proceeding: false,
            handoff_complete: false,
            last_error: None,
        }
    }

    /// Whether the seat can currently be selected.
    #[must_use]
    pub fn is_available(&self, seat: &SeatId) -> bool {
        self.showtime.is_seat_available(seat)
    }

    /// Number of selected seats.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Live subtotal: unit price times selection size.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        let count = u32::try_from(self.selected.len()).unwrap_or(u32::MAX);
        pricing::subtotal(self.showtime.unit_price(), count)
    }

    /// Discount from the applied promotion, zero otherwise.
    #[must_use]
    pub fn discount(&self) -> Money {
        self.promotion
            .applied()
            .map_or(Money::ZERO, |outcome| outcome.discount)
    }

    /// Live total after discount.
    #[must_use]
    pub fn total(&self) -> Money {
        pricing::total(self.subtotal(), self.discount())
    }

    /// The draft this selection would hand to checkout.
    #[must_use]
    pub fn draft(&self) -> BookingDraft {
        let subtotal = self.subtotal();
        let outcome = self.promotion.applied();
        let discount = outcome.map_or(Money::ZERO, |o| o.discount);
        BookingDraft {
            showtime_id: self.showtime.id.clone(),
            seats: self.selected.iter().copied().collect(),
            promo_code: outcome.map(|o| o.coupon_code.clone()),
            promotion_id: outcome.map(|o| o.promotion_id.clone()),
            subtotal,
            discount,
            total: pricing::total(subtotal, discount),
        }
    }

    /// Drop an applied promotion whose basis no longer matches the live
    /// subtotal. Called after every selection change.
    fn invalidate_stale_promotion(&mut self) {
        if let PromotionStatus::Applied(outcome) = &self.promotion {
            if !outcome.applies_to(self.subtotal()) {
                self.promotion = PromotionStatus::None;
            }
        }
    }
}

/// State of the seat-selection page.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum SeatSelectionState {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// Showtime fetch in flight.
    Loading {
        /// The showtime being fetched.
        showtime_id: ShowtimeId,
    },
    /// Page is interactive.
    Active(ActiveSelection),
    /// Showtime fetch failed; re-dispatch `LoadShowtime` to retry.
    LoadFailed {
        /// Failure description.
        message: String,
    },
}

impl SeatSelectionState {
    /// The active selection, if the page is interactive.
    #[must_use]
    pub const fn active(&self) -> Option<&ActiveSelection> {
        match self {
            Self::Active(active) => Some(active),
            _ => None,
        }
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Actions for the seat-selection flow: user intents plus effect results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SeatSelectionAction {
    /// Load (or reload) a showtime; resets selection and promotion.
    LoadShowtime {
        /// Showtime to load.
        showtime_id: ShowtimeId,
    },
    /// Showtime fetch succeeded.
    ShowtimeLoaded {
        /// The fetched showtime.
        showtime: Showtime,
    },
    /// Showtime fetch failed.
    ShowtimeLoadFailed {
        /// Failure description.
        message: String,
    },
    /// Toggle one seat. Unavailable seats are a no-op, not an error.
    ToggleSeat {
        /// The seat to toggle.
        seat: SeatId,
    },
    /// Empty the selection.
    ClearSelection,
    /// Validate a coupon code against the current subtotal.
    ApplyCoupon {
        /// Raw code as typed; trimmed before use.
        code: String,
    },
    /// Coupon check succeeded.
    CouponValidated {
        /// The validated outcome, pinned to its basis subtotal.
        outcome: PromotionOutcome,
    },
    /// Coupon check was rejected (not found / expired / ineligible).
    CouponRejected {
        /// The rejected code.
        code: String,
        /// Reason for inline display.
        reason: String,
    },
    /// Coupon check failed transiently; the user may retry.
    CouponCheckFailed {
        /// Failure description.
        message: String,
    },
    /// Remove the applied promotion; selection is untouched.
    RemovePromotion,
    /// Price the current selection and hand a draft off to checkout.
    ProceedToCheckout,
    /// The draft was written to the session store.
    DraftSaved,
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the seat-selection flow.
#[derive(Clone)]
pub struct SeatSelectionEnvironment {
    /// Remote cinema API.
    pub api: Arc<dyn CinemaApi>,
    /// Session draft store shared with checkout.
    pub drafts: Arc<dyn DraftStore>,
    /// Clock for the started-showtime guard.
    pub clock: Arc<dyn Clock>,
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the seat-selection flow.
#[derive(Clone, Debug, Default)]
pub struct SeatSelectionReducer;

impl SeatSelectionReducer {
    /// Creates the reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Reducer for SeatSelectionReducer {
    type State = SeatSelectionState;
    type Action = SeatSelectionAction;
    type Environment = SeatSelectionEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per user intent
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            SeatSelectionAction::LoadShowtime { showtime_id } => {
                *state = SeatSelectionState::Loading {
                    showtime_id: showtime_id.clone(),
                };
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.get_showtime(&showtime_id).await {
                        Ok(showtime) => SeatSelectionAction::ShowtimeLoaded { showtime },
                        Err(error) => SeatSelectionAction::ShowtimeLoadFailed {
                            message: error.to_string(),
                        },
                    })
                })]
            },

            SeatSelectionAction::ShowtimeLoaded { showtime } => {
                if matches!(state, SeatSelectionState::Loading { .. }) {
                    *state = SeatSelectionState::Active(ActiveSelection::new(showtime));
                }
                smallvec![]
            },

            SeatSelectionAction::ShowtimeLoadFailed { message } => {
                if matches!(state, SeatSelectionState::Loading { .. }) {
                    *state = SeatSelectionState::LoadFailed { message };
                }
                smallvec![]
            },

            SeatSelectionAction::ToggleSeat { seat } => {
                if let SeatSelectionState::Active(active) = state {
                    if !active.proceeding {
                        if active.selected.contains(&seat) {
                            active.selected.remove(&seat);
                        } else if active.is_available(&seat) {
                            active.selected.insert(seat);
                        }
                        // else: unavailable seat, rendered disabled; no-op.
                        active.invalidate_stale_promotion();
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::ClearSelection => {
                if let SeatSelectionState::Active(active) = state {
                    if !active.proceeding {
                        active.selected.clear();
                        active.invalidate_stale_promotion();
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::ApplyCoupon { code } => {
                let SeatSelectionState::Active(active) = state else {
                    return smallvec![];
                };
                if active.proceeding || active.promotion.is_validating() {
                    return smallvec![];
                }

                let trimmed = code.trim().to_string();
                if trimmed.is_empty() {
                    active.last_error = Some("Enter a coupon code".to_string());
                    return smallvec![];
                }
                if active.selected.is_empty() {
                    active.last_error =
                        Some("Select seats before applying a coupon".to_string());
                    return smallvec![];
                }
                if active.showtime.has_started(env.clock.now()) {
                    active.last_error = Some("This showtime has already started".to_string());
                    return smallvec![];
                }

                let basis = active.subtotal();
                active.promotion = PromotionStatus::Validating {
                    code: trimmed.clone(),
                    basis,
                };
                active.last_error = None;

                let request = CouponCheckRequest {
                    coupon_code: trimmed.clone(),
                    total_amount: basis,
                    movie_id: active.showtime.movie_id.clone(),
                    cinema_id: active.showtime.cinema_id.clone(),
                };
                let api = Arc::clone(&env.api);
                smallvec![Effect::future(async move {
                    Some(match api.check_coupon(request).await {
                        Ok(response) => SeatSelectionAction::CouponValidated {
                            outcome: PromotionOutcome {
                                coupon_code: trimmed,
                                promotion_id: response.promotion_id,
                                name: response.name,
                                discount: response.discount_amount,
                                basis,
                            },
                        },
                        Err(ApiError::Rejected { message, .. }) => {
                            SeatSelectionAction::CouponRejected {
                                code: trimmed,
                                reason: message,
                            }
                        },
                        Err(ApiError::Transient { message }) => {
                            SeatSelectionAction::CouponCheckFailed { message }
                        },
                    })
                })]
            },

            SeatSelectionAction::CouponValidated { outcome } => {
                if let SeatSelectionState::Active(active) = state {
                    let in_flight = match &active.promotion {
                        PromotionStatus::Validating { code, .. } => *code == outcome.coupon_code,
                        _ => false,
                    };
                    if in_flight {
                        if outcome.basis != active.subtotal() {
                            // Selection changed while the check was in
                            // flight; the discount's basis is gone.
                            active.promotion = PromotionStatus::None;
                        } else if outcome.discount > outcome.basis {
                            active.promotion = PromotionStatus::Rejected {
                                code: outcome.coupon_code,
                                reason: "Discount exceeds the order subtotal".to_string(),
                            };
                        } else {
                            active.promotion = PromotionStatus::Applied(outcome);
                        }
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::CouponRejected { code, reason } => {
                if let SeatSelectionState::Active(active) = state {
                    let in_flight = match &active.promotion {
                        PromotionStatus::Validating { code: current, .. } => *current == code,
                        _ => false,
                    };
                    if in_flight {
                        active.promotion = PromotionStatus::Rejected { code, reason };
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::CouponCheckFailed { message } => {
                if let SeatSelectionState::Active(active) = state {
                    if active.promotion.is_validating() {
                        active.promotion = PromotionStatus::None;
                        active.last_error = Some(message);
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::RemovePromotion => {
                if let SeatSelectionState::Active(active) = state {
                    if !active.proceeding {
                        active.promotion = PromotionStatus::None;
                    }
                }
                smallvec![]
            },

            SeatSelectionAction::ProceedToCheckout => {
                let SeatSelectionState::Active(active) = state else {
                    return smallvec![];
                };
                if active.proceeding {
                    return smallvec![];
                }
                if active.promotion.is_validating() {
                    active.last_error = Some("Coupon check in progress".to_string());
                    return smallvec![];
                }
                if active.selected.is_empty() {
                    active.last_error = Some("Select at least one seat".to_string());
                    return smallvec![];
                }
                if active.showtime.has_started(env.clock.now()) {
                    active.last_error = Some("This showtime has already started".to_string());
                    return smallvec![];
                }

                let draft = active.draft();
                active.proceeding = true;
                active.last_error = None;

                let drafts = Arc::clone(&env.drafts);
                smallvec![Effect::future(async move {
                    drafts.save(&draft);
                    Some(SeatSelectionAction::DraftSaved)
                })]
            },

            SeatSelectionAction::DraftSaved => {
                if let SeatSelectionState::Active(active) = state {
                    active.proceeding = false;
                    active.handoff_complete = true;
                }
                smallvec![]
            },
        }
    }
}
