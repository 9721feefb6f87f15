//! Composition root: wires the flow reducers to their stores and services.

use crate::cinema_api::{ApiResult, CinemaApi, HttpCinemaApi};
use crate::config::Config;
use crate::draft::{DraftStore, SessionDraftStore};
use crate::flows::checkout::{
    CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState,
};
use crate::flows::seat_selection::{
    SeatSelectionAction, SeatSelectionEnvironment, SeatSelectionReducer, SeatSelectionState,
};
use cinebook_core::environment::{Clock, SystemClock};
use cinebook_runtime::Store;
use std::sync::Arc;
use std::time::Duration;

/// Store driving the seat-selection page.
pub type SeatSelectionStore = Store<
    SeatSelectionState,
    SeatSelectionAction,
    SeatSelectionEnvironment,
    SeatSelectionReducer,
>;

/// Store driving the checkout page.
pub type CheckoutStore =
    Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

/// One browsing session's worth of booking flow: both stores sharing the
/// same API client and draft slot.
pub struct BookingApp {
    /// Seat-selection page store.
    pub seat_selection: SeatSelectionStore,
    /// Checkout page store.
    pub checkout: CheckoutStore,
    /// The shared session draft slot.
    pub drafts: Arc<dyn DraftStore>,
}

impl BookingApp {
    /// Wire the flows to the given services.
    #[must_use]
    pub fn new(
        api: Arc<dyn CinemaApi>,
        drafts: Arc<dyn DraftStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let seat_selection = Store::new(
            SeatSelectionState::default(),
            SeatSelectionReducer::new(),
            SeatSelectionEnvironment {
                api: Arc::clone(&api),
                drafts: Arc::clone(&drafts),
                clock,
            },
        );
        let checkout = Store::new(
            CheckoutState::default(),
            CheckoutReducer::new(),
            CheckoutEnvironment {
                api,
                drafts: Arc::clone(&drafts),
            },
        );
        Self {
            seat_selection,
            checkout,
            drafts,
        }
    }

    /// Production wiring: HTTP API client, fresh session draft slot, system
    /// clock.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &Config) -> ApiResult<Self> {
        let api = HttpCinemaApi::new(
            config.api.base_url.clone(),
            Duration::from_secs(config.api.request_timeout),
        )?;
        Ok(Self::new(
            Arc::new(api),
            Arc::new(SessionDraftStore::new()),
            Arc::new(SystemClock),
        ))
    }
}
