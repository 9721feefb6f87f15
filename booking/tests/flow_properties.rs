//! Property tests for the pricing algebra, seat toggling, and the draft
//! round trip.

#![allow(clippy::unwrap_used)]

use cinebook::cinema_api::MockCinemaApi;
use cinebook::draft::{DraftStore, SessionDraftStore};
use cinebook::flows::seat_selection::{
    ActiveSelection, SeatSelectionAction, SeatSelectionEnvironment, SeatSelectionReducer,
    SeatSelectionState,
};
use cinebook::pricing;
use cinebook::types::{
    BookingDraft, CinemaId, HallId, Money, MovieId, PromotionId, SeatId, Showtime, ShowtimeId,
    TicketPrice,
};
use cinebook_core::reducer::Reducer;
use cinebook_testing::test_clock;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn seat_strategy() -> impl Strategy<Value = SeatId> {
    (proptest::char::range('A', 'Z'), 1u32..=30)
        .prop_map(|(row, column)| SeatId::new(row, column).unwrap())
}

fn seat_set(max: usize) -> impl Strategy<Value = BTreeSet<SeatId>> {
    proptest::collection::btree_set(seat_strategy(), 0..max)
}

fn showtime_with(available: BTreeSet<SeatId>, unit_price: u64) -> Showtime {
    Showtime {
        id: ShowtimeId::new("st-prop"),
        movie_id: MovieId::new("mv-prop"),
        cinema_id: CinemaId::new("cn-prop"),
        hall_id: HallId::new("hall-prop"),
        start_time: "2025-06-01T19:00:00Z".parse().unwrap(),
        end_time: "2025-06-01T21:00:00Z".parse().unwrap(),
        format: "2D".to_string(),
        price: TicketPrice {
            regular: Money::from_minor(unit_price),
        },
        available_seats: available,
        booked_seats: BTreeSet::new(),
    }
}

fn env() -> SeatSelectionEnvironment {
    SeatSelectionEnvironment {
        api: MockCinemaApi::new().shared(),
        drafts: Arc::new(SessionDraftStore::new()),
        clock: Arc::new(test_clock()),
    }
}

fn draft_strategy() -> impl Strategy<Value = BookingDraft> {
    (
        proptest::collection::btree_set(seat_strategy(), 1..8),
        0u64..=10_000_000,
        proptest::option::of("[A-Z]{4,10}"),
    )
        .prop_flat_map(|(seats, subtotal, promo)| {
            (Just(seats), Just(subtotal), 0u64..=subtotal, Just(promo))
        })
        .prop_map(|(seats, subtotal, discount, promo)| BookingDraft {
            showtime_id: ShowtimeId::new("st-prop"),
            seats: seats.into_iter().collect(),
            promotion_id: promo.as_ref().map(|_| PromotionId::new("promo-prop")),
            promo_code: promo,
            subtotal: Money::from_minor(subtotal),
            discount: Money::from_minor(discount),
            total: Money::from_minor(subtotal - discount),
        })
}

proptest! {
    #[test]
    fn subtotal_is_exact_multiplication(unit_price in 0u64..=1_000_000, count in 0u32..=200) {
        let subtotal = pricing::subtotal(Money::from_minor(unit_price), count);
        prop_assert_eq!(subtotal.minor(), unit_price * u64::from(count));
    }

    #[test]
    fn total_is_exact_subtraction_within_bounds(
        subtotal in 0u64..=1_000_000_000,
        discount_ratio in 0.0f64..=1.0,
    ) {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let discount = ((subtotal as f64) * discount_ratio) as u64;
        let total = pricing::total(Money::from_minor(subtotal), Money::from_minor(discount));
        prop_assert_eq!(total.minor(), subtotal - discount);
    }

    #[test]
    fn total_saturates_at_zero(subtotal in 0u64..=1_000, excess in 1u64..=1_000) {
        let total = pricing::total(
            Money::from_minor(subtotal),
            Money::from_minor(subtotal + excess),
        );
        prop_assert_eq!(total, Money::ZERO);
    }

    #[test]
    fn toggling_twice_restores_the_selection(
        available in seat_set(40),
        seat in seat_strategy(),
    ) {
        let mut initial: BTreeSet<SeatId> = available.iter().copied().take(3).collect();
        // The toggled seat may or may not start selected; both directions
        // must invert.
        if available.contains(&seat) && initial.len() % 2 == 0 {
            initial.insert(seat);
        }

        let mut active = ActiveSelection::new(showtime_with(available, 90_000));
        active.selected = initial.clone();
        let mut state = SeatSelectionState::Active(active);

        let reducer = SeatSelectionReducer::new();
        let env = env();
        reducer.reduce(&mut state, SeatSelectionAction::ToggleSeat { seat }, &env);
        reducer.reduce(&mut state, SeatSelectionAction::ToggleSeat { seat }, &env);

        prop_assert_eq!(&state.active().unwrap().selected, &initial);
    }

    #[test]
    fn draft_round_trips_through_the_session_store(draft in draft_strategy()) {
        let store = SessionDraftStore::new();
        store.save(&draft);
        prop_assert_eq!(store.load(), Some(draft));
    }

    #[test]
    fn draft_json_round_trips(draft in draft_strategy()) {
        let json = serde_json::to_string(&draft).unwrap();
        let back: BookingDraft = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, draft);
    }
}
