//! Seat-grid view model for the availability display.
//!
//! A pure projection of a showtime's seat sets plus the user's current
//! selection into render-ready rows. Membership tests only; no business
//! logic beyond "booked wins over available".

use crate::types::{SeatId, Showtime};
use std::collections::{BTreeMap, BTreeSet};

/// Render status of one seat in the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeatStatus {
    /// Selectable.
    Available,
    /// Already taken; rendered disabled.
    Booked,
    /// In the user's current selection.
    Selected,
}

/// One row of the seat grid, columns in ascending order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeatMapRow {
    /// Row letter.
    pub row: char,
    /// Seats in this row with their render status.
    pub seats: Vec<(SeatId, SeatStatus)>,
}

/// Builds the seat grid for a showtime: every seat the hall knows about
/// (offered or taken), grouped by row, row-major.
///
/// A seat listed in both sets renders as booked; a selected seat that has
/// since been booked also renders as booked, so the display never contradicts
/// the authoritative sets.
#[must_use]
pub fn seat_map(showtime: &Showtime, selected: &BTreeSet<SeatId>) -> Vec<SeatMapRow> {
    let mut rows: BTreeMap<char, Vec<(SeatId, SeatStatus)>> = BTreeMap::new();

    // Union of both sets, sorted row-major; a seat can appear in both.
    let known: BTreeSet<SeatId> = showtime
        .available_seats
        .iter()
        .chain(&showtime.booked_seats)
        .copied()
        .collect();

    for seat in known {
        let status = if showtime.booked_seats.contains(&seat) {
            SeatStatus::Booked
        } else if selected.contains(&seat) {
            SeatStatus::Selected
        } else {
            SeatStatus::Available
        };
        rows.entry(seat.row()).or_default().push((seat, status));
    }

    rows.into_iter()
        .map(|(row, seats)| SeatMapRow { row, seats })
        .collect()
}
