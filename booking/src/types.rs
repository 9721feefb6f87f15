//! Domain types for the cinebook ticketing flow.
//!
//! Value objects and entities shared by the seat-selection and checkout
//! state machines: identifiers, seat addressing, money, the showtime read
//! model, the promotion outcome, and the booking draft carried between the
//! two pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================
//
// All catalog identifiers are owned by the remote API and treated as opaque
// strings on this side of the boundary.

/// Unique identifier for a showtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowtimeId(String);

impl ShowtimeId {
    /// Wraps a server-issued showtime id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShowtimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a movie.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovieId(String);

impl MovieId {
    /// Wraps a server-issued movie id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a cinema.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CinemaId(String);

impl CinemaId {
    /// Wraps a server-issued cinema id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CinemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a cinema hall.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HallId(String);

impl HallId {
    /// Wraps a server-issued hall id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a persisted booking.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(String);

impl BookingId {
    /// Wraps a server-issued booking id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a promotion rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromotionId(String);

impl PromotionId {
    /// Wraps a server-issued promotion id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Seat addressing
// ============================================================================

/// Error from parsing a seat identifier string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeatIdError {
    /// The string did not start with an ASCII uppercase row letter.
    #[error("seat id must start with a row letter A-Z: {0:?}")]
    InvalidRow(String),
    /// The column part was missing, non-numeric, or zero.
    #[error("seat id must end with a 1-based column number: {0:?}")]
    InvalidColumn(String),
}

/// A seat address within a hall: row letter plus 1-based column, canonically
/// written as e.g. `"C7"`.
///
/// Ordering is row-major (row first, then column) so seat collections render
/// deterministically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    row: char,
    column: u32,
}

impl SeatId {
    /// Builds a seat id from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`SeatIdError`] if the row is not `A..=Z` or the column is 0.
    pub fn new(row: char, column: u32) -> Result<Self, SeatIdError> {
        if !row.is_ascii_uppercase() {
            return Err(SeatIdError::InvalidRow(row.to_string()));
        }
        if column == 0 {
            return Err(SeatIdError::InvalidColumn(column.to_string()));
        }
        Ok(Self { row, column })
    }

    /// The row letter (`'A'..='Z'`).
    #[must_use]
    pub const fn row(&self) -> char {
        self.row
    }

    /// The 1-based column number.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }
}

impl std::str::FromStr for SeatId {
    type Err = SeatIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let row = chars
            .next()
            .ok_or_else(|| SeatIdError::InvalidRow(s.to_string()))?;
        if !row.is_ascii_uppercase() {
            return Err(SeatIdError::InvalidRow(s.to_string()));
        }
        let column: u32 = chars
            .as_str()
            .parse()
            .map_err(|_| SeatIdError::InvalidColumn(s.to_string()))?;
        if column == 0 {
            return Err(SeatIdError::InvalidColumn(s.to_string()));
        }
        Ok(Self { row, column })
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.column)
    }
}

// ============================================================================
// Money (integer minor units, no floating point)
// ============================================================================

/// An amount of money in the site's currency, in integer minor units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn from_minor(amount: u64) -> Self {
        Self(amount)
    }

    /// The amount in minor units.
    #[must_use]
    pub const fn minor(&self) -> u64 {
        self.0
    }

    /// Whether the amount is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts with overflow checking.
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(sum) => Some(Self(sum)),
            None => None,
        }
    }

    /// Subtracts, returning `None` if the result would be negative.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        if self.0 >= other.0 {
            Some(Self(self.0 - other.0))
        } else {
            None
        }
    }

    /// Subtracts, flooring at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiplies by a quantity, saturating on overflow.
    #[must_use]
    pub const fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Showtime read model (external, read-only)
// ============================================================================

/// Per-category ticket pricing for a showtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPrice {
    /// Price of a regular seat.
    pub regular: Money,
}

/// A scheduled screening, as served by the catalog API.
///
/// `available_seats` and `booked_seats` are both authoritative: a seat is
/// selectable only when it appears in the former and not in the latter. The
/// sets are intersected, never merged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    /// Showtime id.
    pub id: ShowtimeId,
    /// Movie being screened.
    pub movie_id: MovieId,
    /// Cinema hosting the screening.
    pub cinema_id: CinemaId,
    /// Hall within the cinema.
    pub hall_id: HallId,
    /// Screening start.
    pub start_time: DateTime<Utc>,
    /// Screening end.
    pub end_time: DateTime<Utc>,
    /// Presentation format (e.g. "2D", "IMAX").
    pub format: String,
    /// Ticket pricing.
    pub price: TicketPrice,
    /// Seats the hall offers for sale.
    pub available_seats: BTreeSet<SeatId>,
    /// Seats already taken.
    pub booked_seats: BTreeSet<SeatId>,
}

impl Showtime {
    /// Whether a seat can currently be selected: offered for sale and not
    /// already taken.
    #[must_use]
    pub fn is_seat_available(&self, seat: &SeatId) -> bool {
        self.available_seats.contains(seat) && !self.booked_seats.contains(seat)
    }

    /// Price of one regular seat.
    #[must_use]
    pub const fn unit_price(&self) -> Money {
        self.price.regular
    }

    /// Whether the screening has already started at `now`.
    #[must_use]
    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_time
    }
}

// ============================================================================
// Promotion outcome
// ============================================================================

/// The result of a successful coupon validation.
///
/// `basis` records the subtotal the validator was given. A stored outcome is
/// only meaningful while the live subtotal still equals its basis; any seat
/// change that moves the subtotal invalidates the outcome.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionOutcome {
    /// The coupon code as submitted (trimmed).
    pub coupon_code: String,
    /// Server-side promotion rule id.
    pub promotion_id: PromotionId,
    /// Display name of the promotion.
    pub name: String,
    /// Validated discount amount.
    pub discount: Money,
    /// Subtotal the discount was computed against.
    pub basis: Money,
}

impl PromotionOutcome {
    /// Whether this outcome still applies to the given live subtotal.
    #[must_use]
    pub fn applies_to(&self, subtotal: Money) -> bool {
        self.basis == subtotal && self.discount <= self.basis
    }
}

// ============================================================================
// Booking draft (the cross-page handoff record)
// ============================================================================

/// Error from validating a loaded booking draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// The draft has no seats.
    #[error("draft has no seats")]
    EmptySeats,
    /// The subtotal does not match unit price arithmetic recorded in it.
    #[error("draft discount {discount} exceeds subtotal {subtotal}")]
    DiscountExceedsSubtotal {
        /// Recorded discount.
        discount: Money,
        /// Recorded subtotal.
        subtotal: Money,
    },
    /// `total` is not `subtotal - discount`.
    #[error("draft total {total} does not equal subtotal {subtotal} minus discount {discount}")]
    InconsistentTotal {
        /// Recorded subtotal.
        subtotal: Money,
        /// Recorded discount.
        discount: Money,
        /// Recorded total.
        total: Money,
    },
}

/// The transient record handed from seat selection to checkout.
///
/// Created when the user proceeds from seat selection; consumed when
/// checkout succeeds; abandoned without harm if the user walks away.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BookingDraft {
    /// Showtime being booked.
    pub showtime_id: ShowtimeId,
    /// Selected seats, row-major order.
    pub seats: Vec<SeatId>,
    /// Applied coupon code, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
    /// Applied promotion id, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<PromotionId>,
    /// Unit price times seat count.
    pub subtotal: Money,
    /// Validated discount (zero when no promotion applied).
    pub discount: Money,
    /// `subtotal - discount`.
    pub total: Money,
}

impl BookingDraft {
    /// Checks the draft's structural invariants.
    ///
    /// Amounts are integer minor units, so the consistency checks are exact.
    ///
    /// # Errors
    ///
    /// Returns the first violated [`DraftError`] invariant.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.seats.is_empty() {
            return Err(DraftError::EmptySeats);
        }
        if self.discount > self.subtotal {
            return Err(DraftError::DiscountExceedsSubtotal {
                discount: self.discount,
                subtotal: self.subtotal,
            });
        }
        let expected = self.subtotal.saturating_sub(self.discount);
        if self.total != expected {
            return Err(DraftError::InconsistentTotal {
                subtotal: self.subtotal,
                discount: self.discount,
                total: self.total,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Payment method and booking
// ============================================================================

/// An opaque payment-method identifier selected at checkout.
///
/// Gateway integration is out of scope; the id is passed through to the
/// booking API untouched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentMethod(String);

impl PaymentMethod {
    /// Wraps a payment-method id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A persisted booking, as returned by the booking API.
///
/// Server-owned and read-only once created; rendered by the confirmation
/// view.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking id.
    pub id: BookingId,
    /// Booked showtime.
    pub showtime_id: ShowtimeId,
    /// Booked seats.
    pub seats: Vec<SeatId>,
    /// Amount charged.
    pub total: Money,
    /// When the server persisted the booking.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn seat_id_parses_canonical_form() {
        let seat: SeatId = "C7".parse().unwrap();
        assert_eq!(seat.row(), 'C');
        assert_eq!(seat.column(), 7);
        assert_eq!(seat.to_string(), "C7");
    }

    #[test]
    fn seat_id_rejects_malformed_strings() {
        assert!("".parse::<SeatId>().is_err());
        assert!("c7".parse::<SeatId>().is_err());
        assert!("7C".parse::<SeatId>().is_err());
        assert!("C".parse::<SeatId>().is_err());
        assert!("C0".parse::<SeatId>().is_err());
        assert!("CX".parse::<SeatId>().is_err());
    }

    #[test]
    fn seat_id_orders_row_major() {
        let a9: SeatId = "A9".parse().unwrap();
        let b1: SeatId = "B1".parse().unwrap();
        let b2: SeatId = "B2".parse().unwrap();
        assert!(a9 < b1);
        assert!(b1 < b2);
    }

    #[test]
    fn seat_id_serializes_as_string() {
        let seat: SeatId = "H12".parse().unwrap();
        assert_eq!(serde_json::to_string(&seat).unwrap(), "\"H12\"");
        let back: SeatId = serde_json::from_str("\"H12\"").unwrap();
        assert_eq!(back, seat);
    }

    #[test]
    fn booked_seat_is_never_available() {
        let showtime = showtime_with_seats(&["A1", "A2"], &["A2"]);
        assert!(showtime.is_seat_available(&"A1".parse().unwrap()));
        // A2 appears in both sets; booked wins.
        assert!(!showtime.is_seat_available(&"A2".parse().unwrap()));
        // A3 is in neither set.
        assert!(!showtime.is_seat_available(&"A3".parse().unwrap()));
    }

    #[test]
    fn money_arithmetic_is_checked() {
        let a = Money::from_minor(100);
        let b = Money::from_minor(30);
        assert_eq!(a.checked_sub(b), Some(Money::from_minor(70)));
        assert_eq!(b.checked_sub(a), None);
        assert_eq!(b.saturating_sub(a), Money::ZERO);
        assert_eq!(a.saturating_mul(3), Money::from_minor(300));
    }

    #[test]
    fn draft_validation_accepts_consistent_amounts() {
        let draft = draft(270_000, 20_000, 250_000);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn draft_validation_rejects_inconsistent_total() {
        let draft = draft(270_000, 20_000, 260_000);
        assert!(matches!(
            draft.validate(),
            Err(DraftError::InconsistentTotal { .. })
        ));
    }

    #[test]
    fn draft_validation_rejects_excess_discount() {
        let draft = draft(100, 200, 0);
        assert!(matches!(
            draft.validate(),
            Err(DraftError::DiscountExceedsSubtotal { .. })
        ));
    }

    #[test]
    fn draft_validation_rejects_empty_seats() {
        let mut d = draft(0, 0, 0);
        d.seats.clear();
        assert_eq!(d.validate(), Err(DraftError::EmptySeats));
    }

    #[test]
    fn promotion_outcome_tracks_its_basis() {
        let outcome = PromotionOutcome {
            coupon_code: "SUMMER20".to_string(),
            promotion_id: PromotionId::new("promo-1"),
            name: "Summer deal".to_string(),
            discount: Money::from_minor(20_000),
            basis: Money::from_minor(270_000),
        };
        assert!(outcome.applies_to(Money::from_minor(270_000)));
        assert!(!outcome.applies_to(Money::from_minor(180_000)));
    }

    fn showtime_with_seats(available: &[&str], booked: &[&str]) -> Showtime {
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
            available_seats: available.iter().map(|s| s.parse().unwrap()).collect(),
            booked_seats: booked.iter().map(|s| s.parse().unwrap()).collect(),
        }
    }

    fn draft(subtotal: u64, discount: u64, total: u64) -> BookingDraft {
        BookingDraft {
            showtime_id: ShowtimeId::new("st-1"),
            seats: vec!["A1".parse().unwrap()],
            promo_code: None,
            promotion_id: None,
            subtotal: Money::from_minor(subtotal),
            discount: Money::from_minor(discount),
            total: Money::from_minor(total),
        }
    }
}
