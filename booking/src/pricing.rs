//! Pure price calculation for the booking flow.
//!
//! Stateless arithmetic on [`Money`]; promotion eligibility lives with the
//! promotion validation step, not here.

use crate::types::Money;

/// Subtotal for a selection: unit price times seat count.
#[must_use]
pub const fn subtotal(unit_price: Money, seat_count: u32) -> Money {
    unit_price.saturating_mul(seat_count)
}

/// Final total: subtotal minus discount, floored at zero.
///
/// The floor is a last line of defense. A discount reported greater than the
/// subtotal must be rejected as a promotion validation failure upstream,
/// never silently clamped into a zero total.
#[must_use]
pub const fn total(subtotal: Money, discount: Money) -> Money {
    subtotal.saturating_sub(discount)
}
