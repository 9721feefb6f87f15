//! # Cinebook
//!
//! The booking core of a cinema ticketing site: seat selection against live
//! availability, coupon validation against a promotion service, a
//! session-scoped draft handed across the page transition, and checkout
//! submission with a confirmation record.
//!
//! The flow, leaf to root:
//!
//! ```text
//! seat grid (seat_map) ──┐
//! seat toggling          ├─► pricing ─► coupon check ─► BookingDraft
//! (flows::seat_selection)┘                                  │
//!                                                  draft::SessionDraftStore
//!                                                           │
//!                               flows::checkout ─► cinema_api::create_booking
//!                                                           │
//!                                                 Booking (confirmation)
//! ```
//!
//! Everything beyond the three [`cinema_api::CinemaApi`] contracts —
//! catalog CRUD, authentication, payment processing, rendering — belongs to
//! external collaborators.

pub mod app;
pub mod cinema_api;
pub mod config;
pub mod draft;
pub mod flows;
pub mod pricing;
pub mod seat_map;
pub mod types;
