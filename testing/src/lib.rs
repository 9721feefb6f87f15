//! # Cinebook Testing
//!
//! Testing utilities for cinebook flows: deterministic clocks and a fluent
//! reducer test harness.
//!
//! ## Example
//!
//! ```ignore
//! use cinebook_testing::ReducerTest;
//!
//! ReducerTest::new(SeatSelectionReducer)
//!     .with_env(test_environment())
//!     .given_state(active_state())
//!     .when_action(SeatSelectionAction::ClearSelection)
//!     .then_state(|state| assert_eq!(state.selected_count(), 0))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use cinebook_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};

    /// Fixed clock for deterministic tests: always returns the same time.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a fixed clock pinned to the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Default fixed clock for tests (2025-06-01 12:00:00 UTC).
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded timestamp fails to parse, which cannot happen.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

pub use mocks::{FixedClock, test_clock};
