//! # Cinebook Core
//!
//! Core traits and types for the cinebook flow architecture.
//!
//! Every user-facing flow (seat selection, checkout) is a state machine
//! expressed with the same three pieces:
//!
//! - **State**: the flow's domain state
//! - **Action**: all possible inputs (user intents and effect results)
//! - **Reducer**: pure function `(State, Action, Environment) → Effects`
//!
//! Side effects are never performed inside a reducer. A reducer returns
//! [`effect::Effect`] *descriptions*; the store runtime executes them and
//! feeds any produced actions back in. External dependencies (API clients,
//! the draft store, the clock) are injected through the `Environment`
//! associated type so reducers stay deterministic and testable.

// Re-export commonly used types so downstream crates share one vocabulary.
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// The core trait for flow business logic.
pub mod reducer {
    use super::SmallVec;
    use super::effect::Effect;

    /// A pure state machine step.
    ///
    /// Implementations validate the action, update state in place, and
    /// return effect descriptions for the runtime to execute. They must not
    /// perform I/O, read the clock directly, or panic.
    ///
    /// The inline capacity of four covers every flow in this workspace; a
    /// reducer returning more effects simply spills to the heap.
    pub trait Reducer {
        /// The state this reducer operates on.
        type State;

        /// The action type this reducer processes.
        type Action;

        /// Injected dependencies.
        type Environment;

        /// Reduce one action into state changes plus effects.
        ///
        /// Unknown or out-of-phase actions are ignored by returning no
        /// effects; invalid transitions are recorded in state, never raised.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Side-effect descriptions returned by reducers.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// A description of a side effect to be executed by the store runtime.
    ///
    /// Effects are values, not executions. The `Action` parameter is the
    /// feedback type: an effect that resolves to `Some(action)` has that
    /// action dispatched back into the reducer.
    pub enum Effect<Action> {
        /// No-op effect.
        None,

        /// Run the contained effects concurrently.
        Parallel(Vec<Effect<Action>>),

        /// Run the contained effects one after another.
        Sequential(Vec<Effect<Action>>),

        /// Dispatch an action after a delay.
        Delay {
            /// How long to wait.
            duration: Duration,
            /// Action to dispatch after the delay.
            action: Box<Action>,
        },

        /// Arbitrary async computation, optionally feeding an action back.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    impl<Action> Effect<Action> {
        /// Wrap an async block as an effect.
        pub fn future<F>(fut: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(fut))
        }

        /// Combine effects to run concurrently.
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially.
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }
    }

    // Manual Debug since Future does not implement it.
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }
}

/// Dependency-injection traits shared by all environments.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Abstracts time so reducers and effects can be tested deterministically.
    pub trait Clock: Send + Sync {
        /// The current time.
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
