//! Fluent Given/When/Then harness for reducer unit tests.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use cinebook_core::{SmallVec, effect::Effect, reducer::Reducer};

type StateAssertion<S> = Box<dyn FnOnce(&S)>;
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Runs one reducer step and applies assertions to the resulting state and
/// effects.
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    action: Option<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new test around the given reducer.
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment.
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given).
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action under test (When).
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.action = Some(action);
        self
    }

    /// Assert on the resulting state (Then).
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Assert on the returned effects (Then).
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the reducer and all assertions.
    ///
    /// # Panics
    ///
    /// Panics if state, action, or environment was not set, or if any
    /// assertion fails.
    #[allow(clippy::expect_used)] // test harness
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("initial state must be set with given_state()");
        let action = self.action.expect("action must be set with when_action()");
        let env = self
            .environment
            .expect("environment must be set with with_env()");

        let effects: SmallVec<[Effect<A>; 4]> = self.reducer.reduce(&mut state, action, &env);

        for assertion in self.state_assertions {
            assertion(&state);
        }
        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effect slices.
pub mod assertions {
    use cinebook_core::effect::Effect;

    /// Assert that no effects were returned.
    ///
    /// # Panics
    ///
    /// Panics if the slice is not empty.
    #[allow(clippy::panic)] // test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.is_empty(),
            "expected no effects, got {}: {effects:?}",
            effects.len()
        );
    }

    /// Assert an exact number of effects.
    ///
    /// # Panics
    ///
    /// Panics if the count differs.
    #[allow(clippy::panic)] // test assertion
    pub fn assert_effect_count<A: std::fmt::Debug>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "expected {expected} effects, got {}: {effects:?}",
            effects.len()
        );
    }
}
