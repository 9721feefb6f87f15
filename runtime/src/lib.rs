//! # Cinebook Runtime
//!
//! The [`Store`] runtime that drives cinebook flow state machines.
//!
//! A store owns one flow's state, runs its reducer, executes the returned
//! effect descriptions on the tokio runtime, and feeds effect-produced
//! actions back into the reducer. Reducer execution serializes on a write
//! lock; effects run as spawned tasks so the caller stays responsive while
//! requests are in flight.
//!
//! ## Example
//!
//! ```ignore
//! let store = Store::new(SeatSelectionState::default(), SeatSelectionReducer, env);
//!
//! let mut handle = store.send(SeatSelectionAction::LoadShowtime { showtime_id })?;
//! handle.wait().await;
//!
//! let seats = store.state(|s| s.selected_count()).await;
//! ```

use cinebook_core::{effect::Effect, reducer::Reducer};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{RwLock, broadcast, watch};

/// Error types for the store runtime.
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during store operations.
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// The store is shutting down and not accepting new actions.
        #[error("store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out with effects still running.
        #[error("shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),

        /// Timeout waiting for a matching action.
        ///
        /// Returned by `send_and_wait_for` when the timeout expires before
        /// a matching action is broadcast.
        #[error("timeout waiting for action")]
        Timeout,

        /// The action broadcast channel closed, typically because the store
        /// is shutting down.
        #[error("action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for awaiting the effects spawned by a single [`Store::send`].
///
/// Tracking is direct: the handle resolves when the effects returned by that
/// one reducer call finish. Actions those effects feed back may spawn further
/// effects with their own lifetimes; request/response flows should prefer
/// [`Store::send_and_wait_for`].
#[derive(Clone)]
pub struct EffectHandle {
    pending: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, Arc<AtomicUsize>, watch::Sender<()>) {
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());
        (
            Self {
                pending: Arc::clone(&pending),
                completion: rx,
            },
            pending,
            tx,
        )
    }

    /// A handle that is already complete. Useful as a loop seed.
    #[must_use]
    pub fn completed() -> Self {
        let (tx, rx) = watch::channel(());
        drop(tx);
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            completion: rx,
        }
    }

    /// Wait until every tracked effect has finished.
    pub async fn wait(&mut self) {
        while self.pending.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                // Sender dropped: all tracking guards are gone.
                break;
            }
        }
    }

    /// Wait with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if the effects are still running when
    /// the timeout expires.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// RAII guard that decrements the handle counter, notifying waiters at zero.
struct TrackingGuard {
    pending: Arc<AtomicUsize>,
    notifier: watch::Sender<()>,
}

impl TrackingGuard {
    fn new(pending: Arc<AtomicUsize>, notifier: watch::Sender<()>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending, notifier }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// Guard that decrements the store-wide pending counter on drop, so shutdown
/// accounting survives effect panics.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct StoreInner<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    state: RwLock<S>,
    reducer: R,
    environment: E,
    shutdown: AtomicBool,
    pending_effects: Arc<AtomicUsize>,
    /// Actions produced by effects are broadcast to observers; the initial
    /// action of a `send` is not. This is what request/response waiting and
    /// test synchronization subscribe to.
    action_broadcast: broadcast::Sender<A>,
}

/// The runtime coordinator for one flow.
///
/// Cloning is cheap and shares the same state, reducer, and environment.
pub struct Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    inner: Arc<StoreInner<S, A, E, R>>,
}

impl<S, A, E, R> Clone for Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, A, E, R> Store<S, A, E, R>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Create a store with the default broadcast capacity of 16.
    #[must_use]
    pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
        Self::with_broadcast_capacity(initial_state, reducer, environment, 16)
    }

    /// Create a store with a custom action broadcast capacity.
    ///
    /// Increase the capacity when observers may lag behind bursts of
    /// effect-produced actions.
    #[must_use]
    pub fn with_broadcast_capacity(
        initial_state: S,
        reducer: R,
        environment: E,
        capacity: usize,
    ) -> Self {
        let (action_broadcast, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(StoreInner {
                state: RwLock::new(initial_state),
                reducer,
                environment,
                shutdown: AtomicBool::new(false),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                action_broadcast,
            }),
        }
    }

    /// Send an action to the store.
    ///
    /// The reducer runs synchronously under the state write lock; effects
    /// are spawned and execute after this method returns. Use the returned
    /// [`EffectHandle`] to await them.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting
    /// down.
    #[tracing::instrument(skip_all, name = "store_send")]
    pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
        if self.inner.shutdown.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress);
        }

        metrics::counter!("store.actions").increment(1);

        let effects = {
            let mut state = self.inner.state.write().await;
            self.inner
                .reducer
                .reduce(&mut state, action, &self.inner.environment)
        };

        let (handle, pending, notifier) = EffectHandle::new();
        for effect in effects {
            self.spawn_effect(effect, Arc::clone(&pending), notifier.clone());
        }
        Ok(handle)
    }

    /// Send an action and wait for an effect-produced action matching
    /// `predicate`.
    ///
    /// The subscription is taken before sending, so a fast effect cannot
    /// race the observer.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Timeout`] if no matching action arrives in time.
    /// - [`StoreError::ChannelClosed`] if the broadcast channel closes.
    /// - [`StoreError::ShutdownInProgress`] if the store is shutting down.
    pub async fn send_and_wait_for<F>(
        &self,
        action: A,
        predicate: F,
        timeout: Duration,
    ) -> Result<A, StoreError>
    where
        F: Fn(&A) -> bool,
    {
        let mut rx = self.inner.action_broadcast.subscribe();
        self.send(action).await?;

        tokio::time::timeout(timeout, async {
            loop {
                match rx.recv().await {
                    Ok(candidate) if predicate(&candidate) => return Ok(candidate),
                    Ok(_) => {},
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "action observer lagged");
                    },
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(StoreError::ChannelClosed);
                    },
                }
            }
        })
        .await
        .map_err(|_| StoreError::Timeout)?
    }

    /// Read the current state through a projection function.
    pub async fn state<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let state = self.inner.state.read().await;
        f(&state)
    }

    /// Subscribe to effect-produced actions.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<A> {
        self.inner.action_broadcast.subscribe()
    }

    /// Number of effect tasks currently in flight.
    #[must_use]
    pub fn pending_effects(&self) -> usize {
        self.inner.pending_effects.load(Ordering::Acquire)
    }

    /// Initiate graceful shutdown: reject new actions, then wait for
    /// in-flight effects to drain.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if effects are still running
    /// when the timeout expires.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        tracing::info!("initiating store shutdown");
        self.inner.shutdown.store(true, Ordering::Release);

        let start = tokio::time::Instant::now();
        let poll_interval = Duration::from_millis(10);

        loop {
            let pending = self.inner.pending_effects.load(Ordering::Acquire);
            if pending == 0 {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                tracing::error!(pending, "shutdown timed out");
                return Err(StoreError::ShutdownTimeout(pending));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Spawn one top-level effect as a tracked task.
    fn spawn_effect(&self, effect: Effect<A>, pending: Arc<AtomicUsize>, notifier: watch::Sender<()>) {
        let tracking = TrackingGuard::new(pending, notifier);
        self.inner.pending_effects.fetch_add(1, Ordering::SeqCst);
        let in_flight = PendingGuard(Arc::clone(&self.inner.pending_effects));
        let store = self.clone();

        metrics::counter!("store.effects.spawned").increment(1);
        tokio::spawn(async move {
            let _tracking = tracking;
            let _in_flight = in_flight;
            run_effect(store, effect).await;
        });
    }

    /// Dispatch an effect-produced action: broadcast it to observers, then
    /// run it through the reducer. During shutdown feedback is dropped.
    async fn feedback(&self, action: A) {
        let _ = self.inner.action_broadcast.send(action.clone());

        if self.inner.shutdown.load(Ordering::Acquire) {
            tracing::debug!("dropping feedback action during shutdown");
            return;
        }

        let effects = {
            let mut state = self.inner.state.write().await;
            self.inner
                .reducer
                .reduce(&mut state, action, &self.inner.environment)
        };

        // Feedback effects run inline in the current effect task so that an
        // EffectHandle covers the full chain reachable without new spawns.
        for effect in effects {
            run_effect(self.clone(), effect).await;
        }
    }
}

/// Execute one effect description to completion.
fn run_effect<S, A, E, R>(
    store: Store<S, A, E, R>,
    effect: Effect<A>,
) -> Pin<Box<dyn Future<Output = ()> + Send>>
where
    R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
    A: Send + Clone + 'static,
    S: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    Box::pin(async move {
        match effect {
            Effect::None => {},
            Effect::Parallel(children) => {
                let tasks = children
                    .into_iter()
                    .map(|child| run_effect(store.clone(), child));
                futures::future::join_all(tasks).await;
            },
            Effect::Sequential(children) => {
                for child in children {
                    run_effect(store.clone(), child).await;
                }
            },
            Effect::Delay { duration, action } => {
                tokio::time::sleep(duration).await;
                store.feedback(*action).await;
            },
            Effect::Future(fut) => {
                if let Some(action) = fut.await {
                    store.feedback(action).await;
                }
            },
        }
        metrics::counter!("store.effects.completed").increment(1);
    })
}
