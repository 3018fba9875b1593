use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use crate::error::{AppError, AppResult};

pub type SharedFlight<T> = Shared<BoxFuture<'static, T>>;

struct InFlight<T: Clone> {
    generation: u64,
    future: SharedFlight<T>,
}

/// Outcome of asking a [`SingleFlight`] for a value.
pub enum Flight<T: Clone> {
    /// The caller's fast path produced a value without starting any work.
    Ready(T),
    /// Await this; every concurrent caller holds a clone of the same future.
    Pending(SharedFlight<T>),
}

impl<T: Clone> Flight<T> {
    pub async fn resolve(self) -> T {
        match self {
            Self::Ready(value) => value,
            Self::Pending(future) => future.await,
        }
    }
}

/// Slot that is either idle or holds the one operation currently running.
///
/// Callers arriving while an operation is pending attach to it instead of
/// starting their own. The slot returns to idle as soon as the operation
/// finishes, before any awaiting caller observes the result.
pub struct SingleFlight<T: Clone> {
    slot: Arc<Mutex<Option<InFlight<T>>>>,
    generation: AtomicU64,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn is_pending(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }
}

impl<T: Clone> std::fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the pending operation, else try `ready`, else start `start()`.
    ///
    /// `ready` runs while the slot is locked, so no operation can finish
    /// between the check and the decision to start a new one.
    pub fn join_or_start<R, S, F>(&self, ready: R, start: S) -> AppResult<Flight<T>>
    where
        R: FnOnce() -> Option<T>,
        S: FnOnce() -> F,
        F: Future<Output = T> + Send + 'static,
    {
        let mut slot = self.slot.lock().map_err(|e| {
            AppError::InternalError(format!("Single-flight slot poisoned: {e}"))
        })?;

        if let Some(in_flight) = slot.as_ref() {
            return Ok(Flight::Pending(in_flight.future.clone()));
        }
        if let Some(value) = ready() {
            return Ok(Flight::Ready(value));
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        // Weak so the pending future does not keep its own slot alive
        let slot_ref: Weak<Mutex<Option<InFlight<T>>>> = Arc::downgrade(&self.slot);
        let work = start();
        let future = async move {
            let output = work.await;
            if let Some(slot_ref) = slot_ref.upgrade()
                && let Ok(mut slot) = slot_ref.lock()
                && slot.as_ref().is_some_and(|f| f.generation == generation)
            {
                *slot = None;
            }
            output
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            generation,
            future: future.clone(),
        });
        Ok(Flight::Pending(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let flight = Arc::new(SingleFlight::<u32>::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let flight = Arc::clone(&flight);
            let runs = Arc::clone(&runs);
            handles.push(tokio::spawn(async move {
                flight
                    .join_or_start(
                        || None,
                        move || async move {
                            runs.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            7
                        },
                    )
                    .unwrap()
                    .resolve()
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!flight.is_pending());
    }

    #[tokio::test]
    async fn test_ready_value_skips_work() {
        let flight = SingleFlight::<u32>::new();
        let value = flight
            .join_or_start(|| Some(1), || async { 2 })
            .unwrap()
            .resolve()
            .await;
        assert_eq!(value, 1);
        assert!(!flight.is_pending());
    }

    #[tokio::test]
    async fn test_pending_future_does_not_own_slot() {
        let flight = SingleFlight::<u32>::new();
        let pending = flight
            .join_or_start(
                || None,
                || async {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    3
                },
            )
            .unwrap();
        assert!(flight.is_pending());
        assert_eq!(Arc::strong_count(&flight.slot), 1);

        // The flight can outlive the slot it was started from
        drop(flight);
        assert_eq!(pending.resolve().await, 3);
    }

    #[tokio::test]
    async fn test_new_run_after_completion() {
        let flight = SingleFlight::<u32>::new();
        let first = flight
            .join_or_start(|| None, || async { 1 })
            .unwrap()
            .resolve()
            .await;
        let second = flight
            .join_or_start(|| None, || async { 2 })
            .unwrap()
            .resolve()
            .await;
        assert_eq!((first, second), (1, 2));
    }
}
