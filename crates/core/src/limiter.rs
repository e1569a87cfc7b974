//! Bounded-concurrency task queue.
//!
//! Gates expensive operations (page renders, page fetches) so that at most
//! `max` of them execute at once across every holder of the same limiter.
//! Waiting tasks start in FIFO order. Progress is driven only by task
//! completion or by raising the ceiling; nothing polls.
//!
//! Tasks are never started inside the `enqueue` call itself: the returned
//! future does nothing until it is awaited. Dropping a waiting future gives
//! its place back without blocking the rest of the queue.
//!
//! A ceiling of 0 is a caller precondition violation. It is not validated
//! here; `AppConfig::validate` rejects it.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

#[derive(Debug)]
struct State {
    running: usize,
    max: usize,
    waiters: VecDeque<oneshot::Sender<Slot>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand slots to queued waiters while there is room.
    ///
    /// Slots refused by waiters that went away are returned so the caller can
    /// drop them after releasing the lock.
    fn drain(self: &Arc<Self>, state: &mut State) -> Vec<Slot> {
        let mut refused = Vec::new();
        while state.running < state.max {
            let Some(waiter) = state.waiters.pop_front() else {
                break;
            };
            state.running += 1;
            if let Err(slot) = waiter.send(Slot { shared: Arc::clone(self) }) {
                refused.push(slot);
            }
        }
        refused
    }

    fn release(self: &Arc<Self>) {
        let refused = {
            let mut state = self.lock();
            state.running = state.running.saturating_sub(1);
            self.drain(&mut state)
        };
        drop(refused);
    }
}

/// Permission to run one task. Dropping it frees the slot.
#[derive(Debug)]
struct Slot {
    shared: Arc<Shared>,
}

impl Drop for Slot {
    fn drop(&mut self) {
        self.shared.release();
    }
}

/// FIFO task limiter shared by cloning.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    shared: Arc<Shared>,
}

impl ConcurrencyLimiter {
    /// Create a limiter allowing `max` concurrently executing tasks.
    ///
    /// `max` must be at least 1.
    pub fn new(max: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State { running: 0, max, waiters: VecDeque::new() }),
            }),
        }
    }

    /// Run `task` once a slot is free and resolve with its output.
    ///
    /// The task's outcome, including an `Err`, belongs only to this caller;
    /// it never affects queued siblings.
    pub async fn enqueue<F, Fut, T>(&self, task: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _slot = self.acquire().await;
        task().await
    }

    /// Change the ceiling.
    ///
    /// Raising it starts queued tasks immediately. Lowering it never aborts
    /// running tasks; it only delays future starts.
    pub fn set_max_concurrency(&self, max: usize) {
        let refused = {
            let mut state = self.shared.lock();
            state.max = max;
            self.shared.drain(&mut state)
        };
        drop(refused);
    }

    pub fn max_concurrency(&self) -> usize {
        self.shared.lock().max
    }

    /// Number of tasks currently executing.
    pub fn running(&self) -> usize {
        self.shared.lock().running
    }

    /// Number of tasks waiting for a slot.
    pub fn queued(&self) -> usize {
        self.shared.lock().waiters.iter().filter(|w| !w.is_closed()).count()
    }

    async fn acquire(&self) -> Slot {
        loop {
            let receiver = {
                let mut state = self.shared.lock();
                if state.running < state.max && state.waiters.is_empty() {
                    state.running += 1;
                    return Slot { shared: Arc::clone(&self.shared) };
                }
                let (sender, receiver) = oneshot::channel();
                state.waiters.push_back(sender);
                receiver
            };

            // A sender is only dropped unsent if the waiter queue itself is
            // torn down, which cannot happen while we hold the limiter.
            if let Ok(slot) = receiver.await {
                return slot;
            }
        }
    }
}
