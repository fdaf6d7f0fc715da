//! Single-Flight Guard
//!
//! Coalesces concurrent callers onto one in-progress computation. The first caller
//! (the leader) runs it; callers arriving while it runs wait for and share the
//! leader's result. Once the result is delivered the next caller starts a fresh
//! computation.
//!
//! If the leader's future is dropped before finishing (for example because the
//! HTTP client disconnected), the waiting callers see the channel close and race
//! to become the next leader.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

pub struct SingleFlight<T> {
    slot: Mutex<Option<broadcast::Sender<T>>>,
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// True while a leader is computing
    pub fn in_flight(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Run `f`, or join the computation already in flight.
    pub async fn run<F, Fut>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        loop {
            let follower = {
                let mut slot = lock(&self.slot);
                match slot.as_ref() {
                    Some(sender) => Some(sender.subscribe()),
                    None => {
                        let (sender, _) = broadcast::channel(1);
                        *slot = Some(sender);
                        None
                    }
                }
            };

            let Some(mut receiver) = follower else {
                return self.lead(f).await;
            };

            match receiver.recv().await {
                Ok(value) => return value,
                // Leader was cancelled
                Err(_) => continue,
            }
        }
    }

    async fn lead<F, Fut>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = FlightGuard { slot: &self.slot };
        let value = f().await;

        if let Some(sender) = lock(&self.slot).take() {
            // No receivers is fine
            let _ = sender.send(value.clone());
        }
        value
    }
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the slot when the leader stops, whether it finished or was dropped.
struct FlightGuard<'a, T> {
    slot: &'a Mutex<Option<broadcast::Sender<T>>>,
}

impl<T> Drop for FlightGuard<'_, T> {
    fn drop(&mut self) {
        lock(self.slot).take();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
