//! Single-flight token refresh
//!
//! The first request that needs a new access token runs the refresh; every
//! request that arrives while it is running waits for the same outcome.

use super::error::RefreshFailure;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

/// New access token, or why there is none
pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    refreshing: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Run `refresh` unless one is already in flight, in which case wait for it
    pub async fn refreshed_token<F, Fut>(&self, refresh: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome>,
    {
        let queued = {
            let mut state = self.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push(tx);
                debug!(waiting = state.waiters.len(), "Queued behind in-flight refresh");
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        if let Some(rx) = queued {
            return rx.await.unwrap_or(Err(RefreshFailure::Cancelled));
        }

        let in_flight = InFlight {
            coordinator: self,
            settled: false,
        };
        let outcome = refresh().await;
        in_flight.settle(outcome.clone());
        outcome
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().refreshing
    }

    /// Requests currently queued behind the in-flight refresh
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.lock();
            state.refreshing = false;
            std::mem::take(&mut state.waiters)
        };
        for waiter in waiters {
            // Receiver gone means that request was dropped
            let _ = waiter.send(outcome.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the coordinator even if the refreshing future is dropped midway
struct InFlight<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(&outcome);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.coordinator.settle(&Err(RefreshFailure::Cancelled));
        }
    }
}
