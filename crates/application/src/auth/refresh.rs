//! Single-flight refresh coordination.
//!
//! The first request to hit a 401 becomes the *leader* and runs the
//! refresh. Requests failing while the leader is busy become *followers*:
//! they park on a oneshot channel and are woken, in arrival order, with
//! the leader's outcome.

use std::mem;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::RefreshFailure;

/// Outcome of one refresh cycle: the new access token, or why there is none.
pub type RefreshOutcome = Result<String, RefreshFailure>;

#[derive(Debug, Default)]
struct RefreshGate {
    in_progress: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Owns the refresh-in-progress flag and the queue of parked requests.
///
/// The lock is only held for flag and queue updates, never across an
/// await.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    gate: Mutex<RefreshGate>,
}

/// Role handed to a request that needs a refreshed token.
#[derive(Debug)]
pub enum RefreshTicket<'a> {
    /// This request must run the refresh and then settle the cycle.
    Leader(LeaderGuard<'a>),
    /// Another request is refreshing; await its outcome.
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins the current refresh cycle, starting one if none is running.
    pub fn join(&self) -> RefreshTicket<'_> {
        let mut gate = self.gate.lock();
        if gate.in_progress {
            let (tx, rx) = oneshot::channel();
            gate.waiters.push(tx);
            RefreshTicket::Follower(rx)
        } else {
            gate.in_progress = true;
            RefreshTicket::Leader(LeaderGuard {
                coordinator: self,
                settled: false,
            })
        }
    }

    /// Returns true while a refresh cycle is running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.gate.lock().in_progress
    }

    /// Number of requests parked behind the running refresh.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.gate.lock().waiters.len()
    }

    /// Clears the flag and takes the queue in one step, so a request
    /// failing right after the drain starts a fresh cycle instead of
    /// parking on a queue nobody will drain.
    fn finish(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut gate = self.gate.lock();
            gate.in_progress = false;
            mem::take(&mut gate.waiters)
        };

        for waiter in waiters {
            // A follower whose caller gave up has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Proof of leadership for one refresh cycle.
///
/// Dropping the guard without calling [`LeaderGuard::settle`] (for example
/// when the leading request's future is cancelled) wakes every follower
/// with [`RefreshFailure::Abandoned`] and releases the flag.
#[derive(Debug)]
pub struct LeaderGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl LeaderGuard<'_> {
    /// Ends the cycle, waking followers in arrival order with `outcome`.
    pub fn settle(mut self, outcome: &RefreshOutcome) {
        self.coordinator.finish(outcome);
        self.settled = true;
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("token refresh dropped before settling; releasing queued requests");
            self.coordinator.finish(&Err(RefreshFailure::Abandoned));
        }
    }
}
