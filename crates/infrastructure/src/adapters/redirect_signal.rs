//! Navigator that publishes redirects to subscribers.
//!
//! Front ends without a router (the CLI, background workers) subscribe to
//! the signal and react to the latest redirect.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tally_application::ports::Navigator;
use tokio::sync::watch;

/// Publishes the latest redirect over a `tokio::sync::watch` channel.
#[derive(Debug, Clone)]
pub struct RedirectSignal {
    sender: Arc<watch::Sender<Option<String>>>,
    count: Arc<AtomicUsize>,
}

impl RedirectSignal {
    /// Creates a signal with no redirect recorded.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            sender: Arc::new(sender),
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Subscribes to redirects. The receiver starts at the latest value.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<String>> {
        self.sender.subscribe()
    }

    /// The most recent redirect target, if any.
    #[must_use]
    pub fn last_route(&self) -> Option<String> {
        self.sender.borrow().clone()
    }

    /// How many redirects have been issued.
    #[must_use]
    pub fn redirect_count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

impl Default for RedirectSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for RedirectSignal {
    fn redirect(&self, route: &str) {
        self.count.fetch_add(1, Ordering::SeqCst);
        tracing::info!(route, "redirecting");
        self.sender.send_replace(Some(route.to_string()));
    }
}
