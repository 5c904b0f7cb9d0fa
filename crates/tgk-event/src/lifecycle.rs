//! Process lifecycle events
//!
//! Created once at startup and passed to every component that reacts to the
//! application launching or becoming active.

use crate::dispatch::{Dispatcher, SerialQueue};
use crate::publisher::Publisher;
use crate::subscribe::Subscribe;
use std::time::Duration;

/// Lifecycle event bus
#[derive(Debug, Clone)]
pub struct Lifecycle {
    did_launch: Publisher<()>,
    did_become_active: Publisher<()>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    /// Create bus with no subscribers
    #[must_use]
    pub fn new() -> Self {
        Self {
            did_launch: Publisher::new("did-launch"),
            did_become_active: Publisher::new("did-become-active"),
        }
    }

    /// Fired once when the process has finished launching
    #[inline]
    #[must_use]
    pub fn did_launch(&self) -> &Publisher<()> {
        &self.did_launch
    }

    /// Fired every time the application becomes active
    #[inline]
    #[must_use]
    pub fn did_become_active(&self) -> &Publisher<()> {
        &self.did_become_active
    }

    /// Trigger for upload consistency checks: launch or activation
    #[must_use]
    pub fn should_check_upload_consistency(&self) -> Subscribe<()> {
        self.did_launch
            .proxy()
            .merge(&self.did_become_active.proxy())
    }

    /// Consistency trigger delayed by `delay` and delivered on `queue`
    #[must_use]
    pub fn should_check_upload_consistency_on(
        &self,
        delay: Duration,
        dispatcher: &Dispatcher,
        queue: &SerialQueue,
    ) -> Subscribe<()> {
        self.should_check_upload_consistency()
            .delayed(delay, dispatcher)
            .on(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn launch_and_activation_both_trigger_checks() {
        let lifecycle = Lifecycle::new();
        let checks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&checks);
        lifecycle
            .should_check_upload_consistency()
            .subscribe(move |()| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        lifecycle.did_launch().publish(());
        lifecycle.did_become_active().publish(());
        lifecycle.did_become_active().publish(());
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_trigger_lands_on_queue() {
        let dispatcher = Dispatcher::current().unwrap();
        let queue = SerialQueue::spawn("main", &dispatcher);
        let lifecycle = Lifecycle::new();
        let checks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&checks);
        lifecycle
            .should_check_upload_consistency_on(Duration::from_millis(500), &dispatcher, &queue)
            .subscribe(move |()| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        lifecycle.did_become_active().publish(());
        assert_eq!(checks.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        queue.flush().await.unwrap();
        assert_eq!(checks.load(Ordering::SeqCst), 1);
    }
}
