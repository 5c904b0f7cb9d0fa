//! Derived event streams
//!
//! A [`Subscribe`] is a recipe for attaching a handler to one or more
//! publishers, possibly through transformations. Nothing is buffered:
//! deriving a stream does not subscribe anything until `subscribe` is called.

use crate::dispatch::{Dispatcher, SerialQueue};
use crate::publisher::{Handler, Subscription};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

type Attach<T> = Arc<dyn Fn(Handler<T>) -> Subscription + Send + Sync>;

/// Subscribable view of an event stream
pub struct Subscribe<T> {
    label: Arc<str>,
    attach: Attach<T>,
}

impl<T> Clone for Subscribe<T> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            attach: Arc::clone(&self.attach),
        }
    }
}

impl<T> fmt::Debug for Subscribe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribe")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Subscribe<T> {
    pub(crate) fn from_attach<A>(label: Arc<str>, attach: A) -> Self
    where
        A: Fn(Handler<T>) -> Subscription + Send + Sync + 'static,
    {
        Self {
            label,
            attach: Arc::new(attach),
        }
    }

    /// Diagnostic label of the source
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Attach a handler
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        (self.attach)(Arc::new(handler))
    }

    /// Stream of transformed events
    #[must_use]
    pub fn map<U, F>(&self, transform: F) -> Subscribe<U>
    where
        U: 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        let attach = Arc::clone(&self.attach);
        let transform = Arc::new(transform);
        Subscribe::from_attach(Arc::clone(&self.label), move |handler: Handler<U>| {
            let transform = Arc::clone(&transform);
            attach(Arc::new(move |value: &T| handler(&transform(value))))
        })
    }

    /// Stream of events satisfying `predicate`
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Subscribe<T>
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let attach = Arc::clone(&self.attach);
        let predicate = Arc::new(predicate);
        Subscribe::from_attach(Arc::clone(&self.label), move |handler: Handler<T>| {
            let predicate = Arc::clone(&predicate);
            attach(Arc::new(move |value: &T| {
                if predicate(value) {
                    handler(value);
                }
            }))
        })
    }

    /// Stream of transformed events, dropping those mapped to `None`
    #[must_use]
    pub fn filter_map<U, F>(&self, transform: F) -> Subscribe<U>
    where
        U: 'static,
        F: Fn(&T) -> Option<U> + Send + Sync + 'static,
    {
        let attach = Arc::clone(&self.attach);
        let transform = Arc::new(transform);
        Subscribe::from_attach(Arc::clone(&self.label), move |handler: Handler<U>| {
            let transform = Arc::clone(&transform);
            attach(Arc::new(move |value: &T| {
                if let Some(mapped) = transform(value) {
                    handler(&mapped);
                }
            }))
        })
    }

    /// Stream carrying only the fact that an event happened
    #[must_use]
    pub fn void(&self) -> Subscribe<()> {
        self.map(|_| ())
    }

    /// Stream of events from both `self` and `other`
    #[must_use]
    pub fn merge(&self, other: &Subscribe<T>) -> Subscribe<T> {
        let first = Arc::clone(&self.attach);
        let second = Arc::clone(&other.attach);
        let label: Arc<str> = format!("{}|{}", self.label, other.label).into();
        Subscribe::from_attach(label, move |handler: Handler<T>| {
            first(Arc::clone(&handler)).and(second(handler))
        })
    }

    /// Deliver events on `queue` instead of the publishing context
    #[must_use]
    pub fn on(&self, queue: &SerialQueue) -> Subscribe<T>
    where
        T: Clone + Send,
    {
        let attach = Arc::clone(&self.attach);
        let queue = queue.clone();
        Subscribe::from_attach(Arc::clone(&self.label), move |handler: Handler<T>| {
            let queue = queue.clone();
            attach(Arc::new(move |value: &T| {
                let handler = Arc::clone(&handler);
                let value = value.clone();
                if let Err(err) = queue.dispatch(move || handler(&value)) {
                    tracing::warn!(error = %err, "dropping event for closed queue");
                }
            }))
        })
    }

    /// Deliver events `delay` after they were published
    #[must_use]
    pub fn delayed(&self, delay: Duration, dispatcher: &Dispatcher) -> Subscribe<T>
    where
        T: Clone + Send,
    {
        let attach = Arc::clone(&self.attach);
        let dispatcher = dispatcher.clone();
        Subscribe::from_attach(Arc::clone(&self.label), move |handler: Handler<T>| {
            let dispatcher = dispatcher.clone();
            attach(Arc::new(move |value: &T| {
                let handler = Arc::clone(&handler);
                let value = value.clone();
                dispatcher.spawn(async move {
                    tokio::time::sleep(delay).await;
                    handler(&value);
                });
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn collect<T: Clone + Send + 'static>(stream: &Subscribe<T>) -> Arc<Mutex<Vec<T>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        stream.subscribe(move |value: &T| sink.lock().push(value.clone()));
        seen
    }

    #[test]
    fn map_and_filter_compose() {
        let publisher = Publisher::<(u32, bool)>::new("changes");
        let present = publisher.proxy().filter(|(_, on)| *on).map(|(id, _)| *id);
        let seen = collect(&present);

        publisher.publish((1, true));
        publisher.publish((2, false));
        publisher.publish((3, true));
        assert_eq!(*seen.lock(), vec![1, 3]);
    }

    #[test]
    fn filter_map_drops_none() {
        let publisher = Publisher::<&'static str>::new("raw");
        let numbers = publisher.proxy().filter_map(|s| s.parse::<u8>().ok());
        let seen = collect(&numbers);
        publisher.publish("4");
        publisher.publish("four");
        assert_eq!(*seen.lock(), vec![4]);
    }

    #[test]
    fn merge_sees_both_sources_and_cancels_both() {
        let launch = Publisher::<()>::new("launch");
        let active = Publisher::<()>::new("active");
        let merged = launch.proxy().merge(&active.proxy());
        assert_eq!(merged.label(), "launch|active");

        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let subscription = merged.subscribe(move |()| *sink.lock() += 1);
        launch.publish(());
        active.publish(());
        assert_eq!(*count.lock(), 2);

        subscription.cancel();
        assert_eq!(launch.subscriber_count(), 0);
        assert_eq!(active.subscriber_count(), 0);
    }

    #[test]
    fn deriving_does_not_subscribe() {
        let publisher = Publisher::<u8>::new("lazy");
        let _derived = publisher.proxy().map(|n| n + 1).void();
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn on_queue_preserves_order() {
        let dispatcher = Dispatcher::current().unwrap();
        let queue = SerialQueue::spawn("main", &dispatcher);
        let publisher = Publisher::<u32>::new("ticks");
        let seen = collect(&publisher.proxy().on(&queue));

        for n in 0..50 {
            publisher.publish(n);
        }
        queue.flush().await.unwrap();
        assert_eq!(*seen.lock(), (0..50).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_waits_before_delivery() {
        let dispatcher = Dispatcher::current().unwrap();
        let publisher = Publisher::<u8>::new("active");
        let seen = collect(&publisher.proxy().delayed(Duration::from_millis(500), &dispatcher));

        publisher.publish(1);
        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(seen.lock().is_empty());
        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*seen.lock(), vec![1]);
    }
}
