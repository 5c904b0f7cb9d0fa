//! One-to-many event publisher
//!
//! Handlers run synchronously on the publishing context, in subscription
//! order. There is no buffering: a handler added after a `publish` never
//! observes that event.

use crate::subscribe::Subscribe;
use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

/// Shared event handler
pub(crate) type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Handlers<T> {
    next_id: u64,
    entries: Vec<(u64, Handler<T>)>,
}

impl<T> Handlers<T> {
    fn insert(&mut self, handler: Handler<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, handler));
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry, _)| *entry != id);
    }
}

/// Typed event source
///
/// Clones publish to the same set of handlers.
pub struct Publisher<T> {
    label: Arc<str>,
    handlers: Arc<RwLock<Handlers<T>>>,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            label: Arc::clone(&self.label),
            handlers: Arc::clone(&self.handlers),
        }
    }
}

impl<T> fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("label", &self.label)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl<T> Publisher<T> {
    /// Create publisher with a diagnostic label
    #[must_use]
    pub fn new(label: impl Into<Arc<str>>) -> Self {
        Self {
            label: label.into(),
            handlers: Arc::new(RwLock::new(Handlers {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Diagnostic label
    #[inline]
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().entries.len()
    }
}

impl<T: 'static> Publisher<T> {
    /// Invoke every current handler with `value`
    pub fn publish(&self, value: T) {
        // snapshot so handlers may subscribe or cancel while running
        let handlers: Vec<Handler<T>> = self
            .handlers
            .read()
            .entries
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        tracing::trace!(label = %self.label, subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler(&value);
        }
    }

    /// Add a handler
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.attach(Arc::new(handler))
    }

    /// Derived-stream view of this publisher
    #[must_use]
    pub fn proxy(&self) -> Subscribe<T> {
        let publisher = self.clone();
        Subscribe::from_attach(Arc::clone(&self.label), move |handler| {
            publisher.attach(handler)
        })
    }

    pub(crate) fn attach(&self, handler: Handler<T>) -> Subscription {
        let id = self.handlers.write().insert(handler);
        let weak: Weak<RwLock<Handlers<T>>> = Arc::downgrade(&self.handlers);
        Subscription::new(move || {
            if let Some(handlers) = weak.upgrade() {
                handlers.write().remove(id);
            }
        })
    }
}

/// Handle to a registered handler
///
/// Dropping the handle keeps the handler registered; call
/// [`cancel`](Self::cancel) to remove it.
pub struct Subscription {
    cancel: Box<dyn FnOnce() + Send + Sync>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Combine two subscriptions into one
    #[must_use]
    pub fn and(self, other: Subscription) -> Subscription {
        Subscription::new(move || {
            self.cancel();
            other.cancel();
        })
    }

    /// Remove the handler
    pub fn cancel(self) {
        (self.cancel)();
    }
}
