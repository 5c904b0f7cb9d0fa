//! Observing storages
//!
//! - [`OnCompletingWrite`] reports every finished write to a handler
//! - [`TrackingActivity`] keeps an [`ActivityIndicator`] raised while an
//!   operation is in flight

use crate::error::Result;
use crate::storage::{NamedStorage, ReadableStorage, StorageKey, StorageValue, WritableStorage};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Storage calling a handler with the value and outcome of every write
///
/// The handler runs after the write finishes and before its result is
/// returned to the caller.
#[derive(Clone)]
pub struct OnCompletingWrite<S, H> {
    inner: S,
    handler: H,
}

impl<S, H> OnCompletingWrite<S, H> {
    pub(crate) fn new(inner: S, handler: H) -> Self {
        Self { inner, handler }
    }
}

impl<S: std::fmt::Debug, H> std::fmt::Debug for OnCompletingWrite<S, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnCompletingWrite")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: NamedStorage, H: Send + Sync> NamedStorage for OnCompletingWrite<S, H> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, H, K, V> ReadableStorage<K, V> for OnCompletingWrite<S, H>
where
    S: ReadableStorage<K, V>,
    H: Send + Sync,
    K: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        self.inner.retrieve(key).await
    }
}

#[async_trait]
impl<S, H, K, V> WritableStorage<K, V> for OnCompletingWrite<S, H>
where
    S: WritableStorage<K, V>,
    H: Fn(&V, &Result<()>) + Send + Sync,
    K: StorageKey,
    V: StorageValue + Clone,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        let result = self.inner.set(value.clone(), key).await;
        (self.handler)(&value, &result);
        result
    }
}

/// Receiver of operation start and end signals
pub trait ActivityIndicator: Send + Sync {
    /// An operation started
    fn increment(&self);
    /// An operation finished
    fn decrement(&self);
}

/// Counting [`ActivityIndicator`]
#[derive(Debug, Default)]
pub struct ActivityCounter {
    active: AtomicUsize,
}

impl ActivityCounter {
    /// Create counter at zero
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations currently in flight
    #[inline]
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Whether any operation is in flight
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active() > 0
    }
}

impl ActivityIndicator for ActivityCounter {
    fn increment(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    fn decrement(&self) {
        // saturate so an unbalanced decrement never wraps
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }
}

/// Lowers the indicator when dropped, including on cancellation
struct ActivityGuard<'a>(&'a dyn ActivityIndicator);

impl<'a> ActivityGuard<'a> {
    fn raise(indicator: &'a dyn ActivityIndicator) -> Self {
        indicator.increment();
        Self(indicator)
    }
}

impl Drop for ActivityGuard<'_> {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Storage raising an activity indicator around every operation
#[derive(Clone)]
pub struct TrackingActivity<S> {
    inner: S,
    indicator: Arc<dyn ActivityIndicator>,
}

impl<S> TrackingActivity<S> {
    pub(crate) fn new(inner: S, indicator: Arc<dyn ActivityIndicator>) -> Self {
        Self { inner, indicator }
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for TrackingActivity<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingActivity")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S: NamedStorage> NamedStorage for TrackingActivity<S> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, K, V> ReadableStorage<K, V> for TrackingActivity<S>
where
    S: ReadableStorage<K, V>,
    K: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        let _guard = ActivityGuard::raise(&*self.indicator);
        self.inner.retrieve(key).await
    }
}

#[async_trait]
impl<S, K, V> WritableStorage<K, V> for TrackingActivity<S>
where
    S: WritableStorage<K, V>,
    K: StorageKey,
    V: StorageValue,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        let _guard = ActivityGuard::raise(&*self.indicator);
        self.inner.set(value, key).await
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[tokio::test]
    async fn handler_sees_every_write_outcome() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let storage = MemoryStorage::<(), i64>::new().on_completing_write(
            move |value: &i64, result: &Result<()>| sink.lock().push((*value, result.is_ok())),
        );
        storage.set(1, ()).await.unwrap();
        storage.set(2, ()).await.unwrap();
        assert_eq!(*seen.lock(), vec![(1, true), (2, true)]);

        let failing = DevStorage::<i64>::failing(sorry_pal());
        let sink = Arc::clone(&seen);
        let failing = failing
            .on_completing_write(move |value: &i64, result: &Result<()>| {
                sink.lock().push((*value, result.is_ok()));
            });
        assert!(failing.set(3, ()).await.is_err());
        assert_eq!(seen.lock().last(), Some(&(3, false)));
    }

    #[tokio::test]
    async fn indicator_balanced_after_success_and_failure() {
        let counter = Arc::new(ActivityCounter::new());
        let ok = DevStorage::successing(1_u8).tracking_activity(counter.clone());
        let bad = DevStorage::<u8>::failing(sorry_pal()).tracking_activity(counter.clone());

        ok.retrieve(()).await.unwrap();
        bad.retrieve(()).await.unwrap_err();
        bad.set(2, ()).await.unwrap_err();
        assert_eq!(counter.active(), 0);
    }

    #[tokio::test]
    async fn indicator_raised_while_in_flight() {
        let counter = Arc::new(ActivityCounter::new());
        let gate = Arc::new(tokio::sync::Notify::new());
        let storage = Gated {
            gate: Arc::clone(&gate),
        }
        .tracking_activity(counter.clone());

        let pending = tokio::spawn(async move { storage.retrieve(()).await });
        while !counter.is_active() {
            tokio::task::yield_now().await;
        }
        gate.notify_one();
        assert_eq!(pending.await.unwrap().unwrap(), 5);
        assert_eq!(counter.active(), 0);
    }

    #[test]
    fn decrement_saturates() {
        let counter = ActivityCounter::new();
        counter.decrement();
        assert_eq!(counter.active(), 0);
    }

    struct Gated {
        gate: Arc<tokio::sync::Notify>,
    }

    impl NamedStorage for Gated {
        fn storage_name(&self) -> &str {
            "gated"
        }
    }

    #[async_trait::async_trait]
    impl ReadableStorage<(), u8> for Gated {
        async fn retrieve(&self, (): ()) -> Result<u8> {
            self.gate.notified().await;
            Ok(5)
        }
    }
}
