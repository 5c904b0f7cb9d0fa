//! Combinator methods available on every storage
//!
//! Each combinator consumes the storage and returns a new wrapping storage.
//! Wrap in `Arc` or clone first to keep the original addressable.

use crate::error::Result;
use crate::keys::{MapKeys, SingleKey, TryMapKeys};
use crate::layered::{BackedBy, Combined};
use crate::memory::MemoryStorage;
use crate::observe::{ActivityIndicator, OnCompletingWrite, TrackingActivity};
use crate::storage::{
    NamedStorage, ReadOnlyStorage, ReadableStorage, SharedStorage, Storage, StorageKey,
    StorageValue, WritableStorage, WriteOnlyStorage,
};
use crate::values::{Defaulting, MapValues, Unmapped};
use std::hash::Hash;
use std::sync::Arc;

/// Storage combinators
pub trait StorageExt: NamedStorage + Sized {
    /// Transform keys before delegating
    #[inline]
    fn map_keys<K1, K2, F>(self, transform: F) -> MapKeys<Self, F>
    where
        F: Fn(K1) -> K2 + Send + Sync,
    {
        MapKeys::new(self, transform)
    }

    /// Transform keys with a partial function
    ///
    /// Keys for which `transform` returns `None` fail with `KeyMapping`.
    #[inline]
    fn try_map_keys<K1, K2, F>(self, transform: F) -> TryMapKeys<Self, F>
    where
        F: Fn(K1) -> Option<K2> + Send + Sync,
    {
        TryMapKeys::new(self, transform)
    }

    /// Transform values on the read path and the write path
    #[inline]
    fn map_values<V1, V2, In, Out>(
        self,
        transform_in: In,
        transform_out: Out,
    ) -> MapValues<Self, In, Out, V2>
    where
        In: Fn(V2) -> Result<V1> + Send + Sync,
        Out: Fn(V1) -> Result<V2> + Send + Sync,
    {
        MapValues::new(self, transform_in, transform_out)
    }

    /// Transform values on the read path only
    #[inline]
    fn map_retrieved<V1, V2, In>(self, transform_in: In) -> MapValues<Self, In, Unmapped, V2>
    where
        In: Fn(V2) -> Result<V1> + Send + Sync,
    {
        MapValues::new(self, transform_in, Unmapped)
    }

    /// Transform values on the write path only
    #[inline]
    fn map_written<V1, V2, Out>(self, transform_out: Out) -> MapValues<Self, Unmapped, Out, V2>
    where
        Out: Fn(V1) -> Result<V2> + Send + Sync,
    {
        MapValues::new(self, Unmapped, transform_out)
    }

    /// Bind the storage to one key
    #[inline]
    fn single_key<K>(self, key: K) -> SingleKey<Self, K> {
        SingleKey::new(self, key)
    }

    /// Substitute `default` when the medium has no value
    ///
    /// Only `NotFound` is masked. Every other error is forwarded.
    #[inline]
    fn defaulting<V>(self, default: V) -> Defaulting<Self, V> {
        Defaulting::new(self, default)
    }

    /// Layer `self` in front of `back`
    ///
    /// Reads fall through to `back` on `NotFound` and populate `self`.
    /// Writes go to `back` first and reach `self` only on success.
    #[inline]
    fn combined<B: NamedStorage>(self, back: B) -> Combined<Self, B> {
        Combined::new(self, back)
    }

    /// Layer an in-memory storage in front of `self`
    #[inline]
    fn memory_cached<K, V>(self) -> Combined<MemoryStorage<K, V>, Self>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        MemoryStorage::new().combined(self)
    }

    /// Layer a bounded in-memory storage in front of `self`
    #[inline]
    fn memory_cached_with_capacity<K, V>(
        self,
        max_capacity: u64,
    ) -> Combined<MemoryStorage<K, V>, Self>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        MemoryStorage::with_capacity(max_capacity).combined(self)
    }

    /// Read from `self`, falling back to `secondary` on `NotFound`
    ///
    /// Values read from `secondary` are persisted into `self`. The result
    /// is read-only.
    #[inline]
    fn backed_by<S2: NamedStorage>(self, secondary: S2) -> BackedBy<Self, S2> {
        BackedBy::new(self, secondary)
    }

    /// Report every completed write to `handler`
    #[inline]
    fn on_completing_write<H>(self, handler: H) -> OnCompletingWrite<Self, H>
    where
        H: Send + Sync,
    {
        OnCompletingWrite::new(self, handler)
    }

    /// Raise `indicator` around every operation
    #[inline]
    fn tracking_activity(self, indicator: Arc<dyn ActivityIndicator>) -> TrackingActivity<Self> {
        TrackingActivity::new(self, indicator)
    }

    /// Erase to a read-only capability
    #[inline]
    fn read_only<K, V>(self) -> ReadOnlyStorage<K, V>
    where
        Self: ReadableStorage<K, V> + 'static,
        K: StorageKey,
        V: StorageValue,
    {
        Arc::new(self)
    }

    /// Erase to a write-only capability
    #[inline]
    fn write_only<K, V>(self) -> WriteOnlyStorage<K, V>
    where
        Self: WritableStorage<K, V> + 'static,
        K: StorageKey,
        V: StorageValue,
    {
        Arc::new(self)
    }

    /// Erase to a shared read/write capability
    #[inline]
    fn shared<K, V>(self) -> SharedStorage<K, V>
    where
        Self: Storage<K, V> + 'static,
        K: StorageKey,
        V: StorageValue,
    {
        Arc::new(self)
    }
}

impl<S: NamedStorage> StorageExt for S {}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[tokio::test]
    async fn erased_views_share_the_medium() {
        let memory = MemoryStorage::<u8, u8>::new();
        let writer: WriteOnlyStorage<u8, u8> = memory.clone().write_only();
        let reader: ReadOnlyStorage<u8, u8> = memory.clone().read_only();

        writer.set(4, 1).await.unwrap();
        assert_eq!(reader.retrieve(1).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn shared_storage_still_composes() {
        let shared: SharedStorage<u8, u8> = MemoryStorage::new().shared();
        let view: Retrieve<u8> = shared.clone().single_key(3).read_only();
        shared.set(8, 3).await.unwrap();
        assert_eq!(view.retrieve(()).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn concurrent_reads_pair_with_their_calls() {
        let storage: Combined<MemoryStorage<u32, u32>, _> =
            MemoryStorage::<u32, u32>::new().memory_cached();
        for n in 0..16 {
            storage.back().set(n * 10, n).await.unwrap();
        }
        let reads = (0..16).map(|n| {
            let storage = &storage;
            async move { (n, storage.retrieve(n).await.unwrap()) }
        });
        for (key, value) in futures::future::join_all(reads).await {
            assert_eq!(value, key * 10);
        }
    }
}
