//! Key projections
//!
//! - [`MapKeys`]: total key transform
//! - [`TryMapKeys`]: partial key transform, rejected keys fail with `KeyMapping`
//! - [`SingleKey`]: binds a keyed storage to one fixed key

use crate::error::{Result, StorageError};
use crate::storage::{NamedStorage, ReadableStorage, StorageKey, StorageValue, WritableStorage};
use async_trait::async_trait;

/// Storage whose keys are transformed before delegating
#[derive(Debug, Clone)]
pub struct MapKeys<S, F> {
    inner: S,
    transform: F,
}

impl<S, F> MapKeys<S, F> {
    pub(crate) fn new(inner: S, transform: F) -> Self {
        Self { inner, transform }
    }
}

impl<S: NamedStorage, F: Send + Sync> NamedStorage for MapKeys<S, F> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, F, K1, K2, V> ReadableStorage<K1, V> for MapKeys<S, F>
where
    S: ReadableStorage<K2, V>,
    F: Fn(K1) -> K2 + Send + Sync,
    K1: StorageKey,
    K2: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, key: K1) -> Result<V> {
        self.inner.retrieve((self.transform)(key)).await
    }
}

#[async_trait]
impl<S, F, K1, K2, V> WritableStorage<K1, V> for MapKeys<S, F>
where
    S: WritableStorage<K2, V>,
    F: Fn(K1) -> K2 + Send + Sync,
    K1: StorageKey,
    K2: StorageKey,
    V: StorageValue,
{
    async fn set(&self, value: V, key: K1) -> Result<()> {
        self.inner.set(value, (self.transform)(key)).await
    }
}

/// Storage whose keys are projected by a partial function
#[derive(Debug, Clone)]
pub struct TryMapKeys<S, F> {
    inner: S,
    transform: F,
}

impl<S, F> TryMapKeys<S, F> {
    pub(crate) fn new(inner: S, transform: F) -> Self {
        Self { inner, transform }
    }
}

impl<S: NamedStorage, F: Send + Sync> NamedStorage for TryMapKeys<S, F> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

impl<S, F> TryMapKeys<S, F> {
    fn project<K1, K2>(&self, key: K1) -> Result<K2>
    where
        F: Fn(K1) -> Option<K2>,
        K1: StorageKey,
    {
        let rendered = format!("{key:?}");
        (self.transform)(key).ok_or(StorageError::KeyMapping(rendered))
    }
}

#[async_trait]
impl<S, F, K1, K2, V> ReadableStorage<K1, V> for TryMapKeys<S, F>
where
    S: ReadableStorage<K2, V>,
    F: Fn(K1) -> Option<K2> + Send + Sync,
    K1: StorageKey,
    K2: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, key: K1) -> Result<V> {
        let key = self.project(key)?;
        self.inner.retrieve(key).await
    }
}

#[async_trait]
impl<S, F, K1, K2, V> WritableStorage<K1, V> for TryMapKeys<S, F>
where
    S: WritableStorage<K2, V>,
    F: Fn(K1) -> Option<K2> + Send + Sync,
    K1: StorageKey,
    K2: StorageKey,
    V: StorageValue,
{
    async fn set(&self, value: V, key: K1) -> Result<()> {
        let key = self.project(key)?;
        self.inner.set(value, key).await
    }
}

/// Unit-key storage bound to one key of a keyed storage
#[derive(Debug, Clone)]
pub struct SingleKey<S, K> {
    inner: S,
    key: K,
}

impl<S, K> SingleKey<S, K> {
    pub(crate) fn new(inner: S, key: K) -> Self {
        Self { inner, key }
    }

    /// The bound key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<S: NamedStorage, K: Send + Sync> NamedStorage for SingleKey<S, K> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, K, V> ReadableStorage<(), V> for SingleKey<S, K>
where
    S: ReadableStorage<K, V>,
    K: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, (): ()) -> Result<V> {
        self.inner.retrieve(self.key.clone()).await
    }
}

#[async_trait]
impl<S, K, V> WritableStorage<(), V> for SingleKey<S, K>
where
    S: WritableStorage<K, V>,
    K: StorageKey,
    V: StorageValue,
{
    async fn set(&self, value: V, (): ()) -> Result<()> {
        self.inner.set(value, self.key.clone()).await
    }
}
