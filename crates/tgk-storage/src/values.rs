//! Value transforms
//!
//! [`MapValues`] converts values independently on the read path and the write
//! path. A direction left [`Unmapped`] is simply not implemented, so a
//! read-only transform never needs a write-side function.
//! [`Defaulting`] substitutes a value for `NotFound` and nothing else.

use crate::error::Result;
use crate::storage::{NamedStorage, ReadableStorage, StorageKey, StorageValue, WritableStorage};
use async_trait::async_trait;
use std::marker::PhantomData;

/// Placeholder for a value direction with no transform
#[derive(Debug, Clone, Copy, Default)]
pub struct Unmapped;

/// Storage with converted values
///
/// `V` is the value type of the wrapped storage.
pub struct MapValues<S, In, Out, V> {
    inner: S,
    transform_in: In,
    transform_out: Out,
    _inner_value: PhantomData<fn() -> V>,
}

impl<S, In, Out, V> MapValues<S, In, Out, V> {
    pub(crate) fn new(inner: S, transform_in: In, transform_out: Out) -> Self {
        Self {
            inner,
            transform_in,
            transform_out,
            _inner_value: PhantomData,
        }
    }
}

impl<S: Clone, In: Clone, Out: Clone, V> Clone for MapValues<S, In, Out, V> {
    fn clone(&self) -> Self {
        Self::new(
            self.inner.clone(),
            self.transform_in.clone(),
            self.transform_out.clone(),
        )
    }
}

impl<S: std::fmt::Debug, In, Out, V> std::fmt::Debug for MapValues<S, In, Out, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapValues")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

impl<S, In, Out, V> NamedStorage for MapValues<S, In, Out, V>
where
    S: NamedStorage,
    In: Send + Sync,
    Out: Send + Sync,
{
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, In, Out, K, V1, V2> ReadableStorage<K, V1> for MapValues<S, In, Out, V2>
where
    S: ReadableStorage<K, V2>,
    In: Fn(V2) -> Result<V1> + Send + Sync,
    Out: Send + Sync,
    K: StorageKey,
    V1: StorageValue,
    V2: StorageValue,
{
    async fn retrieve(&self, key: K) -> Result<V1> {
        let raw = self.inner.retrieve(key).await?;
        (self.transform_in)(raw)
    }
}

#[async_trait]
impl<S, In, Out, K, V1, V2> WritableStorage<K, V1> for MapValues<S, In, Out, V2>
where
    S: WritableStorage<K, V2>,
    In: Send + Sync,
    Out: Fn(V1) -> Result<V2> + Send + Sync,
    K: StorageKey,
    V1: StorageValue,
    V2: StorageValue,
{
    async fn set(&self, value: V1, key: K) -> Result<()> {
        let raw = (self.transform_out)(value)?;
        self.inner.set(raw, key).await
    }
}

/// Storage yielding a default value while the medium is empty
#[derive(Debug, Clone)]
pub struct Defaulting<S, V> {
    inner: S,
    default: V,
}

impl<S, V> Defaulting<S, V> {
    pub(crate) fn new(inner: S, default: V) -> Self {
        Self { inner, default }
    }
}

impl<S: NamedStorage, V: Send + Sync> NamedStorage for Defaulting<S, V> {
    fn storage_name(&self) -> &str {
        self.inner.storage_name()
    }
}

#[async_trait]
impl<S, K, V> ReadableStorage<K, V> for Defaulting<S, V>
where
    S: ReadableStorage<K, V>,
    K: StorageKey,
    V: StorageValue + Clone + Sync,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        match self.inner.retrieve(key).await {
            Err(err) if err.is_not_found() => {
                tracing::trace!(storage = %self.storage_name(), "substituting default for missing value");
                Ok(self.default.clone())
            }
            other => other,
        }
    }
}

#[async_trait]
impl<S, K, V> WritableStorage<K, V> for Defaulting<S, V>
where
    S: WritableStorage<K, V>,
    K: StorageKey,
    V: StorageValue + Sync,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        self.inner.set(value, key).await
    }
}
