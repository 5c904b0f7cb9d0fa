//! Layered storages
//!
//! Both layerings consult the front layer first and fall through only when
//! it reports `NotFound`. A value found in the back layer is written into the
//! front layer before it is returned.
//!
//! - [`Combined`]: read-through and write-through (back first, front on success)
//! - [`BackedBy`]: read-through only
//!
//! There is no expiry: once the front layer holds a value, the back layer is
//! not consulted for that key again.

use crate::error::Result;
use crate::storage::{NamedStorage, ReadableStorage, Storage, StorageKey, StorageValue, WritableStorage};
use async_trait::async_trait;

async fn read_through<F, B, K, V>(front: &F, back: &B, name: &str, key: K) -> Result<V>
where
    F: Storage<K, V> + ?Sized,
    B: ReadableStorage<K, V> + ?Sized,
    K: StorageKey,
    V: StorageValue + Clone,
{
    match front.retrieve(key.clone()).await {
        Err(err) if err.is_not_found() => {}
        found => return found,
    }

    tracing::trace!(storage = %name, ?key, "front layer miss, reading back layer");
    let value = back.retrieve(key.clone()).await?;
    if let Err(err) = front.set(value.clone(), key).await {
        tracing::warn!(
            storage = %name,
            front = %front.storage_name(),
            error = %err,
            "failed to populate front layer"
        );
    }
    Ok(value)
}

/// Front layer combined with a back layer, for both reads and writes
#[derive(Debug, Clone)]
pub struct Combined<F, B> {
    front: F,
    back: B,
    name: String,
}

impl<F: NamedStorage, B: NamedStorage> Combined<F, B> {
    pub(crate) fn new(front: F, back: B) -> Self {
        let name = format!("{}+{}", front.storage_name(), back.storage_name());
        Self { front, back, name }
    }

    /// The front layer
    #[inline]
    pub fn front(&self) -> &F {
        &self.front
    }

    /// The back layer
    #[inline]
    pub fn back(&self) -> &B {
        &self.back
    }
}

impl<F: NamedStorage, B: NamedStorage> NamedStorage for Combined<F, B> {
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<F, B, K, V> ReadableStorage<K, V> for Combined<F, B>
where
    F: Storage<K, V>,
    B: ReadableStorage<K, V>,
    K: StorageKey,
    V: StorageValue + Clone,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        read_through(&self.front, &self.back, &self.name, key).await
    }
}

#[async_trait]
impl<F, B, K, V> WritableStorage<K, V> for Combined<F, B>
where
    F: WritableStorage<K, V>,
    B: WritableStorage<K, V>,
    K: StorageKey,
    V: StorageValue + Clone,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        self.back.set(value.clone(), key.clone()).await?;
        self.front.set(value, key).await
    }
}

/// Read-only storage falling back to a secondary source on `NotFound`
#[derive(Debug, Clone)]
pub struct BackedBy<P, S> {
    primary: P,
    secondary: S,
    name: String,
}

impl<P: NamedStorage, S: NamedStorage> BackedBy<P, S> {
    pub(crate) fn new(primary: P, secondary: S) -> Self {
        let name = format!("{}<-{}", primary.storage_name(), secondary.storage_name());
        Self {
            primary,
            secondary,
            name,
        }
    }
}

impl<P: NamedStorage, S: NamedStorage> NamedStorage for BackedBy<P, S> {
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<P, S, K, V> ReadableStorage<K, V> for BackedBy<P, S>
where
    P: Storage<K, V>,
    S: ReadableStorage<K, V>,
    K: StorageKey,
    V: StorageValue + Clone,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        read_through(&self.primary, &self.secondary, &self.name, key).await
    }
}
