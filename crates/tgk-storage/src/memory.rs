//! In-memory storage using moka
//!
//! Bounded by entry count, never by time. Clones share the same entries.

use crate::error::{Result, StorageError};
use crate::storage::{NamedStorage, ReadableStorage, StorageKey, WritableStorage};
use async_trait::async_trait;
use moka::future::Cache;
use std::hash::Hash;
use std::sync::Arc;

/// Default entry capacity of a memory layer
pub const DEFAULT_MEMORY_CAPACITY: u64 = 10_000;

/// Concurrent in-memory key-value storage
#[derive(Debug, Clone)]
pub struct MemoryStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    name: Arc<str>,
}

impl<K, V> Default for MemoryStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> MemoryStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Create storage with the default capacity
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }

    /// Create storage holding at most `max_capacity` entries
    #[inline]
    #[must_use]
    pub fn with_capacity(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
            name: Arc::from("memory"),
        }
    }

    /// Set diagnostic name
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Drop every entry
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }

    /// Approximate number of entries
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl<K, V> NamedStorage for MemoryStorage<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<K, V> ReadableStorage<K, V> for MemoryStorage<K, V>
where
    K: StorageKey + Hash + Eq,
    V: Clone + Send + Sync + 'static,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        match self.inner.get(&key).await {
            Some(value) => Ok(value),
            None => Err(StorageError::not_found(&*self.name, &key)),
        }
    }
}

#[async_trait]
impl<K, V> WritableStorage<K, V> for MemoryStorage<K, V>
where
    K: StorageKey + Hash + Eq,
    V: Clone + Send + Sync + 'static,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        self.inner.insert(key, value).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let storage = MemoryStorage::<String, u8>::new();
        let err = storage.retrieve("nope".to_string()).await.unwrap_err();
        assert_eq!(
            err,
            StorageError::NotFound {
                storage: "memory".to_string(),
                key: "\"nope\"".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn clones_share_entries() {
        let storage = MemoryStorage::<u8, u8>::new();
        let other = storage.clone();
        storage.set(1, 2).await.unwrap();
        assert_eq!(other.retrieve(2).await.unwrap(), 1);

        other.clear();
        assert!(storage.retrieve(2).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn latest_write_wins() {
        let storage = MemoryStorage::<(), &'static str>::new();
        storage.set("first", ()).await.unwrap();
        storage.set("second", ()).await.unwrap();
        assert_eq!(storage.retrieve(()).await.unwrap(), "second");
    }
}
