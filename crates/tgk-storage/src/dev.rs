//! Development storages with a fixed outcome

use crate::error::{Result, StorageError};
use crate::storage::{NamedStorage, ReadableStorage, StorageKey, WritableStorage};
use async_trait::async_trait;

/// Storage that answers every call with the same outcome
///
/// A `successing` storage returns its value for every key and accepts every
/// write. A `failing` storage returns its error for reads and writes alike.
#[derive(Debug, Clone)]
pub struct DevStorage<V> {
    outcome: Result<V>,
}

impl<V> DevStorage<V> {
    /// Storage that always yields `value`
    #[inline]
    #[must_use]
    pub fn successing(value: V) -> Self {
        Self { outcome: Ok(value) }
    }

    /// Storage that always fails with `error`
    #[inline]
    #[must_use]
    pub fn failing(error: StorageError) -> Self {
        Self {
            outcome: Err(error),
        }
    }
}

impl<V: Send + Sync> NamedStorage for DevStorage<V> {
    fn storage_name(&self) -> &str {
        match self.outcome {
            Ok(_) => "dev-successing",
            Err(_) => "dev-failing",
        }
    }
}

#[async_trait]
impl<K, V> ReadableStorage<K, V> for DevStorage<V>
where
    K: StorageKey,
    V: Clone + Send + Sync + 'static,
{
    async fn retrieve(&self, _key: K) -> Result<V> {
        self.outcome.clone()
    }
}

#[async_trait]
impl<K, V> WritableStorage<K, V> for DevStorage<V>
where
    K: StorageKey,
    V: Send + Sync + 'static,
{
    async fn set(&self, _value: V, _key: K) -> Result<()> {
        match &self.outcome {
            Ok(_) => Ok(()),
            Err(err) => Err(err.clone()),
        }
    }
}

/// Shorthand for the error a failing dev storage reports
#[must_use]
pub fn sorry_pal() -> StorageError {
    StorageError::Dev("sorry, pal".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successing_ignores_writes() {
        let storage = DevStorage::successing(3_u8);
        storage.set(9, "any").await.unwrap();
        assert_eq!(storage.retrieve("any").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn failing_fails_both_ways() {
        let storage = DevStorage::<u8>::failing(sorry_pal());
        assert_eq!(storage.retrieve(()).await, Err(sorry_pal()));
        assert_eq!(storage.set(1, ()).await, Err(sorry_pal()));
    }
}
