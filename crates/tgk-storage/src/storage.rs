//! Storage capabilities
//!
//! A storage is an asynchronous key to value capability. It can be readable,
//! writable, or both. Each operation resolves to exactly one [`Result`].
//! No ordering holds between two independent operations on the same key
//! unless an implementation serializes them.

use crate::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;

/// Bounds every storage key satisfies
///
/// Keys are cloned when a combinator consults more than one layer and are
/// rendered with `Debug` in diagnostics.
pub trait StorageKey: Clone + Debug + Send + Sync + 'static {}

impl<T: Clone + Debug + Send + Sync + 'static> StorageKey for T {}

/// Bounds every stored value satisfies
pub trait StorageValue: Send + 'static {}

impl<T: Send + 'static> StorageValue for T {}

/// Diagnostic identity of a storage
///
/// The name is used in logs and errors only, never for equality.
pub trait NamedStorage: Send + Sync {
    /// Human readable name
    fn storage_name(&self) -> &str;
}

/// Read capability
#[async_trait]
pub trait ReadableStorage<K: StorageKey, V: StorageValue>: NamedStorage {
    /// Retrieve the value stored for `key`
    ///
    /// # Errors
    /// Any error of the underlying medium, unchanged
    async fn retrieve(&self, key: K) -> Result<V>;
}

/// Write capability
#[async_trait]
pub trait WritableStorage<K: StorageKey, V: StorageValue>: NamedStorage {
    /// Store `value` for `key`
    ///
    /// # Errors
    /// Any error of the underlying medium, unchanged
    async fn set(&self, value: V, key: K) -> Result<()>;
}

/// Read and write capability
pub trait Storage<K: StorageKey, V: StorageValue>:
    ReadableStorage<K, V> + WritableStorage<K, V>
{
}

impl<S, K, V> Storage<K, V> for S
where
    S: ReadableStorage<K, V> + WritableStorage<K, V>,
    K: StorageKey,
    V: StorageValue,
{
}

/// Type-erased read-only storage
pub type ReadOnlyStorage<K, V> = Arc<dyn ReadableStorage<K, V>>;

/// Type-erased write-only storage
pub type WriteOnlyStorage<K, V> = Arc<dyn WritableStorage<K, V>>;

/// Type-erased read/write storage
pub type SharedStorage<K, V> = Arc<dyn Storage<K, V>>;

/// Read-only storage with a single implicit key
pub type Retrieve<V> = ReadOnlyStorage<(), V>;

impl<S: NamedStorage + ?Sized> NamedStorage for Arc<S> {
    fn storage_name(&self) -> &str {
        (**self).storage_name()
    }
}

#[async_trait]
impl<S, K, V> ReadableStorage<K, V> for Arc<S>
where
    S: ReadableStorage<K, V> + ?Sized,
    K: StorageKey,
    V: StorageValue,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        (**self).retrieve(key).await
    }
}

#[async_trait]
impl<S, K, V> WritableStorage<K, V> for Arc<S>
where
    S: WritableStorage<K, V> + ?Sized,
    K: StorageKey,
    V: StorageValue,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        (**self).set(value, key).await
    }
}
