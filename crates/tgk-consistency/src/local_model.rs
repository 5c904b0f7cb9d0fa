//! Observable local value
//!
//! A [`LocalModel`] owns one unit-key storage and announces every successful
//! write through `did_update`. Failed writes are not announced.

use std::fmt;
use std::sync::Arc;
use tgk_event::{Dispatcher, Publisher, Subscribe};
use tgk_mapping::Mappable;
use tgk_storage::prelude::*;
use tgk_storage::DEFAULT_MEMORY_CAPACITY;
use tokio::task::JoinHandle;

/// Locally stored value with change notifications
pub struct LocalModel<V> {
    storage: SharedStorage<(), V>,
    writer: WriteOnlyStorage<(), V>,
    did_update: Publisher<V>,
}

impl<V> Clone for LocalModel<V> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            writer: Arc::clone(&self.writer),
            did_update: self.did_update.clone(),
        }
    }
}

impl<V> fmt::Debug for LocalModel<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalModel")
            .field("storage", &self.storage.storage_name())
            .field("did_update", &self.did_update)
            .finish()
    }
}

impl<V> LocalModel<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Wrap `storage`
    #[must_use]
    pub fn new(storage: SharedStorage<(), V>) -> Self {
        let did_update = Publisher::new(format!("{}.did-update", storage.storage_name()));
        let publisher = did_update.clone();
        let writer = Arc::clone(&storage)
            .on_completing_write(move |value: &V, result: &Result<()>| {
                if result.is_ok() {
                    publisher.publish(value.clone());
                }
            })
            .write_only();
        Self {
            storage,
            writer,
            did_update,
        }
    }

    /// Model persisted as JSON in `filename` with a memory layer in front
    #[must_use]
    pub fn in_storage(disk: FileSystemStorage, filename: Filename) -> Self
    where
        V: Mappable,
    {
        Self::in_storage_with_capacity(disk, filename, DEFAULT_MEMORY_CAPACITY)
    }

    /// Like [`in_storage`](Self::in_storage) with an explicit memory capacity
    #[must_use]
    pub fn in_storage_with_capacity(disk: FileSystemStorage, filename: Filename, capacity: u64) -> Self
    where
        V: Mappable,
    {
        let storage = disk
            .map_json()
            .map_mappable::<V>()
            .memory_cached_with_capacity::<Filename, V>(capacity)
            .single_key(filename)
            .shared();
        Self::new(storage)
    }

    /// Read access without notifications
    #[must_use]
    pub fn access(&self) -> Retrieve<V> {
        Arc::clone(&self.storage).read_only()
    }

    /// Write access that publishes `did_update` after each successful write
    #[must_use]
    pub fn write_access(&self) -> WriteOnlyStorage<(), V> {
        Arc::clone(&self.writer)
    }

    /// Current value
    ///
    /// # Errors
    /// Any error of the underlying storage
    pub async fn get(&self) -> Result<V> {
        self.storage.retrieve(()).await
    }

    /// Store `value` and publish it on success
    ///
    /// # Errors
    /// Any error of the underlying storage
    pub async fn update(&self, value: V) -> Result<()> {
        self.writer.set(value, ()).await
    }

    /// Warm the storage layers in the background
    pub fn prefetch(&self, dispatcher: &Dispatcher) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);
        dispatcher.spawn(async move {
            match storage.retrieve(()).await {
                Ok(_) => tracing::debug!(storage = %storage.storage_name(), "prefetched"),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(storage = %storage.storage_name(), "nothing to prefetch");
                }
                Err(err) => {
                    tracing::warn!(storage = %storage.storage_name(), error = %err, "prefetch failed");
                }
            }
        })
    }

    /// Values written through [`write_access`](Self::write_access)
    #[must_use]
    pub fn did_update(&self) -> Subscribe<V> {
        self.did_update.proxy()
    }
}
