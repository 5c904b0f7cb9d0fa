//! Flags registry
//!
//! Holds the flagged set in memory and persists the whole set after every
//! mutation. Mutations are serialized, so concurrent updates of different ids
//! never overwrite each other on disk.
//!
//! Until [`load`](FlagsRegistry::load) completes, mutations apply to the
//! in-memory set and are queued. Loading replays them on top of the persisted
//! set. [`latest`](FlagsRegistry::latest) reports `NotFound` until then, so a
//! consistency keeper skips instead of uploading a partial set.

use crate::descriptor::FlagDescriptor;
use crate::error::{FlagsError, Result};
use crate::set::{Change, FlagsSet, RegistryUpdate};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::Arc;
use tgk_event::{Publisher, Subscribe};
use tgk_storage::prelude::*;

struct State<Id: Eq + Hash> {
    flags: FlagsSet<Id>,
    loaded: bool,
    pending: Vec<Change<Id>>,
}

/// Registry of flagged ids for descriptor `D`
pub struct FlagsRegistry<D: FlagDescriptor> {
    storage: SharedStorage<(), HashSet<D::Id>>,
    state: Arc<RwLock<State<D::Id>>>,
    persist: tokio::sync::Mutex<()>,
    did_update: Publisher<RegistryUpdate<D::Id>>,
}

impl<D: FlagDescriptor> fmt::Debug for FlagsRegistry<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("FlagsRegistry")
            .field("descriptor", &D::NAME)
            .field("storage", &self.storage.storage_name())
            .field("loaded", &state.loaded)
            .field("flags", &state.flags.len())
            .finish()
    }
}

impl<D: FlagDescriptor> FlagsRegistry<D> {
    /// Registry persisting to `storage`, not yet loaded
    #[must_use]
    pub fn new(storage: SharedStorage<(), HashSet<D::Id>>) -> Self {
        Self {
            storage,
            state: Arc::new(RwLock::new(State {
                flags: FlagsSet::default(),
                loaded: false,
                pending: Vec::new(),
            })),
            persist: tokio::sync::Mutex::new(()),
            did_update: Publisher::new(format!("{}.did-update", D::NAME)),
        }
    }

    /// Registry persisting `{"ids": [...]}` to the descriptor's file in `disk`
    ///
    /// # Errors
    /// `KeyMapping` if the descriptor name is not a valid file name
    pub fn in_directory(disk: FileSystemStorage) -> Result<Self> {
        let storage = disk
            .map_json()
            .map_boxed_set::<D::Id>()
            .single_key(D::filename()?)
            .shared();
        Ok(Self::new(storage))
    }

    /// Whether `id` is flagged, without I/O
    #[must_use]
    pub fn is_present(&self, id: &D::Id) -> bool {
        self.state.read().flags.contains(id)
    }

    /// Current in-memory flags
    #[must_use]
    pub fn all(&self) -> FlagsSet<D::Id> {
        self.state.read().flags.clone()
    }

    /// Whether the persisted set has been loaded
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.state.read().loaded
    }

    /// Flag or unflag `id`, persist, and publish the update
    ///
    /// The update is published even when persisting fails; the in-memory set
    /// stays authoritative and the next mutation persists it again.
    ///
    /// Before [`load`](Self::load) the change is only queued: the set is
    /// still partial, so nothing is persisted or published until `load`
    /// publishes the merged result.
    ///
    /// # Errors
    /// Storage failure while persisting
    pub async fn update_presence(&self, id: D::Id, is_present: bool) -> Result<()> {
        let change = Change::new(id, is_present);
        let _persisting = self.persist.lock().await;

        let (flags, loaded) = {
            let mut state = self.state.write();
            state.flags.apply(&change);
            if !state.loaded {
                state.pending.push(change);
            }
            (state.flags.clone(), state.loaded)
        };
        tracing::debug!(registry = D::NAME, ?id, is_present, "flag updated");

        if !loaded {
            return Ok(());
        }
        let persisted = self.persist_flags(&flags).await;
        self.did_update.publish(RegistryUpdate {
            flags,
            change: Some(change),
        });
        persisted
    }

    /// Replace every flag with `flags`, typically pushed by a companion device
    ///
    /// # Errors
    /// Storage failure while persisting
    pub async fn replace(&self, flags: HashSet<D::Id>) -> Result<()> {
        let _persisting = self.persist.lock().await;
        let flags = FlagsSet::from(flags);
        {
            let mut state = self.state.write();
            state.flags = flags.clone();
            state.loaded = true;
            state.pending.clear();
        }
        tracing::debug!(registry = D::NAME, count = flags.len(), "flags replaced");

        let persisted = self.persist_flags(&flags).await;
        self.did_update.publish(RegistryUpdate { flags, change: None });
        persisted
    }

    /// Read the persisted set and replay mutations made before loading
    ///
    /// A missing file loads as the empty set. Loading twice is a no-op.
    ///
    /// # Errors
    /// Any storage failure other than `NotFound`; the registry stays unloaded
    pub async fn load(&self) -> Result<()> {
        let _persisting = self.persist.lock().await;
        let loaded = self.state.read().loaded;
        if loaded {
            return Ok(());
        }

        let stored = match self.storage.retrieve(()).await {
            Ok(stored) => stored,
            Err(err) if err.is_not_found() => HashSet::new(),
            Err(err) => {
                tracing::warn!(registry = D::NAME, error = %err, "cannot load flags");
                return Err(err.into());
            }
        };

        let (flags, replayed) = {
            let mut state = self.state.write();
            let mut flags = FlagsSet::from(stored);
            let pending = std::mem::take(&mut state.pending);
            for change in &pending {
                flags.apply(change);
            }
            state.flags = flags.clone();
            state.loaded = true;
            (flags, pending.len())
        };
        tracing::debug!(registry = D::NAME, count = flags.len(), replayed, "flags loaded");

        let persisted = if replayed > 0 {
            self.persist_flags(&flags).await
        } else {
            Ok(())
        };
        self.did_update.publish(RegistryUpdate { flags, change: None });
        persisted
    }

    async fn persist_flags(&self, flags: &FlagsSet<D::Id>) -> Result<()> {
        self.storage
            .set(flags.as_set().clone(), ())
            .await
            .map_err(|err| {
                tracing::warn!(registry = D::NAME, error = %err, "failed to persist flags");
                FlagsError::from(err)
            })
    }

    /// Flags as a storage, `NotFound` until loaded
    #[must_use]
    pub fn latest(&self) -> Retrieve<HashSet<D::Id>> {
        LoadedFlags::<D> {
            state: Arc::clone(&self.state),
            name: format!("{}.latest", D::NAME),
            _descriptor: PhantomData,
        }
        .read_only()
    }

    /// Every update with the resulting set
    #[must_use]
    pub fn did_update(&self) -> Subscribe<RegistryUpdate<D::Id>> {
        self.did_update.proxy()
    }

    /// Resulting sets only
    #[must_use]
    pub fn did_update_flags(&self) -> Subscribe<HashSet<D::Id>> {
        self.did_update
            .proxy()
            .map(|update: &RegistryUpdate<D::Id>| update.flags.as_set().clone())
    }

    /// Single-id changes only
    #[must_use]
    pub fn did_update_presence(&self) -> Subscribe<Change<D::Id>> {
        self.did_update
            .proxy()
            .filter_map(|update: &RegistryUpdate<D::Id>| update.change)
    }
}

struct LoadedFlags<D: FlagDescriptor> {
    state: Arc<RwLock<State<D::Id>>>,
    name: String,
    _descriptor: PhantomData<fn() -> D>,
}

impl<D: FlagDescriptor> NamedStorage for LoadedFlags<D> {
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<D: FlagDescriptor> ReadableStorage<(), HashSet<D::Id>> for LoadedFlags<D> {
    async fn retrieve(&self, (): ()) -> tgk_storage::Result<HashSet<D::Id>> {
        let state = self.state.read();
        if state.loaded {
            Ok(state.flags.as_set().clone())
        } else {
            Err(StorageError::not_found(&self.name, &()))
        }
    }
}
