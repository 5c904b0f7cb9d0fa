//! TGK Storage
//!
//! A small algebra of asynchronous key-value storages. Storages are
//! capabilities (readable, writable or both) that are transformed by
//! combinators into new storages without touching the underlying medium.
//!
//! # Combinators
//!
//! - **Keys**: `map_keys`, `try_map_keys`, `single_key`
//! - **Values**: `map_values`, `map_retrieved`, `map_written`, `defaulting`
//! - **Layers**: `combined`, `memory_cached`, `backed_by`
//! - **Observation**: `on_completing_write`, `tracking_activity`
//! - **JSON**: `map_json`, `map_mappable`, `map_boxed_set`
//!
//! # Architecture
//!
//! ```text
//! FileSystemStorage ─ map_json ─ map_mappable ─ memory_cached ─ single_key → Retrieve<T>
//!        ↑                                                        │
//!        └──────────── backed_by(network) on NotFound ────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use tgk_storage::prelude::*;
//! use std::collections::HashSet;
//!
//! # async fn example() -> tgk_storage::Result<()> {
//! let dir = std::env::temp_dir().join("tgk-doc");
//! let favorites = FileSystemStorage::new(&dir)
//!     .map_json()
//!     .map_boxed_set::<i64>()
//!     .memory_cached::<Filename, HashSet<i64>>()
//!     .single_key(Filename::new("favorite-matches.json")?)
//!     .defaulting(HashSet::new());
//!
//! favorites.set(HashSet::from([7, 13]), ()).await?;
//! assert!(favorites.retrieve(()).await?.contains(&7));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod dev;
pub mod error;
pub mod ext;
pub mod fs;
pub mod json;
pub mod keys;
pub mod layered;
pub mod memory;
pub mod observe;
pub mod storage;
pub mod values;

pub use dev::{sorry_pal, DevStorage};
pub use error::{Result, StorageError, StorageErrorKind};
pub use ext::StorageExt;
pub use fs::{FileSystemStorage, Filename};
pub use json::{BoxedSetStorage, JsonStorage, JsonStorageExt, MappableStorage};
pub use keys::{MapKeys, SingleKey, TryMapKeys};
pub use layered::{BackedBy, Combined};
pub use memory::{MemoryStorage, DEFAULT_MEMORY_CAPACITY};
pub use observe::{ActivityCounter, ActivityIndicator, OnCompletingWrite, TrackingActivity};
pub use storage::{
    NamedStorage, ReadOnlyStorage, ReadableStorage, Retrieve, SharedStorage, Storage, StorageKey,
    StorageValue, WritableStorage, WriteOnlyStorage,
};
pub use values::{Defaulting, MapValues, Unmapped};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and using storages
    pub use crate::dev::{sorry_pal, DevStorage};
    pub use crate::error::{Result, StorageError, StorageErrorKind};
    pub use crate::ext::StorageExt;
    pub use crate::fs::{FileSystemStorage, Filename};
    pub use crate::json::JsonStorageExt;
    pub use crate::layered::Combined;
    pub use crate::memory::MemoryStorage;
    pub use crate::observe::{ActivityCounter, ActivityIndicator};
    pub use crate::storage::{
        NamedStorage, ReadOnlyStorage, ReadableStorage, Retrieve, SharedStorage, Storage,
        WritableStorage, WriteOnlyStorage,
    };
}
